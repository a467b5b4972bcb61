use async_trait::async_trait;
use tracing::debug;

use crate::db::{ColumnInfo, ForeignKeyInfo, SchemaError, SchemaSnapshot, TableInfo};

/// The four catalog reads a snapshot is built from.
///
/// Every method is scoped to one namespace so tables with the same name in
/// other schemas never leak in.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Table names in the namespace, alphabetically.
    async fn list_tables(&self, namespace: &str) -> Result<Vec<String>, SchemaError>;

    /// Columns of `table` by ordinal position.
    async fn columns(&self, namespace: &str, table: &str) -> Result<Vec<ColumnInfo>, SchemaError>;

    async fn primary_keys(&self, namespace: &str, table: &str) -> Result<Vec<String>, SchemaError>;

    async fn foreign_keys(
        &self,
        namespace: &str,
        table: &str,
    ) -> Result<Vec<ForeignKeyInfo>, SchemaError>;
}

/// Reads every table of `namespace`, one query at a time.
///
/// Any failure discards the tables gathered so far.
#[tracing::instrument(skip(source))]
pub async fn read_snapshot<C>(source: &C, namespace: &str) -> Result<SchemaSnapshot, SchemaError>
where
    C: CatalogSource + ?Sized,
{
    let tables = source.list_tables(namespace).await?;
    debug!(count = tables.len(), "listed tables");

    let mut snapshot = SchemaSnapshot::new(namespace);
    for table in tables {
        let columns = source.columns(namespace, &table).await?;
        let primary_keys = source.primary_keys(namespace, &table).await?;
        let foreign_keys = source.foreign_keys(namespace, &table).await?;
        debug!(
            table = %table,
            columns = columns.len(),
            primary_keys = primary_keys.len(),
            foreign_keys = foreign_keys.len(),
            "read table"
        );

        snapshot.tables.insert(
            table,
            TableInfo {
                columns,
                primary_keys,
                foreign_keys,
            },
        );
    }

    Ok(snapshot)
}
