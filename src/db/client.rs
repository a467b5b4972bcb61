use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use crate::db::{CatalogSource, ColumnInfo, ForeignKeyInfo, SchemaError};

/// How TLS is negotiated with the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Plain TCP, never attempt TLS
    Disable,
    /// Let the connection string decide (tokio-postgres defaults to `prefer`);
    /// the certificate is not verified
    #[default]
    Prefer,
    /// Fail unless the server accepts TLS; the certificate is not verified
    Require,
    /// Require TLS and verify the certificate chain and hostname
    VerifyFull,
}

/// Connector for `mode`, or `None` when TLS is disabled.
pub(crate) fn tls_connector(mode: SslMode) -> Result<Option<MakeTlsConnector>, SchemaError> {
    let mut builder = TlsConnector::builder();
    match mode {
        SslMode::Disable => return Ok(None),
        SslMode::Prefer | SslMode::Require => {
            debug!("certificate verification disabled");
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyFull => debug!("full certificate verification"),
    }
    Ok(Some(MakeTlsConnector::new(builder.build()?)))
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub namespace: String,
    pub ssl_mode: SslMode,
}

impl ConnectOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: "public".to_string(),
            ssl_mode: SslMode::default(),
        }
    }
}

pub struct Database {
    client: Client,
    connection: JoinHandle<()>,
}

impl Database {
    #[tracing::instrument(skip_all, fields(ssl_mode = ?options.ssl_mode))]
    pub async fn connect(options: &ConnectOptions) -> Result<Self, SchemaError> {
        let mut config: tokio_postgres::Config =
            options.url.parse().map_err(SchemaError::Connection)?;

        match options.ssl_mode {
            SslMode::Disable => {
                config.ssl_mode(tokio_postgres::config::SslMode::Disable);
            }
            SslMode::Require | SslMode::VerifyFull => {
                config.ssl_mode(tokio_postgres::config::SslMode::Require);
            }
            SslMode::Prefer => {}
        }

        let (client, connection) = match tls_connector(options.ssl_mode)? {
            None => {
                let (client, connection) =
                    config.connect(NoTls).await.map_err(SchemaError::Connection)?;
                (client, spawn_connection(connection))
            }
            Some(tls) => {
                let (client, connection) =
                    config.connect(tls).await.map_err(SchemaError::Connection)?;
                (client, spawn_connection(connection))
            }
        };

        debug!("connected");
        Ok(Database { client, connection })
    }

    /// Drops the client and waits for the connection task to wind down.
    pub async fn close(self) {
        let Database { client, connection } = self;
        drop(client);
        if let Err(e) = connection.await {
            warn!(error = %e, "connection task did not shut down cleanly");
        }
        debug!("connection closed");
    }
}

// Keep connection alive in background task
fn spawn_connection<F>(connection: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(error = %e, "database connection error");
        }
    })
}

fn column_from_row(row: &Row) -> ColumnInfo {
    let is_nullable: String = row.get(2);
    ColumnInfo {
        name: row.get(0),
        data_type: row.get(1),
        is_nullable: is_nullable == "YES",
        default: row.get(3),
    }
}

fn foreign_key_from_row(row: &Row) -> ForeignKeyInfo {
    ForeignKeyInfo {
        column: row.get(0),
        references_table: row.get(1),
        references_column: row.get(2),
    }
}

#[async_trait]
impl CatalogSource for Database {
    async fn list_tables(&self, namespace: &str) -> Result<Vec<String>, SchemaError> {
        let rows = self
            .client
            .query(
                "SELECT table_name
                 FROM information_schema.tables
                 WHERE table_schema = $1
                 ORDER BY table_name",
                &[&namespace],
            )
            .await
            .map_err(|e| SchemaError::query(None, e))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn columns(&self, namespace: &str, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let rows = self
            .client
            .query(
                "SELECT column_name, data_type, is_nullable, column_default
                 FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2
                 ORDER BY ordinal_position",
                &[&namespace, &table],
            )
            .await
            .map_err(|e| SchemaError::query(Some(table), e))?;

        Ok(rows.iter().map(column_from_row).collect())
    }

    async fn primary_keys(&self, namespace: &str, table: &str) -> Result<Vec<String>, SchemaError> {
        let rows = self
            .client
            .query(
                "SELECT kcu.column_name
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                     ON tc.constraint_name = kcu.constraint_name
                     AND tc.table_schema = kcu.table_schema
                 WHERE tc.constraint_type = 'PRIMARY KEY'
                     AND tc.table_schema = $1
                     AND tc.table_name = $2",
                &[&namespace, &table],
            )
            .await
            .map_err(|e| SchemaError::query(Some(table), e))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn foreign_keys(
        &self,
        namespace: &str,
        table: &str,
    ) -> Result<Vec<ForeignKeyInfo>, SchemaError> {
        let rows = self
            .client
            .query(
                "SELECT
                     kcu.column_name,
                     ccu.table_name AS foreign_table_name,
                     ccu.column_name AS foreign_column_name
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                     ON tc.constraint_name = kcu.constraint_name
                     AND tc.table_schema = kcu.table_schema
                 JOIN information_schema.constraint_column_usage ccu
                     ON tc.constraint_name = ccu.constraint_name
                     AND tc.table_schema = ccu.table_schema
                 WHERE tc.constraint_type = 'FOREIGN KEY'
                     AND tc.table_schema = $1
                     AND tc.table_name = $2",
                &[&namespace, &table],
            )
            .await
            .map_err(|e| SchemaError::query(Some(table), e))?;

        Ok(rows.iter().map(foreign_key_from_row).collect())
    }
}
