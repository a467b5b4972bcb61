/// Failures while reading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Unreachable host, bad credentials or a malformed connection string
    #[error("{0}")]
    Connection(#[source] tokio_postgres::Error),

    /// A catalog query failed
    #[error("{}", query_message(.table.as_deref(), .source))]
    Query {
        table: Option<String>,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("failed to build TLS connector: {0}")]
    Tls(#[from] native_tls::Error),
}

fn query_message(table: Option<&str>, source: &tokio_postgres::Error) -> String {
    match table {
        Some(table) => format!("{source} (while reading table {table})"),
        None => source.to_string(),
    }
}

impl SchemaError {
    pub fn query(table: Option<&str>, source: tokio_postgres::Error) -> Self {
        SchemaError::Query {
            table: table.map(str::to_string),
            source,
        }
    }

    /// True for errors raised by the database driver itself.
    pub fn is_database_error(&self) -> bool {
        matches!(self, SchemaError::Connection(_) | SchemaError::Query { .. })
    }
}
