use tracing::{error, info};

use crate::db::{read_snapshot, ConnectOptions, Database, SchemaError, SchemaSnapshot};

/// Connects, reads the namespace and closes the connection whatever happened.
pub async fn try_fetch_schema(options: &ConnectOptions) -> Result<SchemaSnapshot, SchemaError> {
    let database = Database::connect(options).await?;
    let result = read_snapshot(&database, &options.namespace).await;
    database.close().await;
    result
}

/// Like [`try_fetch_schema`], but reports a failure on stderr and returns `None`.
///
/// `Some` with no tables means the namespace is empty, not that the read failed.
pub async fn fetch_schema(options: &ConnectOptions) -> Option<SchemaSnapshot> {
    match try_fetch_schema(options).await {
        Ok(snapshot) => {
            info!(
                namespace = %snapshot.namespace,
                tables = snapshot.len(),
                "schema retrieved"
            );
            Some(snapshot)
        }
        Err(e) => {
            error!(error = %e, "schema retrieval failed");
            eprintln!("{}", diagnostic(&e));
            None
        }
    }
}

/// Console line for a failed fetch.
fn diagnostic(e: &SchemaError) -> String {
    if e.is_database_error() {
        format!("Database connection error: {}", e)
    } else {
        format!("An unexpected error occurred: {}", e)
    }
}
