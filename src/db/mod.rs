mod catalog;
mod client;
mod error;
mod models;
mod operations;

pub use catalog::{read_snapshot, CatalogSource};
pub use client::{ConnectOptions, Database, SslMode};
pub use error::SchemaError;
pub use models::{ColumnInfo, ForeignKeyInfo, SchemaSnapshot, TableInfo};
pub use operations::fetch_schema;

#[cfg(test)]
pub(crate) use catalog::tests as fixtures;
