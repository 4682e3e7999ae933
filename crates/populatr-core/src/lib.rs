pub mod config;
pub mod connect;
pub mod deadline;
pub mod dialect;
pub mod error;
pub mod generate;
pub mod graph;
pub mod insert;
pub mod pipeline;
pub mod schema;

// Re-export key types for convenience
pub use connect::DatabasePool;
pub use dialect::Dialect;
pub use error::{PopulatrError, Result};
pub use generate::value::Value;
pub use pipeline::{RunOptions, RunSummary, TableStatus};
pub use schema::types::DatabaseSchema;
