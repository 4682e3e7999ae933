pub mod graph;
pub mod introspect;
pub mod populate;

use std::path::Path;

use anyhow::{Context, Result};

use populatr_core::config::{read_config, resolve_database_url, PopulatrConfig};
use populatr_core::connect::DatabasePool;

/// Load `populatr.toml` from the working directory, if there is one.
pub fn load_config() -> Result<Option<PopulatrConfig>> {
    read_config(Path::new(".")).context("Failed to load populatr.toml")
}

/// Resolve the database URL (flag, env, config) and connect.
pub async fn connect(db: Option<&str>, config: Option<&PopulatrConfig>) -> Result<DatabasePool> {
    let db_url = resolve_database_url(db, config)?;
    let pool = DatabasePool::connect(&db_url).await?;
    Ok(pool)
}

/// `--schema` flag, else `[database] schema`.
pub fn schema_name<'a>(flag: Option<&'a str>, config: Option<&'a PopulatrConfig>) -> Option<&'a str> {
    flag.or_else(|| config.and_then(|c| c.database.schema.as_deref()))
}
