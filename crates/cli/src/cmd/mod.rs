pub mod assess;
pub mod decide;
pub mod inventory;
pub mod key_epoch;
pub mod minisign;
pub mod rollback;
pub mod schema;

use std::path::Path;

fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    use anyhow::Context;

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_at(at: Option<&str>) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    match at {
        Some(s) => Ok(tfws_core::parse_timestamp(s)?),
        None => Ok(chrono::Utc::now()),
    }
}
