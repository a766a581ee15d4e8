//! Subcommand implementations

mod resolve;
mod tools;
mod verify;

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

pub use resolve::{resolve, ResolveArgs, ResolutionReport};
pub use tools::list_tools;
pub use verify::{verify, VerifyArgs};

/// Write pretty JSON to `output`, or stdout when absent
pub(crate) async fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => tokio::fs::write(path, json + "\n")
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid {what}", path.display()))
}
