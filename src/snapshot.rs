use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::models::ShowRecord;

const PREFIX: &str = "upcoming-shows-";

/// `upcoming-shows-2024-03-01T19-00-00-000Z.json`
static SNAPSHOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^upcoming-shows-\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z\.json$")
        .expect("static regex")
});

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} does not contain a list of shows")]
    NotAList { path: PathBuf },
}

/// File name for a snapshot taken at `at`: ISO-8601 with `:` and `.`
/// replaced by `-`.
pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{PREFIX}{stamp}.json")
}

/// Write the scraped shows to a new timestamped file in `dir`.
pub fn write_snapshot(dir: &Path, shows: &[ShowRecord], at: DateTime<Utc>) -> Result<PathBuf, SnapshotError> {
    std::fs::create_dir_all(dir).map_err(|source| SnapshotError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(snapshot_file_name(at));
    let json = serde_json::to_string_pretty(shows).map_err(|source| SnapshotError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|source| SnapshotError::Io {
        path: path.clone(),
        source,
    })?;

    log::info!("Wrote {} shows to {}", shows.len(), path.display());
    Ok(path)
}

/// Most recent snapshot in `dir`, if any. A missing directory counts as empty.
pub fn latest_snapshot(dir: &Path) -> Result<Option<PathBuf>, SnapshotError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    // Timestamps are fixed-width, so name order is time order
    let latest = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| SNAPSHOT_NAME.is_match(name))
        .max();

    Ok(latest.map(|name| dir.join(name)))
}

/// Load a snapshot as raw records. Records are not validated here: older
/// snapshots may hold wrapped shapes, which the matcher's validator handles.
pub fn load_snapshot(path: &Path) -> Result<Vec<Value>, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(records) => {
            log::debug!("Loaded {} raw shows from {}", records.len(), path.display());
            Ok(records)
        }
        _ => Err(SnapshotError::NotAList {
            path: path.to_path_buf(),
        }),
    }
}
