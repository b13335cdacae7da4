//! Loading and saving the JSON snapshot of the trip database.
use std::{fs, io::ErrorKind, path::Path};

use engine::StoreSnapshot;

use crate::error::Result;

/// Reads the snapshot at `path`; a missing file is an empty database.
pub fn load(path: &Path) -> Result<StoreSnapshot> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!("no database at {}, starting empty", path.display());
            Ok(StoreSnapshot::default())
        }
        Err(err) => Err(err.into()),
    }
}

/// Writes the snapshot next to `path` and renames it into place.
pub fn save(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let raw = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, path)?;
    tracing::debug!("database saved to {}", path.display());
    Ok(())
}
