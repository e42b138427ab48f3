//! Snapshot, config and unit-table files.
//!
//! Snapshots may be JSON (what a live host emits) or RON (what people
//! write by hand); the extension decides. Configs and unit tables are RON.

use std::path::Path;

use skirmish_ai::config::EngineConfig;
use skirmish_core::snapshot::Snapshot;
use skirmish_core::stats::UnitTypeTable;
use tracing::debug;

use crate::error::RunnerError;

/// Whether a path names a snapshot file this runner can read.
#[must_use]
pub fn is_snapshot_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("json" | "ron"))
}

/// Read and validate one snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, RunnerError> {
    let contents = std::fs::read_to_string(path)?;
    let snapshot = match extension(path).as_deref() {
        Some("json") => parse_snapshot_json(&contents)?,
        Some("ron") => Snapshot::from_ron_str(&contents)?,
        _ => return Err(RunnerError::UnsupportedFormat(path.display().to_string())),
    };
    debug!(
        path = %path.display(),
        tick = snapshot.tick,
        units = snapshot.units.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Parse a JSON snapshot and validate it.
pub fn parse_snapshot_json(json: &str) -> Result<Snapshot, RunnerError> {
    let snapshot: Snapshot = serde_json::from_str(json)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Engine config from a RON file, or the defaults.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, RunnerError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Unit table overrides from a RON file, or the standard table.
pub fn load_unit_table(path: Option<&Path>) -> Result<UnitTypeTable, RunnerError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(UnitTypeTable::from_ron_str(&contents)?)
        }
        None => Ok(UnitTypeTable::default()),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::error::CoreError;
    use skirmish_core::unit::UnitId;

    #[test]
    fn test_snapshot_extensions() {
        assert!(is_snapshot_file(Path::new("a/opening.json")));
        assert!(is_snapshot_file(Path::new("a/opening.RON")));
        assert!(!is_snapshot_file(Path::new("a/opening.txt")));
        assert!(!is_snapshot_file(Path::new("a/opening")));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opening.yaml");
        std::fs::write(&path, "tick: 0").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_snapshot_json_rejected() {
        let json = r#"{"tick":0,"terrain":{"width":2,"height":1,"cells":["Open","Open"]},
            "units":[
                {"id":1,"owner":0,"kind":"Worker","position":{"x":0,"y":0},"hitpoints":1},
                {"id":1,"owner":0,"kind":"Worker","position":{"x":1,"y":0},"hitpoints":1}
            ]}"#;
        let err = parse_snapshot_json(json).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Core(CoreError::DuplicateUnitId(UnitId(1)))
        ));
    }

    #[test]
    fn test_defaults_without_paths() {
        assert_eq!(load_engine_config(None).unwrap(), EngineConfig::default());
        assert_eq!(load_unit_table(None).unwrap(), UnitTypeTable::default());
    }
}
