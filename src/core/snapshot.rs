use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use super::error::{EngineError, SnapshotError};
use super::params::{ParamKey, ParameterSet};

const REQUIRED_KEYS: [ParamKey; 2] = [ParamKey::NewCarPrice, ParamKey::Years];

pub fn export_snapshot(params: &ParameterSet) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(params)?)
}

/// Merges a flat JSON object of inputs into `params`. Unknown keys are
/// ignored. On any error `params` is left exactly as it was.
pub fn import_snapshot(params: &mut ParameterSet, json: &str) -> Result<(), SnapshotError> {
    let object = serde_json::from_str::<Map<String, Value>>(json)?;

    for key in REQUIRED_KEYS {
        if !object.contains_key(key.name()) {
            return Err(SnapshotError::MissingKey(key.name()));
        }
    }

    let mut merged = params.clone();
    apply_overrides(&mut merged, &object)?;
    merged.validate()?;
    *params = merged;
    Ok(())
}

/// Applies every recognised key of `object` onto `params`, rejecting values
/// that are not numbers (or booleans for `includeTerminalValue`).
pub fn apply_overrides(
    params: &mut ParameterSet,
    object: &Map<String, Value>,
) -> Result<(), EngineError> {
    for (name, value) in object {
        let Some(key) = ParamKey::from_name(name) else {
            continue;
        };
        let numeric = match (key, value) {
            (_, Value::Number(n)) => n.as_f64(),
            (ParamKey::IncludeTerminalValue, Value::Bool(flag)) => Some(f64::from(u8::from(*flag))),
            _ => None,
        };
        let Some(numeric) = numeric else {
            return Err(EngineError::InvalidParameter {
                key: key.name(),
                reason: format!("expected a number, got {value}"),
            });
        };
        params.set(key, numeric)?;
    }
    Ok(())
}

pub fn load_snapshot_file(params: &mut ParameterSet, path: &Path) -> Result<(), SnapshotError> {
    let json = fs::read_to_string(path)?;
    import_snapshot(params, &json)
}

pub fn save_snapshot_file(params: &ParameterSet, path: &Path) -> Result<(), SnapshotError> {
    fs::write(path, export_snapshot(params)?)?;
    Ok(())
}
