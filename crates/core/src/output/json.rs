use super::FormatError;
use crate::models::ProjectMap;

/// Convert a ProjectMap to pretty-printed JSON
pub fn to_json(map: &ProjectMap) -> Result<String, FormatError> {
    serde_json::to_string_pretty(map).map_err(FormatError::from)
}

/// Convert a ProjectMap to compact JSON
#[allow(dead_code)]
pub fn to_json_compact(map: &ProjectMap) -> Result<String, FormatError> {
    serde_json::to_string(map).map_err(FormatError::from)
}
