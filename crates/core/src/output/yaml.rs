use super::FormatError;
use crate::models::ProjectMap;

/// Convert a ProjectMap to YAML
pub fn to_yaml(map: &ProjectMap) -> Result<String, FormatError> {
    serde_yaml::to_string(map).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMetadata, FoldStats};
    use std::path::PathBuf;

    #[test]
    fn test_to_yaml() {
        let map = ProjectMap {
            root: PathBuf::from("/test"),
            files: vec![],
            stats: FoldStats::default(),
            metadata: AnalysisMetadata::default(),
        };

        let yaml = to_yaml(&map).unwrap();
        assert!(yaml.contains("root:"));
        assert!(yaml.contains("files:"));
    }
}
