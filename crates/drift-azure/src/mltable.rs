//! MLTable definitions over Delta Lake tables.

use drift_abstraction::{PlatformError, PlatformResult, TableCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MLTABLE_FILE: &str = "MLTable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlTableSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub paths: Vec<MlTablePath>,
    pub transformations: Vec<Transformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlTablePath {
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub read_delta_lake: ReadDeltaLake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadDeltaLake {
    pub timestamp_as_of: String,
}

impl MlTableSpec {
    /// Point-in-time read of the Delta Lake table stored in `folder`.
    #[must_use]
    pub fn from_delta_lake(folder: &str, timestamp_as_of: &str) -> Self {
        Self {
            kind: "mltable".to_string(),
            paths: vec![MlTablePath { folder: folder.to_string() }],
            transformations: vec![Transformation {
                read_delta_lake: ReadDeltaLake { timestamp_as_of: timestamp_as_of.to_string() },
            }],
        }
    }
}

/// Writes `MLTable` files to local folders.
#[derive(Debug, Default, Clone, Copy)]
pub struct MlTableCatalog;

impl TableCatalog for MlTableCatalog {
    fn materialize_delta_table(&self, source_uri: &str, timestamp_as_of: &str, dest: &Path) -> PlatformResult<PathBuf> {
        let spec = MlTableSpec::from_delta_lake(source_uri, timestamp_as_of);
        let yaml = serde_yaml::to_string(&spec).map_err(|e| PlatformError::Serialization(e.to_string()))?;

        std::fs::create_dir_all(dest)?;
        std::fs::write(dest.join(MLTABLE_FILE), yaml)?;
        debug!(dest = %dest.display(), source = %source_uri, "MLTable written");
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_materialize_writes_mltable_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("gold-sales-mltable");
        let uri = "azureml://subscriptions/s/resourcegroups/rg/workspaces/ws/datastores/gold/paths/sales";

        let folder = MlTableCatalog.materialize_delta_table(uri, "2024-03-01T08:30:00Z", &dest).unwrap();

        assert_eq!(folder, dest);
        let content = std::fs::read_to_string(dest.join(MLTABLE_FILE)).unwrap();
        let spec: MlTableSpec = serde_yaml::from_str(&content).unwrap();
        assert_eq!(spec, MlTableSpec::from_delta_lake(uri, "2024-03-01T08:30:00Z"));
        assert!(content.contains("type: mltable"));
        assert!(content.contains("read_delta_lake:"));
    }

    #[test]
    fn test_materialize_overwrites_previous_definition() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("t");

        MlTableCatalog.materialize_delta_table("azureml://a", "2024-01-01T00:00:00Z", &dest).unwrap();
        MlTableCatalog.materialize_delta_table("azureml://a", "2024-02-01T00:00:00Z", &dest).unwrap();

        let content = std::fs::read_to_string(dest.join(MLTABLE_FILE)).unwrap();
        assert!(content.contains("2024-02-01T00:00:00Z"));
        assert!(!content.contains("2024-01-01T00:00:00Z"));
    }
}
