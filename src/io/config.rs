//! Host configuration for the demo binary.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Mapper host configuration, loaded from YAML.
#[derive(Debug, Deserialize)]
pub struct MapperConfig {
    /// Height-table XML file (required before any ingest).
    pub height_table: PathBuf,

    /// Map XML file; created on first save if missing.
    pub map_file: PathBuf,

    /// Optional robot trajectory CSV for the SVG overlay.
    #[serde(default)]
    pub trajectory: Option<PathBuf>,

    /// Base name for SVG output; no SVG is written when absent.
    #[serde(default)]
    pub svg_base_name: Option<String>,
}

impl MapperConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("malformed config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapper.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "height_table: heights.xml").unwrap();
        writeln!(file, "map_file: map.xml").unwrap();
        writeln!(file, "svg_base_name: map").unwrap();
        drop(file);

        let config = MapperConfig::load(&path).unwrap();
        assert_eq!(config.height_table, PathBuf::from("heights.xml"));
        assert_eq!(config.map_file, PathBuf::from("map.xml"));
        assert!(config.trajectory.is_none());
        assert_eq!(config.svg_base_name.as_deref(), Some("map"));
    }
}
