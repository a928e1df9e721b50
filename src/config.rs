//! Optional tracker configuration loaded beside the targets file.
//!
//! Flags override file values; built-in defaults apply when neither is
//! present. The defaults match the propagation effort this tool was first
//! built for, so a bare checkout keeps working.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "ptrack.config.json";
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_NAMESPACE: &str = "Azure-Samples";
pub const DEFAULT_SOURCE_REFERENCE: &str = "TBD";
pub const DEFAULT_TITLE_MARKERS: &[&str] = &[
    "App Insights",
    "APPLICATIONINSIGHTS",
    "propagation from #18",
];

/// Pack-owned configuration file, all fields optional.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
    #[serde(default)]
    pub title_markers: Vec<String>,
}

/// Load `ptrack.config.json` from the targets file's directory, if present.
pub fn load_optional(targets_path: &Path) -> Result<Option<TrackerConfig>> {
    let dir = targets_path.parent().filter(|p| !p.as_os_str().is_empty());
    let path = dir.unwrap_or_else(|| Path::new(".")).join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: TrackerConfig = serde_json::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "config {} has schema_version {}, expected {}",
            path.display(),
            config.schema_version,
            CONFIG_SCHEMA_VERSION
        ));
    }
    Ok(Some(config))
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub namespace: String,
    pub source_reference: String,
    pub title_markers: Vec<String>,
}

impl Settings {
    pub fn resolve(
        config: Option<&TrackerConfig>,
        namespace_flag: Option<&str>,
        source_flag: Option<&str>,
        marker_flags: &[String],
    ) -> Settings {
        let namespace = namespace_flag
            .map(str::to_string)
            .or_else(|| config.and_then(|c| c.default_namespace.clone()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let source_reference = source_flag
            .map(str::to_string)
            .or_else(|| config.and_then(|c| c.source_reference.clone()))
            .unwrap_or_else(|| DEFAULT_SOURCE_REFERENCE.to_string());
        let title_markers = if !marker_flags.is_empty() {
            marker_flags.to_vec()
        } else {
            match config.filter(|c| !c.title_markers.is_empty()) {
                Some(c) => c.title_markers.clone(),
                None => DEFAULT_TITLE_MARKERS.iter().map(|m| m.to_string()).collect(),
            }
        };
        Settings {
            namespace,
            source_reference,
            title_markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_or_flags() {
        let settings = Settings::resolve(None, None, None, &[]);
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
        assert_eq!(settings.source_reference, DEFAULT_SOURCE_REFERENCE);
        assert_eq!(settings.title_markers.len(), DEFAULT_TITLE_MARKERS.len());
    }

    #[test]
    fn flags_override_config_which_overrides_defaults() {
        let config = TrackerConfig {
            schema_version: CONFIG_SCHEMA_VERSION,
            default_namespace: Some("config-org".to_string()),
            source_reference: Some("pr-18".to_string()),
            title_markers: vec!["config marker".to_string()],
        };
        let markers = vec!["flag marker".to_string()];
        let settings = Settings::resolve(Some(&config), Some("flag-org"), None, &markers);
        assert_eq!(settings.namespace, "flag-org");
        assert_eq!(settings.source_reference, "pr-18");
        assert_eq!(settings.title_markers, vec!["flag marker"]);
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let targets = dir.path().join("propagation.targets.json");
        assert!(load_optional(&targets).unwrap().is_none());
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let targets = dir.path().join("propagation.targets.json");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "{\"schema_version\": 99}",
        )
        .unwrap();
        assert!(load_optional(&targets).is_err());
    }
}
