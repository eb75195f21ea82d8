//! The client-facing configuration surface.
//!
//! Deserialized from `workspace/didChangeConfiguration` payloads; every
//! field is optional and falls back to its default, so partial settings
//! blobs apply cleanly.

use serde::Deserialize;

use dunlin_module_resolver::PythonVersion;

use crate::diagnostics::SeverityMap;

fn default_true() -> bool {
    true
}

fn default_publishing_delay() -> u64 {
    1000
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    pub python: PythonSettings,
    pub interpreter: InterpreterSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PythonSettings {
    pub linting: LintingSettings,
    pub analysis: AnalysisSettings,
    /// Ordered user search roots.
    pub search_paths: Vec<String>,
}

impl Default for PythonSettings {
    fn default() -> Self {
        Self {
            linting: LintingSettings::default(),
            analysis: AnalysisSettings::default(),
            search_paths: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LintingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    /// Error codes promoted to errors.
    pub errors: Vec<String>,
    /// Error codes demoted or promoted to warnings.
    pub warnings: Vec<String>,
    /// Error codes demoted to information.
    pub information: Vec<String>,
    /// Error codes suppressed entirely.
    pub disabled: Vec<String>,
    #[serde(default = "default_publishing_delay")]
    pub publishing_delay: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            information: Vec::new(),
            disabled: Vec::new(),
            publishing_delay: default_publishing_delay(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterpreterSettings {
    pub properties: InterpreterProperties,
    /// Ordered interpreter/library search roots.
    pub search_paths: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InterpreterProperties {
    #[serde(rename = "InterpreterPath")]
    pub interpreter_path: Option<String>,
    #[serde(rename = "Version")]
    pub version: Option<String>,
    #[serde(rename = "UseDefaultDatabase")]
    pub use_default_database: Option<bool>,
}

impl ClientSettings {
    /// Parses a configuration payload, falling back to defaults (with a
    /// log line) on malformed input.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("Failed to deserialize client settings, using defaults: {error}");
                Self::default()
            }
        }
    }

    pub fn severity_map(&self) -> SeverityMap {
        let analysis = &self.python.analysis;
        SeverityMap::from_lists(
            &analysis.errors,
            &analysis.warnings,
            &analysis.information,
            &analysis.disabled,
        )
    }

    pub fn python_version(&self) -> PythonVersion {
        self.interpreter
            .properties
            .version
            .as_deref()
            .and_then(|version| version.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use dunlin_diagnostics::Severity;

    use super::ClientSettings;

    #[test]
    fn defaults() {
        let settings = ClientSettings::from_value(json!({}));
        assert!(settings.python.linting.enabled);
        assert_eq!(settings.python.analysis.publishing_delay, 1000);
        assert_eq!(settings.python_version().major, 3);
    }

    #[test]
    fn nested_keys() {
        let settings = ClientSettings::from_value(json!({
            "python": {
                "linting": { "enabled": false },
                "analysis": {
                    "errors": ["undefined-variable"],
                    "disabled": ["typevar-linter"],
                    "publishingDelay": 250,
                },
                "searchPaths": ["/ws/src"],
            },
            "interpreter": {
                "properties": {
                    "InterpreterPath": "/usr/bin/python3",
                    "Version": "3.7",
                    "UseDefaultDatabase": true,
                },
            },
        }));

        assert!(!settings.python.linting.enabled);
        assert_eq!(settings.python.analysis.publishing_delay, 250);
        assert_eq!(settings.python.search_paths, vec!["/ws/src".to_string()]);
        assert_eq!(settings.python_version().minor, 7);

        let map = settings.severity_map();
        assert_eq!(
            map.effective("undefined-variable", Severity::Warning),
            Severity::Error
        );
        assert_eq!(
            map.effective("typevar-linter", Severity::Warning),
            Severity::Suppressed
        );
        assert_eq!(
            map.effective("unlisted-code", Severity::Information),
            Severity::Information
        );
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let settings = ClientSettings::from_value(json!({ "python": 42 }));
        assert!(settings.python.linting.enabled);
    }
}
