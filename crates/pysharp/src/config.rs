//! Configuration system for pysharp.
//!
//! Loads config from:
//! 1. Global: ~/.config/pysharp/config.toml
//! 2. Per-project: pysharp.toml at the source root (overrides global)
//!
//! Example pysharp.toml:
//! ```toml
//! [source]
//! extension = "py"
//! respect_gitignore = true
//!
//! [output]
//! extension = "cs"
//! dir = "Generated"
//!
//! [watch]
//! debounce_ms = 200
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project config file.
pub const PROJECT_CONFIG: &str = "pysharp.toml";

/// Which files are translated.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(default)]
pub struct SourceConfig {
    /// Extension of source files, without the dot. Default: "py"
    pub extension: Option<String>,
    /// Skip files excluded by .gitignore. Default: true
    pub respect_gitignore: Option<bool>,
}

impl SourceConfig {
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or("py")
    }

    pub fn respect_gitignore(&self) -> bool {
        self.respect_gitignore.unwrap_or(true)
    }
}

/// Where translated files are written.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Extension of generated files, without the dot. Default: "cs"
    pub extension: Option<String>,
    /// Directory that mirrors the source layout. None = next to each source file.
    /// Relative paths resolve against the source root.
    pub dir: Option<PathBuf>,
}

impl OutputConfig {
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or("cs")
    }
}

/// Watch mode settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of file events is processed. Default: 200
    pub debounce_ms: Option<u64>,
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(200))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(default)]
pub struct PysharpConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub watch: WatchConfig,
}

impl PysharpConfig {
    /// Load configuration for a source root.
    ///
    /// Loads global config from ~/.config/pysharp/config.toml,
    /// then merges with per-project config from pysharp.toml.
    pub fn load(root: &Path) -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path()
            && let Some(global) = Self::load_file(&global_path)
        {
            config = config.merge(global);
        }

        if let Some(project) = Self::load_file(&root.join(PROJECT_CONFIG)) {
            config = config.merge(project);
        }

        config
    }

    /// Get the global config path.
    pub fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("pysharp").join("config.toml"))
    }

    /// Load config from a file path. A missing file is silent, a malformed one is logged.
    fn load_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one. Values set in `other` win.
    fn merge(self, other: Self) -> Self {
        Self {
            source: SourceConfig {
                extension: other.source.extension.or(self.source.extension),
                respect_gitignore: other
                    .source
                    .respect_gitignore
                    .or(self.source.respect_gitignore),
            },
            output: OutputConfig {
                extension: other.output.extension.or(self.output.extension),
                dir: other.output.dir.or(self.output.dir),
            },
            watch: WatchConfig {
                debounce_ms: other.watch.debounce_ms.or(self.watch.debounce_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PysharpConfig::default();
        assert_eq!(config.source.extension(), "py");
        assert!(config.source.respect_gitignore());
        assert_eq!(config.output.extension(), "cs");
        assert!(config.output.dir.is_none());
        assert_eq!(config.watch.debounce(), Duration::from_millis(200));
    }

    #[test]
    fn test_load_project_config() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(PROJECT_CONFIG)).unwrap();
        writeln!(
            file,
            r#"
[output]
extension = "g.cs"
dir = "Generated"

[watch]
debounce_ms = 50
"#
        )
        .unwrap();

        let config = PysharpConfig::load(dir.path());
        assert_eq!(config.output.extension(), "g.cs");
        assert_eq!(config.output.dir, Some(PathBuf::from("Generated")));
        assert_eq!(config.watch.debounce(), Duration::from_millis(50));
        assert_eq!(config.source.extension(), "py"); // default
    }

    #[test]
    fn test_project_overrides_only_what_it_sets() {
        let global: PysharpConfig = toml::from_str(
            r#"
[source]
respect_gitignore = false

[output]
extension = "txt"
"#,
        )
        .unwrap();
        let project: PysharpConfig = toml::from_str("[output]\nextension = \"cs\"\n").unwrap();

        let config = PysharpConfig::default().merge(global).merge(project);
        assert_eq!(config.output.extension(), "cs");
        assert!(!config.source.respect_gitignore());
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG), "[watch\ndebounce_ms = ").unwrap();
        assert!(PysharpConfig::load_file(&dir.path().join(PROJECT_CONFIG)).is_none());
    }

    #[test]
    fn test_schema_names_sections() {
        let schema = serde_json::to_value(schemars::schema_for!(PysharpConfig)).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("source"));
        assert!(properties.contains_key("output"));
        assert!(properties.contains_key("watch"));
    }
}
