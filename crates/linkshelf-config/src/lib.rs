use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// One keyword rule of the category table: any keyword fragment occurring
/// in a classifier category routes the link to `heading`. Rule order in the
/// file is match order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub heading: String,
    pub keywords: Vec<String>,
}

/// Settings for the classification oracle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key; the key itself never
    /// lives in the config file.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub max_retries: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            batch_size: 20,
            max_retries: 2,
        }
    }
}

/// Settings for fetching page excerpts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherConfig {
    pub timeout_secs: u64,
    pub max_content_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_content_chars: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub document_path: PathBuf,
    #[serde(default = "default_fallback_heading")]
    pub fallback_heading: String,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

fn default_fallback_heading() -> String {
    "Unsorted".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.6
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded document path
        config.document_path =
            Self::expand_path(&config.document_path).unwrap_or(config.document_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/linkshelf");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config {
            document_path: PathBuf::from("/tmp/links.md"),
            fallback_heading: "Unsorted".to_string(),
            similarity_threshold: 0.6,
            categories: vec![CategoryRule {
                heading: "Shipbuilding".to_string(),
                keywords: vec!["ship".to_string(), "hull".to_string()],
            }],
            classifier: ClassifierConfig::default(),
            fetcher: FetcherConfig::default(),
        }
    }

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/linkshelf/config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let test_config = sample_config();

        test_config.save_to_path(&config_file).unwrap();
        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded.document_path, test_config.document_path);
        assert_eq!(loaded.categories, test_config.categories);
        assert_eq!(loaded.classifier, test_config.classifier);
        assert_eq!(loaded.fetcher, test_config.fetcher);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&missing).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config_content = r#"
document_path = "/tmp/links.md"
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.fallback_heading, "Unsorted");
        assert_eq!(config.similarity_threshold, 0.6);
        assert!(config.categories.is_empty());
        assert_eq!(config.classifier.batch_size, 20);
        assert_eq!(config.classifier.max_retries, 2);
        assert_eq!(config.fetcher.timeout_secs, 10);
    }

    #[test]
    fn test_category_table_preserves_file_order() {
        let config_content = r#"
document_path = "/tmp/links.md"

[[categories]]
heading = "Shipbuilding"
keywords = ["ship", "hull"]

[[categories]]
heading = "Robotics"
keywords = ["robot", "servo"]
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        let headings: Vec<&str> = config
            .categories
            .iter()
            .map(|r| r.heading.as_str())
            .collect();
        assert_eq!(headings, vec!["Shipbuilding", "Robotics"]);
    }

    #[test]
    fn test_partial_classifier_section_keeps_other_defaults() {
        let config_content = r#"
document_path = "/tmp/links.md"

[classifier]
model = "local-model"
batch_size = 5
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.classifier.model, "local-model");
        assert_eq!(config.classifier.batch_size, 5);
        assert_eq!(config.classifier.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.classifier.timeout_secs, 60);
    }

    #[test]
    fn test_config_with_tilde_in_toml() {
        let config_content = r#"
document_path = "~/notes/links.md"
"#;

        let mut config: Config = toml::from_str(config_content).unwrap();
        config.document_path =
            Config::expand_path(&config.document_path).unwrap_or(config.document_path);

        let expanded = config.document_path.to_string_lossy();
        assert!(!expanded.starts_with('~'));
        assert!(expanded.contains("notes/links.md"));
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        unsafe {
            env::set_var("LINKSHELF_NOTES", "/custom/notes");
        }

        let config_content = r#"
document_path = "$LINKSHELF_NOTES/links.md"
"#;

        let mut config: Config = toml::from_str(config_content).unwrap();
        config.document_path =
            Config::expand_path(&config.document_path).unwrap_or(config.document_path);

        assert_eq!(config.document_path, PathBuf::from("/custom/notes/links.md"));

        unsafe {
            env::remove_var("LINKSHELF_NOTES");
        }
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }
}
