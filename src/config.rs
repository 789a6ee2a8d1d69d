//! Configuration for clausewise.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CLAUSEWISE_HOME, CLAUSEWISE_TEMPLATES, CLAUSEWISE_PROVIDER)
//! 2. Config file (.clausewise/config.yaml)
//! 3. Defaults (~/.clausewise, built-in template library)
//!
//! Config file discovery:
//! - Searches current directory and parents for .clausewise/config.yaml
//! - Paths in config file are relative to the project root (the parent of .clausewise/)

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::Provider;
use crate::core::aggregator::ScoringPolicy;
use crate::core::classifier::DEFAULT_MAX_CONCURRENCY;
use crate::core::retry::RetryPolicy;
use crate::core::safety::InputLimits;
use crate::core::segmenter::DEFAULT_MIN_HEADING_CUES;
use crate::domain::{ClauseCategory, DocumentType};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub scoring: Option<ScoringPolicy>,
    /// Expected categories keyed by document type, or "unknown"
    #[serde(default)]
    pub expected_clauses: HashMap<String, Vec<ClauseCategory>>,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to the project root)
    pub home: Option<String>,
    /// Clause template library YAML (relative to the project root)
    pub templates: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentationConfig {
    pub min_heading_cues: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsConfig {
    pub max_input_bytes: Option<u64>,
    pub max_text_bytes: Option<u64>,
    pub denylist_patterns: Option<Vec<String>>,
}

/// Live backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub provider: Provider,

    /// Model name; provider default when unset
    #[serde(default)]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint; provider default when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeout_seconds: default_timeout_seconds(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl BackendSettings {
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

/// Expected clause categories per document type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedClauses {
    overrides: HashMap<DocumentType, BTreeSet<ClauseCategory>>,
    unknown: Option<BTreeSet<ClauseCategory>>,
}

impl ExpectedClauses {
    /// Build from config keys: document type names or "unknown"
    pub fn from_config(raw: &HashMap<String, Vec<ClauseCategory>>) -> Result<Self> {
        let mut expected = Self::default();
        for (key, categories) in raw {
            let set: BTreeSet<ClauseCategory> = categories.iter().copied().collect();
            if matches!(key.trim().to_lowercase().as_str(), "unknown" | "default") {
                expected.unknown = Some(set);
            } else {
                let doc_type: DocumentType = key
                    .parse()
                    .with_context(|| format!("Invalid expected_clauses key '{}'", key))?;
                expected.overrides.insert(doc_type, set);
            }
        }
        Ok(expected)
    }

    /// Categories a document of this type should contain
    pub fn for_type(&self, doc_type: Option<DocumentType>) -> BTreeSet<ClauseCategory> {
        match doc_type {
            Some(t) => self
                .overrides
                .get(&t)
                .cloned()
                .unwrap_or_else(|| t.expected_categories()),
            None => self
                .unknown
                .clone()
                .unwrap_or_else(DocumentType::baseline_categories),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Clause template library override; built-in library when `None`
    pub templates: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub backend: BackendSettings,
    pub min_heading_cues: usize,
    pub scoring: ScoringPolicy,
    pub expected_clauses: ExpectedClauses,
    pub limits: InputLimits,
    pub retry: RetryPolicy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            templates: None,
            config_file: None,
            backend: BackendSettings::default(),
            min_heading_cues: DEFAULT_MIN_HEADING_CUES,
            scoring: ScoringPolicy::default(),
            expected_clauses: ExpectedClauses::default(),
            limits: InputLimits::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clausewise")
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".clausewise").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Resolve a parsed config file (if any) plus environment overrides
fn resolve(config_path: Option<PathBuf>, file: ConfigFile) -> Result<ResolvedConfig> {
    // Project root is the parent of .clausewise/
    let base_dir = config_path
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let home = if let Ok(env_home) = std::env::var("CLAUSEWISE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = file.paths.home {
        resolve_path(&base_dir, home_path)
    } else {
        default_home()
    };

    let templates = if let Ok(env_templates) = std::env::var("CLAUSEWISE_TEMPLATES") {
        Some(PathBuf::from(env_templates))
    } else if let Some(ref templates_path) = file.paths.templates {
        Some(resolve_path(&base_dir, templates_path))
    } else {
        Some(home.join("clauses.yaml")).filter(|p| p.exists())
    };

    let mut backend = file.backend;
    if let Ok(provider) = std::env::var("CLAUSEWISE_PROVIDER") {
        backend.provider = provider
            .parse()
            .with_context(|| format!("Invalid CLAUSEWISE_PROVIDER '{}'", provider))?;
    }
    backend.max_concurrency = backend.max_concurrency.max(1);

    let scoring = file.scoring.unwrap_or_default();
    scoring.validate().context("Invalid scoring configuration")?;

    let defaults = InputLimits::default();
    let limits = InputLimits {
        max_input_bytes: file.limits.max_input_bytes.unwrap_or(defaults.max_input_bytes),
        max_text_bytes: file.limits.max_text_bytes.unwrap_or(defaults.max_text_bytes),
        denylist_patterns: file.limits.denylist_patterns.unwrap_or(defaults.denylist_patterns),
    };

    Ok(ResolvedConfig {
        home,
        templates,
        config_file: config_path,
        backend,
        min_heading_cues: file
            .segmentation
            .min_heading_cues
            .unwrap_or(DEFAULT_MIN_HEADING_CUES)
            .max(1),
        scoring,
        expected_clauses: ExpectedClauses::from_config(&file.expected_clauses)?,
        limits,
        retry: file.retry.unwrap_or_default(),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            resolve(Some(path), file)
        }
        None => resolve(None, ConfigFile::default()),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::SeverityWeights;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".clausewise");
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", content).unwrap();
        (temp, config_path)
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, ConfigFile::default()).unwrap();
        assert_eq!(config.min_heading_cues, 3);
        assert_eq!(config.scoring, ScoringPolicy::default());
        assert_eq!(config.backend.max_concurrency, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.config_file.is_none());
        assert_eq!(
            config.expected_clauses.for_type(None),
            DocumentType::baseline_categories()
        );
    }

    #[test]
    fn test_config_file_parsing() {
        let (_temp, path) = write_config(
            r#"
version: "1.0"
paths:
  templates: ./legal/clauses.yaml
backend:
  provider: openai
  model: gpt-4o-mini
  timeout_seconds: 20
  max_concurrency: 8
segmentation:
  min_heading_cues: 2
scoring:
  weights: { none: 0, low: 2, medium: 10, high: 25, critical: 60 }
  missing_clause_penalty: 12
expected_clauses:
  nda: [confidentiality, term]
  unknown: []
limits:
  max_input_bytes: 1024
retry:
  max_attempts: 5
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.backend.provider, Provider::OpenAi);
        assert_eq!(file.backend.model.as_deref(), Some("gpt-4o-mini"));

        let config = resolve(Some(path.clone()), file).unwrap();
        assert_eq!(config.backend.timeout(), Duration::from_secs(20));
        assert_eq!(config.backend.max_concurrency, 8);
        assert_eq!(config.min_heading_cues, 2);
        assert_eq!(config.scoring.missing_clause_penalty, 12);
        assert_eq!(
            config.scoring.weights,
            SeverityWeights {
                none: 0,
                low: 2,
                medium: 10,
                high: 25,
                critical: 60
            }
        );
        assert_eq!(config.limits.max_input_bytes, 1024);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 500);
        assert_eq!(
            config.expected_clauses.for_type(Some(DocumentType::Nda)),
            [ClauseCategory::Confidentiality, ClauseCategory::Term].into_iter().collect()
        );
        assert!(config.expected_clauses.for_type(None).is_empty());
        assert_eq!(
            config.expected_clauses.for_type(Some(DocumentType::Service)),
            DocumentType::Service.expected_categories()
        );

        let project_root = path.parent().unwrap().parent().unwrap();
        assert_eq!(
            config.templates,
            Some(project_root.join("legal/clauses.yaml"))
        );
    }

    #[test]
    fn test_non_monotonic_weights_rejected() {
        let (_temp, path) = write_config("scoring:\n  weights: { none: 0, low: 20, medium: 10, high: 30, critical: 50 }");
        let file = load_config_file(&path).unwrap();
        assert!(resolve(Some(path), file).is_err());
    }

    #[test]
    fn test_unknown_document_type_key_rejected() {
        let (_temp, path) = write_config("expected_clauses:\n  lease: [payment]");
        let file = load_config_file(&path).unwrap();
        assert!(resolve(Some(path), file).is_err());
    }

    #[test]
    fn test_backend_settings_defaults() {
        let settings = BackendSettings::default();
        assert_eq!(settings.api_key_env(), "GROQ_API_KEY");
        assert_eq!(settings.model(), "llama-3.3-70b-versatile");
        assert_eq!(settings.base_url(), "https://api.groq.com/openai/v1");

        let settings = BackendSettings {
            provider: Provider::OpenAi,
            api_key_env: Some("MY_KEY".into()),
            ..Default::default()
        };
        assert_eq!(settings.api_key_env(), "MY_KEY");
        assert_eq!(settings.model(), "gpt-4o");
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
