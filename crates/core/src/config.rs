//! # Pitchcraft Configuration
//!
//! Settings persisted in `.pitchcraft/config.json` and API keys persisted in
//! `.pitchcraft/.env`. Every field is optional on disk; unset fields fall
//! back to the defaults exposed by [`ConfigDefaults`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crew::CrewSpec;
use crate::error::{CrewError, CrewResult};
use crate::marketing::marketing_crew;
use crate::models::{LlmProvider, ModelConfig};
use crate::tools::{scrape::DEFAULT_MAX_CHARS, web_search::DEFAULT_MAX_RESULTS};

/// Directory holding config, keys and the run database
pub const DATA_DIR: &str = ".pitchcraft";
pub const CONFIG_FILE: &str = "config.json";
pub const ENV_FILE: &str = ".env";

/// Persisted configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Give research agents web search and scrape tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_search_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_max_chars: Option<usize>,
    /// JSON crew definition replacing the built-in marketing crew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crew_file: Option<PathBuf>,
}

/// Values used when the config leaves a field unset
#[derive(Debug, Clone, Serialize)]
pub struct ConfigDefaults {
    pub provider: &'static str,
    pub model: &'static str,
    pub search_enabled: bool,
    pub max_search_results: usize,
    pub scrape_max_chars: usize,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            provider: provider.id(),
            model: provider.default_model(),
            search_enabled: true,
            max_search_results: DEFAULT_MAX_RESULTS,
            scrape_max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl AppConfig {
    /// Path of the config file inside `dir`
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Load from `dir`; a missing file yields the empty config
    pub fn load_from(dir: &Path) -> CrewResult<Self> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            CrewError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn save_to(&self, dir: &Path) -> CrewResult<()> {
        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CrewError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(Self::path_in(dir), content)?;
        Ok(())
    }

    /// Apply a patch: every `Some` field in `other` overrides this one
    pub fn merge(&mut self, other: AppConfig) {
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.search_enabled.is_some() {
            self.search_enabled = other.search_enabled;
        }
        if other.searxng_url.is_some() {
            self.searxng_url = other.searxng_url;
        }
        if other.max_search_results.is_some() {
            self.max_search_results = other.max_search_results;
        }
        if other.scrape_max_chars.is_some() {
            self.scrape_max_chars = other.scrape_max_chars;
        }
        if other.crew_file.is_some() {
            self.crew_file = other.crew_file;
        }
    }

    /// Resolve the provider, falling back to the default for unknown names
    pub fn provider(&self) -> LlmProvider {
        match self.provider.as_deref() {
            Some(name) => LlmProvider::parse(name).unwrap_or_else(|| {
                tracing::warn!("Unknown provider '{}', using default", name);
                LlmProvider::default()
            }),
            None => LlmProvider::default(),
        }
    }

    /// Model config for the crew: configured model, else the provider default
    pub fn model_config(&self) -> ModelConfig {
        let provider = self.provider();
        let model = self
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());
        let base_url = if provider.supports_base_url() {
            self.base_url.clone()
        } else {
            None
        };
        ModelConfig {
            provider,
            model,
            base_url,
        }
    }

    pub fn search_enabled(&self) -> bool {
        self.search_enabled.unwrap_or(true)
    }

    /// The crew to run: the configured crew file, or the built-in one
    pub fn crew_spec(&self) -> CrewResult<CrewSpec> {
        match &self.crew_file {
            Some(path) => CrewSpec::load(path),
            None => Ok(marketing_crew()),
        }
    }

    /// Export tool settings as the environment variables the tools read
    pub fn apply_to_env(&self) {
        if let Some(url) = &self.searxng_url {
            std::env::set_var("SEARXNG_URL", url);
        }
        if let Some(max) = self.max_search_results {
            std::env::set_var("PITCHCRAFT_MAX_SEARCH_RESULTS", max.to_string());
        }
        if let Some(max) = self.scrape_max_chars {
            std::env::set_var("PITCHCRAFT_SCRAPE_MAX_CHARS", max.to_string());
        }
    }
}

/// API keys entered in the settings form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
    pub grok: Option<String>,
    pub deepseek: Option<String>,
    pub serper: Option<String>,
}

impl ApiKeys {
    /// Non-empty keys paired with their environment variable names
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            (LlmProvider::OpenAI.api_key_env(), &self.openai),
            (LlmProvider::Anthropic.api_key_env(), &self.anthropic),
            (LlmProvider::Gemini.api_key_env(), &self.gemini),
            (LlmProvider::OpenRouter.api_key_env(), &self.openrouter),
            (LlmProvider::Grok.api_key_env(), &self.grok),
            (LlmProvider::DeepSeek.api_key_env(), &self.deepseek),
            ("SERPER_API_KEY", &self.serper),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
        .collect()
    }
}

/// Characters a key may not contain; anything here breaks or extends an
/// unquoted `NAME=value` line
fn check_key_value(name: &str, value: &str) -> CrewResult<()> {
    let bad = value.chars().find(|c| {
        c.is_whitespace() || c.is_control() || matches!(c, '\'' | '"' | '#' | '$' | '\\' | '`')
    });
    match bad {
        Some(c) => Err(CrewError::Config(format!(
            "{} contains an unsupported character ({:?})",
            name, c
        ))),
        None => Ok(()),
    }
}

/// Parse `.env` content line by line, dropping lines that cannot be kept
fn read_env_entries(path: &Path) -> CrewResult<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (number, line) in content.lines().enumerate() {
        for item in dotenvy::from_read_iter(line.as_bytes()) {
            let entry = item
                .map_err(|e| CrewError::Config(e.to_string()))
                .and_then(|(name, value)| check_key_value(&name, &value).map(|_| (name, value)));
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Dropping line {} of {}: {}", number + 1, path.display(), e),
            }
        }
    }
    Ok(entries)
}

/// Write keys to `<dir>/.env`, keeping keys already stored there, then load
/// the file into the process environment
///
/// Values that cannot be stored as a plain `NAME=value` line are rejected
/// before anything is written. Returns the number of keys written.
pub fn write_env_file(dir: &Path, keys: &ApiKeys) -> CrewResult<usize> {
    let entries = keys.entries();
    for (name, value) in &entries {
        check_key_value(name, value)?;
    }

    std::fs::create_dir_all(dir)?;

    // Create .gitignore to protect API keys
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "# Never commit API keys\n.env\n*.env\n*.db\n")?;
    }

    let env_path = dir.join(ENV_FILE);
    let mut merged = if env_path.exists() {
        read_env_entries(&env_path)?
    } else {
        Vec::new()
    };

    for (name, value) in &entries {
        match merged.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => merged.push((name.to_string(), value.to_string())),
        }
    }

    let mut content = String::from("# Pitchcraft API Keys - DO NOT COMMIT\n\n");
    for (name, value) in &merged {
        content.push_str(&format!("{}={}\n", name, value));
    }

    // The new file must read back as exactly what was merged
    let parsed = dotenvy::from_read_iter(content.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CrewError::Config(format!("refusing to write {}: {}", env_path.display(), e)))?;
    if parsed != merged {
        return Err(CrewError::Config(format!(
            "refusing to write {}: content does not read back unchanged",
            env_path.display()
        )));
    }

    let tmp_path = dir.join(format!("{}.tmp", ENV_FILE));
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, &env_path)?;

    // Override so freshly saved keys win over stale process values
    dotenvy::from_path_override(&env_path)
        .map_err(|e| CrewError::Config(format!("failed to load {}: {}", env_path.display(), e)))?;

    tracing::info!(count = entries.len(), "Saved API keys");
    Ok(entries.len())
}

/// Load `<dir>/.env` and a `.env` in the working directory, if present
pub fn load_env(dir: &Path) {
    let env_path = dir.join(ENV_FILE);
    if env_path.exists() {
        if let Err(e) = dotenvy::from_path(&env_path) {
            tracing::warn!("Failed to load {}: {}", env_path.display(), e);
        }
    }
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.search_enabled());
        assert_eq!(config.model_config(), ModelConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            provider: Some("anthropic".to_string()),
            search_enabled: Some(false),
            ..AppConfig::default()
        };
        config.save_to(dir.path()).unwrap();

        let loaded = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded, config);

        let raw = std::fs::read_to_string(AppConfig::path_in(dir.path())).unwrap();
        assert!(!raw.contains("model"), "unset fields are not written");
    }

    #[test]
    fn test_broken_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(AppConfig::path_in(dir.path()), "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from(dir.path()),
            Err(CrewError::Config(_))
        ));
    }

    #[test]
    fn test_merge_only_overrides_set_fields() {
        let mut config = AppConfig {
            provider: Some("openai".to_string()),
            model: Some("gpt-4o".to_string()),
            ..AppConfig::default()
        };
        config.merge(AppConfig {
            model: Some("gpt-4o-mini".to_string()),
            search_enabled: Some(false),
            ..AppConfig::default()
        });

        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.search_enabled, Some(false));
    }

    #[test]
    fn test_model_config_resolution() {
        let config = AppConfig {
            provider: Some("anthropic".to_string()),
            base_url: Some("http://localhost:1234/v1".to_string()),
            ..AppConfig::default()
        };
        let model = config.model_config();
        assert_eq!(model.provider, LlmProvider::Anthropic);
        assert_eq!(model.model, LlmProvider::Anthropic.default_model());
        assert!(model.base_url.is_none(), "base URL only applies to OpenAI");

        let config = AppConfig {
            provider: Some("nonsense".to_string()),
            base_url: Some("http://localhost:1234/v1".to_string()),
            ..AppConfig::default()
        };
        let model = config.model_config();
        assert_eq!(model.provider, LlmProvider::OpenAI);
        assert_eq!(model.base_url.as_deref(), Some("http://localhost:1234/v1"));
    }

    #[test]
    fn test_crew_spec_defaults_to_marketing() {
        let spec = AppConfig::default().crew_spec().unwrap();
        assert_eq!(spec, marketing_crew());
    }

    #[test]
    fn test_crew_spec_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crew.json");
        let mut custom = marketing_crew();
        custom.name = "custom".to_string();
        custom.tasks.truncate(1);
        std::fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();

        let config = AppConfig {
            crew_file: Some(path),
            ..AppConfig::default()
        };
        assert_eq!(config.crew_spec().unwrap(), custom);
    }

    #[test]
    fn test_api_key_entries_skip_blank() {
        let keys = ApiKeys {
            openai: Some(" sk-test ".to_string()),
            serper: Some("".to_string()),
            ..ApiKeys::default()
        };
        assert_eq!(keys.entries(), vec![("OPENAI_API_KEY", "sk-test")]);
    }

    #[test]
    fn test_write_env_file_merges_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let first = ApiKeys {
            serper: Some("serper-1".to_string()),
            ..ApiKeys::default()
        };
        assert_eq!(write_env_file(dir.path(), &first).unwrap(), 1);

        let second = ApiKeys {
            serper: Some("serper-2".to_string()),
            deepseek: Some("ds-1".to_string()),
            ..ApiKeys::default()
        };
        assert_eq!(write_env_file(dir.path(), &second).unwrap(), 2);

        let content = std::fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert!(content.contains("SERPER_API_KEY=serper-2\n"));
        assert!(content.contains("DEEPSEEK_API_KEY=ds-1\n"));
        assert!(!content.contains("serper-1"));
        assert!(dir.path().join(".gitignore").exists());
        assert_eq!(std::env::var("DEEPSEEK_API_KEY").unwrap(), "ds-1");
    }

    #[test]
    fn test_write_env_file_rejects_unsafe_values() {
        let dir = tempfile::tempdir().unwrap();
        let good = ApiKeys {
            openai: Some("sk-good".to_string()),
            ..ApiKeys::default()
        };
        write_env_file(dir.path(), &good).unwrap();
        let before = std::fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();

        for value in ["ab cd", "say\"hi\"", "a#b", "$HOME", "it's"] {
            let keys = ApiKeys {
                gemini: Some(value.to_string()),
                ..ApiKeys::default()
            };
            assert!(
                matches!(write_env_file(dir.path(), &keys), Err(CrewError::Config(_))),
                "{:?} should be rejected",
                value
            );
        }

        let after = std::fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert_eq!(before, after);

        // The file stays usable for later saves
        let next = ApiKeys {
            anthropic: Some("sk-ant-1".to_string()),
            ..ApiKeys::default()
        };
        assert_eq!(write_env_file(dir.path(), &next).unwrap(), 1);
    }

    #[test]
    fn test_write_env_file_blocks_newline_injection() {
        let dir = tempfile::tempdir().unwrap();
        let keys = ApiKeys {
            grok: Some("xai-1\nPITCHCRAFT_INJECTED_VAR=yes".to_string()),
            ..ApiKeys::default()
        };

        assert!(matches!(
            write_env_file(dir.path(), &keys),
            Err(CrewError::Config(_))
        ));
        assert!(std::env::var("PITCHCRAFT_INJECTED_VAR").is_err());
        assert!(!dir.path().join(ENV_FILE).exists());
    }

    #[test]
    fn test_write_env_file_drops_unreadable_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ENV_FILE),
            "SERPER_API_KEY=serper-kept\nGEMINI_API_KEY=ab cd\n",
        )
        .unwrap();

        let keys = ApiKeys {
            openrouter: Some("or-1".to_string()),
            ..ApiKeys::default()
        };
        assert_eq!(write_env_file(dir.path(), &keys).unwrap(), 1);

        let content = std::fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert!(content.contains("SERPER_API_KEY=serper-kept\n"));
        assert!(content.contains("OPENROUTER_API_KEY=or-1\n"));
        assert!(!content.contains("ab cd"));
    }
}
