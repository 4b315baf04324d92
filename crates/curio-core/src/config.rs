use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurioError, Result};

/// Providers understood in `provider:model` shorthand (e.g. `openai:gpt-4.1`).
pub const KNOWN_PROVIDERS: &[&str] = &[
    "openai",
    "anthropic",
    "claude",
    "ollama",
    "groq",
    "openrouter",
    "together",
    "fireworks",
    "cerebras",
    "xai",
    "mistral",
    "perplexity",
    "deepseek",
];

/// Top-level Curio configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base data directory holding the dataset, references, and output.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Restrict processing to `test_terms`.
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_test_terms")]
    pub test_terms: Vec<String>,
    /// Chance in [0, 1] that an uncached record gets a synthetic negative.
    #[serde(default = "default_false_assertion_probability")]
    pub false_assertion_probability: f64,
    /// Fixed seed for the injection draw. Unset = entropy-seeded.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub paths: PathOverrides,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            test_mode: false,
            test_terms: default_test_terms(),
            false_assertion_probability: default_false_assertion_probability(),
            seed: None,
            paths: PathOverrides::default(),
        }
    }
}

/// Optional overrides for individual artifact locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathOverrides {
    #[serde(default)]
    pub dataset_file: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub false_definitions_file: Option<String>,
    #[serde(default)]
    pub markdown_dir: Option<String>,
    #[serde(default)]
    pub json_dir: Option<String>,
    #[serde(default)]
    pub report_file: Option<String>,
}

fn default_data_dir() -> String { "./data".to_string() }
fn default_false_assertion_probability() -> f64 { 0.6 }

fn default_test_terms() -> Vec<String> {
    [
        "CL_4052001",
        "CL_4033092",
        "CL_4033088",
        "CL_4052055",
        "CL_4033094",
        "CL_4033084",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Filesystem layout for the dataset and caches.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPaths {
    pub data_dir: PathBuf,
    pub dataset_file: PathBuf,
    pub output_dir: PathBuf,
    pub false_definitions_file: PathBuf,
    pub markdown_dir: PathBuf,
    pub json_dir: PathBuf,
    pub report_file: PathBuf,
}

impl ValidationPaths {
    /// Standard layout under a base data directory.
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let output_dir = data_dir.join("output");
        Self {
            dataset_file: data_dir.join("cells_data.json"),
            false_definitions_file: output_dir.join("cells_false_data.json"),
            markdown_dir: output_dir.clone(),
            json_dir: output_dir.join("pqa_jsons"),
            report_file: output_dir.join("cell_type_validation_report.tsv"),
            output_dir,
            data_dir,
        }
    }

    /// Create output and cache directories if they do not already exist.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.markdown_dir, &self.json_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Resolve the artifact layout, applying any per-path overrides.
    pub fn paths(&self) -> ValidationPaths {
        let mut paths = ValidationPaths::under(expand_home(&self.data_dir));
        let o = &self.paths;
        if let Some(ref p) = o.dataset_file {
            paths.dataset_file = expand_home(p);
        }
        if let Some(ref p) = o.output_dir {
            let out = expand_home(p);
            paths.false_definitions_file = out.join("cells_false_data.json");
            paths.markdown_dir = out.clone();
            paths.json_dir = out.join("pqa_jsons");
            paths.report_file = out.join("cell_type_validation_report.tsv");
            paths.output_dir = out;
        }
        if let Some(ref p) = o.false_definitions_file {
            paths.false_definitions_file = expand_home(p);
        }
        if let Some(ref p) = o.markdown_dir {
            paths.markdown_dir = expand_home(p);
        }
        if let Some(ref p) = o.json_dir {
            paths.json_dir = expand_home(p);
        }
        if let Some(ref p) = o.report_file {
            paths.report_file = expand_home(p);
        }
        paths
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.false_assertion_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(CurioError::Config(format!(
                "false_assertion_probability must be within [0, 1], got {}",
                p
            )));
        }
        Ok(())
    }
}

/// The two text-completion agents used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Rewrites definitions and converts tables to JSON.
    #[serde(default = "default_curation_profile")]
    pub curation: AgentProfile,
    /// Extracts and validates assertions against literature.
    #[serde(default = "default_literature_profile")]
    pub literature: AgentProfile,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            curation: default_curation_profile(),
            literature: default_literature_profile(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub fallback_models: Vec<ModelConfig>,
}

impl AgentProfile {
    /// The primary model followed by each fallback.
    pub fn models_mut(&mut self) -> impl Iterator<Item = &mut ModelConfig> {
        std::iter::once(&mut self.model).chain(self.fallback_models.iter_mut())
    }
}

fn default_curation_profile() -> AgentProfile {
    AgentProfile {
        model: ModelConfig {
            temperature: 0.1,
            ..ModelConfig::default()
        },
        fallback_models: vec![],
    }
}

fn default_literature_profile() -> AgentProfile {
    AgentProfile {
        model: ModelConfig::default(),
        fallback_models: vec![],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Extra HTTP headers sent with each request.
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            retry: None,
            extra_headers: HashMap::new(),
        }
    }
}

fn default_provider() -> String { "openai".to_string() }
fn default_model_id() -> String { "gpt-4.1".to_string() }
fn default_max_tokens() -> u32 { 4096 }
fn default_temperature() -> f32 { 0.0 }

impl ModelConfig {
    /// Apply a model spec: `provider:model_id` or a bare model id.
    pub fn apply_model_spec(&mut self, spec: &str) {
        let spec = spec.trim();
        match spec.split_once(':') {
            Some((provider, model)) if KNOWN_PROVIDERS.contains(&provider) && !model.is_empty() => {
                self.provider = provider.to_string();
                self.model_id = model.to_string();
            }
            _ => self.model_id = spec.to_string(),
        }
    }

    /// Environment variable that conventionally holds this provider's key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self.provider.as_str() {
            "openai" => Some("OPENAI_API_KEY"),
            "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
            "groq" => Some("GROQ_API_KEY"),
            "openrouter" => Some("OPENROUTER_API_KEY"),
            "together" => Some("TOGETHER_API_KEY"),
            "mistral" => Some("MISTRAL_API_KEY"),
            "deepseek" => Some("DEEPSEEK_API_KEY"),
            _ => None,
        }
    }
}

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CurioError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| CurioError::Config(e.to_string()))?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Apply `CURIO_*` overrides and provider API keys from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let p = &mut self.pipeline;
        if let Some(dir) = lookup("CURIO_DATA_DIR") {
            p.data_dir = dir;
        }
        if let Some(raw) = lookup("CURIO_TEST_MODE") {
            p.test_mode = parse_env_bool(&raw);
        }
        if let Some(raw) = lookup("CURIO_TEST_TERMS") {
            p.test_terms = parse_env_list(&raw);
        }
        if let Some(raw) = lookup("CURIO_FALSE_ASSERTION_PROBABILITY") {
            p.false_assertion_probability =
                parse_env_float("CURIO_FALSE_ASSERTION_PROBABILITY", &raw)?;
        }
        if let Some(raw) = lookup("CURIO_SEED") {
            p.seed = Some(raw.trim().parse().map_err(|_| {
                CurioError::Config(format!("Invalid integer for CURIO_SEED: {}", raw))
            })?);
        }

        for (prefix, profile) in [
            ("CURIO_CURATION", &mut self.agents.curation),
            ("CURIO_LITERATURE", &mut self.agents.literature),
        ] {
            if let Some(spec) = lookup(&format!("{}_MODEL", prefix)) {
                profile.model.apply_model_spec(&spec);
            }
            let temp_key = format!("{}_TEMPERATURE", prefix);
            if let Some(raw) = lookup(&temp_key) {
                profile.model.temperature = parse_env_float(&temp_key, &raw)? as f32;
            }
            for model in profile.models_mut() {
                // Unset or an unexpanded ${VAR} placeholder
                let missing = model
                    .api_key
                    .as_deref()
                    .map_or(true, |k| k.is_empty() || k.starts_with("${"));
                if missing {
                    if let Some(key) = model.api_key_env().and_then(&lookup) {
                        model.api_key = Some(key);
                    }
                }
            }
        }

        self.pipeline.validate()
    }

    /// A copy safe to print: API keys are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for profile in [&mut copy.agents.curation, &mut copy.agents.literature] {
            for model in profile.models_mut() {
                if model.api_key.is_some() {
                    model.api_key = Some("***".to_string());
                }
            }
        }
        copy
    }
}

fn parse_env_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_env_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env_float(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| CurioError::Config(format!("Invalid float for {}: {}", key, raw)))
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_CURIO_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_CURIO_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_CURIO_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_CURIO_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_CURIO_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.pipeline.data_dir, "./data");
        assert!(!config.pipeline.test_mode);
        assert_eq!(config.pipeline.test_terms.len(), 6);
        assert!((config.pipeline.false_assertion_probability - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.agents.curation.model.model_id, "gpt-4.1");
        assert!((config.agents.curation.model.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.agents.literature.model.temperature, 0.0);
    }

    #[test]
    fn test_paths_layout() {
        let paths = ValidationPaths::under("/data");
        assert_eq!(paths.dataset_file, PathBuf::from("/data/cells_data.json"));
        assert_eq!(
            paths.false_definitions_file,
            PathBuf::from("/data/output/cells_false_data.json")
        );
        assert_eq!(paths.markdown_dir, PathBuf::from("/data/output"));
        assert_eq!(paths.json_dir, PathBuf::from("/data/output/pqa_jsons"));
        assert_eq!(
            paths.report_file,
            PathBuf::from("/data/output/cell_type_validation_report.tsv")
        );
    }

    #[test]
    fn test_path_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
[pipeline]
data_dir = "/data"

[pipeline.paths]
output_dir = "/out"
json_dir = "/json"
"#,
        )
        .unwrap();
        let paths = config.pipeline.paths();
        assert_eq!(paths.dataset_file, PathBuf::from("/data/cells_data.json"));
        assert_eq!(paths.markdown_dir, PathBuf::from("/out"));
        assert_eq!(paths.json_dir, PathBuf::from("/json"));
        assert_eq!(paths.false_definitions_file, PathBuf::from("/out/cells_false_data.json"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env_of(&[
                ("CURIO_DATA_DIR", "/tmp/curio"),
                ("CURIO_TEST_MODE", "yes"),
                ("CURIO_TEST_TERMS", "CL_1, ,CL_2"),
                ("CURIO_FALSE_ASSERTION_PROBABILITY", "0.25"),
                ("CURIO_LITERATURE_MODEL", "anthropic:claude-sonnet-4-20250514"),
                ("CURIO_CURATION_TEMPERATURE", "0.5"),
                ("OPENAI_API_KEY", "sk-openai"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
            ]))
            .unwrap();

        assert_eq!(config.pipeline.data_dir, "/tmp/curio");
        assert!(config.pipeline.test_mode);
        assert_eq!(config.pipeline.test_terms, vec!["CL_1", "CL_2"]);
        assert!((config.pipeline.false_assertion_probability - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.agents.literature.model.provider, "anthropic");
        assert_eq!(config.agents.literature.model.model_id, "claude-sonnet-4-20250514");
        assert_eq!(config.agents.literature.model.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.agents.curation.model.api_key.as_deref(), Some("sk-openai"));
        assert!((config.agents.curation.model.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_env_invalid_float() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env_of(&[("CURIO_FALSE_ASSERTION_PROBABILITY", "often")]))
            .unwrap_err();
        assert!(matches!(err, CurioError::Config(_)));
    }

    #[test]
    fn test_probability_out_of_range() {
        let mut config = AppConfig::default();
        config.pipeline.false_assertion_probability = 1.5;
        assert!(config.pipeline.validate().is_err());
        config.pipeline.false_assertion_probability = 1.0;
        assert!(config.pipeline.validate().is_ok());
    }

    #[test]
    fn test_model_spec_parsing() {
        let mut model = ModelConfig::default();
        model.apply_model_spec("ollama:llama3.2");
        assert_eq!(model.provider, "ollama");
        assert_eq!(model.model_id, "llama3.2");

        // Unknown prefix is kept as part of the model id
        model.apply_model_spec("llama3.2:8b");
        assert_eq!(model.provider, "ollama");
        assert_eq!(model.model_id, "llama3.2:8b");
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = AppConfig::default();
        config.agents.curation.model.api_key = Some("secret".into());
        let redacted = config.redacted();
        assert_eq!(redacted.agents.curation.model.api_key.as_deref(), Some("***"));
        assert!(redacted.agents.literature.model.api_key.is_none());
    }
}
