use std::collections::HashMap;

use curio_core::config::ModelConfig;

/// A named provider preset for OpenAI-compatible APIs.
pub struct ProviderPreset {
    pub default_base_url: &'static str,
    pub needs_api_key: bool,
    pub extra_headers: &'static [(&'static str, &'static str)],
}

/// Look up a provider preset by name.
pub fn get_preset(provider: &str) -> Option<ProviderPreset> {
    match provider {
        "ollama" => Some(ProviderPreset {
            default_base_url: "http://localhost:11434/v1/chat/completions",
            needs_api_key: false,
            extra_headers: &[],
        }),
        "groq" => Some(ProviderPreset {
            default_base_url: "https://api.groq.com/openai/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "openrouter" => Some(ProviderPreset {
            default_base_url: "https://openrouter.ai/api/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[("X-Title", "Curio")],
        }),
        "together" => Some(ProviderPreset {
            default_base_url: "https://api.together.xyz/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "fireworks" => Some(ProviderPreset {
            default_base_url: "https://api.fireworks.ai/inference/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "cerebras" => Some(ProviderPreset {
            default_base_url: "https://api.cerebras.ai/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "xai" => Some(ProviderPreset {
            default_base_url: "https://api.x.ai/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "mistral" => Some(ProviderPreset {
            default_base_url: "https://api.mistral.ai/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "perplexity" => Some(ProviderPreset {
            default_base_url: "https://api.perplexity.ai/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        "deepseek" => Some(ProviderPreset {
            default_base_url: "https://api.deepseek.com/v1/chat/completions",
            needs_api_key: true,
            extra_headers: &[],
        }),
        _ => None,
    }
}

/// Build extra headers from a preset + user config overrides.
pub fn build_extra_headers(
    preset: &ProviderPreset,
    user_headers: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = preset
        .extra_headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // User overrides take precedence
    for (k, v) in user_headers {
        headers.insert(k.clone(), v.clone());
    }

    headers
}

/// Fill in the preset base URL and headers for a named provider.
///
/// Returns `false` when the provider has no preset. An explicit `base_url`
/// is never replaced.
pub fn apply_preset_defaults(config: &mut ModelConfig) -> bool {
    let Some(preset) = get_preset(&config.provider) else {
        return false;
    };
    if config.base_url.is_none() {
        config.base_url = Some(preset.default_base_url.to_string());
    }
    config.extra_headers = build_extra_headers(&preset, &config.extra_headers);
    true
}

/// Whether a provider can be called without an API key.
pub fn requires_api_key(provider: &str) -> bool {
    get_preset(provider).map_or(true, |p| p.needs_api_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_has_no_preset() {
        assert!(get_preset("openai").is_none());
        assert!(get_preset("nope").is_none());
    }

    #[test]
    fn test_apply_preset_keeps_explicit_base_url() {
        let mut config = ModelConfig {
            provider: "ollama".into(),
            base_url: Some("http://gpu-box:11434/v1/chat/completions".into()),
            ..ModelConfig::default()
        };
        assert!(apply_preset_defaults(&mut config));
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://gpu-box:11434/v1/chat/completions")
        );
        assert!(!requires_api_key("ollama"));
    }

    #[test]
    fn test_user_headers_override_preset() {
        let mut config = ModelConfig {
            provider: "openrouter".into(),
            ..ModelConfig::default()
        };
        config.extra_headers.insert("X-Title".into(), "mine".into());
        apply_preset_defaults(&mut config);
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://openrouter.ai/api/v1/chat/completions")
        );
        assert_eq!(config.extra_headers.get("X-Title").map(String::as_str), Some("mine"));
    }
}
