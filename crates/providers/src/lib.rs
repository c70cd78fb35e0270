//! Completion service implementations for Palaver.
//!
//! All providers implement the `palaver_core::Provider` trait.
//! `from_config` builds the provider named in the `[provider]` section.

pub mod ollama;

pub use ollama::OllamaProvider;

use palaver_config::ProviderConfig;
use palaver_core::error::ProviderError;
use palaver_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the provider described by `config`.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    match config.kind.as_str() {
        "ollama" => {
            let provider = OllamaProvider::new(
                config.base_url.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotConfigured(format!("Unknown provider kind '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ollama_from_defaults() {
        let provider = from_config(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn unknown_kind_is_not_configured() {
        let config = ProviderConfig {
            kind: "carrier-pigeon".into(),
            ..ProviderConfig::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(ref m) if m.contains("carrier-pigeon")));
    }
}
