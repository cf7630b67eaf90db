use charter_utils::error::ConfigError;

use super::{Config, DestinationKind, ProviderPreference};

pub(crate) const MAX_CONCURRENCY: usize = 10;

pub(crate) fn check_concurrency(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "must be greater than 0".to_string(),
        });
    }
    if value > MAX_CONCURRENCY {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("exceeds maximum limit of {MAX_CONCURRENCY}"),
        });
    }
    Ok(())
}

fn check_timeout(key: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "must be at least 1 second".to_string(),
        });
    }
    if secs > 3600 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "exceeds maximum limit of 3600 seconds".to_string(),
        });
    }
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_concurrency("generation.concurrency_limit", self.generation.concurrency_limit)?;
        check_concurrency("research.concurrency_limit", self.research.concurrency_limit)?;

        if self.generation.preference == ProviderPreference::Pinned
            && self.generation.pinned_backend.is_none()
        {
            return Err(ConfigError::MissingRequired(
                "generation.pinned_backend (required when preference = \"pinned\")".to_string(),
            ));
        }

        for (key, tokens) in [
            ("generation.max_tokens", self.generation.max_tokens),
            ("research.max_tokens", self.research.max_tokens),
        ] {
            if tokens == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "must be greater than 0".to_string(),
                });
            }
            if tokens > 32_000 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "exceeds maximum limit of 32000".to_string(),
                });
            }
        }

        for (key, temperature) in [
            ("generation.temperature", self.generation.temperature),
            ("research.temperature", self.research.temperature),
        ] {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }

        if self.generation.truncation_retries > 5 {
            return Err(ConfigError::InvalidValue {
                key: "generation.truncation_retries".to_string(),
                value: "exceeds maximum limit of 5".to_string(),
            });
        }

        check_timeout("generation.call_timeout_secs", self.generation.call_timeout_secs)?;
        check_timeout("research.call_timeout_secs", self.research.call_timeout_secs)?;
        check_timeout("privacy.scan_timeout_secs", self.privacy.scan_timeout_secs)?;
        check_timeout(
            "providers.remote.health_timeout_secs",
            self.providers.remote.health_timeout_secs,
        )?;
        check_timeout(
            "providers.local.health_timeout_secs",
            self.providers.local.health_timeout_secs,
        )?;

        self.generation
            .batches
            .check()
            .map_err(|reason| ConfigError::InvalidValue {
                key: "generation.batches".to_string(),
                value: reason,
            })?;

        if !(0.0..=1.0).contains(&self.privacy.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "privacy.confidence_threshold".to_string(),
                value: "must be between 0.0 and 1.0".to_string(),
            });
        }

        for (key, url) in [
            ("providers.remote.base_url", &self.providers.remote.base_url),
            ("providers.local.base_url", &self.providers.local.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("'{url}' must start with http:// or https://"),
                });
            }
        }

        if self.providers.remote.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "providers.remote.model".to_string(),
                value: "must not be empty".to_string(),
            });
        }

        if self.output.destinations.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.destinations".to_string(),
                value: "at least one destination is required".to_string(),
            });
        }
        if self.output.destinations.contains(&DestinationKind::Wiki) && self.output.wiki.is_none()
        {
            return Err(ConfigError::MissingRequired(
                "output.wiki (required when the wiki destination is enabled)".to_string(),
            ));
        }

        Ok(())
    }
}
