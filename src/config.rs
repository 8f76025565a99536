use std::env;
use std::path::PathBuf;

use crate::dataset::{DEFAULT_DOMAIN, DuplicatePolicy, StoreOptions, ValidationPolicy};
use crate::dataset::report::DEFAULT_SHORT_TEXT_THRESHOLD;

const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Store settings read from the environment.
///
/// - `CORPUS_OUTPUT_DIR`: managed output directory (default `output`)
/// - `CORPUS_DEFAULT_DOMAIN`: domain for records without one (default `general`)
/// - `CORPUS_SHORT_TEXT_THRESHOLD`: short-text threshold in characters (default 100)
/// - `CORPUS_DUPLICATE_POLICY`: `exact` (default) or `normalized`
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub default_domain: String,
    pub short_text_threshold: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_domain: DEFAULT_DOMAIN.to_string(),
            short_text_threshold: DEFAULT_SHORT_TEXT_THRESHOLD,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Self::default();

        if let Some(dir) = var("CORPUS_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(domain) = var("CORPUS_DEFAULT_DOMAIN") {
            settings.default_domain = domain;
        }
        if let Some(raw) = var("CORPUS_SHORT_TEXT_THRESHOLD") {
            settings.short_text_threshold = raw.parse().map_err(|e| ConfigError::Invalid {
                var: "CORPUS_SHORT_TEXT_THRESHOLD",
                reason: format!("'{raw}': {e}"),
            })?;
        }
        if let Some(raw) = var("CORPUS_DUPLICATE_POLICY") {
            settings.duplicate_policy = raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "CORPUS_DUPLICATE_POLICY",
                reason,
            })?;
        }
        Ok(settings)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            output_dir: self.output_dir.clone(),
            default_domain: self.default_domain.clone(),
            validation: ValidationPolicy {
                short_text_threshold: self.short_text_threshold,
                duplicates: self.duplicate_policy,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("{0} not set. The collection pipeline needs it before it can start.")]
    Missing(&'static str),
}

/// Secrets the upstream search and extraction agents need before a
/// collection run can start.
pub const REQUIRED_CREDENTIALS: [&str; 2] = ["SERPER_API_KEY", "OPENAI_API_KEY"];

pub fn check_credentials() -> Result<(), CredentialsError> {
    check_credentials_with(|key| env::var(key).ok())
}

fn check_credentials_with(lookup: impl Fn(&str) -> Option<String>) -> Result<(), CredentialsError> {
    for key in REQUIRED_CREDENTIALS {
        if lookup(key).is_none_or(|v| v.trim().is_empty()) {
            return Err(CredentialsError::Missing(key));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.short_text_threshold, 100);
    }

    #[test]
    fn reads_all_variables() {
        let settings = Settings::from_lookup(lookup(&[
            ("CORPUS_OUTPUT_DIR", "/data/corpus"),
            ("CORPUS_DEFAULT_DOMAIN", "legal"),
            ("CORPUS_SHORT_TEXT_THRESHOLD", "40"),
            ("CORPUS_DUPLICATE_POLICY", "normalized"),
        ]))
        .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/data/corpus"));
        assert_eq!(settings.default_domain, "legal");
        assert_eq!(settings.short_text_threshold, 40);
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Normalized);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings =
            Settings::from_lookup(lookup(&[("CORPUS_DEFAULT_DOMAIN", "  ")])).unwrap();
        assert_eq!(settings.default_domain, "general");
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let err = Settings::from_lookup(lookup(&[("CORPUS_SHORT_TEXT_THRESHOLD", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("CORPUS_SHORT_TEXT_THRESHOLD"), "got: {err}");
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let err =
            Settings::from_lookup(lookup(&[("CORPUS_DUPLICATE_POLICY", "fuzzy")])).unwrap_err();
        assert!(err.to_string().contains("fuzzy"), "got: {err}");
    }

    #[test]
    fn credentials_require_both_keys() {
        let err = check_credentials_with(lookup(&[("SERPER_API_KEY", "s")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"), "got: {err}");

        let err = check_credentials_with(lookup(&[("OPENAI_API_KEY", "o")])).unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"), "got: {err}");

        let err = check_credentials_with(lookup(&[
            ("SERPER_API_KEY", "s"),
            ("OPENAI_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"), "got: {err}");

        assert!(
            check_credentials_with(lookup(&[("SERPER_API_KEY", "s"), ("OPENAI_API_KEY", "o")]))
                .is_ok()
        );
    }
}
