//! Pipeline configuration loaded from environment variables.

use std::time::Duration;

/// Limits applied by the mutation pipeline and the customer use cases.
///
/// Reads from environment variables:
/// - `CRM_MAX_CONTACTS`: contacts allowed per customer (default: `100`)
/// - `CRM_MUTATION_TIMEOUT_MS`: deadline for callers that supply none (default: `5000`)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_contacts: usize,
    pub mutation_timeout: Duration,
}

impl PipelineConfig {
    const DEFAULT_MAX_CONTACTS: usize = 100;
    const DEFAULT_TIMEOUT_MS: u64 = 5_000;

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            max_contacts: std::env::var("CRM_MAX_CONTACTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_MAX_CONTACTS),
            mutation_timeout: Duration::from_millis(
                std::env::var("CRM_MUTATION_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(Self::DEFAULT_TIMEOUT_MS),
            ),
        }
    }

    pub fn with_max_contacts(mut self, max_contacts: usize) -> Self {
        self.max_contacts = max_contacts;
        self
    }

    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_contacts: Self::DEFAULT_MAX_CONTACTS,
            mutation_timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_contacts, 100);
        assert_eq!(config.mutation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = PipelineConfig::default()
            .with_max_contacts(2)
            .with_mutation_timeout(Duration::from_millis(250));
        assert_eq!(config.max_contacts, 2);
        assert_eq!(config.mutation_timeout, Duration::from_millis(250));
    }
}
