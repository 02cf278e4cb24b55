//! Engine configuration.

/// Tunable defaults for the playbook engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default retry budget for `retry_failed_execution`.
    pub default_max_retries: u32,

    /// Default SLA deadline offset in hours.
    pub default_sla_hours: i64,
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let default_max_retries: u32 = std::env::var("OPSBOOK_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        let default_sla_hours: i64 = std::env::var("OPSBOOK_SLA_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        Self {
            default_max_retries,
            default_sla_hours,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            default_sla_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.default_sla_hours, 24);
    }

    // Single test for both from_env paths so the variable mutations
    // cannot interleave across parallel test threads.
    #[test]
    fn test_config_from_env() {
        std::env::remove_var("OPSBOOK_MAX_RETRIES");
        std::env::remove_var("OPSBOOK_SLA_HOURS");
        let config = EngineConfig::from_env();
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.default_sla_hours, 24);

        std::env::set_var("OPSBOOK_MAX_RETRIES", "5");
        std::env::set_var("OPSBOOK_SLA_HOURS", "48");
        let config = EngineConfig::from_env();
        assert_eq!(config.default_max_retries, 5);
        assert_eq!(config.default_sla_hours, 48);

        // Unparseable values fall back to defaults.
        std::env::set_var("OPSBOOK_MAX_RETRIES", "many");
        let config = EngineConfig::from_env();
        assert_eq!(config.default_max_retries, 3);

        std::env::remove_var("OPSBOOK_MAX_RETRIES");
        std::env::remove_var("OPSBOOK_SLA_HOURS");
    }
}
