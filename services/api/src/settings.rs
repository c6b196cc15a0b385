//! Service settings
//!
//! Loaded from built-in defaults, then an optional `config/api.toml`, then
//! environment variables prefixed with `APP__` (for example
//! `APP__AI__API_KEY` or `APP__SERVER__PORT`).

use config::{Config, ConfigError, Environment, File};
use ledger::RemainderPolicy;
use ledger::receipts::ReviewPolicy;
use ledger::reminders::QuietHours;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ai {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ledger {
    pub remainder_policy: RemainderPolicy,
    pub confidence_threshold: f64,
    pub suspicious_amount_major: i64,
}

impl Ledger {
    pub fn review_policy(&self) -> ReviewPolicy {
        ReviewPolicy {
            confidence_threshold: self.confidence_threshold,
            suspicious_total_cents: self.suspicious_amount_major * 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reminders {
    pub enabled: bool,
    /// Cron expression with seconds, as understood by tokio-cron-scheduler
    pub schedule: String,
    pub batch_size: i64,
    pub delay_ms: u64,
    pub quiet_start_hour: u32,
    pub quiet_end_hour: u32,
}

impl Reminders {
    pub fn quiet_hours(&self) -> QuietHours {
        QuietHours {
            start_hour: self.quiet_start_hour,
            end_hour: self.quiet_end_hour,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub ai: Ai,
    pub ledger: Ledger,
    pub reminders: Reminders,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("ai.api_key", "")?
            .set_default("ai.base_url", "https://api.openai.com/v1")?
            .set_default("ai.text_model", "gpt-4o-mini")?
            .set_default("ai.vision_model", "gpt-4o")?
            .set_default("ai.timeout_secs", 30)?
            .set_default("ledger.remainder_policy", "payer")?
            .set_default("ledger.confidence_threshold", 0.7)?
            .set_default("ledger.suspicious_amount_major", 5000)?
            .set_default("reminders.enabled", true)?
            .set_default("reminders.schedule", "0 0 * * * *")?
            .set_default("reminders.batch_size", 50)?
            .set_default("reminders.delay_ms", 1000)?
            .set_default("reminders.quiet_start_hour", 22)?
            .set_default("reminders.quiet_end_hour", 8)?
            .add_source(File::with_name("config/api").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        unsafe {
            env::remove_var("APP__SERVER__PORT");
            env::remove_var("APP__AI__API_KEY");
            env::remove_var("APP__LEDGER__REMAINDER_POLICY");
            env::remove_var("APP__REMINDERS__ENABLED");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::new().expect("defaults should load");

        assert_eq!(settings.server.address(), "0.0.0.0:3001");
        assert_eq!(settings.ledger.remainder_policy, RemainderPolicy::Payer);
        assert_eq!(settings.ledger.review_policy(), ReviewPolicy::default());
        assert_eq!(settings.reminders.batch_size, 50);
        assert_eq!(settings.reminders.quiet_hours(), QuietHours::default());
        assert!(settings.ai.api_key.is_empty());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            env::set_var("APP__SERVER__PORT", "8080");
            env::set_var("APP__AI__API_KEY", "sk-test");
            env::set_var("APP__LEDGER__REMAINDER_POLICY", "round_robin");
            env::set_var("APP__REMINDERS__ENABLED", "false");
        }

        let settings = Settings::new().expect("overrides should load");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.ai.api_key, "sk-test");
        assert_eq!(settings.ledger.remainder_policy, RemainderPolicy::RoundRobin);
        assert!(!settings.reminders.enabled);

        clear_env();
    }
}
