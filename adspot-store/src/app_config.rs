use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Quarters rendered by the availability dashboard.
    #[serde(default = "default_window")]
    pub availability_window_quarters: usize,
    /// Display currency for price breakdowns; prices themselves are
    /// stored as integer currency units.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_window() -> usize {
    4
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            availability_window_quarters: default_window(),
            currency: default_currency(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `ADSPOT__BUSINESS_RULES__CURRENCY=EUR`
            .add_source(config::Environment::with_prefix("ADSPOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yields_defaults() {
        let config = Config::load().unwrap();
        assert_eq!(config.business_rules.availability_window_quarters, 4);
        assert_eq!(config.business_rules.currency, "USD");
    }
}
