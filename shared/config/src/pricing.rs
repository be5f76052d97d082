use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PRICING_CONFIG_PATH_ENV: &str = "PRICING_CONFIG_PATH";
pub const ANNUAL_DISCOUNT_RATE_ENV: &str = "PRICING_ANNUAL_DISCOUNT_RATE";
pub const ADDON_SURCHARGE_ENV: &str = "PRICING_ADDON_SURCHARGE";
pub const ADDON_EXCLUDED_PLANS_ENV: &str = "PRICING_ADDON_EXCLUDED_PLANS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read pricing config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse pricing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid pricing config: {0}")]
    Invalid(String),
}

/// Business rules shared by every order builder and renewal panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fraction taken off the monthly-equivalent price for yearly terms.
    pub annual_discount_rate: Decimal,
    /// Monthly amount added per unit when the add-on is enabled.
    pub addon_surcharge: Decimal,
    /// Plans that never carry the add-on surcharge.
    pub addon_excluded_plans: Vec<String>,
    /// ISO 4217 code printed next to quoted amounts.
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            annual_discount_rate: Decimal::new(17, 2),
            addon_surcharge: Decimal::new(200, 2),
            addon_excluded_plans: vec!["light".to_string(), "business".to_string()],
            currency: "USD".to_string(),
        }
    }
}

impl PricingConfig {
    // Load from a provided path or env var PRICING_CONFIG_PATH, defaulting to ./pricing.json
    pub fn from_path(path: Option<String>) -> Result<Self, ConfigError> {
        let default_path = std::env::var(PRICING_CONFIG_PATH_ENV)
            .unwrap_or_else(|_| "pricing.json".to_string());
        let path = path.unwrap_or(default_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<PricingConfig>(&content).map_err(|source| {
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "Pricing config file not found, using defaults");
                PricingConfig::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        info!(
            annual_discount_rate = %config.annual_discount_rate,
            addon_surcharge = %config.addon_surcharge,
            excluded = ?config.addon_excluded_plans,
            "Pricing configuration loaded"
        );

        Ok(config)
    }

    pub fn from_env_path() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_path(None)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(ANNUAL_DISCOUNT_RATE_ENV) {
            self.annual_discount_rate = parse_decimal(ANNUAL_DISCOUNT_RATE_ENV, &raw)?;
        }

        if let Ok(raw) = std::env::var(ADDON_SURCHARGE_ENV) {
            self.addon_surcharge = parse_decimal(ADDON_SURCHARGE_ENV, &raw)?;
        }

        if let Ok(raw) = std::env::var(ADDON_EXCLUDED_PLANS_ENV) {
            self.addon_excluded_plans = raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.annual_discount_rate < Decimal::ZERO || self.annual_discount_rate >= Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "annual_discount_rate must be in [0, 1), got {}",
                self.annual_discount_rate
            )));
        }

        if self.addon_surcharge < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "addon_surcharge must not be negative, got {}",
                self.addon_surcharge
            )));
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(format!(
                "currency must be a three-letter ISO code, got {:?}",
                self.currency
            )));
        }

        Ok(())
    }
}

fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| ConfigError::Invalid(format!("{} is not a decimal ({}): {}", name, raw, e)))
}

// Thread-safe cached pricing rules for hot reload support
lazy_static::lazy_static! {
    static ref CACHED_PRICING: Arc<RwLock<PricingConfig>> = {
        let config = PricingConfig::from_env_path().unwrap_or_else(|e| {
            warn!("Falling back to default pricing configuration: {}", e);
            PricingConfig::default()
        });
        Arc::new(RwLock::new(config))
    };
}

// Get cached pricing rules (read-optimized)
pub fn get_cached_pricing() -> PricingConfig {
    CACHED_PRICING.read().clone()
}

// Reload pricing rules; the cached copy is kept when the new one is invalid
pub fn reload_pricing() -> Result<(), ConfigError> {
    let fresh = PricingConfig::from_env_path()?;
    *CACHED_PRICING.write() = fresh;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        std::env::remove_var(PRICING_CONFIG_PATH_ENV);
        std::env::remove_var(ANNUAL_DISCOUNT_RATE_ENV);
        std::env::remove_var(ADDON_SURCHARGE_ENV);
        std::env::remove_var(ADDON_EXCLUDED_PLANS_ENV);
    }

    #[test]
    fn test_defaults() {
        let config = PricingConfig::default();
        assert_eq!(config.annual_discount_rate, dec!(0.17));
        assert_eq!(config.addon_surcharge, dec!(2.00));
        assert_eq!(config.addon_excluded_plans, vec!["light", "business"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_currency_must_be_iso_code() {
        for bad in ["", "usd", "EURO"] {
            let config = PricingConfig {
                currency: bad.to_string(),
                ..PricingConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        clear_env();
        let config = PricingConfig::from_path(Some("/nonexistent/pricing.json".to_string())).unwrap();
        assert_eq!(config, PricingConfig::default());
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_other_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"annual_discount_rate": "0.20"}}"#).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = PricingConfig::from_path(Some(path)).unwrap();
        assert_eq!(config.annual_discount_rate, dec!(0.20));
        assert_eq!(config.addon_surcharge, dec!(2.00));
        assert_eq!(config.currency, "USD");
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_an_error() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let err = PricingConfig::from_path(Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var(ADDON_SURCHARGE_ENV, "3.25");
        std::env::set_var(ADDON_EXCLUDED_PLANS_ENV, "light, edge-starter ,");

        let config = PricingConfig::from_path(Some("/nonexistent/pricing.json".to_string())).unwrap();
        clear_env();

        assert_eq!(config.addon_surcharge, dec!(3.25));
        assert_eq!(config.addon_excluded_plans, vec!["light", "edge-starter"]);
    }

    #[test]
    #[serial]
    fn test_invalid_rate_rejected() {
        clear_env();
        std::env::set_var(ANNUAL_DISCOUNT_RATE_ENV, "1.5");
        let result = PricingConfig::from_path(Some("/nonexistent/pricing.json".to_string()));
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_reload_replaces_cached_copy() {
        clear_env();
        std::env::set_var(PRICING_CONFIG_PATH_ENV, "/nonexistent/pricing.json");
        std::env::set_var(ADDON_SURCHARGE_ENV, "4.00");
        reload_pricing().unwrap();
        assert_eq!(get_cached_pricing().addon_surcharge, dec!(4.00));

        std::env::set_var(ANNUAL_DISCOUNT_RATE_ENV, "-0.1");
        assert!(reload_pricing().is_err());
        assert_eq!(get_cached_pricing().addon_surcharge, dec!(4.00));

        clear_env();
        std::env::set_var(PRICING_CONFIG_PATH_ENV, "/nonexistent/pricing.json");
        reload_pricing().unwrap();
        clear_env();
        assert_eq!(get_cached_pricing(), PricingConfig::default());
    }

    #[test]
    #[serial]
    fn test_unparseable_env_value_rejected() {
        clear_env();
        std::env::set_var(ADDON_SURCHARGE_ENV, "two dollars");
        let result = PricingConfig::from_path(Some("/nonexistent/pricing.json".to_string()));
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
