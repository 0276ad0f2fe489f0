//! Operations configuration

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::{Currency, Money};
use domain_reversal::context::CashbackScheme;
use infra_db::ReversalSettings;

use crate::error::OpsError;

/// Servicing operations configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServicingConfig {
    /// Primary ledger store URL
    pub primary_database_url: String,
    /// Collection store URL
    pub collection_database_url: String,
    /// Log level filter
    pub log_level: String,
    /// Emit JSON logs instead of human-readable ones
    #[serde(default)]
    pub json_logs: bool,
    /// Proven-account threshold in whole rupiah
    pub proven_threshold: i64,
    /// Whether accounts are on the tiered cashback scheme
    #[serde(default)]
    pub cashback_scheme_enabled: bool,
    /// Cashback counter ceiling
    pub cashback_counter_ceiling: u32,
    /// Percentage tiers, e.g. `1:0.01,3:0.02,4:0.03`
    pub cashback_percentages: String,
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self {
            primary_database_url: "postgres://localhost/servicing".to_string(),
            collection_database_url: "postgres://localhost/servicing_collection".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            proven_threshold: 500_000,
            cashback_scheme_enabled: true,
            cashback_counter_ceiling: 4,
            cashback_percentages: "1:0.01,3:0.02,4:0.03".to_string(),
        }
    }
}

impl ServicingConfig {
    /// Loads configuration from `SERVICING_`-prefixed environment variables
    ///
    /// A `.env` file in the working directory is honored when present.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::Environment::with_prefix("SERVICING"))
            .build()?
            .try_deserialize()
    }

    /// Parses the percentage tiers into a counter-keyed mapping
    pub fn percentage_mapping(&self) -> Result<BTreeMap<u32, Decimal>, OpsError> {
        let mut mapping = BTreeMap::new();
        for pair in self
            .cashback_percentages
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let (counter, percentage) = pair.split_once(':').ok_or_else(|| {
                OpsError::Configuration(format!("invalid cashback tier '{}'", pair))
            })?;
            let counter: u32 = counter.trim().parse().map_err(|_| {
                OpsError::Configuration(format!("invalid tier counter '{}'", counter))
            })?;
            let percentage: Decimal = percentage.trim().parse().map_err(|_| {
                OpsError::Configuration(format!("invalid tier percentage '{}'", percentage))
            })?;
            mapping.insert(counter, percentage);
        }
        Ok(mapping)
    }

    /// Builds the repository settings from this configuration
    pub fn reversal_settings(&self) -> Result<ReversalSettings, OpsError> {
        Ok(ReversalSettings {
            currency: Currency::IDR,
            proven_threshold: Money::idr(self.proven_threshold),
            scheme: CashbackScheme {
                eligible: self.cashback_scheme_enabled,
                counter_ceiling: self.cashback_counter_ceiling,
                percentage_mapping: self.percentage_mapping()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_mapping_parses() {
        let config = ServicingConfig::default();
        let mapping = config.percentage_mapping().unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[&1], dec!(0.01));
        assert_eq!(mapping[&4], dec!(0.03));
    }

    #[test]
    fn test_malformed_tier_is_rejected() {
        let config = ServicingConfig {
            cashback_percentages: "1-0.01".to_string(),
            ..Default::default()
        };
        assert!(config.percentage_mapping().is_err());
    }

    #[test]
    fn test_settings_carry_threshold() {
        let settings = ServicingConfig::default().reversal_settings().unwrap();
        assert_eq!(settings.proven_threshold, Money::idr(500_000));
        assert!(settings.scheme.eligible);
    }
}
