use crate::{
    catalog_cache::DEFAULT_CATALOG_TTL,
    notification::{DispatchMode, RetryPolicy},
    product::Product,
};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

#[derive(Debug, Clone, Deserialize)]
struct ProductCatalogFile {
    products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts:  u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_dispatch")]
    pub dispatch:      DispatchMode,
    /// JSONL outbox. When absent, payloads go to the log.
    #[serde(default)]
    pub outbox_path:   Option<String>,
}

fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 1_000 }
fn default_dispatch() -> DispatchMode { DispatchMode::Background }
fn default_catalog_ttl_secs() -> u64 { DEFAULT_CATALOG_TTL.as_secs() }
fn default_max_page_size() -> u32 { 100 }

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_attempts:  default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            dispatch:      default_dispatch(),
            outbox_path:   None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size:    u32,
    #[serde(default)]
    pub notification:     NotificationSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            catalog_ttl_secs: default_catalog_ttl_secs(),
            max_page_size:    default_max_page_size(),
            notification:     NotificationSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoanConfig {
    /// Catalog order is preserved; it breaks rate ties.
    pub products: Vec<Product>,
    pub settings: ServiceSettings,
}

impl LoanConfig {
    /// Load from the data/ directory.
    /// In tests, use LoanConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let product_path = format!("{data_dir}/products/product_catalog.json");
        let product_content = std::fs::read_to_string(&product_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {product_path}: {e}"))?;
        let product_file: ProductCatalogFile = serde_json::from_str(&product_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {product_path}: {e}"))?;

        let settings_path = format!("{data_dir}/settings.json");
        let settings = if Path::new(&settings_path).exists() {
            let content = std::fs::read_to_string(&settings_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {settings_path}: {e}"))?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {settings_path}: {e}"))?
        } else {
            log::warn!("config: {settings_path} missing, using default settings");
            ServiceSettings::default()
        };

        let config = Self {
            products: product_file.products,
            settings,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject catalogs the resolver could not reason about.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for p in &self.products {
            if !seen.insert(p.code) {
                anyhow::bail!("Duplicate product code {}", p.code);
            }
            if p.monthly_rate.is_sign_negative() {
                anyhow::bail!("Product {} has a negative rate", p.code);
            }
            if let (Some(min), Some(max)) = (p.min_term, p.max_term) {
                if min > max {
                    anyhow::bail!("Product {} has min_term {min} above max_term {max}", p.code);
                }
            }
            if let (Some(min), Some(max)) = (p.min_amount, p.max_amount) {
                if min > max {
                    anyhow::bail!("Product {} has min_amount {min} above max_amount {max}", p.code);
                }
            }
        }
        if self.settings.max_page_size == 0 {
            anyhow::bail!("max_page_size must be at least 1");
        }
        Ok(())
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.settings.catalog_ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.settings.notification.max_attempts,
            base_delay:   Duration::from_millis(self.settings.notification.base_delay_ms),
        }
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// Inline delivery with no backoff keeps tests fast and ordered.
    pub fn default_test() -> Self {
        let products = vec![
            Product {
                code:         1,
                name:         "Produto 1".into(),
                monthly_rate: dec!(0.0179),
                min_term:     Some(0),
                max_term:     Some(24),
                min_amount:   Some(dec!(200.00)),
                max_amount:   Some(dec!(10000.00)),
            },
            Product {
                code:         2,
                name:         "Produto 2".into(),
                monthly_rate: dec!(0.0175),
                min_term:     Some(25),
                max_term:     Some(48),
                min_amount:   Some(dec!(10000.01)),
                max_amount:   Some(dec!(100000.00)),
            },
            Product {
                code:         3,
                name:         "Produto 3".into(),
                monthly_rate: dec!(0.0182),
                min_term:     Some(49),
                max_term:     Some(96),
                min_amount:   Some(dec!(100000.01)),
                max_amount:   Some(dec!(1000000.00)),
            },
            Product {
                code:         4,
                name:         "Produto 4".into(),
                monthly_rate: dec!(0.0151),
                min_term:     Some(96),
                max_term:     None,
                min_amount:   Some(dec!(1000000.01)),
                max_amount:   None,
            },
        ];

        Self {
            products,
            settings: ServiceSettings {
                catalog_ttl_secs: default_catalog_ttl_secs(),
                max_page_size:    default_max_page_size(),
                notification: NotificationSettings {
                    max_attempts:  3,
                    base_delay_ms: 0,
                    dispatch:      DispatchMode::Inline,
                    outbox_path:   None,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        LoanConfig::default_test().validate().unwrap();
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: ServiceSettings =
            serde_json::from_str(r#"{ "notification": { "dispatch": "inline" } }"#).unwrap();
        assert_eq!(settings.catalog_ttl_secs, 300);
        assert_eq!(settings.notification.max_attempts, 3);
        assert_eq!(settings.notification.dispatch, DispatchMode::Inline);
    }

    #[test]
    fn duplicate_codes_rejected() {
        let mut config = LoanConfig::default_test();
        let dup = config.products[0].clone();
        config.products.push(dup);
        assert!(config.validate().is_err());
    }
}
