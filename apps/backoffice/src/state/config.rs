//! # Configuration State
//!
//! Store settings used by the commands: tax rate for new drafts, low-stock
//! threshold, and what the ticket header shows.
//!
//! ## Configuration Sources (later wins)
//! 1. Defaults (this file)
//! 2. Environment variables (`MOSTRADOR_*`)
//! 3. Database (`config_entries` table), edited from the dashboard
//!
//! ## Thread Safety
//! Settings change at runtime when the dashboard saves a config entry, so
//! they live behind an `RwLock`. Readers take a cloned snapshot.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mostrador_core::validation::validate_percentage;
use mostrador_core::{Percentage, ValidationError, DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_TAX_BPS};
use mostrador_db::{Database, DbResult};

/// Config entry keys the back office understands.
pub const KEY_STORE_NAME: &str = "store_name";
pub const KEY_TAX_RATE: &str = "tax_rate";
pub const KEY_LOW_STOCK: &str = "low_stock_threshold";
pub const KEY_CURRENCY_SYMBOL: &str = "currency_symbol";

/// Environment variable for each key.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("MOSTRADOR_STORE_NAME", KEY_STORE_NAME),
    ("MOSTRADOR_TAX_RATE", KEY_TAX_RATE),
    ("MOSTRADOR_LOW_STOCK", KEY_LOW_STOCK),
    ("MOSTRADOR_CURRENCY_SYMBOL", KEY_CURRENCY_SYMBOL),
];

/// Effective store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Store name (ticket header when no company profile is saved)
    pub store_name: String,

    /// Tax rate applied to new drafts
    pub tax_rate: Percentage,

    /// Products at or below this stock are listed as low
    pub low_stock_threshold: i64,

    /// Currency symbol for display
    pub currency_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_name: "Mostrador".to_string(),
            tax_rate: Percentage::from_bps(DEFAULT_TAX_BPS),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            currency_symbol: "$".to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `MOSTRADOR_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `MOSTRADOR_*` variable. Invalid values are logged and skipped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                if let Err(e) = settings.apply(key, &value) {
                    warn!(var = %var, error = %e, "Ignoring invalid environment override");
                }
            }
        }

        settings
    }

    /// Applies one config entry.
    ///
    /// ## Returns
    /// `Ok(false)` for keys the back office does not use; they are stored
    /// but have no effect here.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, ValidationError> {
        match key {
            KEY_STORE_NAME => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(ValidationError::Required {
                        field: KEY_STORE_NAME.to_string(),
                    });
                }
                self.store_name = name.to_string();
            }
            KEY_TAX_RATE => {
                let rate: Percentage = value.parse()?;
                validate_percentage(KEY_TAX_RATE, rate)?;
                self.tax_rate = rate;
            }
            KEY_LOW_STOCK => {
                let threshold = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::InvalidFormat {
                        field: KEY_LOW_STOCK.to_string(),
                        reason: "must be a whole number".to_string(),
                    })?;
                if threshold < 0 {
                    return Err(ValidationError::OutOfRange {
                        field: KEY_LOW_STOCK.to_string(),
                        min: 0,
                        max: i64::MAX,
                    });
                }
                self.low_stock_threshold = threshold;
            }
            KEY_CURRENCY_SYMBOL => {
                let symbol = value.trim();
                if symbol.is_empty() || symbol.chars().count() > 4 {
                    return Err(ValidationError::OutOfRange {
                        field: KEY_CURRENCY_SYMBOL.to_string(),
                        min: 1,
                        max: 4,
                    });
                }
                self.currency_symbol = symbol.to_string();
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Formats a cent amount with the configured symbol.
    ///
    /// ```
    /// use mostrador_backoffice::state::Settings;
    ///
    /// let settings = Settings::default();
    /// assert_eq!(settings.format_currency(1234), "$12.34");
    /// assert_eq!(settings.format_currency(-5), "-$0.05");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        format!(
            "{}{}{}.{:02}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            (cents / 100).abs(),
            (cents % 100).abs()
        )
    }
}

/// Shared, updatable settings.
#[derive(Debug, Default)]
pub struct ConfigState {
    settings: RwLock<Settings>,
}

impl ConfigState {
    pub fn new(settings: Settings) -> Self {
        ConfigState {
            settings: RwLock::new(settings),
        }
    }

    /// Environment settings overlaid with the database entries.
    pub async fn load(db: &Database) -> DbResult<Self> {
        let state = ConfigState::new(Settings::from_env());
        state.reload(db).await?;
        Ok(state)
    }

    /// Rebuilds the settings from the environment and the database.
    ///
    /// Used after an entry is deleted, when the value must fall back to the
    /// environment or the default.
    pub async fn reload(&self, db: &Database) -> DbResult<()> {
        let entries = db.config().all().await?;

        let mut settings = Settings::from_env();
        for entry in &entries {
            if let Err(e) = settings.apply(&entry.key, &entry.value) {
                warn!(key = %entry.key, error = %e, "Ignoring invalid stored config entry");
            }
        }

        debug!(entries = entries.len(), "Settings loaded");
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates and applies one entry without touching the database.
    pub fn apply(&self, key: &str, value: &str) -> Result<bool, ValidationError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = settings.clone();
        let known = updated.apply(key, value)?;
        *settings = updated;
        Ok(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        let settings = Settings::default();
        assert_eq!(settings.format_currency(1234), "$12.34");
        assert_eq!(settings.format_currency(1), "$0.01");
        assert_eq!(settings.format_currency(0), "$0.00");
        assert_eq!(settings.format_currency(-1234), "-$12.34");
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::from_lookup(|var| match var {
            "MOSTRADOR_TAX_RATE" => Some("8".to_string()),
            "MOSTRADOR_STORE_NAME" => Some("Abarrotes Lupita".to_string()),
            "MOSTRADOR_LOW_STOCK" => Some("not a number".to_string()),
            _ => None,
        });

        assert_eq!(settings.tax_rate, Percentage::from_percent(8));
        assert_eq!(settings.store_name, "Abarrotes Lupita");
        assert_eq!(settings.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn test_apply_rejects_out_of_range_tax() {
        let state = ConfigState::default();
        assert!(state.apply(KEY_TAX_RATE, "120").is_err());
        assert!(state.apply(KEY_LOW_STOCK, "-1").is_err());
        assert_eq!(state.snapshot(), Settings::default());

        assert!(state.apply(KEY_TAX_RATE, "8.5").unwrap());
        assert_eq!(state.snapshot().tax_rate.bps(), 850);
        assert!(!state.apply("receipt_footer", "Gracias").unwrap());
    }
}
