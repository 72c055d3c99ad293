use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    app::DEFAULT_QUALITIES,
    domain::{City, FeeSet, Server},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketCfg {
    pub server: Server,
    pub city: City,
    pub qualities: Vec<u8>,
    pub timeout_secs: u64,
    /// Overrides the per-server stats URL.
    pub base_url: Option<String>,
}

impl Default for MarketCfg {
    fn default() -> Self {
        Self {
            server: Server::default(),
            city: City::default(),
            qualities: DEFAULT_QUALITIES.to_vec(),
            timeout_secs: 15,
            base_url: None,
        }
    }
}

impl MarketCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Values used for a calculation when neither a request file nor a flag sets them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsCfg {
    pub crafting_fee: f64,
    pub setup_fee: f64,
    pub return_bonus_percent: f64,
    pub tax_rate_percent: f64,
}

impl Default for DefaultsCfg {
    fn default() -> Self {
        Self {
            crafting_fee: 0.0,
            setup_fee: 0.0,
            return_bonus_percent: 0.0,
            tax_rate_percent: 4.0,
        }
    }
}

impl DefaultsCfg {
    pub fn fees(&self) -> FeeSet {
        FeeSet {
            crafting_fee: self.crafting_fee,
            setup_fee: self.setup_fee,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub market: MarketCfg,
    pub defaults: DefaultsCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.market.server, Server::West);
        assert_eq!(cfg.market.city, City::Caerleon);
        assert_eq!(cfg.market.qualities, vec![1]);
        assert_eq!(cfg.market.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.defaults.tax_rate_percent, 4.0);
        assert_eq!(cfg.defaults.fees(), FeeSet::default());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = Config::from_toml(
            r#"
            [market]
            server = "Europe"
            city = "Fort Sterling"
            qualities = [1, 2, 3]

            [defaults]
            crafting_fee = 1500.0
            tax_rate_percent = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.market.server, Server::Europe);
        assert_eq!(cfg.market.city, City::FortSterling);
        assert_eq!(cfg.market.qualities, vec![1, 2, 3]);
        assert_eq!(cfg.market.timeout_secs, 15);
        assert_eq!(cfg.defaults.crafting_fee, 1500.0);
        assert_eq!(cfg.defaults.setup_fee, 0.0);
        assert_eq!(cfg.defaults.tax_rate_percent, 8.0);
    }

    #[test]
    fn unknown_server_is_a_parse_error() {
        let err = Config::from_toml("[market]\nserver = \"Mars\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
