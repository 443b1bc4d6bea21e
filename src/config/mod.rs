mod api;
mod basic;

pub use api::ApiConfig;
pub use basic::{BasicConfig, LoginConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Process-level settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Backend connection settings (see `api` table in config.toml).
    #[serde(default)]
    pub api: ApiConfig,

    /// Optional credentials used by the binary when no session can be restored.
    #[serde(default)]
    pub login: Option<LoginConfig>,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file, if present.
    pub fn figment_from(path: &Path) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment.merge(Toml::file(path))
        } else {
            figment
        }
    }

    pub fn figment() -> Figment {
        Self::figment_from(&PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .extract()
            .expect("extract defaults");

        assert_eq!(cfg.api.base_url.as_str(), "http://localhost:3000/api");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.basic.loglevel, "info");
        assert!(cfg.login.is_none());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [api]
                base_url = "https://desidia.example/api/v2"
                enable_multiplexing = true

                [login]
                email = "a@b.com"
                password = "validpass"
                "#,
            ))
            .extract()
            .expect("extract merged config");

        assert_eq!(cfg.api.base_url.as_str(), "https://desidia.example/api/v2");
        assert!(cfg.api.enable_multiplexing);
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.login.map(|l| l.email).as_deref(), Some("a@b.com"));
    }
}
