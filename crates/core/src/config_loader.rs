use crate::config::HedgeConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the optional hedge settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Hedge.toml";

/// Environment prefix for hedge settings, e.g. `HEDGE_ORDER_SIZE=25`.
pub const ENV_PREFIX: &str = "HEDGE_";

// Token and market ids are long digit strings; figment would parse them from
// the environment as numbers, so the CLI reads those variables itself.
const ENV_IGNORED: &[&str] = &["market_id", "yes_token_id", "no_token_id"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads hedge settings from `config/Hedge.toml` and `HEDGE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or a variable cannot be parsed.
    pub fn load() -> Result<HedgeConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads hedge settings from the given TOML file (skipped when absent),
    /// then the environment. Unset keys keep their `HedgeConfig::default()` values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or a variable cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<HedgeConfig> {
        let path = path.as_ref();
        let config: HedgeConfig = Self::figment(path).extract()?;

        tracing::debug!(
            path = %path.display(),
            dry_run = config.dry_run,
            order_size = %config.order_size,
            "Loaded hedge configuration"
        );

        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(ENV_IGNORED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("config/Hedge.toml").map_err(|e| e.to_string())?;
            assert_eq!(config, HedgeConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Hedge.toml",
                r#"
                    market_id = "btc-15m"
                    yes_token_id = "1111"
                    no_token_id = "2222"
                    order_size = 20
                    target_pair_cost = 0.97
                    cooldown_seconds = 2
                "#,
            )?;

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.yes_token_id, "1111");
            assert_eq!(config.no_token_id, "2222");
            assert_eq!(config.order_size, dec!(20));
            assert_eq!(config.target_pair_cost, dec!(0.97));
            assert_eq!(config.cooldown_seconds, 2);
            assert_eq!(config.balance_slack, dec!(0.15));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Hedge.toml", "order_size = 20\ndry_run = true")?;
            jail.set_env("HEDGE_ORDER_SIZE", "35");
            jail.set_env("HEDGE_COOLDOWN_SECONDS", "9");

            let config = ConfigLoader::load_from("Hedge.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.order_size, dec!(35));
            assert_eq!(config.cooldown_seconds, 9);
            Ok(())
        });
    }

    #[test]
    fn test_env_token_ids_are_left_to_cli() {
        Jail::expect_with(|jail| {
            jail.set_env("HEDGE_YES_TOKEN_ID", "71321045679252212594626385532706912750332728571942532289631379312455583992563");

            let config = ConfigLoader::load_from("missing.toml").map_err(|e| e.to_string())?;
            assert!(config.yes_token_id.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file("Hedge.toml", "cooldown_seconds = \"soon\"")?;
            assert!(ConfigLoader::load_from("Hedge.toml").is_err());
            Ok(())
        });
    }
}
