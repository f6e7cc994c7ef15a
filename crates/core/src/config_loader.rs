use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

const ENV_PREFIX: &str = "FORECAST_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, TOML, JSON and environment variables.
    ///
    /// Nested keys are addressed with a double underscore, e.g.
    /// `FORECAST_RUN__N_STEPS=10`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Toml::file("config/Config.toml"))
            .join(Json::file("config/Config.json"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration with a profile file layered over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .join(Json::file("config/Config.json"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration from an explicit TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_files() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.run.n_steps, 15);
            assert_eq!(config.hyper_params.n_estimators, 100);
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [run]
                name = "nightly"
                shift_list = [1, 5]

                [hyper_params]
                max_depth = 4
                "#,
            )?;
            jail.set_env("FORECAST_RUN__N_STEPS", "10");

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.run.name, "nightly");
            assert_eq!(config.run.shift_list, vec![1, 5]);
            assert_eq!(config.run.n_steps, 10);
            assert_eq!(config.hyper_params.max_depth, 4);
            assert_eq!(config.hyper_params.n_estimators, 100);
            Ok(())
        });
    }

    #[test]
    fn profile_file_wins_over_base() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/Config.toml", "[run]\nn_steps = 5\n")?;
            jail.create_file("config/Config.fast.toml", "[run]\nn_steps = 3\n")?;

            let config = ConfigLoader::load_with_profile("fast").map_err(|e| e.to_string())?;
            assert_eq!(config.run.n_steps, 3);
            Ok(())
        });
    }

    #[test]
    fn explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[data]\noutput_dir = \"out\"\n")?;
            let config =
                ConfigLoader::load_from(Path::new("custom.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.data.output_dir, std::path::PathBuf::from("out"));
            Ok(())
        });
    }
}
