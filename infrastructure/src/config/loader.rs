//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level file names, checked in order
const PROJECT_FILES: [&str; 2] = ["aigenflow.toml", ".aigenflow.toml"];

/// Prefix for environment overrides (`AIGENFLOW_RETRY__ATTEMPTS=3`)
const ENV_PREFIX: &str = "AIGENFLOW_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `AIGENFLOW_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./aigenflow.toml` or `./.aigenflow.toml`
    /// 4. Global: `~/.config/aigenflow/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(
            Self::global_config_path().as_deref(),
            Self::project_config_path().as_deref(),
            config_path,
        )
        .extract()
        .map_err(Box::new)
    }

    /// Merge the given sources over the defaults.
    pub fn figment(
        global: Option<&Path>,
        project: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(path) = global
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = project {
            figment = figment.merge(Toml::file(path));
        }
        // An explicit file must exist
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path (`~/.config/aigenflow/config.toml`)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("aigenflow").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Config file locations with whether each was found
    pub fn config_sources() -> Vec<(&'static str, String, bool)> {
        let mut sources = Vec::new();
        match Self::project_config_path() {
            Some(path) => sources.push(("Project", path.display().to_string(), true)),
            None => sources.push(("Project", "./aigenflow.toml or ./.aigenflow.toml".to_string(), false)),
        }
        if let Some(path) = Self::global_config_path() {
            let found = path.exists();
            sources.push(("Global", path.display().to_string(), found));
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.retry.attempts, 2);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("aigenflow"));
    }

    #[test]
    fn test_merge_priority() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "global.toml",
                "[retry]\nattempts = 4\nbase_delay_ms = 10\n[pipeline]\nlanguage = \"en\"\n",
            )?;
            jail.create_file("aigenflow.toml", "[retry]\nattempts = 5\n")?;
            jail.create_file("explicit.toml", "[pipeline]\nlanguage = \"ja\"\n")?;

            let config: FileConfig = ConfigLoader::figment(
                Some(Path::new("global.toml")),
                Some(Path::new("aigenflow.toml")),
                Some(Path::new("explicit.toml")),
            )
            .extract()?;

            // Project beats global, explicit beats both, untouched keys survive
            assert_eq!(config.retry.attempts, 5);
            assert_eq!(config.retry.base_delay_ms, 10);
            assert_eq!(config.pipeline.language, "ja");
            assert_eq!(config.recovery.login_timeout_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_files() {
        Jail::expect_with(|jail| {
            jail.create_file("aigenflow.toml", "[recovery]\ninteractive_login = true\n")?;
            jail.set_env("AIGENFLOW_RECOVERY__INTERACTIVE_LOGIN", "false");
            jail.set_env("AIGENFLOW_CONTEXT__PREVIEW_CHARS", "120");

            let config: FileConfig =
                ConfigLoader::figment(None, Some(Path::new("aigenflow.toml")), None).extract()?;
            assert!(!config.recovery.interactive_login);
            assert_eq!(config.context.preview_chars, 120);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let result: Result<FileConfig, _> =
                ConfigLoader::figment(None, None, Some(Path::new("nope.toml"))).extract();
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_provider_table_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "aigenflow.toml",
                "[providers.gemini]\ncommand = \"gemini-bridge\"\ntimeout_secs = 30\n",
            )?;
            let config: FileConfig =
                ConfigLoader::figment(None, Some(Path::new("aigenflow.toml")), None).extract()?;
            let gemini = &config.providers["gemini"];
            assert_eq!(gemini.command, "gemini-bridge");
            assert!(gemini.enabled);
            Ok(())
        });
    }
}
