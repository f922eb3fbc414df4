//! Layered configuration for the `tlq` CLI.
//!
//! Sources, lowest precedence first: built-in defaults, `tlq.toml` in the
//! working directory (or the file passed with `--config`), then `TLQ__*`
//! environment variables. A `.env` file is loaded before the environment is
//! read.

use serde::Deserialize;
use std::path::Path;
use zunder_ccda::CcdaOptions;
use zunder_hl7v2::Hl7v2Options;
use zunder_normalize::NormalizeOptions;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub hl7v2: Hl7v2Options,
    #[serde(default)]
    pub ccda: CcdaOptions,
    #[serde(default)]
    pub normalize: NormalizeOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines on stderr
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from defaults, the config file and the environment.
    pub fn load(config_file: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let hl7v2 = Hl7v2Options::default();
        let ccda = CcdaOptions::default();
        let normalize = NormalizeOptions::default();

        let mut builder = config::Config::builder()
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            .set_default("hl7v2.unescape", hl7v2.unescape)?
            .set_default("hl7v2.grammar_escape", hl7v2.grammar_escape)?
            .set_default("ccda.render_narrative", ccda.render_narrative)?
            .set_default("ccda.cdata_key", ccda.cdata_key)?
            .set_default("normalize.ignore_empty_fields", normalize.ignore_empty_fields)?
            .set_default(
                "normalize.merge_extension_entries",
                normalize.merge_extension_entries,
            )?;

        builder = match config_file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("tlq").required(false)),
        };

        // Example: TLQ__CCDA__RENDER_NARRATIVE=true -> ccda.render_narrative
        let config = builder
            .add_source(
                config::Environment::with_prefix("TLQ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            ));
        }
        if self.ccda.cdata_key.is_empty() {
            return Err("ccda.cdata_key must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tlq.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_file_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"
[logging]
level = "debug"

[ccda]
render_narrative = true

[normalize]
merge_extension_entries = true
"#,
        );
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
        assert!(config.ccda.render_narrative);
        assert_eq!(config.ccda.cdata_key, "_");
        assert!(config.hl7v2.unescape);
        assert!(config.normalize.ignore_empty_fields);
        assert!(config.normalize.merge_extension_entries);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let (_dir, path) = write_config("[logging]\nlevel = \"loud\"\n");
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.validate().unwrap_err().contains("logging.level"));

        let (_dir, path) = write_config("[ccda]\ncdata_key = \"\"\n");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.validate().unwrap_err(),
            "ccda.cdata_key must not be empty"
        );
    }
}
