//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use triangle_core::{Config, Result};

#[derive(Parser, Debug)]
#[command(name = "triangle")]
#[command(about = "Draws a triangle with Vulkan")]
pub struct Cli {
    /// Configuration file path. Defaults apply when absent.
    #[arg(short, long, env = "TRIANGLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable the Khronos validation layer
    #[arg(long, conflicts_with = "no_validation")]
    pub validation: bool,

    /// Disable the Khronos validation layer
    #[arg(long)]
    pub no_validation: bool,

    /// Present without waiting for vertical blank (MAILBOX when available)
    #[arg(long)]
    pub no_vsync: bool,
}

impl Cli {
    /// Loads the configuration file, if any, and applies flag overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if self.validation {
            config.renderer.validation = true;
        }
        if self.no_validation {
            config.renderer.validation = false;
        }
        if self.no_vsync {
            config.renderer.vsync = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["triangle"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["triangle", "--no-validation", "--no-vsync"]);
        let mut config = Config::default();
        config.renderer.validation = true;
        cli.apply(&mut config);
        assert!(!config.renderer.validation);
        assert!(!config.renderer.vsync);

        let cli = Cli::parse_from(["triangle", "--validation"]);
        let mut config = Config::default();
        config.renderer.validation = false;
        cli.apply(&mut config);
        assert!(config.renderer.validation);
    }

    #[test]
    fn test_validation_flags_conflict() {
        let result = Cli::try_parse_from(["triangle", "--validation", "--no-validation"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["triangle", "--config", "triangle.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("triangle.toml")));
    }
}
