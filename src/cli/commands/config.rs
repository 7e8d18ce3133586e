//! Implementation of the `rag-pipeline config` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::ConfigLoader;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Only validate, print nothing on success
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|e| format!("Failed to render configuration: {e}"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

pub fn execute(args: &ConfigArgs, config_file: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load(config_file).context("Failed to load configuration")?;
    if !args.check {
        output(&ConfigOutput { config }, json_mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_is_yaml_of_effective_config() {
        let out = ConfigOutput {
            config: Config::default(),
        };
        let parsed: Config = serde_yaml::from_str(&out.to_human()).unwrap();
        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.model.identifier, Config::default().model.identifier);
    }

    #[test]
    fn test_json_output_has_sections() {
        let value = ConfigOutput {
            config: Config::default(),
        }
        .to_json();
        assert_eq!(value["server"]["port"], 8000);
        assert_eq!(value["storage"]["upload_dir"], "./uploaded_pdfs");
    }
}
