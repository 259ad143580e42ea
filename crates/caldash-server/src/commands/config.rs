//! Configuration commands.

use std::path::Path;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &ServerConfig, path: &Path) -> ServerResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ServerError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including credentials and timezone.
pub fn validate(config: &ServerConfig) -> ServerResult<()> {
    config
        .validate()
        .map_err(|e| ServerError::config(format!("invalid configuration: {}", e)))?;
    println!("Google credentials are valid.");
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ServerResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;

    #[test]
    fn validate_reports_missing_credentials_file() {
        let config = ServerConfig {
            google: GoogleSettings {
                credentials_file: Some("/nonexistent/caldash/client_secret.json".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("failed to read credentials file"));
    }

    #[test]
    fn dump_default_config() {
        assert!(dump(&ServerConfig::default(), Path::new("/tmp/config.toml")).is_ok());
    }
}
