use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
pub fn parse_config(text: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(text)?;
    validate(&config)?;
    Ok(config)
}

/// Reads, parses and validates the configuration file at `path`
///
/// # Returns
///
/// * `Err(ConfigError::Io)` - the file could not be read
/// * `Err(ConfigError::Parse)` - the file is not valid TOML for [`Config`]
/// * `Err(ConfigError::Validation)` / `Err(ConfigError::InvalidUrl)` - a
///   setting is out of range
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex SHA-256 of the configuration file, recorded in the job log at start-up
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    Ok(hash_text(&std::fs::read_to_string(path)?))
}

/// Loads a configuration together with the hash of the exact bytes parsed
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    Ok((config, hash_text(&text)))
}

fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
