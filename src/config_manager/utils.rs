use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config_manager::main::Config;

/// Read JSON-LD configuration file with environment variable substitution
pub fn read_jsonld(config_path: &Path) -> Result<Value> {
    let content = read_config_text(config_path)?;
    let json_value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", config_path.display()))?;
    Ok(json_value)
}

/// Read YAML configuration file with environment variable substitution
pub fn read_yaml(config_path: &Path) -> Result<Value> {
    let content = read_config_text(config_path)?;
    let json_value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid YAML in {}", config_path.display()))?;
    Ok(json_value)
}

fn read_config_text(config_path: &Path) -> Result<String> {
    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }

    let content = load_text_file_with_guess_encoding(config_path)?;
    if content.trim().is_empty() {
        anyhow::bail!("Configuration file is empty: {}", config_path.display());
    }

    substitute_env_vars(&content)
}

/// Replace `${VAR_NAME}` with the variable's value; unknown variables are left as-is
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{(\w+)\}")?;
    let replaced = pattern.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(replaced.into_owned())
}

/// Validate configuration data against the Config model
pub fn validate_config(config_data: &Value) -> Result<Config> {
    let config: Config = serde_json::from_value(config_data.clone())?;
    Ok(config)
}

/// Load text file, tolerating a BOM and falling back to legacy encodings
pub fn load_text_file_with_guess_encoding(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)?;

    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(&bytes) {
        let (cow, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return Ok(cow.into_owned());
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            debug!("{} is not UTF-8, decoding as windows-1252", file_path.display());
            let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
            Ok(cow.into_owned())
        }
    }
}

/// Candidate config locations, most specific first
pub fn config_search_paths() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    vec![
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from),
        Some(PathBuf::from("conf.jsonld")),
        Some(exe_dir.join("conf.jsonld")),
        Some(PathBuf::from("conf.yaml")),
        Some(exe_dir.join("conf.yaml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Load the first candidate that exists.
///
/// Missing files are skipped. A file that exists but cannot be read or parsed
/// is an error rather than a silent fall-through to the next candidate.
pub fn load_first_existing(paths: &[PathBuf]) -> Result<Option<(PathBuf, Config)>> {
    for path in paths {
        if !path.exists() {
            debug!("No config at {}", path.display());
            continue;
        }
        let config = Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        return Ok(Some((path.clone(), config)));
    }
    Ok(None)
}
