//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use storefront_core::Config;

use super::optional;
use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, backend, backend_url, backend_key, request_timeout_secs, \
     user_id, email_api_url, email_api_key, email_from, operator_email, store_name, \
     currency_symbol, listen_addr, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend.to_string(),
                    "backend_url": config.backend_url,
                    "backend_key": config.backend_key.as_deref().map(mask),
                    "request_timeout_secs": config.request_timeout_secs,
                    "user_id": config.user_id,
                    "email_api_url": config.email_api_url,
                    "email_api_key": config.email_api_key.as_deref().map(mask),
                    "email_from": config.email_from,
                    "operator_email": config.operator_email,
                    "store_name": config.store_name,
                    "currency_symbol": config.currency_symbol,
                    "listen_addr": config.listen_addr,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let unset = || "(not set)".to_string();

            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  backend:              {}", config.backend);
            println!(
                "  backend_url:          {}",
                config.backend_url.clone().unwrap_or_else(unset)
            );
            println!(
                "  backend_key:          {}",
                config.backend_key.as_deref().map(mask).unwrap_or_else(unset)
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  user_id:              {}",
                config.user_id.clone().unwrap_or_else(unset)
            );
            println!("  email_api_url:        {}", config.email_api_url);
            println!(
                "  email_api_key:        {}",
                config.email_api_key.as_deref().map(mask).unwrap_or_else(unset)
            );
            println!("  email_from:           {}", config.email_from);
            println!(
                "  operator_email:       {}",
                config.operator_email.clone().unwrap_or_else(unset)
            );
            println!("  store_name:           {}", config.store_name);
            println!("  currency_symbol:      {}", config.currency_symbol);
            println!("  listen_addr:          {}", config.listen_addr);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(unset)
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, value.clone())?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key.ends_with("_key") {
        mask(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: String) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "backend" => config.backend = value.parse()?,
        "backend_url" => config.backend_url = optional(value),
        "backend_key" => config.backend_key = optional(value),
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number.")?;
        }
        "user_id" => config.user_id = optional(value),
        "email_api_url" => config.email_api_url = value,
        "email_api_key" => config.email_api_key = optional(value),
        "email_from" => config.email_from = value,
        "operator_email" => config.operator_email = optional(value),
        "store_name" => config.store_name = value,
        "currency_symbol" => config.currency_symbol = value,
        "listen_addr" => config.listen_addr = value,
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

/// Hide all but the last four characters of a secret
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}
