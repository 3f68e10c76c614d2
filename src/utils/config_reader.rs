use crate::model::Config;
use log::{error, warn};
use shared::error::{info_err, GatewayError};
use shared::model::ConfigDto;
use shared::utils::{set_sanitize_sensitive_info, CONSTANTS};
use std::env;

pub fn resolve_env_var(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    CONSTANTS.re_env_var.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|e| {
            error!("Could not resolve env var '{var_name}': {e}");
            format!("${{env:{var_name}}}")
        })
    }).to_string()
}

/// Reads the config file and expands `${env:VAR}` placeholders.
pub fn read_config_file_content(config_file: &str) -> Result<String, GatewayError> {
    let content = std::fs::read_to_string(config_file)
        .map_err(|err| info_err!("Failed to read config file {config_file}: {err}"))?;
    Ok(resolve_env_var(&content))
}

pub fn parse_config(content: &str) -> Result<Config, GatewayError> {
    let mut dto: ConfigDto = serde_saphyr::from_str(content)
        .map_err(|err| info_err!("Failed to parse config file: {err}"))?;
    dto.prepare()?;
    if dto.admin.is_none() {
        warn!("No admin token configured, the credential api is disabled");
    }
    set_sanitize_sensitive_info(dto.log.as_ref().is_none_or(|l| l.sanitize_sensitive_info));
    Ok(Config::from(&dto))
}

pub fn read_config(config_file: &str) -> Result<Config, GatewayError> {
    parse_config(&read_config_file_content(config_file)?)
}

#[derive(serde::Deserialize)]
struct HealthcheckApiConfig {
    #[serde(default = "shared::utils::default_port")]
    port: u16,
}

#[derive(serde::Deserialize)]
struct HealthcheckConfig {
    api: Option<HealthcheckApiConfig>,
}

/// Reads only the api port, the rest of the config may be invalid for a healthcheck.
pub fn read_healthcheck_port(config_file: &str) -> Option<u16> {
    let content = read_config_file_content(config_file)
        .map_err(|err| error!("Failed to open config file for healthcheck {err}"))
        .ok()?;
    match serde_saphyr::from_str::<HealthcheckConfig>(&content) {
        Ok(config) => Some(config.api.map_or_else(shared::utils::default_port, |api| api.port)),
        Err(err) => {
            error!("Failed to parse config file for healthcheck {err}");
            None
        }
    }
}
