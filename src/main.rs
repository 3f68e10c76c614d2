#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
mod modules;

include_modules!();

use crate::auth::{generate_password, hash_password};
use crate::model::Config;
use crate::utils::{init_logger, read_config, read_healthcheck_port, resolve_env_var};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::info;
use shared::model::HealthcheckDto;
use shared::utils::{CONFIG_FILE, CONFIG_PATH};

#[derive(Parser)]
#[command(name = "tulipgate")]
#[command(version)]
#[command(about = "IPTV access gateway with signed redirect tokens", long_about = None)]
struct Args {
    /// The config file
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// log level
    #[arg(short = 'l', long = "log-level", default_missing_value = "info")]
    log_level: Option<String>,

    #[arg(short = None, long = "genpwd", default_value_t = false, default_missing_value = "true")]
    genpwd: bool,

    /// Print the argon2 hash of a password for config defined credentials
    #[arg(short = None, long = "hash-password")]
    hash_password: Option<String>,

    #[arg(short = None, long = "healthcheck", default_value_t = false, default_missing_value = "true")]
    healthcheck: bool,
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIMESTAMP: Option<&str> = option_env!("VERGEN_BUILD_TIMESTAMP");

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.genpwd {
        println!("{}", generate_password());
        return;
    }

    if let Some(pwd) = args.hash_password.as_deref() {
        match hash_password(pwd) {
            Ok(hash) => println!("{hash}"),
            Err(err) => eprintln!("{err}"),
        }
        return;
    }

    let config_file = get_config_file_path(&args);

    init_logger(args.log_level.as_ref(), config_file.as_str());

    if args.healthcheck {
        let healthy = healthcheck(config_file.as_str()).await;
        std::process::exit(i32::from(!healthy));
    }

    info!("Version: {VERSION}");
    if let Some(bts) = BUILD_TIMESTAMP
        .and_then(|ts| ts.parse::<DateTime<Utc>>().ok())
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S %Z").to_string()) {
        info!("Build time: {bts}");
    }

    let config = read_config(config_file.as_str()).unwrap_or_else(|err| exit!("{}", err));
    print_info(&config, config_file.as_str());

    if let Err(err) = api::main_api::start_server(config).await {
        exit!("Can't start server: {err}");
    }
}

fn print_info(config: &Config, config_file: &str) {
    info!("Current time: {}", chrono::offset::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("Config file: {config_file}");
    info!("Storage dir: {}", config.storage_dir);
    info!("Catalog: {}", shared::utils::sanitize_sensitive_info(&config.catalog.url));
    info!("Token ip binding: {}", if config.token.ip_binding { "enabled" } else { "disabled" });
    info!("Config credentials: {}", config.credentials.len());
}

fn get_config_file_path(args: &Args) -> String {
    resolve_env_var(&args.config_file.as_ref().map_or_else(
        || std::path::Path::new(CONFIG_PATH).join(CONFIG_FILE).to_string_lossy().to_string(),
        ToString::to_string))
}

async fn healthcheck(config_file: &str) -> bool {
    let Some(port) = read_healthcheck_port(config_file) else {
        return false;
    };
    match reqwest::Client::new()
        .get(format!("http://localhost:{port}/healthcheck"))
        .send()
        .await
    {
        Ok(response) => matches!(response.json::<HealthcheckDto>().await, Ok(check) if check.status == "ok"),
        Err(_) => false,
    }
}
