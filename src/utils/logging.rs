use crate::utils::read_config_file_content;
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};
use shared::model::LogLevelConfigDto;

pub const LOG_ENV_VAR: &str = "TULIPGATE_LOG";

const LOG_ERROR_LEVEL_MOD: &[&str] = &[
    "reqwest::async_impl::client",
    "reqwest::connect",
    "hyper_util::client",
    "tower_governor",
];

fn get_log_level(log_level: &str) -> LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn read_config_log_level(config_file: &str) -> Option<String> {
    read_config_file_content(config_file).ok()
        .and_then(|content| serde_saphyr::from_str::<LogLevelConfigDto>(&content)
            .map_err(|e| error!("Failed to parse log config file: {e}"))
            .ok())
        .and_then(|cfg| cfg.log.and_then(|l| l.log_level))
}

/// Splits `debug,hyper=warn` into a default level and per module filters.
fn parse_log_levels(log_level: &str) -> (Option<LevelFilter>, Vec<(String, LevelFilter)>) {
    let mut default_level = None;
    let mut modules = vec![];
    for pair in log_level.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((module, level)) = pair.split_once('=') {
            modules.push((module.trim().to_string(), get_log_level(level.trim())));
        } else {
            default_level = Some(get_log_level(pair));
        }
    }
    (default_level, modules)
}

pub fn init_logger(user_log_level: Option<&String>, config_file: &str) {
    let env_log_level = std::env::var(LOG_ENV_VAR).ok();

    let mut log_builder = Builder::from_default_env();
    log_builder.target(Target::Stdout);

    // priority  CLI-Argument, Env-Var, Config, Default
    let log_level = user_log_level
        .map(std::string::ToString::to_string)
        .or(env_log_level)
        .or_else(|| read_config_log_level(config_file))
        .unwrap_or_else(|| "info".to_string());

    let (default_level, modules) = parse_log_levels(&log_level);
    let mut log_levels = vec![];
    if let Some(level) = default_level {
        log_builder.filter_level(level);
        log_levels.push(level.to_string());
    }
    for (module, level) in modules {
        log_builder.filter_module(&module, level);
        log_levels.push(format!("{module}={level}"));
    }
    for module in LOG_ERROR_LEVEL_MOD {
        log_builder.filter_module(module, LevelFilter::Error);
    }
    log_builder.init();
    info!("Log Level {}", &log_levels.join(", "));
}

#[cfg(test)]
mod tests {
    use super::parse_log_levels;
    use log::LevelFilter;

    #[test]
    fn test_parse_log_levels() {
        let (default_level, modules) = parse_log_levels("debug, tulipgate::access=trace,hyper=warn");
        assert_eq!(default_level, Some(LevelFilter::Debug));
        assert_eq!(modules, vec![
            ("tulipgate::access".to_string(), LevelFilter::Trace),
            ("hyper".to_string(), LevelFilter::Warn),
        ]);

        let (default_level, modules) = parse_log_levels("unknown");
        assert_eq!(default_level, Some(LevelFilter::Info));
        assert!(modules.is_empty());
    }
}
