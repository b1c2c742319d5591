const SCHEDULER_CONFIG: &str = "SCHEDULER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "scheduler.json";

pub fn get_default_config_path() -> &'static str {
    DEFAULT_CONFIG_PATH
}

pub fn get_config_path() -> String {
    let path_from_env = std::env::var(SCHEDULER_CONFIG);
    path_from_env.unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

const SCHEDULER_CYCLE_MS: &str = "SCHEDULER_CYCLE_MS";

/// Cycle interval override, if set and valid
pub fn get_cycle_interval_ms() -> Option<u64> {
    let cycle_from_env = std::env::var(SCHEDULER_CYCLE_MS);
    cycle_from_env
        .ok()
        .and_then(|res| res.parse().ok())
        .filter(|ms| *ms > 0)
}
