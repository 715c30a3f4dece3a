use std::sync::OnceLock;

pub const PRESETS_FOLDER: &str = "Presets";
pub const INDEX_FILE: &str = "Presets.db";
pub const INDEX_TABLE: &str = "pXcPresets";
pub const PRESET_EXTENSION: &str = ".at5p";
pub const LEGACY_PRESET_EXTENSION: &str = ".at4p";
pub const SHADOW_PREFIX: &str = "_";
pub const IMPORT_FOLDER: &str = "Import";

pub const LOG_ENV: &str = "AMPT_LOG";
pub const PERF_LOG_ENV: &str = "AMPT_PERF_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

static PERF_LOG_ENABLED: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Settings {
    pub log_filter: String,
    pub perf_log: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        let log_filter = std::env::var(LOG_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            log_filter,
            perf_log: perf_log_enabled(),
        }
    }
}

pub fn env_truthy(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

pub fn perf_log_enabled() -> bool {
    *PERF_LOG_ENABLED.get_or_init(|| env_truthy(PERF_LOG_ENV))
}

pub fn perf_log(message: impl AsRef<str>) {
    if perf_log_enabled() {
        log::info!(target: "perf", "{}", message.as_ref());
    }
}
