use cadence_core::timezone::validate_timezone;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Runtime settings, read from `cadence.toml` (or the file named by
/// `CADENCE_CONFIG`) and overridden by `CADENCE_`-prefixed variables.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    /// IANA timezone whose calendar days the series follow
    pub timezone: String,
    /// Run a catch-up pass before every command
    pub catch_up_on_start: bool,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub default_preview_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "cadence.db".to_string(),
            timezone: detect_system_timezone(),
            catch_up_on_start: true,
            log_level: "warn".to_string(),
            default_preview_count: 5,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(Env::var_or("CADENCE_CONFIG", "cadence.toml")))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if validate_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}

/// Gets a list of common/popular timezones for user selection
pub fn get_common_timezones() -> Vec<&'static str> {
    vec![
        "UTC",
        "America/New_York",
        "America/Chicago",
        "America/Denver",
        "America/Los_Angeles",
        "America/Sao_Paulo",
        "Europe/London",
        "Europe/Paris",
        "Europe/Berlin",
        "Europe/Madrid",
        "Asia/Tokyo",
        "Asia/Shanghai",
        "Asia/Kolkata",
        "Australia/Sydney",
        "Pacific/Auckland",
    ]
}

/// Suggests similar timezone names when validation fails
pub fn suggest_timezone(invalid_tz: &str) -> Vec<String> {
    let common = get_common_timezones();
    let lower_invalid = invalid_tz.to_lowercase();

    let mut suggestions: Vec<String> = common
        .iter()
        .filter(|tz| {
            let lower_tz = tz.to_lowercase();
            let city = lower_tz.rsplit('/').next().unwrap_or(&lower_tz);
            lower_tz.contains(&lower_invalid) || lower_invalid.contains(city)
        })
        .map(|tz| tz.to_string())
        .collect();

    if suggestions.is_empty() {
        suggestions.extend(common.iter().take(5).map(|s| s.to_string()));
    }

    suggestions
}
