use config::Config;
use serde::Deserialize;

use crate::error::CoreResult;

/// Engine-wide settings loaded from `.env`/environment/`config.toml`.
///
/// Deliberately small: the engine has no database, auth, or server sections
/// of its own (those surfaces are out of scope), but the loading mechanism
/// itself is ambient infrastructure the engine keeps regardless.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub recurrence: RecurrenceDefaults,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthDayBehaviorDefault {
    Throw,
    Skip,
    Clamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurrenceDefaults {
    /// Policy applied when a creation request omits `MonthDayBehavior`.
    pub default_month_day_behavior: MonthDayBehaviorDefault,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl EngineSettings {
    /// ## Summary
    /// Loads configuration from `.env`/environment variables and an optional
    /// `config.toml`. Environment variables take precedence.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it
    /// fails.
    pub fn load() -> CoreResult<Self> {
        Ok(Config::builder()
            .set_default("recurrence.default_month_day_behavior", "throw")?
            .set_default("logging.level", "debug")?
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Self>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> CoreResult<EngineSettings> {
    dotenvy::dotenv().ok();

    EngineSettings::load()
}
