use std::env;
use std::path::Path;

use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_logging;
pub use settings::{DatabaseSettings, LoggingSettings, Settings};

/// Config file read when no explicit path is given. It is optional.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `RIDESHARE__DATABASE__POOL_SIZE=5`.
pub const ENV_PREFIX: &str = "RIDESHARE";

/// Loads the application configuration from `config.toml`, the environment and `.env`.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads the application configuration using `path` as the (optional) config file.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults,
/// 2. the TOML file at `path`, if it exists,
/// 3. `RIDESHARE__SECTION__KEY` environment variables,
/// 4. `DATABASE_URL` (process environment or `.env`).
///
/// A configuration without a database URL is rejected.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    // A missing .env file is fine; the variables may come from the real environment.
    dotenvy::dotenv().ok();
    build_settings(path, environment(None), env::var("DATABASE_URL").ok())
}

/// The `RIDESHARE__SECTION__KEY` layer. List-valued keys take comma-separated
/// values. `vars` stands in for the process environment when given.
fn environment(vars: Option<config::Map<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("database.ssl_required_hosts")
        .source(vars)
}

fn build_settings(
    path: &Path,
    environment: config::Environment,
    database_url: Option<String>,
) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(environment)
        .set_override_option("database.url", database_url)?
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.database.validate()?;

    Ok(settings)
}
