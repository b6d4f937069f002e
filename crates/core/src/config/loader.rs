use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables that override the config file.
const ENV_PREFIX: &str = "ENROLLMENT_";

/// Read the client's settings: registrar backend, academic term, billing
/// rounding and certificate rendering.
///
/// `ENROLLMENT_*` variables win over the file. Sections and keys are joined
/// by a double underscore, so `ENROLLMENT_BACKEND__URL` points the client at
/// another registrar and `ENROLLMENT_RENDER__SLICE_PAGES=true` tiles every
/// certificate. The CLI picks `path` from `--config`, `$ENROLL_CONFIG` or
/// `enrollment.toml`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_env(path, ENV_PREFIX)
}

fn load_config_with_env(path: &Path, prefix: &str) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(prefix).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse settings from TOML text alone. No environment overrides apply.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
