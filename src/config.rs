use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read config \"{}\"", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to parse {}, it is not valid unicode", API_KEY_ENV_VAR)]
    CredentialNotUnicode,
}

#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Keybindings {
    #[default]
    Emacs,
    Vi,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct OpenRouter {
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    pub editor: Option<PathBuf>,
    #[serde(default)]
    pub keybindings: Keybindings,
    #[serde(default)]
    pub openrouter: OpenRouter,
}

const USER_PATHS: [&str; 2] = [".config/orchat/config.toml", ".orchat.toml"];

const SYSTEM_PATH: &str = "/etc/orchat.toml";

fn get_config_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);

        for path in USER_PATHS {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from(SYSTEM_PATH);

    system_config.exists().then_some(system_config)
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a str>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        match (user_value, config.get(user_key)) {
            (toml::Value::Table(user_value), Some(toml::Value::Table(config_value))) => {
                extra_fields_helper(path, user_value, config_value, extra)
            }
            (_, Some(_)) => {}
            (_, None) => extra.push(path.join(".")),
        }

        path.pop();
    }
}

/// Returns the dotted paths of keys in `raw_config` that `config` does not use.
fn extra_fields(config: &Config, raw_config: &str) -> Result<Vec<String>, Error> {
    let user_config: toml::Table = toml::from_str(raw_config)?;

    // Unset options are not serialized, so only compare against known keys.
    let known: toml::Table = match toml::to_string(config) {
        Ok(reserialized) => toml::from_str(&reserialized)?,
        Err(err) => {
            tracing::debug!("could not reserialize config: {}", err);
            return Ok(Vec::new());
        }
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &known, &mut extra);

    Ok(extra)
}

/// Parses a configuration file, returning the configuration and any keys
/// that were ignored.
pub(crate) fn parse_config(raw_config: &str) -> Result<(Config, Vec<String>), Error> {
    let config: Config = toml::from_str(raw_config)?;

    let extra = extra_fields(&config, raw_config)?;

    Ok((config, extra))
}

fn load(path: &Path) -> Result<Config, Error> {
    let raw_config =
        std::fs::read_to_string(path).map_err(|err| Error::Read(path.to_path_buf(), err))?;

    let (config, extra) = parse_config(&raw_config)?;

    for key in extra {
        crate::warn!("config contains extraneous key \"{}\", ignoring", key);
    }

    Ok(config)
}

/// Reads the configuration at `config`, or the first one found in the default
/// locations. Without a configuration file the defaults are used.
pub(crate) fn read_config(config: Option<PathBuf>) -> Result<Config, Error> {
    match config.or_else(get_config_path) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "reading config");
            load(&path)
        }
        None => Ok(Config::default()),
    }
}

/// Loads `KEY=value` pairs from an environment file into the process
/// environment without overriding variables that are already set. Without a
/// path, `.env` is looked up from the working directory upwards.
pub(crate) fn load_env_file(path: Option<&Path>) {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => crate::warn!("failed to load the environment file: {}", err),
    }
}

fn credential_from(
    configured: Option<&str>,
    env: Result<String, VarError>,
) -> Result<Option<String>, Error> {
    if let Some(api_key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(Some(api_key.to_string()));
    }

    match env {
        Ok(api_key) if api_key.trim().is_empty() => Ok(None),
        Ok(api_key) => Ok(Some(api_key)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::CredentialNotUnicode),
    }
}

impl Config {
    /// The API key from the config, falling back to the environment.
    pub(crate) fn credential(&self) -> Result<Option<String>, Error> {
        credential_from(
            self.openrouter.api_key.as_deref(),
            std::env::var(API_KEY_ENV_VAR),
        )
    }
}
