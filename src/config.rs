//! Purpose: Resolve REST URL and credentials from flags, environment, `.env` and defaults.
//! Exports: `Config`, `ConfigOverrides`, env var names and defaults.
//! Role: Optional convenience for the CLI and callers; the client itself takes explicit values.
//! Invariants: Precedence per field is explicit > environment > `.env` file > default.
//! Invariants: Reading the `.env` file never mutates the process environment.
#![allow(clippy::result_large_err)]

use crate::api::Credentials;
use crate::core::error::{Error, ErrorKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const REST_URL_VAR: &str = "ISLANDORA_REST";
pub const USER_VAR: &str = "ISLANDORA_USER";
pub const TOKEN_VAR: &str = "ISLANDORA_TOKEN";

pub const DEFAULT_REST_URL: &str = "http://localhost:8000/islandora/rest/";
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_TOKEN: &str = "password";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub rest_url: String,
    pub user: Option<String>,
    pub token: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    pub rest_url: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    /// Defaults to `.env` in the working directory.
    pub env_file: Option<PathBuf>,
}

impl Config {
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, Error> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_file = overrides
            .env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(".env"));
        let file_vars = read_env_file(&env_file)?;
        let pick = |explicit: Option<String>, name: &str, default: &str| {
            explicit
                .or_else(|| env(name))
                .or_else(|| file_vars.get(name).cloned())
                .unwrap_or_else(|| default.to_string())
        };

        let config = Config {
            rest_url: pick(overrides.rest_url, REST_URL_VAR, DEFAULT_REST_URL),
            user: non_empty(pick(overrides.user, USER_VAR, DEFAULT_USER)),
            token: non_empty(pick(overrides.token, TOKEN_VAR, DEFAULT_TOKEN)),
        };
        tracing::debug!(rest_url = %config.rest_url, user = ?config.user, "resolved configuration");
        Ok(config)
    }

    /// Basic credentials, only when both user and token are set.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => Some(Credentials::new(user.clone(), token.clone())),
            _ => None,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, Error> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HashMap::new());
        }
        Err(err) => return Err(env_file_error(path, err)),
    };
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|err| env_file_error(path, err))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("failed to read env file {}", path.display()))
        .with_source(err)
}
