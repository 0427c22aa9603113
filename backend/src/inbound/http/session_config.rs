//! Session cookie configuration read from the environment.
//!
//! The driver id lives in a private cookie written by the account subsystem,
//! so this service must derive the same key from `SESSION_KEY_FILE`.

use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use mockable::Env;
use tracing::warn;

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
/// `Key::derive_from` needs at least this many bytes of key material.
const SESSION_KEY_MIN_LEN: usize = 32;
const COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Cookie settings shared with the account subsystem.
pub struct SessionSettings {
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("invalid value for {name}='{value}'; expected 1|0|true|false|yes|no")]
    InvalidFlag { name: &'static str, value: String },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= 32 bytes, got {length}")]
    KeyTooShort { path: PathBuf, length: usize },
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn flag_from_env<E: Env>(
    env: &E,
    name: &'static str,
    default: bool,
) -> Result<bool, SessionConfigError> {
    match env.string(name) {
        Some(value) => parse_flag(&value).ok_or(SessionConfigError::InvalidFlag { name, value }),
        None => Ok(default),
    }
}

/// Build session settings from environment variables.
///
/// A missing key file falls back to an ephemeral key in debug builds or when
/// `SESSION_ALLOW_EPHEMERAL` is set; cookies written by other processes then
/// no longer decrypt.
///
/// # Examples
///
/// ```rust
/// use carpark_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
/// use mockable::MockEnv;
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(|name| match name {
///     "SESSION_KEY_FILE" => Some("/nonexistent/session_key".to_owned()),
///     "SESSION_ALLOW_EPHEMERAL" => Some("1".to_owned()),
///     _ => None,
/// });
///
/// let settings = session_settings_from_env(&env, BuildMode::Release).expect("settings");
/// assert!(settings.cookie_secure);
/// ```
pub fn session_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let cookie_secure = flag_from_env(env, COOKIE_SECURE_ENV, true)?;
    let allow_ephemeral = flag_from_env(env, ALLOW_EPHEMERAL_ENV, false)?;
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SESSION_KEY_DEFAULT_PATH.to_owned()),
    );

    let key = match std::fs::read(&path) {
        Ok(bytes) if bytes.len() < SESSION_KEY_MIN_LEN => {
            return Err(SessionConfigError::KeyTooShort {
                path,
                length: bytes.len(),
            });
        }
        Ok(bytes) => Key::derive_from(&bytes),
        Err(error) if mode == BuildMode::Debug || allow_ephemeral => {
            warn!(path = %path.display(), %error, "using temporary session key");
            Key::generate()
        }
        Err(source) => return Err(SessionConfigError::KeyRead { path, source }),
    };

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site: SameSite::Lax,
    })
}
