use crate::config::schema::{Profile, ValidationError};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a profile TOML that replaces the built-in one.
pub const PROFILE_ENV: &str = "RUSTBUFFER_PATCHER_PROFILE";

const BUILTIN_PROFILE: &str = include_str!("rustpushgo.toml");

/// Where a profile's TOML text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Embedded in the binary
    Builtin,
    /// Read from a file, typically named by `RUSTBUFFER_PATCHER_PROFILE`
    File(PathBuf),
    /// Handed to [`load_from_str`] directly
    Inline,
}

impl fmt::Display for ProfileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileOrigin::Builtin => f.write_str("built-in profile"),
            ProfileOrigin::File(path) => write!(f, "profile {}", path.display()),
            ProfileOrigin::Inline => f.write_str("inline profile"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read profile {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} is not a valid profile document: {source}")]
    Malformed {
        origin: ProfileOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("{origin} was rejected:\n{source}")]
    Rejected {
        origin: ProfileOrigin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Origin of the profile that failed, when it got as far as parsing.
    pub fn origin(&self) -> Option<&ProfileOrigin> {
        match self {
            ConfigError::Unreadable { .. } => None,
            ConfigError::Malformed { origin, .. } | ConfigError::Rejected { origin, .. } => {
                Some(origin)
            }
        }
    }
}

fn parse(input: &str, origin: ProfileOrigin) -> Result<Profile, ConfigError> {
    let profile: Profile = match toml_edit::de::from_str(input) {
        Ok(profile) => profile,
        Err(source) => return Err(ConfigError::Malformed { origin, source }),
    };
    match profile.validate() {
        Ok(()) => Ok(profile),
        Err(source) => Err(ConfigError::Rejected { origin, source }),
    }
}

pub fn load_from_str(input: &str) -> Result<Profile, ConfigError> {
    parse(input, ProfileOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Profile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, ProfileOrigin::File(path.to_path_buf()))
}

/// The profile for the `rustpushgo` bindings, embedded at build time.
pub fn load_builtin() -> Result<Profile, ConfigError> {
    parse(BUILTIN_PROFILE, ProfileOrigin::Builtin)
}

/// Resolve the active profile.
///
/// Priority order:
/// 1. File named by `RUSTBUFFER_PATCHER_PROFILE`
/// 2. Built-in `rustpushgo` profile
pub fn resolve_profile() -> Result<Profile, ConfigError> {
    match env::var_os(PROFILE_ENV) {
        Some(path) if !path.is_empty() => load_from_path(PathBuf::from(path)),
        _ => load_builtin(),
    }
}
