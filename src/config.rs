use std::{env, ffi::CStr};

use thiserror::Error;

/// Exit status used when an arena cannot be mapped under
/// [`OsFailurePolicy::Abort`].
pub const FATAL_EXIT_CODE: i32 = 255;

pub const ENV_ON_OS_FAILURE: &str = "MAPALLOC_ON_OS_FAILURE";
pub const ENV_DIAGNOSTICS: &str = "MAPALLOC_DIAGNOSTICS";

const ENV_ON_OS_FAILURE_C: &CStr = c"MAPALLOC_ON_OS_FAILURE";
const ENV_DIAGNOSTICS_C: &CStr = c"MAPALLOC_DIAGNOSTICS";

/// What a heap does when the OS refuses to map an arena.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OsFailurePolicy {
  /// Log the failure and terminate the process with [`FATAL_EXIT_CODE`].
  #[default]
  Abort,
  /// Log the failure and hand a null pointer back to the caller.
  ReturnNull,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value {value:?} for {key}")]
  InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  pub on_os_failure: OsFailurePolicy,
  /// Emit `tracing` events for heap activity. Arena failures are logged
  /// either way.
  pub diagnostics: bool,
}

impl HeapConfig {
  pub const DEFAULT: Self = Self {
    on_os_failure: OsFailurePolicy::Abort,
    diagnostics: true,
  };

  pub fn on_os_failure(
    mut self,
    policy: OsFailurePolicy,
  ) -> Self {
    self.on_os_failure = policy;
    self
  }

  pub fn diagnostics(
    mut self,
    enabled: bool,
  ) -> Self {
    self.diagnostics = enabled;
    self
  }

  /// Builds a config from `MAPALLOC_*` environment variables, falling back to
  /// [`HeapConfig::DEFAULT`] for unset ones.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Reads the same variables as [`HeapConfig::from_env`] through
  /// `libc::getenv`, without allocating. Unset or unreadable values keep
  /// their default.
  ///
  /// # Safety
  ///
  /// Calls `libc::getenv`: no other thread may modify the environment
  /// while this runs.
  pub unsafe fn from_env_raw() -> Self {
    let mut config = Self::DEFAULT;

    if let Some(policy) = unsafe { getenv_with(ENV_ON_OS_FAILURE_C, parse_policy) } {
      config.on_os_failure = policy;
    }
    if let Some(enabled) = unsafe { getenv_with(ENV_DIAGNOSTICS_C, parse_switch) } {
      config.diagnostics = enabled;
    }

    config
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let mut config = Self::DEFAULT;

    if let Some(value) = lookup(ENV_ON_OS_FAILURE) {
      config.on_os_failure = parse_policy(&value).ok_or(ConfigError::InvalidValue {
        key: ENV_ON_OS_FAILURE,
        value,
      })?;
    }

    if let Some(value) = lookup(ENV_DIAGNOSTICS) {
      config.diagnostics = parse_switch(&value).ok_or(ConfigError::InvalidValue {
        key: ENV_DIAGNOSTICS,
        value,
      })?;
    }

    Ok(config)
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

fn matches_any(
  value: &str,
  names: &[&str],
) -> bool {
  let value = value.trim();
  names.iter().any(|name| value.eq_ignore_ascii_case(name))
}

fn parse_policy(value: &str) -> Option<OsFailurePolicy> {
  if matches_any(value, &["abort", "exit"]) {
    Some(OsFailurePolicy::Abort)
  } else if matches_any(value, &["null", "return-null"]) {
    Some(OsFailurePolicy::ReturnNull)
  } else {
    None
  }
}

fn parse_switch(value: &str) -> Option<bool> {
  if matches_any(value, &["1", "true", "on", "yes"]) {
    Some(true)
  } else if matches_any(value, &["0", "false", "off", "no"]) {
    Some(false)
  } else {
    None
  }
}

/// # Safety
///
/// Same contract as [`HeapConfig::from_env_raw`].
unsafe fn getenv_with<T>(
  key: &CStr,
  parse: fn(&str) -> Option<T>,
) -> Option<T> {
  let value = unsafe { libc::getenv(key.as_ptr()) };
  if value.is_null() {
    return None;
  }

  unsafe { CStr::from_ptr(value) }.to_str().ok().and_then(parse)
}
