//! Environment variable and home directory expansion for config strings.

use std::borrow::Cow;
use std::env::VarError;

use crate::ConfigError;

/// Expand `$VAR`, `${VAR}`, `${VAR:-default}` and a leading `~` in `value`.
///
/// Unset variables without a default are left verbatim.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with(value, field, |name| std::env::var(name), home_dir)
}

fn home_dir() -> Option<String> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
}

fn expand_with<L, H>(value: &str, field: &str, lookup: L, home: H) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Result<String, VarError>,
    H: FnOnce() -> Option<String>,
{
    shellexpand::full_with_context(value, home, |name| match lookup(name) {
        Ok(found) => Ok(Some(found)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err),
    })
    .map(Cow::into_owned)
    .map_err(|err| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}}: {}", err.var_name, err.cause),
    })
}
