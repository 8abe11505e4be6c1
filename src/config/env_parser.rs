//! Environment variable parsing utilities for configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::Error;

use super::paths;

fn non_empty<'v>(name: &str, value: &'v str) -> Result<&'v str, Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(value)
}

/// Parse a string value, rejecting empty or whitespace-only input.
pub fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    Ok(non_empty(name, value)?.to_string())
}

/// Parse a path value, expanding tilde.
pub fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    let value = non_empty(name, value)?;
    Ok(paths::expand_tilde_path(&PathBuf::from(value)))
}

/// Parse any `FromStr` value (numbers). Range checks happen in validation.
pub fn parse_env_value<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(name, value)?
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

/// Parse a boolean: `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match non_empty(name, value)?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: {other} (expected true or false)"
        ))),
    }
}

/// Replace `target` with the parsed value of `name` when it is set.
pub fn apply_override<T>(
    name: &str,
    target: &mut T,
    parse: fn(&str, &str) -> Result<T, Error>,
) -> Result<(), Error> {
    if let Ok(val) = std::env::var(name) {
        *target = parse(name, &val)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_string_empty() {
        assert!(matches!(parse_env_string("TEST_VAR", ""), Err(Error::Config(_))));
        assert!(matches!(parse_env_string("TEST_VAR", "   "), Err(Error::Config(_))));
        assert_eq!(parse_env_string("TEST_VAR", "valid").unwrap(), "valid");
    }

    #[test]
    fn test_parse_env_value() {
        assert_eq!(parse_env_value::<f64>("T", " 0.5 ").unwrap(), 0.5);
        assert_eq!(parse_env_value::<usize>("T", "8").unwrap(), 8);
        assert!(matches!(parse_env_value::<usize>("T", "-1"), Err(Error::Config(_))));
        assert!(matches!(parse_env_value::<f64>("T", "high"), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("T", "TRUE").unwrap());
        assert!(parse_env_bool("T", "1").unwrap());
        assert!(!parse_env_bool("T", "off").unwrap());
        let err = parse_env_bool("T", "maybe").unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_parse_env_path_rejects_empty() {
        assert!(matches!(parse_env_path("T", " "), Err(Error::Config(_))));
        assert_eq!(
            parse_env_path("T", "/tmp/cards.db").unwrap(),
            PathBuf::from("/tmp/cards.db")
        );
    }
}
