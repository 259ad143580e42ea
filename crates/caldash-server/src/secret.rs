//! Secret reference resolver.
//!
//! Credential values in `config.toml` may point at a secret kept elsewhere:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and uses the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used verbatim

use std::process::Command;

/// Resolves a value that may carry a secret reference prefix.
pub fn resolve(value: &str) -> Result<String, String> {
    match value.split_once("::") {
        Some(("pass", path)) => from_pass(path),
        Some(("env", var)) => from_env(var),
        _ => Ok(value.to_string()),
    }
}

fn from_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {path}`: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {path}` failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {path}` produced no output"))
}

fn from_env(var: &str) -> Result<String, String> {
    std::env::var(var).map_err(|_| format!("environment variable `{var}` is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("plain").unwrap(), "plain");
        assert_eq!(resolve("").unwrap(), "");
        assert_eq!(
            resolve("123-abc.apps.googleusercontent.com").unwrap(),
            "123-abc.apps.googleusercontent.com"
        );
        // Only the known prefixes are special.
        assert_eq!(resolve("vault::x").unwrap(), "vault::x");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_CALDASH_TEST_SECRET", "s3cret");
        }
        assert_eq!(resolve("env::_CALDASH_TEST_SECRET").unwrap(), "s3cret");
        unsafe {
            std::env::remove_var("_CALDASH_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var() {
        let err = resolve("env::_CALDASH_SURELY_UNSET_VAR").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn failing_pass_lookup() {
        // Fails either because `pass` is absent or because the entry is.
        assert!(resolve("pass::caldash/does/not/exist/4242").is_err());
    }
}
