use {
    regex::{Captures, Regex},
    tracing::warn,
};

use crate::error::Result;

/// `${NAME}` where NAME is a shell-style variable name.
const PLACEHOLDER: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Expand `${VAR}` placeholders in raw config text from the process
/// environment. Unset variables stay as written.
pub fn substitute_env(input: &str) -> Result<String> {
    expand(input, |name| std::env::var(name).ok())
}

fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let placeholder = Regex::new(PLACEHOLDER)?;
    let expanded = placeholder.replace_all(input, |caps: &Captures<'_>| {
        let var = &caps[1];
        lookup(var).unwrap_or_else(|| {
            warn!(var, "config references an unset environment variable");
            caps[0].to_string()
        })
    });
    Ok(expanded.into_owned())
}
