use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Substitute `${VAR}` and `${VAR:-fallback}` in raw configuration text
///
/// Runs before TOML parsing so configuration structs hold plain values.
/// Comment lines are copied verbatim, so a commented-out placeholder never
/// requires its variable to exist.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut expanded = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                Ok(line.to_owned())
            } else {
                expand_line(line)
            }
        })
        .collect::<Result<Vec<_>, _>>()?
        .join("\n");

    if input.ends_with('\n') {
        expanded.push('\n');
    }

    Ok(expanded)
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Group 1: variable name, group 2: optional fallback after `:-`
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("placeholder regex is valid"))
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut missing = None;

    let replaced = placeholder().replace_all(line, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (std::env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(fallback)) => fallback.as_str().to_owned(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_owned());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(format!("environment variable not set: `{name}`")),
        None => Ok(replaced.into_owned()),
    }
}
