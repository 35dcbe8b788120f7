//! Package naming rules and multi-convention identifiers.

use tracing::info;

use super::DomainError;

/// Ensure `name` carries the mandatory `@{scope}/` package prefix.
///
/// Bare names get the prefix added (and an info event so the rename is
/// visible in logs). Names already under the scope pass through untouched.
/// A name scoped to some other organization is rejected.
pub fn normalize_name(name: &str, scope: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidProjectName {
            name: name.into(),
            reason: "name cannot be empty".into(),
        });
    }

    let prefix = format!("@{scope}/");
    if let Some(rest) = name.strip_prefix(&prefix) {
        if rest.is_empty() {
            return Err(DomainError::InvalidProjectName {
                name: name.into(),
                reason: "nothing follows the scope prefix".into(),
            });
        }
        return Ok(name.to_string());
    }

    if name.starts_with('@') {
        return Err(DomainError::InvalidProjectName {
            name: name.into(),
            reason: format!("packages must be published under {prefix}"),
        });
    }

    let normalized = format!("{prefix}{name}");
    info!("Adding mandatory prefix {prefix} to name. New name: {normalized}");
    Ok(normalized)
}

/// Strip the leading range operator from each `pkg@^x.y.z` spec.
///
/// Only the first `^` or `~` is removed, so `pkg@^1.0.0` becomes
/// `pkg@1.0.0` while specs without a range are returned as-is.
pub fn pinned_deps<S: AsRef<str>>(deps: &[S]) -> Vec<String> {
    deps.iter()
        .map(|dep| dep.as_ref().replacen(['^', '~'], "", 1))
        .collect()
}

/// An identifier kept as lowercase parts and rendered in any convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namer {
    parts: Vec<String>,
}

impl Namer {
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Self {
        Self {
            parts: parts
                .iter()
                .flat_map(|p| split_words(p.as_ref()))
                .collect(),
        }
    }

    /// Split a free-form name (`my-cool widget`, `myCoolWidget`) into parts.
    pub fn parse(name: &str) -> Self {
        Self {
            parts: split_words(name),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// `usQa`
    pub fn camel(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i == 0 {
                out.push_str(part);
            } else {
                out.push_str(&capitalize(part));
            }
        }
        out
    }

    /// `UsQa`
    pub fn pascal(&self) -> String {
        self.parts.iter().map(|p| capitalize(p)).collect()
    }

    /// `us-qa`
    pub fn kebab(&self) -> String {
        self.parts.join("-")
    }

    /// `us_qa`
    pub fn snake(&self) -> String {
        self.parts.join("_")
    }

    /// `usqa`
    pub fn joined(&self) -> String {
        self.parts.concat()
    }
}

/// Uppercase the first character, leaving the rest as-is.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::new();
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

/// Split a string into lowercase words.
///
/// Separators (`_`, `-`, whitespace) always split. A lower-to-upper case
/// transition splits (`myApp`), as does the end of an acronym followed by a
/// capitalised word (`HTTPServer`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(&next) = chars.peek() {
            let closes_camel = c.is_lowercase() && next.is_uppercase();
            let closes_acronym = c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase());
            if closes_camel || closes_acronym {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_gets_scope_prefix() {
        assert_eq!(
            normalize_name("missing-prefix", "time-loop").unwrap(),
            "@time-loop/missing-prefix"
        );
    }

    #[test]
    fn owner_scope_is_honoured() {
        assert_eq!(
            normalize_name("missing-prefix", "fizzle").unwrap(),
            "@fizzle/missing-prefix"
        );
    }

    #[test]
    fn prefixed_name_passes_through() {
        assert_eq!(
            normalize_name("@time-loop/has-prefix", "time-loop").unwrap(),
            "@time-loop/has-prefix"
        );
    }

    #[test]
    fn foreign_scope_is_rejected() {
        assert!(matches!(
            normalize_name("@other/pkg", "time-loop"),
            Err(DomainError::InvalidProjectName { .. })
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(normalize_name("  ", "time-loop").is_err());
        assert!(normalize_name("@time-loop/", "time-loop").is_err());
    }

    #[test]
    fn pinned_deps_handles_empty_and_unranged_lists() {
        let empty: [&str; 0] = [];
        assert!(pinned_deps(&empty).is_empty());
        assert_eq!(
            pinned_deps(&["some-fake-pkg@2.9.8", "other"]),
            vec!["some-fake-pkg@2.9.8", "other"]
        );
    }

    #[test]
    fn pinned_deps_strips_first_range_operator() {
        assert_eq!(
            pinned_deps(&["some-fake-pkg@^2.9.8", "tilde@~1.0.0"]),
            vec!["some-fake-pkg@2.9.8", "tilde@1.0.0"]
        );
    }

    #[test]
    fn namer_renders_every_convention() {
        let namer = Namer::new(&["global", "staging"]);
        assert_eq!(namer.camel(), "globalStaging");
        assert_eq!(namer.pascal(), "GlobalStaging");
        assert_eq!(namer.kebab(), "global-staging");
        assert_eq!(namer.snake(), "global_staging");
        assert_eq!(namer.joined(), "globalstaging");
    }

    #[test]
    fn namer_parses_mixed_input() {
        assert_eq!(Namer::parse("myCool widget").kebab(), "my-cool-widget");
        assert_eq!(Namer::parse("HTTPServer").snake(), "http_server");
    }
}
