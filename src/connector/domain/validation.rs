//! Pure validation of raw connector configuration.

use super::{ConnectorConfig, TransportKind};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// A single problem found in a connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// `name` is blank.
    #[error("name is required")]
    EmptyName,
    /// `displayName` is blank.
    #[error("display name is required")]
    EmptyDisplayName,
    /// `description` is blank.
    #[error("description is required")]
    EmptyDescription,
    /// A URL-based transport has no URL.
    #[error("a URL is required for {0} transport")]
    MissingUrl(TransportKind),
    /// The URL is not absolute or has no host.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as entered.
        url: String,
        /// Parser or shape failure.
        reason: String,
    },
    /// A `stdio` connector has no launch command.
    #[error("a command is required for stdio transport")]
    MissingCommand,
    /// The environment text is not a JSON object of strings.
    #[error("environment must be a JSON object of string values: {0}")]
    InvalidEnvironment(String),
}

/// Rejection of a configuration, listing every violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Wraps a non-empty violation list.
    #[must_use]
    pub const fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the violations.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns whether `violation` was reported.
    #[must_use]
    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("invalid connector configuration")?;
        for (index, violation) in self.violations.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(formatter, "{separator}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Stateless checker for [`ConnectorConfig`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorValidator;

impl ConnectorValidator {
    /// Returns every violation in `config`; an empty list means valid.
    #[must_use]
    pub fn validate(config: &ConnectorConfig) -> Vec<Violation> {
        let mut violations = Vec::new();

        if config.name.trim().is_empty() {
            violations.push(Violation::EmptyName);
        }
        if config.display_name.trim().is_empty() {
            violations.push(Violation::EmptyDisplayName);
        }
        if config.description.trim().is_empty() {
            violations.push(Violation::EmptyDescription);
        }

        match config.transport {
            TransportKind::Sse | TransportKind::StreamableHttp => {
                if let Some(violation) = check_url(config.transport, &config.url) {
                    violations.push(violation);
                }
            }
            TransportKind::Stdio => {
                if config.command.trim().is_empty() {
                    violations.push(Violation::MissingCommand);
                }
            }
        }

        if let Err(reason) = parse_environment(config.environment.as_deref()) {
            violations.push(Violation::InvalidEnvironment(reason));
        }

        violations
    }

    /// Validates `config`, returning all violations as one error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when at least one violation is found.
    pub fn check(config: &ConnectorConfig) -> Result<(), ValidationError> {
        let violations = Self::validate(config);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

fn check_url(transport: TransportKind, raw: &str) -> Option<Violation> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Violation::MissingUrl(transport));
    }
    match Url::parse(trimmed) {
        Ok(parsed) if parsed.has_host() => None,
        Ok(_) => Some(Violation::InvalidUrl {
            url: raw.to_owned(),
            reason: "URL has no host".to_owned(),
        }),
        Err(err) => Some(Violation::InvalidUrl {
            url: raw.to_owned(),
            reason: err.to_string(),
        }),
    }
}

/// Parses raw environment text. Absent or blank text yields an empty map.
pub(crate) fn parse_environment(raw: Option<&str>) -> Result<BTreeMap<String, String>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(BTreeMap::new()),
        Some(text) => serde_json::from_str(text).map_err(|err| err.to_string()),
    }
}
