use colored::Colorize;
use std::fmt;

/// Errors that can occur while populating a configuration struct
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The provider chain is empty
    NoProviders,
    /// Two providers in the chain report the same name
    ProviderNameCollision { name: String },
    /// A provider's one-time setup failed
    ProviderInit { provider: String, reason: String },
    /// No provider in the chain could set the field
    Unresolved { field: String, tags: String },
    /// A provider found a value that doesn't convert to the field's type
    Conversion {
        field: String,
        value: String,
        kind: String,
        reason: String,
    },
    /// The field's type cannot be set from text at all
    UnsupportedKind { field: String, kind: String },
    /// A provider has a value for the field but refuses to apply it
    Rejected {
        provider: String,
        field: String,
        reason: String,
    },
}

impl ConfigError {
    /// Errors raised before any field is touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ConfigError::NoProviders
                | ConfigError::ProviderNameCollision { .. }
                | ConfigError::ProviderInit { .. }
        )
    }

    /// Name of the field this error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Unresolved { field, .. }
            | ConfigError::Conversion { field, .. }
            | ConfigError::UnsupportedKind { field, .. }
            | ConfigError::Rejected { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoProviders => {
                writeln!(f, "{}", "No value providers were registered".red())
            }
            ConfigError::ProviderNameCollision { name } => {
                writeln!(
                    f,
                    "{}: Provider name is registered more than once",
                    name.magenta().bold()
                )
            }
            ConfigError::ProviderInit { provider, reason } => {
                writeln!(f, "{}: Cannot init provider", provider.magenta().bold())?;
                writeln!(f, "\tReason: {}", reason)
            }
            ConfigError::Unresolved { field, tags } => {
                writeln!(
                    f,
                    "{}: Cannot be set by any provider",
                    field.magenta().bold()
                )?;
                writeln!(f, "\tTags: {}", tags.cyan())
            }
            ConfigError::Conversion {
                field,
                value,
                kind,
                reason,
            } => {
                writeln!(
                    f,
                    "{}: Invalid value {}",
                    field.magenta().bold(),
                    format!("'{}'", value).red(),
                )?;
                writeln!(f, "\tExpected: {}", kind.cyan())?;
                writeln!(f, "\tReason: {}", reason)
            }
            ConfigError::UnsupportedKind { field, kind } => {
                writeln!(
                    f,
                    "{}: Unsupported field kind {}",
                    field.magenta().bold(),
                    kind.red()
                )
            }
            ConfigError::Rejected {
                provider,
                field,
                reason,
            } => {
                writeln!(
                    f,
                    "{}: Rejected by {}",
                    field.magenta().bold(),
                    provider.cyan()
                )?;
                writeln!(f, "\tReason: {}", reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Helper to format multiple configuration errors into a single report
pub fn format_config_errors(errors: &[ConfigError]) -> String {
    let error_summary = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Configuration failed with {} error(s):\n{}",
        errors.len().to_string().yellow().bold(),
        error_summary
    )
}
