use crate::error::ConfigError;
use crate::field::FieldDescriptor;
use crate::provider::{BoxError, Provided, Provider};
use crate::setter::{FieldSlot, set_field};
use std::env::{self, VarError};
use std::path::PathBuf;

pub const ENV_PROVIDER_NAME: &str = "EnvProvider";

/// Sets fields from the environment variable named by their `env` tag
///
/// An unset variable means the provider has nothing to say. A variable that is set, even
/// to the empty string, is converted and any conversion failure is final.
#[derive(Debug, Clone, Default)]
pub struct EnvProvider {
    prefix: Option<String>,
    dotenv: Option<PathBuf>,
}

impl EnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every variable name, so `env = "PORT"` reads `{prefix}PORT`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Load a dotenv file into the process environment during `init`
    ///
    /// A missing file is ignored; a malformed one fails the whole pass.
    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    fn variable_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &str {
        ENV_PROVIDER_NAME
    }

    fn init(&mut self, _fields: &[FieldDescriptor]) -> Result<(), BoxError> {
        if let Some(path) = &self.dotenv {
            match dotenvy::from_filename(path) {
                Ok(_) => {}
                Err(err) if err.not_found() => {}
                Err(err) => return Err(Box::new(err)),
            }
        }
        Ok(())
    }

    fn provide(
        &self,
        field: &FieldDescriptor,
        slot: &mut dyn FieldSlot,
    ) -> Result<Provided, ConfigError> {
        let Some(key) = field.tag("env").filter(|key| !key.is_empty()) else {
            return Ok(Provided::NotApplicable);
        };

        match env::var(self.variable_name(key)) {
            Ok(value) => {
                set_field(field, slot, &value)?;
                Ok(Provided::Applied)
            }
            Err(VarError::NotPresent) => Ok(Provided::NotApplicable),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::Rejected {
                provider: ENV_PROVIDER_NAME.to_string(),
                field: field.name.to_string(),
                reason: format!("{} is not valid unicode", self.variable_name(key)),
            }),
        }
    }
}
