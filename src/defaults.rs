use crate::error::ConfigError;
use crate::field::FieldDescriptor;
use crate::provider::{Provided, Provider};
use crate::setter::{FieldSlot, set_field};

pub const DEFAULT_PROVIDER_NAME: &str = "DefaultProvider";

/// Sets fields from their `default` tag
///
/// A missing or empty tag means the provider has nothing to say about the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProvider;

impl DefaultProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Provider for DefaultProvider {
    fn name(&self) -> &str {
        DEFAULT_PROVIDER_NAME
    }

    fn provide(
        &self,
        field: &FieldDescriptor,
        slot: &mut dyn FieldSlot,
    ) -> Result<Provided, ConfigError> {
        match field.tag("default") {
            Some(value) if !value.is_empty() => {
                set_field(field, slot, value)?;
                Ok(Provided::Applied)
            }
            _ => Ok(Provided::NotApplicable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setter::Kind;

    fn port(tags: &'static [(&'static str, &'static str)]) -> FieldDescriptor {
        FieldDescriptor {
            name: "Port",
            type_name: "u16",
            kind: Kind::Uint,
            tags,
        }
    }

    #[test]
    fn test_applies_default_tag() {
        let mut value: u16 = 0;
        let outcome = DefaultProvider::new()
            .provide(&port(&[("default", "8080")]), &mut value)
            .unwrap();

        assert_eq!(outcome, Provided::Applied);
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_missing_tag_is_not_applicable() {
        let mut value: u16 = 0;
        let outcome = DefaultProvider::new()
            .provide(&port(&[("env", "PORT")]), &mut value)
            .unwrap();

        assert_eq!(outcome, Provided::NotApplicable);
        assert_eq!(value, 0);
    }

    #[test]
    fn test_empty_tag_is_not_applicable() {
        let mut value: u16 = 0;
        let outcome = DefaultProvider::new()
            .provide(&port(&[("default", "")]), &mut value)
            .unwrap();

        assert_eq!(outcome, Provided::NotApplicable);
    }

    #[test]
    fn test_malformed_default_is_a_hard_failure() {
        let mut value: u16 = 0;
        let result = DefaultProvider::new().provide(&port(&[("default", "notanumber")]), &mut value);

        assert!(matches!(
            result,
            Err(ConfigError::Conversion { ref value, .. }) if value == "notanumber"
        ));
    }

    #[test]
    fn test_name() {
        assert_eq!(DefaultProvider::new().name(), "DefaultProvider");
    }
}
