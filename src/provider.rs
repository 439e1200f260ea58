use crate::error::ConfigError;
use crate::field::FieldDescriptor;
use crate::setter::FieldSlot;

/// Error type providers may return from their one-time setup
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Non-fatal outcome of asking a provider for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provided {
    /// The provider set the field; the rest of the chain is not consulted
    Applied,
    /// The provider has no opinion on the field; try the next one
    NotApplicable,
}

/// A source of configuration values
///
/// Providers are consulted in chain order for every public leaf field until one of
/// them returns [`Provided::Applied`].
///
/// - `Ok(Provided::Applied)`: value found and stored
/// - `Ok(Provided::NotApplicable)`: nothing to say about this field (try next provider)
/// - `Err(e)`: value found but unusable (stop immediately, `e` is reported for the field)
pub trait Provider {
    /// Unique name within a chain, used for collision detection only
    fn name(&self) -> &str;

    /// One-time setup, called before any field is visited
    ///
    /// `fields` lists every public leaf of the target, depth first.
    fn init(&mut self, fields: &[FieldDescriptor]) -> Result<(), BoxError> {
        let _ = fields;
        Ok(())
    }

    /// Try to produce a value for `field` and store it through `slot`
    fn provide(
        &self,
        field: &FieldDescriptor,
        slot: &mut dyn FieldSlot,
    ) -> Result<Provided, ConfigError>;
}
