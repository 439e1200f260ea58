// Lets the derive's `::config_chain::` paths resolve inside this crate's own tests
extern crate self as config_chain;

pub mod configurator;
pub mod defaults;
pub mod docs;
mod engine;
pub mod env;
pub mod error;
pub mod field;
pub mod flags;
pub mod provider;
pub mod setter;

// Re-export main types
pub use configurator::{Configurator, from_env_and_default};
pub use defaults::DefaultProvider;
pub use env::EnvProvider;
pub use error::{ConfigError, format_config_errors};
pub use field::{Field, FieldDescriptor, NestedSlot};
pub use flags::{FlagError, FlagProvider};
pub use provider::{BoxError, Provided, Provider};
pub use setter::{FieldSlot, FieldType, Kind, set_field};

// Re-export macro
pub use config_chain_macros::Configurable;

/// A struct whose fields can be populated by a provider chain
///
/// Usually derived: `#[derive(Configurable)]` with `#[config(key = value)]` tags on
/// fields and `#[config(nested)]` on struct-typed fields (`T` or `Option<T>`).
pub trait Configurable {
    /// Every field in declaration order
    fn fields(&mut self) -> Vec<Field<'_>>;

    /// Append the descriptor of every public leaf, nested structs expanded depth first
    fn describe(out: &mut Vec<FieldDescriptor>)
    where
        Self: Sized;
}
