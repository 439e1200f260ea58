use crate::Configurable;
use crate::setter::{FieldSlot, Kind};
use std::fmt;

/// Identity of one public leaf field: its name, declared type and tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDescriptor {
    /// Field name as declared on the struct
    pub name: &'static str,
    /// Declared type, as written in the source
    pub type_name: &'static str,
    /// Conversion kind of the declared type
    pub kind: Kind,
    /// `#[config(key = value)]` pairs, sorted by key
    pub tags: &'static [(&'static str, &'static str)],
}

impl FieldDescriptor {
    /// Look up the value of a tag
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tag(key).is_some()
    }

    /// Render the tag set as `key = "value", ...`
    pub fn tags_display(&self) -> String {
        if self.tags.is_empty() {
            return "none".to_string();
        }

        self.tags
            .iter()
            .map(|(key, value)| format!("{} = {:?}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.name, self.type_name, self.tags_display())
    }
}

/// One field of a configuration struct, as seen by a resolution pass
pub enum Field<'a> {
    /// A public field that providers may set
    Leaf {
        descriptor: FieldDescriptor,
        slot: &'a mut dyn FieldSlot,
    },
    /// An embedded struct, always present
    Nested {
        name: &'static str,
        target: &'a mut dyn Configurable,
    },
    /// A struct that only exists once it has been allocated
    OptionalNested {
        name: &'static str,
        slot: &'a mut dyn NestedSlot,
    },
    /// A field outside the public surface, never handed to providers
    Private { name: &'static str },
}

impl Field<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Leaf { descriptor, .. } => descriptor.name,
            Field::Nested { name, .. }
            | Field::OptionalNested { name, .. }
            | Field::Private { name } => *name,
        }
    }
}

/// Storage for a nested struct that is absent until constructed
pub trait NestedSlot {
    fn is_allocated(&self) -> bool;

    /// Return the nested struct, allocating a default instance first if needed
    fn allocate(&mut self) -> &mut dyn Configurable;
}

impl<T: Configurable + Default> NestedSlot for Option<T> {
    fn is_allocated(&self) -> bool {
        self.is_some()
    }

    fn allocate(&mut self) -> &mut dyn Configurable {
        self.get_or_insert_with(T::default)
    }
}
