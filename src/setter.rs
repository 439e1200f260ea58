use crate::error::ConfigError;
use crate::field::FieldDescriptor;
use std::collections::HashMap;
use std::fmt;

/// The runtime shape of a leaf field, as far as text conversion is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    Char,
    Str,
    /// One level of indirection: the value is allocated when it is set
    Optional(&'static Kind),
    Sequence,
    Map,
}

impl Kind {
    /// Whether a raw string can be converted into this kind at all
    pub fn is_supported(&self) -> bool {
        match self {
            Kind::Sequence | Kind::Map => false,
            Kind::Optional(inner) => !matches!(inner, Kind::Optional(_)) && inner.is_supported(),
            _ => true,
        }
    }

    /// Boolean fields (direct or optional) may appear as bare command line switches
    pub fn is_bool(&self) -> bool {
        matches!(self, Kind::Bool | Kind::Optional(Kind::Bool))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Bool => write!(f, "bool"),
            Kind::Int => write!(f, "int"),
            Kind::Uint => write!(f, "uint"),
            Kind::Float => write!(f, "float"),
            Kind::Char => write!(f, "char"),
            Kind::Str => write!(f, "string"),
            Kind::Optional(inner) => write!(f, "optional {}", inner),
            Kind::Sequence => write!(f, "sequence"),
            Kind::Map => write!(f, "map"),
        }
    }
}

/// Type-erased handle to the storage of one leaf field
pub trait FieldSlot {
    /// Convert `raw` into the field's type and store it, or describe why it can't be
    fn set_str(&mut self, raw: &str) -> Result<(), String>;
}

/// A type that can live in a leaf field
pub trait FieldType: FieldSlot {
    const KIND: Kind;
}

trait ParseValue: Sized {
    fn parse_value(raw: &str) -> Result<Self, String>;
}

macro_rules! parse_with_from_str {
    ($($ty:ty),+ $(,)?) => {$(
        impl ParseValue for $ty {
            fn parse_value(raw: &str) -> Result<Self, String> {
                raw.parse::<$ty>().map_err(|e| e.to_string())
            }
        }
    )+};
}

parse_with_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
);

impl ParseValue for bool {
    fn parse_value(raw: &str) -> Result<Self, String> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err("expected one of 1, t, true, 0, f, false".to_string()),
        }
    }
}

macro_rules! field_types {
    ($kind:expr => $($ty:ty),+ $(,)?) => {$(
        impl FieldSlot for $ty {
            fn set_str(&mut self, raw: &str) -> Result<(), String> {
                *self = <$ty as ParseValue>::parse_value(raw)?;
                Ok(())
            }
        }

        impl FieldType for $ty {
            const KIND: Kind = $kind;
        }

        impl FieldSlot for Option<$ty> {
            fn set_str(&mut self, raw: &str) -> Result<(), String> {
                *self = Some(<$ty as ParseValue>::parse_value(raw)?);
                Ok(())
            }
        }

        impl FieldType for Option<$ty> {
            const KIND: Kind = Kind::Optional(&$kind);
        }
    )+};
}

field_types!(Kind::Bool => bool);
field_types!(Kind::Int => i8, i16, i32, i64, i128, isize);
field_types!(Kind::Uint => u8, u16, u32, u64, u128, usize);
field_types!(Kind::Float => f32, f64);
field_types!(Kind::Char => char);
field_types!(Kind::Str => String);

impl<T> FieldSlot for Vec<T> {
    fn set_str(&mut self, _raw: &str) -> Result<(), String> {
        Err(format!("{} fields cannot be set from text", Kind::Sequence))
    }
}

impl<T> FieldType for Vec<T> {
    const KIND: Kind = Kind::Sequence;
}

impl<K, V, S> FieldSlot for HashMap<K, V, S> {
    fn set_str(&mut self, _raw: &str) -> Result<(), String> {
        Err(format!("{} fields cannot be set from text", Kind::Map))
    }
}

impl<K, V, S> FieldType for HashMap<K, V, S> {
    const KIND: Kind = Kind::Map;
}

/// Converts `raw` into the declared type of `field` and stores it in `slot`
///
/// Unsupported kinds are rejected before any conversion is attempted, and a value that
/// doesn't parse is reported with the offending text. The slot is left untouched on error.
pub fn set_field(
    field: &FieldDescriptor,
    slot: &mut dyn FieldSlot,
    raw: &str,
) -> Result<(), ConfigError> {
    if !field.kind.is_supported() {
        return Err(ConfigError::UnsupportedKind {
            field: field.name.to_string(),
            kind: field.kind.to_string(),
        });
    }

    slot.set_str(raw).map_err(|reason| ConfigError::Conversion {
        field: field.name.to_string(),
        value: raw.to_string(),
        kind: field.kind.to_string(),
        reason,
    })
}
