//! Static and runtime descriptions of configuration types.
//!
//! A schema type describes itself twice: once statically through [`Shape`]
//! (used to build the set of valid file keys) and once per instance through
//! [`NodeMut`] (used to hand out mutable leaf handles). `#[derive(Schema)]`
//! writes both for structs; this module provides them for std types.

mod impls;

use std::fmt;
use std::str::FromStr;

use crate::error::CoercionError;

/// Declared annotations of a field: `(namespace, value)` pairs in declaration order.
pub type Tags = &'static [(&'static str, &'static str)];

/// Static description of one struct field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Declared identifier (raw `r#` prefix stripped).
    pub ident: &'static str,
    pub tags: Tags,
    /// Flattened into its parent: contributes no path segment.
    pub embedded: bool,
    pub shape: fn() -> Shape,
}

impl FieldDef {
    /// Value of the annotation in namespace `ns`, if declared.
    pub fn tag(&self, ns: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(key, _)| *key == ns)
            .map(|(_, value)| *value)
    }

    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

/// Coercion kind of a leaf, resolved once per descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Any type decoded from its textual form (`FromStr`).
    Text,
    String,
    Bool,
    Int,
    Uint,
    Float,
    Duration,
    List,
    Map,
    Record,
    Dynamic,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Text => "text",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Duration => "duration",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Record => "struct",
            Kind::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

/// Type-level structure of a schema node.
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar(Kind),
    Record(&'static [FieldDef]),
    Seq(Box<Shape>),
    /// Map with string-like keys; the box holds the value shape.
    Map(Box<Shape>),
    /// Arbitrary sub-structure with no fixed shape.
    Dynamic,
}

impl Shape {
    pub fn kind(&self) -> Kind {
        match self {
            Shape::Scalar(kind) => *kind,
            Shape::Record(_) => Kind::Record,
            Shape::Seq(_) => Kind::List,
            Shape::Map(_) => Kind::Map,
            Shape::Dynamic => Kind::Dynamic,
        }
    }

    /// Whether walks continue below this shape instead of stopping at a leaf:
    /// records, and maps whose values (transitively) are records.
    pub fn descends(&self) -> bool {
        match self {
            Shape::Record(_) => true,
            Shape::Map(value) => value.descends(),
            _ => false,
        }
    }
}

/// Implemented by every type usable as a schema field.
pub trait Node {
    fn shape() -> Shape
    where
        Self: Sized;

    fn node(&mut self) -> NodeMut<'_>;

    /// Decode a standalone value from text. Used for slice elements and
    /// to allocate absent optional values.
    fn parse_text(_raw: &str) -> Result<Self, CoercionError>
    where
        Self: Sized,
    {
        Err(CoercionError::Unsupported {
            kind: Self::shape().kind(),
        })
    }

    fn render(&self) -> String {
        String::new()
    }
}

/// Mutable view of one schema node.
pub enum NodeMut<'a> {
    Leaf(&'a mut dyn Value),
    Record(&'a mut dyn Record),
    /// Entries of a map with structured values, sorted by key.
    Entries(Vec<(String, NodeMut<'a>)>),
}

/// A struct whose fields are part of a schema.
///
/// `nodes()` yields one view per entry of `fields()`, in the same order.
pub trait Record {
    fn fields(&self) -> &'static [FieldDef];
    fn nodes(&mut self) -> Vec<NodeMut<'_>>;
}

/// A settable leaf.
pub trait Value {
    fn kind(&self) -> Kind;
    /// Coerce `raw` into the leaf. The leaf is untouched on error.
    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError>;
    fn is_zero(&self) -> bool;
    fn render(&self) -> String;
}

/// Decode a textual type through `FromStr`. Backs [`text_value!`](crate::text_value).
pub fn parse_text_value<T>(raw: &str) -> Result<T, CoercionError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| CoercionError::invalid(Kind::Text, raw, e))
}

pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Make a `FromStr + Display + Default + PartialEq` type usable as a leaf.
///
/// ```ignore
/// flatconf::text_value!(LogLevel);
/// ```
#[macro_export]
macro_rules! text_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Node for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::Scalar($crate::Kind::Text)
            }

            fn node(&mut self) -> $crate::NodeMut<'_> {
                $crate::NodeMut::Leaf(self)
            }

            fn parse_text(raw: &str) -> ::std::result::Result<Self, $crate::CoercionError> {
                $crate::schema::parse_text_value(raw)
            }

            fn render(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(self)
            }
        }

        impl $crate::Value for $ty {
            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Text
            }

            fn set_text(&mut self, raw: &str) -> ::std::result::Result<(), $crate::CoercionError> {
                *self = <Self as $crate::Node>::parse_text(raw)?;
                Ok(())
            }

            fn is_zero(&self) -> bool {
                $crate::schema::is_default(self)
            }

            fn render(&self) -> ::std::string::String {
                <Self as $crate::Node>::render(self)
            }
        }
    )+};
}
