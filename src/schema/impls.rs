//! Schema impls for std types.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::{BuildHasher, Hash};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use super::{parse_text_value, Kind, Node, NodeMut, Shape, Value};
use crate::duration;
use crate::error::CoercionError;
use crate::flat::coerce;

macro_rules! leaf {
    ($kind:expr, $parse:path; $($ty:ty),+ $(,)?) => {$(
        impl Node for $ty {
            fn shape() -> Shape {
                Shape::Scalar($kind)
            }

            fn node(&mut self) -> NodeMut<'_> {
                NodeMut::Leaf(self)
            }

            fn parse_text(raw: &str) -> Result<Self, CoercionError> {
                $parse(raw)
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }

        impl Value for $ty {
            fn kind(&self) -> Kind {
                $kind
            }

            fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
                *self = <Self as Node>::parse_text(raw)?;
                Ok(())
            }

            fn is_zero(&self) -> bool {
                *self == Self::default()
            }

            fn render(&self) -> String {
                Node::render(self)
            }
        }
    )+};
}

leaf!(Kind::Int, coerce::parse_signed; i8, i16, i32, i64, i128, isize);
leaf!(Kind::Uint, coerce::parse_unsigned; u8, u16, u32, u64, u128, usize);
leaf!(Kind::Float, coerce::parse_float; f32, f64);
leaf!(Kind::Bool, coerce::parse_bool; bool);
leaf!(Kind::String, coerce::parse_string; String);

impl Node for Duration {
    fn shape() -> Shape {
        Shape::Scalar(Kind::Duration)
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Leaf(self)
    }

    fn parse_text(raw: &str) -> Result<Self, CoercionError> {
        duration::parse(raw)
    }

    fn render(&self) -> String {
        duration::format(*self)
    }
}

impl Value for Duration {
    fn kind(&self) -> Kind {
        Kind::Duration
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = duration::parse(raw)?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        Duration::is_zero(self)
    }

    fn render(&self) -> String {
        duration::format(*self)
    }
}

impl Node for PathBuf {
    fn shape() -> Shape {
        Shape::Scalar(Kind::Text)
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Leaf(self)
    }

    fn parse_text(raw: &str) -> Result<Self, CoercionError> {
        Ok(PathBuf::from(raw))
    }

    fn render(&self) -> String {
        self.display().to_string()
    }
}

impl Value for PathBuf {
    fn kind(&self) -> Kind {
        Kind::Text
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = PathBuf::from(raw);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.as_os_str().is_empty()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}

// Network addresses have no Default; the unspecified address counts as zero.
macro_rules! address {
    ($($ty:ty => $zero:expr),+ $(,)?) => {$(
        impl Node for $ty {
            fn shape() -> Shape {
                Shape::Scalar(Kind::Text)
            }

            fn node(&mut self) -> NodeMut<'_> {
                NodeMut::Leaf(self)
            }

            fn parse_text(raw: &str) -> Result<Self, CoercionError> {
                parse_text_value(raw)
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }

        impl Value for $ty {
            fn kind(&self) -> Kind {
                Kind::Text
            }

            fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
                *self = parse_text_value(raw)?;
                Ok(())
            }

            fn is_zero(&self) -> bool {
                let zero: fn(&$ty) -> bool = $zero;
                zero(self)
            }

            fn render(&self) -> String {
                Node::render(self)
            }
        }
    )+};
}

address!(
    IpAddr => |ip| ip.is_unspecified(),
    Ipv4Addr => |ip| ip.is_unspecified(),
    Ipv6Addr => |ip| ip.is_unspecified(),
    SocketAddr => |addr| addr.ip().is_unspecified() && addr.port() == 0,
);

impl Node for serde_json::Value {
    fn shape() -> Shape {
        Shape::Dynamic
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Leaf(self)
    }

    fn parse_text(raw: &str) -> Result<Self, CoercionError> {
        Ok(serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string())))
    }

    fn render(&self) -> String {
        match self {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Value for serde_json::Value {
    fn kind(&self) -> Kind {
        Kind::Dynamic
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = <Self as Node>::parse_text(raw)?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}

impl<T: Node> Node for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn node(&mut self) -> NodeMut<'_> {
        T::node(self)
    }

    fn parse_text(raw: &str) -> Result<Self, CoercionError> {
        T::parse_text(raw).map(Box::new)
    }

    fn render(&self) -> String {
        T::render(self)
    }
}

impl<T: Node> Node for Option<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn node(&mut self) -> NodeMut<'_> {
        if !T::shape().descends() {
            return NodeMut::Leaf(self);
        }
        match self {
            Some(inner) => inner.node(),
            absent => NodeMut::Leaf(absent),
        }
    }

    fn parse_text(raw: &str) -> Result<Self, CoercionError> {
        T::parse_text(raw).map(Some)
    }

    fn render(&self) -> String {
        self.as_ref().map(T::render).unwrap_or_default()
    }
}

impl<T: Node> Value for Option<T> {
    fn kind(&self) -> Kind {
        T::shape().kind()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = Some(T::parse_text(raw)?);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}

impl<T: Node> Node for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Leaf(self)
    }

    fn render(&self) -> String {
        self.iter().map(T::render).collect::<Vec<_>>().join(",")
    }
}

impl<T: Node> Value for Vec<T> {
    fn kind(&self) -> Kind {
        Kind::List
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = coerce::parse_list(raw)?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}

/// Shared map behaviour: structured values are walked per key, anything
/// else makes the whole map a single (unsettable) leaf.
fn map_node<'a, K, V, I>(entries: I) -> NodeMut<'a>
where
    K: Display + 'a,
    V: Node + 'a,
    I: Iterator<Item = (&'a K, &'a mut V)>,
{
    let mut entries: Vec<(String, NodeMut<'a>)> = entries
        .map(|(key, value)| (key.to_string(), Node::node(value)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    NodeMut::Entries(entries)
}

fn render_entries<'a, K, V, I>(entries: I) -> String
where
    K: Display + 'a,
    V: Node + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let mut pairs: Vec<String> = entries
        .map(|(key, value)| format!("{key}={}", value.render()))
        .collect();
    pairs.sort();
    pairs.join(",")
}

impl<K, V, S> Node for HashMap<K, V, S>
where
    K: Display + Eq + Hash,
    V: Node,
    S: BuildHasher,
{
    fn shape() -> Shape {
        Shape::Map(Box::new(V::shape()))
    }

    fn node(&mut self) -> NodeMut<'_> {
        if V::shape().descends() {
            map_node(self.iter_mut())
        } else {
            NodeMut::Leaf(self)
        }
    }

    fn render(&self) -> String {
        render_entries(self.iter())
    }
}

impl<K, V, S> Value for HashMap<K, V, S>
where
    K: Display + Eq + Hash,
    V: Node,
    S: BuildHasher,
{
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn set_text(&mut self, _raw: &str) -> Result<(), CoercionError> {
        Err(CoercionError::Unsupported { kind: Kind::Map })
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}

impl<K, V> Node for BTreeMap<K, V>
where
    K: Display + Ord,
    V: Node,
{
    fn shape() -> Shape {
        Shape::Map(Box::new(V::shape()))
    }

    fn node(&mut self) -> NodeMut<'_> {
        if V::shape().descends() {
            map_node(self.iter_mut())
        } else {
            NodeMut::Leaf(self)
        }
    }

    fn render(&self) -> String {
        render_entries(self.iter())
    }
}

impl<K, V> Value for BTreeMap<K, V>
where
    K: Display + Ord,
    V: Node,
{
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn set_text(&mut self, _raw: &str) -> Result<(), CoercionError> {
        Err(CoercionError::Unsupported { kind: Kind::Map })
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn render(&self) -> String {
        Node::render(self)
    }
}
