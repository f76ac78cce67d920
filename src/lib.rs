//! Layered configuration loading driven by a struct's own schema.
//!
//! A configuration type derives [`Schema`] and is then loaded with [`load`]
//! from `default` annotations, JSON/YAML/TOML files, environment variables
//! and command-line flags. Every leaf is reachable through a flat, dotted
//! view ([`view`]) with string coercion, and files are checked against the
//! schema for keys it does not declare ([`Detector`]).
//!
//! ```ignore
//! use flatconf::{load, Options, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Schema, Serialize, Deserialize, Default)]
//! #[serde(default)]
//! struct Config {
//!     #[config(default = "8080", usage = "listen port")]
//!     pub port: u16,
//! }
//!
//! let mut opts = Options::new().env_prefix("APP");
//! opts.loader_mut().add_file("config.yaml", true)?;
//!
//! let mut conf = Config::default();
//! let report = flatconf::load(&mut conf, &mut opts)?;
//! ```

extern crate self as flatconf;

pub mod decoder;
pub mod duration;
pub mod error;
pub mod flat;
mod load;
pub mod loader;
pub mod naming;
pub mod plugins;
pub mod schema;
pub mod unknown;
pub mod usage;

pub use flatconf_derive::Schema;

pub use decoder::Decoder;
pub use error::{
    BoxError, CoercionError, DecodeError, Error, Result, StructuralError, UnknownFieldsError,
};
pub use flat::{view, FieldDescriptor, MapEntry};
pub use load::{load, Options, Report};
pub use loader::{find_file_upward, Loader, UnknownFieldsReport};
pub use plugins::{
    CustomDefaults, Defaults, Env, Flags, Plugin, Secrets, SetDefaults, TagRegistry, Validate,
    Validator,
};
pub use schema::{FieldDef, Kind, Node, NodeMut, Record, Shape, Tags, Value};
pub use unknown::{detect_unknown, Detector, ValidFieldSet};
