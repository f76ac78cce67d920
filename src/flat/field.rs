use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::error::{Error, Result};
use crate::naming;
use crate::schema::{FieldDef, Kind, Tags, Value};

/// Map entry enclosing a field: the dotted path of the map and the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub map: String,
    pub key: String,
}

/// Handle to one leaf of a schema instance.
///
/// Borrows the leaf mutably for the lifetime of the walk. Leaves living
/// inside map values are borrowed in place, so a successful [`set`](Self::set)
/// lands directly in the map entry listed by [`map_entries`](Self::map_entries).
pub struct FieldDescriptor<'a> {
    name: String,
    key_path: String,
    def: &'static FieldDef,
    meta: BTreeMap<String, String>,
    value: &'a mut dyn Value,
    entries: Vec<MapEntry>,
}

impl<'a> FieldDescriptor<'a> {
    pub(crate) fn new(
        name: String,
        key_path: String,
        def: &'static FieldDef,
        value: &'a mut dyn Value,
        entries: Vec<MapEntry>,
    ) -> Self {
        FieldDescriptor {
            name,
            key_path,
            def,
            meta: BTreeMap::new(),
            value,
            entries,
        }
    }

    /// Dotted path built from `name` overrides and identifiers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted path the field has in decoded configuration files.
    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn ident(&self) -> &'static str {
        self.def.ident
    }

    pub fn env_name(&self) -> String {
        naming::env_name(&self.name)
    }

    pub fn tag(&self, ns: &str) -> Option<&'static str> {
        self.def.tag(ns)
    }

    pub fn tags(&self) -> Tags {
        self.def.tags
    }

    /// Value of the `default` annotation.
    pub fn default_value(&self) -> Option<&'static str> {
        self.tag("default")
    }

    /// Metadata recorded by plugins (env var names, flag names, ...).
    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.meta
    }

    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Current value in textual form.
    pub fn render(&self) -> String {
        self.value.render()
    }

    /// Enclosing map entries, outermost first. Empty outside maps.
    pub fn map_entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Coerce `raw` into the field. The field is left unchanged on error.
    pub fn set(&mut self, raw: &str) -> Result<()> {
        trace!(field = %self.name, kind = %self.kind(), "setting field");
        self.value
            .set_text(raw)
            .map_err(|source| Error::coercion(&self.name, source))
    }
}

impl fmt::Debug for FieldDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("key_path", &self.key_path)
            .field("kind", &self.kind())
            .field("value", &self.render())
            .field("meta", &self.meta)
            .field("entries", &self.entries)
            .finish()
    }
}
