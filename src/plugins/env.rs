use std::collections::BTreeMap;

use tracing::debug;

use super::{Plugin, TagRegistry};
use crate::error::Result;
use crate::flat::{view, FieldDescriptor};
use crate::schema::Node;

const TAG: &str = "env";

/// Reads fields from environment variables.
///
/// The variable name is the `env` annotation when set, otherwise the
/// upper-snake form of the field name behind an optional prefix
/// (`APP_REDIS_HOST` for `redis.host` with prefix `APP`). `env = "-"`
/// disables the field.
#[derive(Debug, Clone, Default)]
pub struct Env {
    prefix: String,
    vars: Option<BTreeMap<String, String>>,
}

impl Env {
    /// Read from the process environment.
    pub fn new(prefix: impl Into<String>) -> Self {
        Env {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Read from an explicit set of variables instead of the process environment.
    pub fn with_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Env {
            prefix: prefix.into(),
            vars: Some(
                vars.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    pub fn var_name(&self, field: &FieldDescriptor<'_>) -> String {
        match field.tag(TAG) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if self.prefix.is_empty() => field.env_name(),
            _ => format!("{}_{}", self.prefix, field.env_name()),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

impl<T: Node> Plugin<T> for Env {
    fn name(&self) -> &'static str {
        "env"
    }

    fn register(&self, tags: &mut TagRegistry) -> Result<()> {
        tags.claim(TAG, "env")
    }

    fn annotate(&self, fields: &mut [FieldDescriptor<'_>]) {
        for field in fields {
            let name = self.var_name(field);
            field.meta_mut().insert(TAG.to_string(), name);
        }
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        let mut fields = view(conf)?;
        Plugin::<T>::annotate(self, &mut fields);

        for field in fields.iter_mut() {
            let Some(name) = field.meta().get(TAG).cloned() else {
                continue;
            };
            if name == "-" {
                continue;
            }
            if let Some(value) = self.lookup(&name) {
                debug!(field = field.name(), var = %name, "reading environment variable");
                field.set(&value)?;
            }
        }
        Ok(())
    }
}
