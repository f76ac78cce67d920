use std::collections::BTreeSet;

use tracing::debug;

use super::{annotate_tag, Plugin, TagRegistry};
use crate::error::Result;
use crate::flat::{view, FieldDescriptor};
use crate::schema::Node;

const TAG: &str = "default";

/// Sets zero-valued fields from their `default` annotation.
///
/// A pass built with [`Defaults::skipping`] leaves alone every field whose
/// key path was present in a loaded file, so an explicit `false` or `0` in a
/// file is never replaced. That pass also reaches map entries the files
/// created.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    present: BTreeSet<String>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults skipping fields whose lower-cased key path is in `present`.
    pub fn skipping(present: BTreeSet<String>) -> Self {
        Defaults { present }
    }
}

impl<T: Node> Plugin<T> for Defaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn register(&self, tags: &mut TagRegistry) -> Result<()> {
        tags.claim(TAG, "defaults")
    }

    fn annotate(&self, fields: &mut [FieldDescriptor<'_>]) {
        annotate_tag(fields, TAG);
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        let mut fields = view(conf)?;
        Plugin::<T>::annotate(self, &mut fields);

        for field in fields.iter_mut() {
            let Some(value) = field.meta().get(TAG).cloned() else {
                continue;
            };
            if !field.is_zero() || self.present.contains(&field.key_path().to_lowercase()) {
                continue;
            }
            debug!(field = field.name(), value = %value, "applying default");
            field.set(&value)?;
        }
        Ok(())
    }
}
