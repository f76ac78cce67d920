//! Sources and hooks that run over a configuration during [`load`](crate::load()).
//!
//! Every plugin claims the annotation namespaces it reads in a
//! [`TagRegistry`] before anything runs, may record per-field metadata on a
//! flat view (used for usage output), and then applies itself to the config.

mod custom_defaults;
mod defaults;
mod env;
mod flags;
mod secret;
mod validate;

pub use custom_defaults::{CustomDefaults, SetDefaults};
pub use defaults::Defaults;
pub use env::Env;
pub use flags::Flags;
pub use secret::Secrets;
pub use validate::{Validate, Validator};

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::flat::FieldDescriptor;

pub trait Plugin<T> {
    fn name(&self) -> &'static str;

    /// Claim the annotation namespaces this plugin reads.
    fn register(&self, _tags: &mut TagRegistry) -> Result<()> {
        Ok(())
    }

    /// Record per-field metadata.
    fn annotate(&self, _fields: &mut [FieldDescriptor<'_>]) {}

    fn apply(&mut self, conf: &mut T) -> Result<()>;
}

/// Owners of annotation namespaces.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    owners: BTreeMap<String, &'static str>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `tag` for `owner`. Claiming again for the same owner is a no-op.
    pub fn claim(&mut self, tag: &str, owner: &'static str) -> Result<()> {
        match self.owners.get(tag) {
            Some(existing) if *existing == owner => Ok(()),
            Some(existing) => Err(Error::TagClaimed {
                tag: tag.to_string(),
                owner: existing,
            }),
            None => {
                self.owners.insert(tag.to_string(), owner);
                Ok(())
            }
        }
    }

    pub fn owner(&self, tag: &str) -> Option<&'static str> {
        self.owners.get(tag).copied()
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.owners.iter().map(|(tag, owner)| (tag.as_str(), *owner))
    }
}

/// Copy the value of annotation `tag` into the metadata key of the same name.
pub(crate) fn annotate_tag(fields: &mut [FieldDescriptor<'_>], tag: &str) {
    for field in fields {
        if let Some(value) = field.tag(tag) {
            field.meta_mut().insert(tag.to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_registry_claims() {
        let mut tags = TagRegistry::new();
        tags.claim("env", "env").unwrap();
        tags.claim("env", "env").unwrap();

        let err = tags.claim("env", "vault").unwrap_err();
        assert!(matches!(err, Error::TagClaimed { owner: "env", .. }));
        assert_eq!(tags.owner("env"), Some("env"));
        assert_eq!(tags.owner("flag"), None);
        assert_eq!(tags.tags().collect::<Vec<_>>(), vec![("env", "env")]);
    }
}
