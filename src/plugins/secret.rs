use std::fmt;

use tracing::debug;

use super::{Plugin, TagRegistry};
use crate::error::{BoxError, Error, Result};
use crate::flat::{view, FieldDescriptor};
use crate::schema::Node;

const TAG: &str = "secret";

type Provider = Box<dyn Fn(&str) -> Result<Option<String>, BoxError>>;

/// Fills fields annotated with `secret` from a secret provider.
///
/// The secret name is the annotation value, or the upper-snake field name
/// when the annotation is bare. A provider returning `Ok(None)` leaves the
/// field untouched. Secret fields never show their value in usage output.
pub struct Secrets {
    provider: Provider,
}

impl Secrets {
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn(&str) -> Result<Option<String>, BoxError> + 'static,
    {
        Secrets {
            provider: Box::new(provider),
        }
    }

    pub fn secret_name(field: &FieldDescriptor<'_>) -> Option<String> {
        match field.tag(TAG)? {
            "" => Some(field.env_name()),
            name => Some(name.to_string()),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl<T: Node> Plugin<T> for Secrets {
    fn name(&self) -> &'static str {
        "secrets"
    }

    fn register(&self, tags: &mut TagRegistry) -> Result<()> {
        tags.claim(TAG, "secrets")
    }

    fn annotate(&self, fields: &mut [FieldDescriptor<'_>]) {
        for field in fields {
            if let Some(name) = Secrets::secret_name(field) {
                field.meta_mut().insert(TAG.to_string(), name);
            }
        }
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        let mut fields = view(conf)?;
        Plugin::<T>::annotate(self, &mut fields);

        for field in fields.iter_mut() {
            let Some(name) = field.meta().get(TAG).cloned() else {
                continue;
            };
            let value = (self.provider)(&name).map_err(|source| Error::Secret {
                name: name.clone(),
                source,
            })?;
            if let Some(value) = value {
                debug!(field = field.name(), secret = %name, "reading secret");
                field.set(&value)?;
            }
        }
        Ok(())
    }
}
