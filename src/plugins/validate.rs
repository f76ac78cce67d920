use std::fmt;

use tracing::debug;

use super::Plugin;
use crate::error::{BoxError, Error, Result};

/// Post-load validation implemented by the configuration type itself.
pub trait Validate {
    fn validate(&self) -> Result<(), BoxError>;
}

type Check<T> = Box<dyn Fn(&T) -> Result<(), BoxError>>;

/// Runs checks over the final configuration; the first failure aborts loading.
pub struct Validator<T> {
    checks: Vec<Check<T>>,
}

impl<T> Validator<T> {
    pub fn new() -> Self {
        Validator { checks: Vec::new() }
    }

    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }
}

impl<T: Validate + 'static> Validator<T> {
    /// Validator running [`Validate::validate`].
    pub fn validating() -> Self {
        Validator::new().check(|conf: &T| conf.validate())
    }
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl<T> Plugin<T> for Validator<T> {
    fn name(&self) -> &'static str {
        "validator"
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        debug!(checks = self.checks.len(), "validating configuration");
        for check in &self.checks {
            check(conf).map_err(Error::Validation)?;
        }
        Ok(())
    }
}
