use super::Plugin;
use crate::error::Result;

/// Programmatic defaults, run right after annotation defaults.
pub trait SetDefaults {
    fn set_defaults(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CustomDefaults;

impl<T: SetDefaults> Plugin<T> for CustomDefaults {
    fn name(&self) -> &'static str {
        "custom-defaults"
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        conf.set_defaults();
        Ok(())
    }
}
