use std::collections::BTreeSet;
use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, Command};
use tracing::debug;

use super::{Plugin, TagRegistry};
use crate::error::{Error, Result};
use crate::flat::{view, FieldDescriptor};
use crate::naming;
use crate::schema::{Kind, Node};

const TAG: &str = "flag";
const USAGE_TAG: &str = "usage";

/// Reads fields from long command-line flags.
///
/// The flag name is the `flag` annotation when set, otherwise the kebab form
/// of the field name (`--redis-host` for `redis.host`). Booleans accept a
/// bare `--debug` as well as `--debug=false`. `flag = "-"` disables the field.
#[derive(Debug, Clone)]
pub struct Flags {
    args: Vec<OsString>,
}

impl Flags {
    /// Parse `args`; the first item is the program name.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Flags {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the arguments of the current process.
    pub fn from_env() -> Self {
        Flags::new(std::env::args_os())
    }

    pub fn flag_name(field: &FieldDescriptor<'_>) -> String {
        match field.tag(TAG) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => naming::flag_name(field.name()),
        }
    }

    fn command(&self, fields: &[FieldDescriptor<'_>]) -> Result<Command> {
        let bin = self
            .args
            .first()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());

        let mut seen: BTreeSet<String> = BTreeSet::from(["help".to_string()]);
        let mut command = Command::new(bin).disable_version_flag(true);

        for field in fields {
            let Some(flag) = field.meta().get(TAG) else {
                continue;
            };
            if flag == "-" {
                continue;
            }
            if !seen.insert(flag.clone()) {
                return Err(Error::DuplicateFlag(flag.clone()));
            }

            let mut arg = Arg::new(flag.clone())
                .long(flag.clone())
                .action(ArgAction::Set)
                .value_parser(value_parser!(String))
                .value_name(field.kind().to_string().to_uppercase());
            if let Some(usage) = field.tag(USAGE_TAG) {
                arg = arg.help(usage.to_string());
            }
            arg = if field.kind() == Kind::Bool {
                arg.num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true")
            } else {
                arg.num_args(1)
            };
            command = command.arg(arg);
        }
        Ok(command)
    }
}

impl<T: Node> Plugin<T> for Flags {
    fn name(&self) -> &'static str {
        "flags"
    }

    fn register(&self, tags: &mut TagRegistry) -> Result<()> {
        tags.claim(TAG, "flags")
    }

    fn annotate(&self, fields: &mut [FieldDescriptor<'_>]) {
        for field in fields {
            let name = Flags::flag_name(field);
            field.meta_mut().insert(TAG.to_string(), name);
        }
    }

    fn apply(&mut self, conf: &mut T) -> Result<()> {
        let mut fields = view(conf)?;
        Plugin::<T>::annotate(self, &mut fields);

        let matches = match self.command(&fields)?.try_get_matches_from(&self.args) {
            Ok(matches) => matches,
            Err(e) if e.kind() == ErrorKind::DisplayHelp => return Err(Error::Usage(e.to_string())),
            Err(e) => return Err(Error::Flags(e)),
        };

        for field in fields.iter_mut() {
            let Some(flag) = field.meta().get(TAG).cloned() else {
                continue;
            };
            if flag == "-" {
                continue;
            }
            if let Some(value) = matches.get_one::<String>(&flag) {
                debug!(field = field.name(), flag = %flag, "reading flag");
                field.set(value)?;
            }
        }
        Ok(())
    }
}
