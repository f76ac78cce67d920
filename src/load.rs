//! One-call loading: defaults, files, environment, flags and user plugins.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::flat::{view, FieldDescriptor};
use crate::loader::{Loader, UnknownFieldsReport};
use crate::plugins::{
    annotate_tag, CustomDefaults, Defaults, Env, Flags, Plugin, SetDefaults, TagRegistry,
};
use crate::schema::Node;
use crate::usage::{self, USAGE_TAG};

/// Settings for [`load`].
///
/// Every built-in stage is on by default. Flags are read from the process
/// arguments and variables from the process environment unless explicit
/// ones are given.
pub struct Options<T> {
    skip_defaults: bool,
    skip_files: bool,
    skip_env: bool,
    skip_flags: bool,
    env_prefix: String,
    env_vars: Option<BTreeMap<String, String>>,
    args: Option<Vec<OsString>>,
    disallow_unknown_fields: bool,
    loader: Loader,
    custom_defaults: Option<Box<dyn Plugin<T>>>,
    plugins: Vec<Box<dyn Plugin<T>>>,
}

impl<T> Default for Options<T> {
    fn default() -> Self {
        Options {
            skip_defaults: false,
            skip_files: false,
            skip_env: false,
            skip_flags: false,
            env_prefix: String::new(),
            env_vars: None,
            args: None,
            disallow_unknown_fields: false,
            loader: Loader::with_default_decoders(),
            custom_defaults: None,
            plugins: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("skip_defaults", &self.skip_defaults)
            .field("skip_files", &self.skip_files)
            .field("skip_env", &self.skip_env)
            .field("skip_flags", &self.skip_flags)
            .field("env_prefix", &self.env_prefix)
            .field("disallow_unknown_fields", &self.disallow_unknown_fields)
            .field("loader", &self.loader)
            .field("custom_defaults", &self.custom_defaults.is_some())
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T> Options<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not apply `default` annotations.
    pub fn skip_defaults(mut self) -> Self {
        self.skip_defaults = true;
        self
    }

    pub fn skip_files(mut self) -> Self {
        self.skip_files = true;
        self
    }

    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn skip_flags(mut self) -> Self {
        self.skip_flags = true;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read variables from `vars` instead of the process environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Parse `args` instead of the process arguments; the first item is the program name.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Fail when a configuration file carries fields the schema does not declare.
    pub fn disallow_unknown_fields(mut self) -> Self {
        self.disallow_unknown_fields = true;
        self
    }

    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    /// The loader holding configuration files, for queueing files after construction.
    pub fn loader_mut(&mut self) -> &mut Loader {
        &mut self.loader
    }

    /// Run `plugin` after every built-in stage. Plugins run in the order added.
    pub fn plugin(mut self, plugin: impl Plugin<T> + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    fn env(&self) -> Env {
        match &self.env_vars {
            Some(vars) => Env::with_vars(self.env_prefix.clone(), vars.clone()),
            None => Env::new(self.env_prefix.clone()),
        }
    }

    fn flags(&self) -> Flags {
        match &self.args {
            Some(args) => Flags::new(args.clone()),
            None => Flags::from_env(),
        }
    }
}

impl<T: SetDefaults> Options<T> {
    /// Call [`SetDefaults::set_defaults`] right after annotation defaults.
    pub fn custom_defaults(mut self) -> Self {
        self.custom_defaults = Some(Box::new(CustomDefaults));
        self
    }
}

impl<T: Node> Options<T> {
    /// Claim the annotation namespaces of every configured stage.
    fn register(&self) -> Result<TagRegistry> {
        let mut tags = TagRegistry::new();
        tags.claim(USAGE_TAG, "usage")?;
        Plugin::<T>::register(&Defaults::new(), &mut tags)?;
        Plugin::<T>::register(&self.env(), &mut tags)?;
        Plugin::<T>::register(&self.flags(), &mut tags)?;
        if let Some(custom) = &self.custom_defaults {
            custom.register(&mut tags)?;
        }
        for plugin in &self.plugins {
            plugin.register(&mut tags)?;
        }
        Ok(tags)
    }

    fn annotate(&self, fields: &mut [FieldDescriptor<'_>]) {
        annotate_tag(fields, USAGE_TAG);
        if !self.skip_defaults {
            Plugin::<T>::annotate(&Defaults::new(), fields);
        }
        if !self.skip_env {
            Plugin::<T>::annotate(&self.env(), fields);
        }
        if !self.skip_flags {
            Plugin::<T>::annotate(&self.flags(), fields);
        }
        for plugin in &self.plugins {
            plugin.annotate(fields);
        }
    }

    /// Table of every field with its flag, variable, default and usage text.
    pub fn usage(&self, conf: &mut T) -> Result<String> {
        self.register()?;
        let mut fields = view(conf)?;
        self.annotate(&mut fields);
        Ok(usage::render_usage(&fields))
    }

    /// Markdown table documenting every field by environment variable.
    pub fn markdown(&self, conf: &mut T) -> Result<String> {
        self.register()?;
        let mut fields = view(conf)?;
        self.annotate(&mut fields);
        Plugin::<T>::annotate(&self.env(), &mut fields);
        Ok(usage::render_markdown(&fields))
    }
}

/// Outcome of a successful [`load`].
#[derive(Debug, Clone, Default)]
pub struct Report {
    unknown_fields: UnknownFieldsReport,
    present: BTreeSet<String>,
}

impl Report {
    /// Unknown fields per configuration file, found in non-strict mode.
    pub fn unknown_fields(&self) -> &UnknownFieldsReport {
        &self.unknown_fields
    }

    /// Whether `key_path` was set by any configuration file.
    pub fn is_present(&self, key_path: &str) -> bool {
        self.present.contains(&key_path.to_lowercase())
    }
}

/// Load `conf` from every configured source.
///
/// Stages run in order: `default` annotations, custom defaults, files,
/// `default` annotations again for fields no file set, environment
/// variables, flags, then user plugins. Each stage overrides the previous
/// ones; the first error aborts loading.
pub fn load<T>(conf: &mut T, opts: &mut Options<T>) -> Result<Report>
where
    T: Node + Serialize + DeserializeOwned,
{
    let tags = opts.register()?;
    debug!(tags = ?tags.tags().collect::<Vec<_>>(), "registered annotation namespaces");

    if !opts.skip_defaults {
        Defaults::new().apply(conf)?;
    }
    if let Some(custom) = opts.custom_defaults.as_mut() {
        custom.apply(conf)?;
    }

    if !opts.skip_files {
        if opts.disallow_unknown_fields {
            opts.loader.disallow_unknown_fields(true);
        }
        opts.loader.load_into(conf)?;
    }

    if !opts.skip_defaults {
        Defaults::skipping(opts.loader.present_paths().clone()).apply(conf)?;
    }
    if !opts.skip_env {
        opts.env().apply(conf)?;
    }
    if !opts.skip_flags {
        opts.flags().apply(conf)?;
    }
    for plugin in opts.plugins.iter_mut() {
        debug!(plugin = plugin.name(), "applying plugin");
        plugin.apply(conf)?;
    }

    let report = Report {
        unknown_fields: opts.loader.unknown_fields(),
        present: opts.loader.present_paths().clone(),
    };
    info!(
        sources = opts.loader.sources().len(),
        unknown = report.unknown_fields.len(),
        "configuration loaded"
    );
    Ok(report)
}
