//! Configuration file loading.
//!
//! This module provides:
//! - Decoder registration by format (file extension)
//! - Config file discovery (search upward from a directory)
//! - Unknown field detection per file, aggregated across files
//! - Layered merging of every file onto the current configuration

mod file;
mod merge;

pub use file::{find_file_upward, Origin, Source};
pub use merge::{canonicalize, collect_paths, overlay};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::decoder::{self, Decoder};
use crate::error::{DecodeError, Error, Result, UnknownFieldsError};
use crate::schema::Node;
use crate::unknown::Detector;

/// Unknown dotted paths keyed by source identifier.
pub type UnknownFieldsReport = BTreeMap<String, Vec<String>>;

/// Loads configuration files into a schema instance.
pub struct Loader {
    decoders: BTreeMap<String, Box<dyn Decoder>>,
    sources: Vec<Source>,
    disallow_unknown_fields: bool,
    unknown_fields: UnknownFieldsReport,
    present: BTreeSet<String>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("formats", &self.decoders.keys().collect::<Vec<_>>())
            .field("sources", &self.sources)
            .field("disallow_unknown_fields", &self.disallow_unknown_fields)
            .field("unknown_fields", &self.unknown_fields)
            .finish()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Loader::with_default_decoders()
    }
}

impl Loader {
    /// A loader with no decoders registered.
    pub fn new() -> Self {
        Loader {
            decoders: BTreeMap::new(),
            sources: Vec::new(),
            disallow_unknown_fields: false,
            unknown_fields: UnknownFieldsReport::new(),
            present: BTreeSet::new(),
        }
    }

    /// A loader decoding `json`, `yaml`/`yml` and `toml`.
    pub fn with_default_decoders() -> Self {
        let mut decoders: BTreeMap<String, Box<dyn Decoder>> = BTreeMap::new();
        decoders.insert("json".to_string(), Box::new(decoder::Json));
        decoders.insert("yaml".to_string(), Box::new(decoder::Yaml));
        decoders.insert("yml".to_string(), Box::new(decoder::Yaml));
        decoders.insert("toml".to_string(), Box::new(decoder::Toml));
        Loader {
            decoders,
            ..Loader::new()
        }
    }

    /// Register `decoder` for files with extension `format` (a leading `.` is ignored).
    pub fn register_decoder(&mut self, format: &str, decoder: impl Decoder + 'static) -> Result<()> {
        let format = normalize_format(format);
        if format.is_empty() {
            return Err(Error::EmptyFormat);
        }
        if self.decoders.contains_key(&format) {
            return Err(Error::DuplicateDecoder(format));
        }
        self.decoders.insert(format, Box::new(decoder));
        Ok(())
    }

    /// Queue a file; its extension picks the decoder. Empty paths are ignored.
    pub fn add_file(&mut self, path: impl AsRef<Path>, optional: bool) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        let format = file::format_of(path);
        self.ensure_decoder(&format)?;
        self.sources.push(Source {
            origin: Origin::File {
                path: path.to_path_buf(),
                optional,
            },
            format,
        });
        Ok(())
    }

    pub fn add_files<I, P>(&mut self, paths: I, optional: bool) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.add_file(path, optional)?;
        }
        Ok(())
    }

    /// Queue an in-memory document.
    pub fn add_bytes(&mut self, label: impl Into<String>, format: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let format = normalize_format(format);
        self.ensure_decoder(&format)?;
        self.sources.push(Source {
            origin: Origin::Bytes {
                label: label.into(),
                data: data.into(),
            },
            format,
        });
        Ok(())
    }

    /// Search upward from `start_dir` for `filename` and queue it when found.
    pub fn add_discovered(&mut self, start_dir: &Path, filename: &str, stop_at_git_root: bool) -> Result<Option<PathBuf>> {
        let Some(path) = find_file_upward(start_dir, filename, stop_at_git_root) else {
            debug!(filename, "no config file found");
            return Ok(None);
        };
        self.add_file(&path, false)?;
        Ok(Some(path))
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Fail loading when any file carries unknown fields.
    pub fn disallow_unknown_fields(&mut self, disallow: bool) {
        self.disallow_unknown_fields = disallow;
    }

    pub fn disallows_unknown_fields(&self) -> bool {
        self.disallow_unknown_fields
    }

    /// Copy of the unknown fields recorded so far.
    pub fn unknown_fields(&self) -> UnknownFieldsReport {
        self.unknown_fields.clone()
    }

    pub fn clear_unknown_fields(&mut self) {
        self.unknown_fields.clear();
    }

    /// Whether `key_path` (as in [`FieldDescriptor::key_path`](crate::FieldDescriptor::key_path))
    /// was present in any loaded layer.
    pub fn is_present(&self, key_path: &str) -> bool {
        self.present.contains(&key_path.to_lowercase())
    }

    pub(crate) fn present_paths(&self) -> &BTreeSet<String> {
        &self.present
    }

    /// Load every queued source into `conf`.
    ///
    /// All sources are read and checked for unknown fields first. In strict
    /// mode any finding fails the load before a single layer is applied.
    /// Otherwise every layer is merged in order onto a snapshot of `conf`,
    /// and `conf` is replaced only once all of them deserialize.
    ///
    /// Each source's entry in the report is replaced by this load's findings,
    /// so loading again does not repeat paths.
    pub fn load_into<T>(&mut self, conf: &mut T) -> Result<()>
    where
        T: Node + Serialize + DeserializeOwned,
    {
        let detector = Detector::for_schema::<T>()?;
        let mut layers = Vec::new();
        let mut found = UnknownFieldsReport::new();

        for source in &self.sources {
            let label = source.label();
            let Some(bytes) = source.read()? else {
                debug!(source = %label, "optional config file not found, skipping");
                continue;
            };
            let decoder = self
                .decoders
                .get(&source.format)
                .ok_or_else(|| Error::NoDecoder(source.format.clone()))?;

            let unknown = detector.detect(&bytes, decoder.as_ref());
            if !unknown.is_empty() {
                found.insert(label.clone(), unknown);
            }

            let layer = decode_layer(decoder.as_ref(), &bytes).map_err(|source| Error::Decode {
                label: label.clone(),
                source,
            })?;
            debug!(source = %label, format = %source.format, "read config layer");
            layers.push((label, layer));
        }

        for source in &self.sources {
            let label = source.label();
            match found.get(&label) {
                Some(fields) => {
                    self.unknown_fields.insert(label, fields.clone());
                }
                None => {
                    self.unknown_fields.remove(&label);
                }
            }
        }
        if !found.is_empty() {
            if self.disallow_unknown_fields {
                return Err(UnknownFieldsError { fields: found }.into());
            }
            for (label, fields) in &found {
                warn!(source = %label, fields = ?fields, "unknown fields in config file");
            }
        }

        if layers.is_empty() {
            return Ok(());
        }

        let shape = T::shape();
        let mut merged = serde_json::to_value(&*conf).map_err(Error::Snapshot)?;
        let mut next = None;
        for (label, mut layer) in layers {
            canonicalize(&mut layer, &shape);
            collect_paths("", &layer, &mut self.present);
            overlay(&mut merged, layer);
            next = Some(T::deserialize(&merged).map_err(|source| Error::Apply { label, source })?);
        }
        if let Some(next) = next {
            *conf = next;
        }
        Ok(())
    }

    fn ensure_decoder(&self, format: &str) -> Result<()> {
        if self.decoders.contains_key(format) {
            Ok(())
        } else {
            Err(Error::NoDecoder(format.to_string()))
        }
    }
}

fn normalize_format(format: &str) -> String {
    format.trim_start_matches('.').to_lowercase()
}

/// Decode one layer; empty documents are empty tables.
fn decode_layer(decoder: &dyn Decoder, bytes: &[u8]) -> std::result::Result<Value, DecodeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    match decoder.decode(bytes)? {
        Value::Null => Ok(Value::Object(Default::default())),
        table @ Value::Object(_) => Ok(table),
        _ => Err(DecodeError::NotATable),
    }
}
