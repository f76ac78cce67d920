use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::decoder::Decoder;
use crate::error::StructuralError;
use crate::naming::join;
use crate::schema::Node;

use super::valid_set::{ValidFieldSet, ANY_KEY, ANY_VALUE, ELEMENTS};

/// Compares decoded documents against the valid paths of one schema type.
#[derive(Debug, Clone)]
pub struct Detector {
    valid: ValidFieldSet,
    patterns: Vec<Pattern>,
}

/// A valid path split into lower-cased segments.
#[derive(Debug, Clone)]
struct Pattern {
    path: String,
    segments: Vec<String>,
}

impl Detector {
    pub fn for_schema<T: Node>() -> Result<Self, StructuralError> {
        Ok(Self::new(ValidFieldSet::of::<T>()?))
    }

    pub fn new(valid: ValidFieldSet) -> Self {
        let patterns = valid
            .iter()
            .map(|path| Pattern {
                path: path.to_string(),
                segments: segments(&path.to_lowercase()),
            })
            .collect();
        Detector { valid, patterns }
    }

    pub fn valid_fields(&self) -> &ValidFieldSet {
        &self.valid
    }

    /// Unknown paths in `src`, decoded with `decoder` or, failing that, as JSON.
    ///
    /// Documents that decode to something other than a map are not checked.
    pub fn detect(&self, src: &[u8], decoder: &dyn Decoder) -> Vec<String> {
        let tree = match decoder.decode(src) {
            Ok(Value::Object(map)) => map,
            _ => match serde_json::from_slice::<Value>(src) {
                Ok(Value::Object(map)) => map,
                _ => {
                    debug!("document is not a keyed map, skipping unknown field detection");
                    return Vec::new();
                }
            },
        };
        self.check(&tree)
    }

    /// Unknown paths of an already decoded document, in first-seen order.
    ///
    /// Paths inside lists are reported without index or `[]` segments, and
    /// each path is reported once.
    pub fn check(&self, tree: &Map<String, Value>) -> Vec<String> {
        let mut found = Found::default();
        self.compare("", "", tree, &mut found);
        found.paths
    }

    fn compare(&self, schema_prefix: &str, report_prefix: &str, tree: &Map<String, Value>, found: &mut Found) {
        for (key, value) in tree {
            let candidate = join(schema_prefix, key);
            let report = join(report_prefix, key);

            let Some(resolved) = self.resolve(schema_prefix, &candidate) else {
                found.push(report);
                continue;
            };

            match value {
                Value::Object(inner) => {
                    if !self.is_open(&resolved) {
                        self.compare(&resolved, &report, inner, found);
                    }
                }
                Value::Array(items) => {
                    let elements = format!("{resolved}{ELEMENTS}");
                    if self.is_open(&elements) {
                        continue;
                    }
                    for item in items {
                        if let Value::Object(inner) = item {
                            self.compare(&elements, &report, inner, found);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Schema path to use for `candidate`, or `None` when it is not valid.
    fn resolve(&self, prefix: &str, candidate: &str) -> Option<String> {
        if self.valid.contains(candidate) {
            return Some(candidate.to_string());
        }

        let lowered = candidate.to_lowercase();
        if let Some(pattern) = self.patterns.iter().find(|p| p.path.to_lowercase() == lowered) {
            return Some(pattern.path.clone());
        }

        if self.valid.contains(&join(prefix, ANY_KEY)) {
            return Some(candidate.to_string());
        }

        let wanted = segments(&lowered);
        self.patterns
            .iter()
            .filter(|p| p.segments.last().map(String::as_str) != Some(ANY_VALUE))
            .any(|p| p.segments.len() == wanted.len() && matches_prefix(&p.segments, &wanted))
            .then(|| candidate.to_string())
    }

    /// Whether nothing below `path` is checked: `path` or an ancestor is an
    /// open value, or lies under an open map whose values are unstructured.
    fn is_open(&self, path: &str) -> bool {
        let wanted = segments(&path.to_lowercase());
        self.patterns.iter().any(|p| {
            let Some((last, head)) = p.segments.split_last() else {
                return false;
            };
            let marks_open = match last.as_str() {
                ANY_VALUE => true,
                ANY_KEY => self.is_terminal_map(&p.path),
                _ => false,
            };
            let scope = if last == ANY_VALUE { head } else { &p.segments[..] };
            marks_open && scope.len() <= wanted.len() && matches_prefix(scope, &wanted[..scope.len()])
        })
    }

    /// An open map with no valid paths below its keys.
    fn is_terminal_map(&self, map: &str) -> bool {
        let nested = format!("{map}.");
        let elements = format!("{map}{ELEMENTS}");
        !self
            .patterns
            .iter()
            .any(|p| p.path.starts_with(&nested) || p.path.starts_with(&elements))
    }
}

/// Unknown paths of `src` for schema type `T`.
pub fn detect_unknown<T: Node>(src: &[u8], decoder: &dyn Decoder) -> Result<Vec<String>, StructuralError> {
    Ok(Detector::for_schema::<T>()?.detect(src, decoder))
}

fn segments(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(str::to_string).collect()
}

/// Segment-wise match: `*` matches one segment, `*[]` one list segment,
/// anything else must be equal (both sides are lower-cased).
fn matches_prefix(pattern: &[String], path: &[String]) -> bool {
    pattern.iter().zip(path).all(|(want, got)| match want.as_str() {
        ANY_KEY => true,
        "*[]" => got.ends_with(ELEMENTS),
        _ => want == got,
    })
}

#[derive(Default)]
struct Found {
    paths: Vec<String>,
    seen: HashSet<String>,
}

impl Found {
    fn push(&mut self, path: String) {
        if self.seen.insert(path.clone()) {
            self.paths.push(path);
        }
    }
}
