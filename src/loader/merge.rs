//! Layer merging
//!
//! Priority: later layers > earlier layers > the configuration's current values

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::naming::{self, join};
use crate::schema::{FieldDef, Shape};

/// Overlay `layer` onto `base`.
///
/// Objects merge key by key; a layer key matches an existing base key
/// exactly or, failing that, case-insensitively. Any other value (scalars,
/// arrays, null) replaces what was there.
pub fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => overlay_object(base, layer),
        (base, layer) => *base = layer,
    }
}

fn overlay_object(base: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        let target = if base.contains_key(&key) {
            key
        } else {
            base.keys()
                .find(|existing| existing.eq_ignore_ascii_case(&key))
                .cloned()
                .unwrap_or(key)
        };

        match base.get_mut(&target) {
            Some(existing) => overlay(existing, value),
            None => {
                base.insert(target, value);
            }
        }
    }
}

/// Rename the keys of `layer` to the names serde deserializes for `shape`.
///
/// A key matching a field's file key or one of its aliases, exactly or else
/// case-insensitively, becomes the file key. When several spellings of one
/// field meet, the file key's own value wins. Map entries and list elements
/// are followed; dynamic values and unknown keys are left as they are.
pub fn canonicalize(layer: &mut Value, shape: &Shape) {
    match (layer, shape) {
        (Value::Object(map), Shape::Record(defs)) => canonicalize_object(map, defs),
        (Value::Object(map), Shape::Map(value)) => {
            for entry in map.values_mut() {
                canonicalize(entry, value);
            }
        }
        (Value::Array(items), Shape::Seq(element)) => {
            for item in items {
                canonicalize(item, element);
            }
        }
        _ => {}
    }
}

fn canonicalize_object(map: &mut Map<String, Value>, defs: &[FieldDef]) {
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        let Some((canonical, shape)) = resolve(defs, &key) else {
            continue;
        };
        let Some(mut value) = map.remove(&key) else {
            continue;
        };
        canonicalize(&mut value, &shape);
        if let Some(existing) = map.remove(canonical) {
            overlay(&mut value, existing);
        }
        map.insert(canonical.to_string(), value);
    }
}

/// File key and shape of the field `key` names at this level.
fn resolve(defs: &[FieldDef], key: &str) -> Option<(&'static str, Shape)> {
    find_field(defs, &|candidate| candidate == key)
        .or_else(|| find_field(defs, &|candidate| candidate.eq_ignore_ascii_case(key)))
}

fn find_field(defs: &[FieldDef], matches: &dyn Fn(&str) -> bool) -> Option<(&'static str, Shape)> {
    for def in defs {
        let Some(canonical) = naming::file_key(def) else {
            continue;
        };
        let shape = def.shape();
        if def.embedded {
            match &shape {
                Shape::Record(inner) => {
                    if let Some(found) = find_field(inner, matches) {
                        return Some(found);
                    }
                    continue;
                }
                Shape::Map(_) => continue,
                _ => {}
            }
        }
        if std::iter::once(canonical)
            .chain(naming::file_aliases(def))
            .any(matches)
        {
            return Some((canonical, shape));
        }
    }
    None
}

/// Record the lower-cased dotted path of every object key in `value`.
pub fn collect_paths(prefix: &str, value: &Value, out: &mut BTreeSet<String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            let path = join(prefix, &key.to_lowercase());
            collect_paths(&path, child, out);
            out.insert(path);
        }
    }
}
