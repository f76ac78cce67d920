//! Field name resolution shared by the walker, the unknown-field detector
//! and the source plugins.

use crate::schema::FieldDef;

/// Annotation overriding a field's name in flat views.
pub const NAME_TAG: &str = "name";

/// serde's deserialize-side name, or `-` when serde skips the field.
pub const SERDE_TAG: &str = "serde";

/// Extra key serde accepts for a field.
pub const ALIAS_TAG: &str = "alias";

/// Name segment used in flat views: the `name` override when non-empty,
/// else the declared identifier.
pub fn field_name(def: &FieldDef) -> &'static str {
    match def.tag(NAME_TAG) {
        Some(name) if !name.is_empty() => name,
        _ => def.ident,
    }
}

/// Key a field carries in decoded files, or `None` when serde skips it.
///
/// This is the key serde deserializes: the field's `rename` (or the
/// container's `rename_all` applied to it), else the identifier. The `name`
/// override only affects flat names.
pub fn file_key(def: &FieldDef) -> Option<&'static str> {
    match def.tag(SERDE_TAG) {
        Some("-") => None,
        Some(key) if !key.is_empty() => Some(key),
        _ => Some(def.ident),
    }
}

/// Additional keys serde accepts for a field.
pub fn file_aliases(def: &FieldDef) -> impl Iterator<Item = &'static str> {
    def.tags
        .iter()
        .filter(|(ns, _)| *ns == ALIAS_TAG)
        .map(|(_, alias)| *alias)
}

/// Join a dotted prefix and a segment.
pub fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Lower,
    Upper,
    Digit,
    Other,
}

fn class_of(c: char) -> CharClass {
    if c.is_lowercase() {
        CharClass::Lower
    } else if c.is_uppercase() {
        CharClass::Upper
    } else if c.is_numeric() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

/// Split a dotted field name into words.
///
/// `.`, `_` and `-` separate words; a lower-to-upper transition starts a new
/// word; in an uppercase run followed by lowercase the last capital starts
/// the next word (`PDFLoader` -> `PDF`, `Loader`); digits stay attached to a
/// preceding uppercase run (`S3Bucket` -> `S3`, `Bucket`).
pub fn split_words(name: &str) -> Vec<String> {
    name.split(['.', '_', '-'])
        .flat_map(segment_words)
        .collect()
}

fn segment_words(segment: &str) -> Vec<String> {
    let mut runs: Vec<(CharClass, Vec<char>)> = Vec::new();
    for c in segment.chars() {
        let class = class_of(c);
        match runs.last_mut() {
            Some((last, chars)) if *last == class => chars.push(c),
            _ => runs.push((class, vec![c])),
        }
    }

    for i in 1..runs.len() {
        if runs[i - 1].0 == CharClass::Upper && runs[i].0 == CharClass::Lower {
            if let Some(c) = runs[i - 1].1.pop() {
                runs[i].1.insert(0, c);
            }
        }
    }

    let mut words: Vec<String> = Vec::new();
    let mut previous = None;
    for (class, chars) in runs {
        if chars.is_empty() {
            continue;
        }
        let word: String = chars.into_iter().collect();
        let attach = previous == Some(CharClass::Upper) && class == CharClass::Digit;
        previous = Some(class);
        if attach {
            if let Some(last) = words.last_mut() {
                last.push_str(&word);
                continue;
            }
        }
        words.push(word);
    }
    words
}

/// `UPPER_SNAKE` form of a dotted name: `redis.maxConns` -> `REDIS_MAX_CONNS`.
pub fn env_name(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Long flag form of a dotted name: `redis.maxConns` -> `redis-max-conns`.
pub fn flag_name(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
