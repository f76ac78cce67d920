use std::collections::HashSet;

use crate::error::StructuralError;
use crate::naming::{self, join};
use crate::schema::{FieldDef, Kind, Node, NodeMut, Record};

use super::field::{FieldDescriptor, MapEntry};

/// Flatten `root` into one descriptor per reachable leaf, in declaration
/// order (map entries in key order).
///
/// Fails when `root` is not a struct or when two leaves resolve to the same
/// dotted name.
pub fn view<T: Node + ?Sized>(root: &mut T) -> Result<Vec<FieldDescriptor<'_>>, StructuralError> {
    match root.node() {
        NodeMut::Record(record) => {
            let mut walker = Walker::default();
            walker.record(record, &Prefix::default(), &[])?;
            Ok(walker.fields)
        }
        NodeMut::Leaf(value) => Err(StructuralError::NotARecord { kind: value.kind() }),
        NodeMut::Entries(_) => Err(StructuralError::NotARecord { kind: Kind::Map }),
    }
}

/// Dotted prefixes in both naming schemes.
#[derive(Default)]
struct Prefix {
    name: String,
    key: String,
}

impl Prefix {
    fn child(&self, name: &str, key: &str) -> Prefix {
        Prefix {
            name: join(&self.name, name),
            key: join(&self.key, key),
        }
    }
}

#[derive(Default)]
struct Walker<'a> {
    fields: Vec<FieldDescriptor<'a>>,
    seen: HashSet<String>,
}

impl<'a> Walker<'a> {
    fn record(
        &mut self,
        record: &'a mut dyn Record,
        prefix: &Prefix,
        entries: &[MapEntry],
    ) -> Result<(), StructuralError> {
        let defs = record.fields();
        for (def, node) in defs.iter().zip(record.nodes()) {
            let flattened = def.embedded && !matches!(node, NodeMut::Leaf(_));
            let path = if flattened {
                Prefix {
                    name: prefix.name.clone(),
                    key: prefix.key.clone(),
                }
            } else {
                let name = naming::field_name(def);
                prefix.child(name, naming::file_key(def).unwrap_or(name))
            };
            self.node(def, node, path, entries)?;
        }
        Ok(())
    }

    fn node(
        &mut self,
        def: &'static FieldDef,
        node: NodeMut<'a>,
        path: Prefix,
        entries: &[MapEntry],
    ) -> Result<(), StructuralError> {
        match node {
            NodeMut::Record(record) => self.record(record, &path, entries),
            NodeMut::Entries(items) => {
                for (key, item) in items {
                    let mut chain = entries.to_vec();
                    chain.push(MapEntry {
                        map: path.name.clone(),
                        key: key.clone(),
                    });
                    self.node(def, item, path.child(&key, &key), &chain)?;
                }
                Ok(())
            }
            NodeMut::Leaf(value) => {
                if !self.seen.insert(path.name.clone()) {
                    return Err(StructuralError::DuplicatePath(path.name));
                }
                self.fields.push(FieldDescriptor::new(
                    path.name,
                    path.key,
                    def,
                    value,
                    entries.to_vec(),
                ));
                Ok(())
            }
        }
    }
}
