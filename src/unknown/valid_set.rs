use std::collections::BTreeSet;

use crate::error::StructuralError;
use crate::naming::{self, join};
use crate::schema::{FieldDef, Node, Shape};

/// Marker segment: any key at this depth.
pub const ANY_KEY: &str = "*";
/// Marker segment: any sub-structure below this path.
pub const ANY_VALUE: &str = "**";
/// Suffix of a segment addressing the elements of a list.
pub const ELEMENTS: &str = "[]";

/// Dotted paths a configuration file may contain for a schema type.
///
/// Besides exact paths the set holds open-map markers (`a.*`), open-value
/// markers (`a.**`) and list element prefixes (`a[].b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidFieldSet {
    paths: BTreeSet<String>,
}

impl ValidFieldSet {
    /// Valid paths of schema type `T`, which must be a struct.
    pub fn of<T: Node>() -> Result<Self, StructuralError> {
        match T::shape() {
            Shape::Record(defs) => Ok(Self::from_fields(defs)),
            other => Err(StructuralError::NotARecord { kind: other.kind() }),
        }
    }

    pub fn from_fields(defs: &[FieldDef]) -> Self {
        let mut set = ValidFieldSet::default();
        set.fields("", defs);
        set
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn fields(&mut self, prefix: &str, defs: &[FieldDef]) {
        for def in defs {
            let Some(key) = naming::file_key(def) else {
                continue;
            };
            let shape = def.shape();

            if def.embedded {
                match &shape {
                    Shape::Record(inner) => {
                        self.fields(prefix, inner);
                        continue;
                    }
                    Shape::Map(value) => {
                        self.map(prefix, value);
                        continue;
                    }
                    _ => {}
                }
            }

            for key in std::iter::once(key).chain(naming::file_aliases(def)) {
                let path = join(prefix, key);
                self.paths.insert(path.clone());
                self.shape(&path, &shape);
            }
        }
    }

    fn shape(&mut self, path: &str, shape: &Shape) {
        match shape {
            Shape::Record(defs) => self.fields(path, defs),
            Shape::Seq(element) => match element.as_ref() {
                Shape::Dynamic => {
                    self.paths.insert(format!("{path}{ELEMENTS}.{ANY_VALUE}"));
                }
                Shape::Scalar(_) => {}
                structured => self.shape(&format!("{path}{ELEMENTS}"), structured),
            },
            Shape::Map(value) => self.map(path, value),
            Shape::Dynamic => {
                self.paths.insert(join(path, ANY_VALUE));
            }
            Shape::Scalar(_) => {}
        }
    }

    fn map(&mut self, path: &str, value: &Shape) {
        let keys = join(path, ANY_KEY);
        self.paths.insert(keys.clone());
        match value {
            Shape::Dynamic => {
                self.paths.insert(join(path, ANY_VALUE));
            }
            other => self.shape(&keys, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::schema::Kind;
    use crate::Schema;

    #[derive(Schema, serde::Deserialize)]
    struct Log {
        pub level: String,
        #[serde(rename = "fmt")]
        pub format: String,
    }

    #[derive(Schema, serde::Deserialize)]
    struct Server {
        #[serde(rename = "hostname")]
        pub host: String,
        pub port: u16,
    }

    #[derive(Schema, Default)]
    struct Common {
        pub version: String,
    }

    #[derive(Schema, serde::Deserialize)]
    struct Root {
        pub log: Log,
        pub servers: Vec<Server>,
        pub settings: HashMap<String, String>,
        pub extra: HashMap<String, serde_json::Value>,
        pub raw: serde_json::Value,
        pub groups: HashMap<String, HashMap<String, Server>>,
        #[serde(skip)]
        pub runtime_only: u8,
        #[config(embed)]
        #[serde(skip)]
        pub common: Common,
    }

    fn paths(set: &ValidFieldSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn test_builds_markers_for_every_shape() {
        let set = ValidFieldSet::of::<Root>().unwrap();
        assert_eq!(
            paths(&set),
            vec![
                "extra",
                "extra.*",
                "extra.**",
                "groups",
                "groups.*",
                "groups.*.*",
                "groups.*.*.hostname",
                "groups.*.*.port",
                "log",
                "log.fmt",
                "log.level",
                "raw",
                "raw.**",
                "servers",
                "servers[].hostname",
                "servers[].port",
                "settings",
                "settings.*",
            ]
        );
    }

    #[test]
    fn test_embedded_fields_join_parent_level() {
        #[derive(Schema)]
        struct Wrapper {
            #[config(embed)]
            pub common: Common,
            pub name: String,
        }

        let set = ValidFieldSet::of::<Wrapper>().unwrap();
        assert_eq!(paths(&set), vec!["name", "version"]);
    }

    #[test]
    fn test_embedded_map_opens_its_level() {
        #[derive(Schema)]
        struct Loose {
            pub name: String,
            #[config(embed)]
            pub rest: HashMap<String, String>,
        }

        let set = ValidFieldSet::of::<Loose>().unwrap();
        assert_eq!(paths(&set), vec!["*", "name"]);
    }

    #[test]
    fn test_container_rename_rule_and_aliases() {
        #[derive(Schema, serde::Deserialize)]
        #[serde(rename_all = "kebab-case")]
        struct Pool {
            pub max_conns: u32,
            #[serde(rename = "idle")]
            pub idle_timeout: u32,
            #[serde(alias = "retries")]
            pub retry_limit: u32,
        }

        #[derive(Schema, serde::Deserialize)]
        struct Db {
            pub pool: Pool,
        }

        let set = ValidFieldSet::of::<Db>().unwrap();
        assert_eq!(
            paths(&set),
            vec![
                "pool",
                "pool.idle",
                "pool.max-conns",
                "pool.retries",
                "pool.retry-limit",
            ]
        );
    }

    #[test]
    fn test_non_struct_schema_is_structural_error() {
        let err = ValidFieldSet::of::<Vec<u8>>().unwrap_err();
        assert_eq!(err, StructuralError::NotARecord { kind: Kind::List });
    }
}
