//! Flat view of a schema instance.
//!
//! [`view`] walks a configuration struct and returns one
//! [`FieldDescriptor`] per leaf, named by its dotted path:
//! - nested structs add a segment, embedded structs do not
//! - maps whose values are structs add one segment per key
//! - everything else (scalars, lists, maps of scalars) is a leaf

pub(crate) mod coerce;
mod field;
mod walk;

pub use field::{FieldDescriptor, MapEntry};
pub use walk::view;

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    use super::*;
    use crate::error::StructuralError;
    use crate::schema::Kind;
    use crate::Schema;

    #[derive(Schema, Default)]
    struct Redis {
        pub host: String,
        #[config(default = "6379")]
        pub port: u16,
    }

    #[derive(Schema, Default)]
    struct Meta {
        pub version: String,
    }

    #[derive(Schema, Default)]
    struct App {
        #[config(name = "Name")]
        pub name: String,
        pub debug: bool,
        pub timeout: Duration,
        pub tags: Vec<String>,
        pub redis: Redis,
        #[config(embed)]
        pub meta: Meta,
        #[allow(dead_code)]
        internal: u32,
    }

    fn names(fields: &[FieldDescriptor<'_>]) -> Vec<String> {
        fields.iter().map(|f| f.name().to_string()).collect()
    }

    // ===========================================
    // Walking
    // ===========================================

    #[test]
    fn test_view_lists_leaves_in_declaration_order() {
        let mut app = App::default();
        let fields = view(&mut app).unwrap();

        assert_eq!(
            names(&fields),
            vec!["Name", "debug", "timeout", "tags", "redis.host", "redis.port", "version"]
        );
        assert_eq!(fields[0].key_path(), "name");
        assert_eq!(fields[2].kind(), Kind::Duration);
        assert_eq!(fields[3].kind(), Kind::List);
        assert_eq!(fields[5].default_value(), Some("6379"));
    }

    #[test]
    fn test_view_rejects_non_struct_root() {
        let mut port: u16 = 0;
        let err = view(&mut port).unwrap_err();
        assert_eq!(err, StructuralError::NotARecord { kind: Kind::Uint });

        let mut boxed = Box::new(App::default());
        assert!(view(&mut boxed).is_ok());
    }

    #[test]
    fn test_set_coerces_into_the_struct() {
        let mut app = App::default();
        {
            let mut fields = view(&mut app).unwrap();
            for f in fields.iter_mut() {
                let name = f.name().to_string();
                match name.as_str() {
                    "debug" => f.set("true").unwrap(),
                    "timeout" => f.set("1h30m").unwrap(),
                    "tags" => f.set("a, b").unwrap(),
                    "redis.port" => f.set("0x10").unwrap(),
                    "version" => f.set("1.2.3").unwrap(),
                    _ => {}
                }
            }
        }

        assert!(app.debug);
        assert_eq!(app.timeout, Duration::from_secs(5_400));
        assert_eq!(app.tags, vec!["a", "b"]);
        assert_eq!(app.redis.port, 16);
        assert_eq!(app.meta.version, "1.2.3");
    }

    #[test]
    fn test_failed_set_leaves_value_and_names_field() {
        let mut app = App::default();
        app.redis.port = 6379;
        {
            let mut fields = view(&mut app).unwrap();
            let port = fields
                .iter_mut()
                .find(|f| f.name() == "redis.port")
                .unwrap();
            let err = port.set("99999").unwrap_err();
            assert!(err.to_string().contains("redis.port"));
        }
        assert_eq!(app.redis.port, 6379);
    }

    #[test]
    fn test_zero_checks_and_render() {
        let mut app = App {
            debug: true,
            ..Default::default()
        };
        let fields = view(&mut app).unwrap();
        assert!(fields[0].is_zero());
        assert!(!fields[1].is_zero());
        assert_eq!(fields[1].render(), "true");
        assert_eq!(fields[2].render(), "0s");
    }

    #[test]
    fn test_metadata_is_per_descriptor() {
        let mut app = App::default();
        let mut fields = view(&mut app).unwrap();
        fields[0]
            .meta_mut()
            .insert("env".to_string(), "APP_NAME".to_string());

        assert_eq!(fields[0].meta().get("env").map(String::as_str), Some("APP_NAME"));
        assert!(fields[1].meta().is_empty());
    }

    // ===========================================
    // Maps of structs
    // ===========================================

    #[derive(Schema, Default)]
    struct Indexer {
        #[config(default = "12")]
        pub min_confirmations: u32,
        pub parser: Parser,
    }

    #[derive(Schema, Default, serde::Deserialize)]
    struct Parser {
        #[serde(rename = "Enabled")]
        pub enabled: bool,
    }

    #[derive(Schema, Default)]
    struct Chains {
        pub indexers: HashMap<String, Indexer>,
        pub labels: HashMap<String, String>,
        pub regions: BTreeMap<String, BTreeMap<String, Indexer>>,
        pub fallback: Option<Indexer>,
    }

    #[test]
    fn test_map_of_structs_adds_key_segments_in_sorted_order() {
        let mut chains = Chains::default();
        chains
            .indexers
            .insert("polygon".to_string(), Indexer::default());
        chains
            .indexers
            .insert("ethereum".to_string(), Indexer::default());

        let fields = view(&mut chains).unwrap();
        assert_eq!(
            names(&fields),
            vec![
                "indexers.ethereum.min_confirmations",
                "indexers.ethereum.parser.enabled",
                "indexers.polygon.min_confirmations",
                "indexers.polygon.parser.enabled",
                "labels",
                "fallback",
            ]
        );
        assert_eq!(fields[1].key_path(), "indexers.ethereum.parser.Enabled");
        assert_eq!(
            fields[1].map_entries(),
            &[MapEntry {
                map: "indexers".to_string(),
                key: "ethereum".to_string()
            }]
        );
        assert_eq!(fields[4].kind(), Kind::Map);
        assert_eq!(fields[5].kind(), Kind::Record);
    }

    #[test]
    fn test_set_through_map_entry_writes_back() {
        let mut chains = Chains::default();
        chains
            .indexers
            .insert("ethereum".to_string(), Indexer::default());
        {
            let mut fields = view(&mut chains).unwrap();
            for f in fields.iter_mut() {
                if f.name() == "indexers.ethereum.min_confirmations" {
                    f.set("12").unwrap();
                }
            }
        }
        assert_eq!(chains.indexers["ethereum"].min_confirmations, 12);
    }

    #[test]
    fn test_nested_maps_compose_entries() {
        let mut chains = Chains::default();
        let mut inner = BTreeMap::new();
        inner.insert("mainnet".to_string(), Indexer::default());
        chains.regions.insert("eu".to_string(), inner);

        let fields = view(&mut chains).unwrap();
        let field = fields
            .iter()
            .find(|f| f.name() == "regions.eu.mainnet.min_confirmations")
            .unwrap();
        assert_eq!(
            field.map_entries(),
            &[
                MapEntry {
                    map: "regions".to_string(),
                    key: "eu".to_string()
                },
                MapEntry {
                    map: "regions.eu".to_string(),
                    key: "mainnet".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_populated_option_is_walked() {
        let mut chains = Chains {
            fallback: Some(Indexer::default()),
            ..Default::default()
        };
        let fields = view(&mut chains).unwrap();
        assert!(names(&fields).contains(&"fallback.parser.enabled".to_string()));
    }

    #[derive(Schema, Default)]
    struct Clash {
        #[config(name = "port")]
        pub a: u16,
        #[config(name = "port")]
        pub b: u16,
    }

    #[test]
    fn test_duplicate_names_are_structural_errors() {
        let mut clash = Clash::default();
        let err = view(&mut clash).unwrap_err();
        assert_eq!(err, StructuralError::DuplicatePath("port".to_string()));
    }
}
