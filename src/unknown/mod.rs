//! Unknown field detection.
//!
//! The valid paths of a schema type are computed from its static shape,
//! then every decoded document is walked in lockstep against them. A key is
//! valid when it matches a declared path exactly or case-insensitively, sits
//! directly under an open map, or matches a wildcard path segment by segment.
//! Nothing below an open value (`**`) is checked.

mod detect;
mod valid_set;

pub use detect::{detect_unknown, Detector};
pub use valid_set::{ValidFieldSet, ANY_KEY, ANY_VALUE, ELEMENTS};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::*;
    use crate::decoder::{Json, Yaml};
    use crate::error::DecodeError;
    use crate::Schema;

    #[derive(Schema)]
    struct Log {
        pub level: String,
        pub format: String,
    }

    #[derive(Schema)]
    struct Server {
        pub host: String,
        pub port: u16,
    }

    #[derive(Schema)]
    struct Basic {
        pub log: Log,
        pub server: Server,
    }

    #[derive(Schema)]
    struct Fleet {
        pub servers: Vec<Server>,
    }

    #[derive(Schema)]
    struct Settings {
        pub name: String,
        pub settings: HashMap<String, String>,
    }

    #[derive(Schema)]
    struct Chain {
        pub blockchain: String,
        pub rpc: String,
    }

    #[derive(Schema)]
    struct Indexer {
        pub chain: Chain,
        pub enabled: bool,
    }

    #[derive(Schema)]
    struct Chains {
        pub indexers: HashMap<String, Indexer>,
        pub regions: HashMap<String, HashMap<String, Indexer>>,
        pub plugins: HashMap<String, Value>,
        pub extra: Value,
    }

    #[derive(Schema, serde::Deserialize)]
    #[serde(rename_all = "kebab-case")]
    struct Pool {
        pub max_conns: u32,
        #[serde(alias = "timeout")]
        pub idle_timeout: u32,
    }

    #[derive(Schema, serde::Deserialize)]
    struct Database {
        pub pool: Pool,
    }

    fn check<T: crate::Node>(doc: Value) -> Vec<String> {
        let Value::Object(map) = doc else {
            panic!("test documents are objects");
        };
        Detector::for_schema::<T>().unwrap().check(&map)
    }

    fn sorted(mut paths: Vec<String>) -> Vec<String> {
        paths.sort();
        paths
    }

    // ===========================================
    // Scenarios
    // ===========================================

    #[test]
    fn test_reports_root_and_nested_unknowns() {
        let found = check::<Basic>(json!({
            "log": {"level": "debug", "format": "json", "unknown_log_field": true},
            "server": {"host": "localhost", "port": 8080},
            "unknown_root_field": "value"
        }));
        assert_eq!(
            sorted(found),
            vec!["log.unknown_log_field", "unknown_root_field"]
        );
    }

    #[test]
    fn test_keys_follow_serde_renames() {
        let found = check::<Database>(json!({
            "pool": {"max-conns": 7, "max_conns": 7, "timeout": 5, "idle-timeout": 5}
        }));
        assert_eq!(found, vec!["pool.max_conns"]);
    }

    #[test]
    fn test_list_elements_report_plain_paths_once() {
        let found = check::<Fleet>(json!({
            "servers": [
                {"host": "a", "port": 1},
                {"host": "b", "port": 2, "extra": 1},
                {"host": "c", "port": 3, "weight": 5}
            ]
        }));
        assert_eq!(found, vec!["servers.extra", "servers.weight"]);

        let repeated = check::<Fleet>(json!({
            "servers": [{"host": "a", "extra": 1}, {"host": "b", "extra": 2}]
        }));
        assert_eq!(repeated, vec!["servers.extra"]);
    }

    #[test]
    fn test_open_map_accepts_any_key() {
        let found = check::<Settings>(json!({
            "name": "app",
            "settings": {"a": "1", "b": "2", "deeply": {"nested": true}},
            "unrelated": 1
        }));
        assert_eq!(found, vec!["unrelated"]);
    }

    #[test]
    fn test_case_insensitive_keys() {
        for key in ["LEVEL", "level", "Level"] {
            let found = check::<Basic>(json!({"LOG": {key: "debug"}, "Server": {"PORT": 1}}));
            assert!(found.is_empty(), "{key}: {found:?}");
        }
    }

    #[test]
    fn test_map_of_structs_validates_inner_fields() {
        let found = check::<Chains>(json!({
            "indexers": {
                "ethereum": {"chain": {"blockchain": "eth", "rpc": "x", "unexpected": 1}, "enabled": true},
                "polygon": {"chain": {"blockchain": "matic"}, "bogus": false}
            }
        }));
        assert_eq!(
            found,
            vec!["indexers.ethereum.chain.unexpected", "indexers.polygon.bogus"]
        );
    }

    #[test]
    fn test_map_of_maps_of_structs() {
        let found = check::<Chains>(json!({
            "regions": {
                "eu": {"mainnet": {"enabled": true, "chain": {"rpc": "x", "oops": 1}}},
                "us": {"testnet": {"Enabled": false}}
            }
        }));
        assert_eq!(found, vec!["regions.eu.mainnet.chain.oops"]);
    }

    #[test]
    fn test_open_values_are_never_checked() {
        let found = check::<Chains>(json!({
            "plugins": {"auth": {"anything": {"goes": [1, {"deep": true}]}}},
            "extra": {"free": {"form": {"tree": null}}}
        }));
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_invalid_keys_are_not_descended() {
        let found = check::<Basic>(json!({"metrics": {"enabled": true, "port": 9}}));
        assert_eq!(found, vec!["metrics"]);
    }

    // ===========================================
    // Decoding
    // ===========================================

    #[test]
    fn test_detect_with_yaml_decoder() {
        let src = b"log:\n  level: debug\n  colour: red\nserver:\n  port: 1\n";
        let found = detect_unknown::<Basic>(src, &Yaml).unwrap();
        assert_eq!(found, vec!["log.colour"]);
    }

    #[test]
    fn test_falls_back_to_json() {
        let failing = |_: &[u8]| -> Result<Value, DecodeError> { Err(DecodeError::NotATable) };
        let found = detect_unknown::<Basic>(br#"{"nope": 1}"#, &failing).unwrap();
        assert_eq!(found, vec!["nope"]);
    }

    #[test]
    fn test_undecodable_documents_are_skipped() {
        let found = detect_unknown::<Basic>(b"key = value", &Json).unwrap();
        assert!(found.is_empty());

        let found = detect_unknown::<Basic>(b"[1, 2]", &Json).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_non_struct_schema_fails() {
        assert!(detect_unknown::<Vec<String>>(b"{}", &Json).is_err());
    }

    // ===========================================
    // Properties
    // ===========================================

    fn known_document() -> impl Strategy<Value = Value> {
        (
            any::<bool>(),
            prop::collection::vec("[a-z]{1,6}", 0..4),
            prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..4),
        )
            .prop_map(|(upper, hosts, settings)| {
                let level = if upper { "LEVEL" } else { "level" };
                let servers: Vec<Value> = hosts
                    .into_iter()
                    .map(|host| json!({"host": host, "port": 80}))
                    .collect();
                json!({
                    "log": {level: "info", "format": "text"},
                    "servers": servers,
                    "settings": settings,
                })
            })
    }

    #[derive(Schema)]
    struct Mixed {
        pub log: Log,
        pub servers: Vec<Server>,
        pub settings: HashMap<String, String>,
    }

    proptest! {
        #[test]
        fn prop_declared_documents_have_no_unknowns(doc in known_document()) {
            prop_assert!(check::<Mixed>(doc).is_empty());
        }

        #[test]
        fn prop_undeclared_key_reported_exactly_once(
            doc in known_document(),
            extra in "zz[a-z]{1,6}",
        ) {
            let mut doc = doc;
            doc["log"][extra.as_str()] = json!(1);
            doc[extra.as_str()] = json!({"nested": true});

            let found = check::<Mixed>(doc.clone());
            let nested = format!("log.{extra}");
            prop_assert_eq!(found.iter().filter(|p| **p == extra).count(), 1);
            prop_assert_eq!(found.iter().filter(|p| **p == nested).count(), 1);
            prop_assert_eq!(found.len(), 2);
            prop_assert_eq!(sorted(found), sorted(check::<Mixed>(doc)));
        }

        #[test]
        fn prop_open_values_accept_anything(tree in prop::collection::btree_map("[a-z]{1,5}", "[a-z]{0,5}", 0..6)) {
            let doc = json!({"plugins": {"p": {"config": tree}}, "extra": {"nested": {"tree": tree}}});
            prop_assert!(check::<Chains>(doc).is_empty());
        }
    }
}
