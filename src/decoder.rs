//! Decoders turning raw configuration documents into a generic tree.

use serde_json::Value;

use crate::error::DecodeError;

/// Decodes raw bytes into a generic keyed tree.
pub trait Decoder {
    fn decode(&self, src: &[u8]) -> Result<Value, DecodeError>;
}

impl<F> Decoder for F
where
    F: Fn(&[u8]) -> Result<Value, DecodeError>,
{
    fn decode(&self, src: &[u8]) -> Result<Value, DecodeError> {
        self(src)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Decoder for Json {
    fn decode(&self, src: &[u8]) -> Result<Value, DecodeError> {
        Ok(serde_json::from_slice(src)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl Decoder for Yaml {
    fn decode(&self, src: &[u8]) -> Result<Value, DecodeError> {
        Ok(serde_yaml::from_slice(src)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

impl Decoder for Toml {
    fn decode(&self, src: &[u8]) -> Result<Value, DecodeError> {
        let text = std::str::from_utf8(src)?;
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_decodes_nested_maps() {
        let value = Yaml.decode(b"log:\n  level: debug\nports: [80, 443]\n").unwrap();
        assert_eq!(value, json!({"log": {"level": "debug"}, "ports": [80, 443]}));
    }

    #[test]
    fn test_toml_decodes_tables() {
        let value = Toml
            .decode(b"[server]\nhost = \"localhost\"\nport = 8080\n")
            .unwrap();
        assert_eq!(value, json!({"server": {"host": "localhost", "port": 8080}}));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(Json.decode(b"{"), Err(DecodeError::Json(_))));
        assert!(matches!(Toml.decode(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));
        assert!(matches!(Toml.decode(b"= broken"), Err(DecodeError::Toml(_))));
    }

    #[test]
    fn test_closure_decoder() {
        let decoder = |_: &[u8]| -> Result<Value, DecodeError> { Ok(json!({"a": 1})) };
        assert_eq!(decoder.decode(b"ignored").unwrap(), json!({"a": 1}));
    }
}
