//! node.toml / node.json 反序列化
//!
//! 只做语法与类型层面的检查 (组件 id 必须落在 u8 内)，语义检查交给 `validator`。

use contracts::{ContractError, NodeBlueprint};
use std::path::Path;

/// On-disk encoding of a node blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `node.toml`
    Toml,
    /// `node.json`, same schema
    Json,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Deserialize a blueprint, keeping the serde error as source
pub fn parse(content: &str, format: ConfigFormat) -> Result<NodeBlueprint, ContractError> {
    let result: Result<NodeBlueprint, _> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(box_source),
        ConfigFormat::Json => serde_json::from_str(content).map_err(box_source),
    };
    result.map_err(|source| ContractError::ConfigParse {
        message: format!("malformed {} node blueprint: {source}", format.label()),
        source: Some(source),
    })
}

fn box_source<E>(e: E) -> Box<dyn std::error::Error + Send + Sync>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[node]
name = "board-a"

[[components]]
id = 1
name = "driver"
"#;
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.node.name, "board-a");
        assert_eq!(bp.components.len(), 1);
        assert!(bp.peers.is_empty());
        assert_eq!(bp.dispatcher.ack_timeout_ms, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "node": { "name": "board-a" },
            "dispatcher": { "ack_timeout_ms": 50, "response_timeout_ms": 1000 },
            "components": [{ "id": 1, "name": "driver" }],
            "peers": [{ "id": 10, "name": "sensor-hub" }]
        }"#;
        let result = parse(content, ConfigFormat::Json);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.dispatcher.ack_timeout_ms, 50);
        assert_eq!(bp.dispatcher.response_timeout_ms, Some(1000));
        assert_eq!(bp.peers[0].id, 10);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        assert!(err.to_string().contains("malformed TOML node blueprint"));
    }

    #[test]
    fn test_component_id_out_of_range() {
        let content = r#"
[node]
name = "board-a"

[[components]]
id = 300
name = "driver"
"#;
        assert!(parse(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("boards/a/node.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("node")), None);
    }
}
