//! # Config Loader
//!
//! 节点配置加载：一个 `node.toml` 描述本节点的名字、dispatcher 的 ack/响应
//! 超时与重试次数、本地组件 id，以及可经由 backend 到达的远端组件。
//!
//! 读取后先反序列化为 `NodeBlueprint`，再做组件 id 唯一性与超时范围检查，
//! 通过检查的 blueprint 可直接交给 `dispatcher::create_dispatcher`。
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("node.toml")).unwrap();
//! println!("Node: {}", blueprint.node.name);
//! ```

mod parser;
mod validator;

pub use contracts::NodeBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Loads and checks node blueprints
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a node blueprint from `node.toml` or `node.json`
    ///
    /// # Errors
    /// Unknown extension, unreadable file, malformed content, or a blueprint
    /// the dispatcher cannot run with (duplicate component ids, zero ack timeout).
    pub fn load_from_path(path: &Path) -> Result<NodeBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            ContractError::config_parse(format!(
                "node config {} must end in .toml or .json",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and check a node blueprint held in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<NodeBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Render a blueprint back as `node.toml`
    pub fn to_toml(blueprint: &NodeBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint).map_err(|e| {
            ContractError::config_parse(format!(
                "cannot render node '{}' as TOML: {e}",
                blueprint.node.name
            ))
        })
    }

    /// Render a blueprint as JSON, e.g. for `info --json`
    pub fn to_json(blueprint: &NodeBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint).map_err(|e| {
            ContractError::config_parse(format!(
                "cannot render node '{}' as JSON: {e}",
                blueprint.node.name
            ))
        })
    }
}
