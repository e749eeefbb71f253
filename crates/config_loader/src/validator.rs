//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive)：节点名称非空、组件 id 非 0、ack_timeout_ms > 0
//! - 组件 id 在 components 与 peers 之间唯一
//! - response_timeout_ms 若设置则 > 0

use std::collections::HashSet;

use contracts::{ContractError, NodeBlueprint};
use ::validator::Validate;

/// 校验 NodeBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_component_ids(blueprint)?;
    validate_response_timeout(blueprint)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// 校验组件 id 唯一性 (本地组件与远端组件共享地址空间)
fn validate_component_ids(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for component in blueprint.all_components() {
        if !seen.insert(component.id) {
            return Err(ContractError::config_validation(
                format!("components[id={}]", component.id),
                format!("duplicate component id (name '{}')", component.name),
            ));
        }
    }
    Ok(())
}

/// 校验响应超时
fn validate_response_timeout(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    if blueprint.dispatcher.response_timeout_ms == Some(0) {
        return Err(ContractError::config_validation(
            "dispatcher.response_timeout_ms",
            "response_timeout_ms must be > 0 when set",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ComponentConfig, ConfigVersion, DispatcherConfig, NodeConfig};

    fn minimal_blueprint() -> NodeBlueprint {
        NodeBlueprint {
            version: ConfigVersion::V1,
            node: NodeConfig {
                name: "board-a".into(),
            },
            dispatcher: DispatcherConfig::default(),
            components: vec![ComponentConfig {
                id: 1,
                name: "driver".into(),
            }],
            peers: vec![ComponentConfig {
                id: 10,
                name: "sensor-hub".into(),
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_component_id() {
        let mut bp = minimal_blueprint();
        bp.peers[0].id = 1;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate component id"), "got: {err}");
    }

    #[test]
    fn test_event_address_reserved() {
        let mut bp = minimal_blueprint();
        bp.peers[0].id = 0;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("reserved for events"), "got: {err}");
    }

    #[test]
    fn test_zero_ack_timeout() {
        let mut bp = minimal_blueprint();
        bp.dispatcher.ack_timeout_ms = 0;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("ack_timeout_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_response_timeout() {
        let mut bp = minimal_blueprint();
        bp.dispatcher.response_timeout_ms = Some(0);
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("response_timeout_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_node_name() {
        let mut bp = minimal_blueprint();
        bp.node.name = String::new();
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
