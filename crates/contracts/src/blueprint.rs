//! NodeBlueprint - Config Loader 输出
//!
//! 描述一个节点的完整配置：节点名称、分发器时序参数、本地组件与远端组件。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::ComponentId;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的节点配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 节点设置
    #[validate(nested)]
    pub node: NodeConfig,

    /// 分发器时序参数
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherConfig,

    /// 运行在本节点上的组件
    #[serde(default)]
    #[validate(nested)]
    pub components: Vec<ComponentConfig>,

    /// 通过 backend 可达的远端组件
    #[serde(default)]
    #[validate(nested)]
    pub peers: Vec<ComponentConfig>,
}

/// 节点配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeConfig {
    /// 节点名称 (用于日志/指标)
    #[validate(length(min = 1, message = "node name cannot be empty"))]
    pub name: String,
}

/// 组件配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ComponentConfig {
    /// 组件地址，0 保留给事件
    #[validate(range(min = 1, message = "component id 0 is reserved for events"))]
    pub id: ComponentId,

    /// 组件名称
    #[validate(length(min = 1, message = "component name cannot be empty"))]
    pub name: String,
}

/// Dispatcher timing and retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DispatcherConfig {
    /// Time to wait for a transport acknowledge before retransmitting
    #[serde(default = "default_ack_timeout_ms")]
    #[validate(range(min = 1, message = "ack_timeout_ms must be > 0"))]
    pub ack_timeout_ms: u64,

    /// Retransmissions before a request is given up (total attempts = retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,

    /// Time to wait for a response once the request was acknowledged.
    ///
    /// `None` waits forever.
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

fn default_ack_timeout_ms() -> u64 {
    100
}

fn default_max_retries() -> u8 {
    2
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
            max_retries: default_max_retries(),
            response_timeout_ms: None,
        }
    }
}

impl DispatcherConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

impl NodeBlueprint {
    /// Whether `id` names a component hosted on this node
    pub fn hosts(&self, id: ComponentId) -> bool {
        self.components.iter().any(|component| component.id == id)
    }

    /// Local components followed by peers
    pub fn all_components(&self) -> impl Iterator<Item = &ComponentConfig> {
        self.components.iter().chain(self.peers.iter())
    }
}
