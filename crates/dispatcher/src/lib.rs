//! # Dispatcher
//!
//! 组件间消息分发模块。
//!
//! 负责：
//! - 轮询 backend，投递入站 action call，匹配 ack / response
//! - 维护待发消息队列 (响应插入队首，请求与事件追加到队尾)
//! - 重传、超时升级为 `Timeout` 回调

pub mod backends;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod postman;
pub mod queue;

pub use contracts::{Backend, Header, Payload, Postman};
pub use backends::{LogBackend, LoopbackBackend};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use entry::{Entry, EntryKind, EntryState, ResponseCallback};
pub use error::DispatcherError;
pub use handle::DispatcherHandle;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use postman::{ActionHandler, ComponentPostman, EventListener};
pub use queue::{EntryQueue, IncomingMatch};
