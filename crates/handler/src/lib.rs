//! # 事件处理核心
//!
//! 防抖引擎、计数器、健康上报、队列订阅框架和各事件流的业务处理。

pub mod completion;
pub mod context;
pub mod counters;
pub mod debounce;
pub mod handlers;
pub mod health;
pub mod subscriber;

pub use completion::Completion;
pub use context::{EventContext, HandlerSettings};
pub use counters::CounterStore;
pub use debounce::Debouncer;
pub use health::HealthReporter;
pub use subscriber::{dispatch, EventSubscriber, StreamKind, TOPOLOGY};
