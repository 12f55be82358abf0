//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Group>)
//!     ↓
//! workflow::GroupFlow (处理单个组的四个阶段)
//!     ↓
//! services (能力层：catalog / resolve / download / normalize)
//!     ↓
//! infrastructure (基础设施：BrowserSession)
//! ```

pub mod batch_processor;

pub use batch_processor::{App, RunStats};
