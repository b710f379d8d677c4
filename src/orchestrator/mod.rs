//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次测验会话的调度，是整个系统的"指挥中心"。
//!
//! - 持有会话、导航状态机、题目生成器和进度存储
//! - 决定何时同步出题、何时交给后台任务
//! - 决定何时保存进度
//!
//! ## 层次关系
//!
//! ```text
//! session_orchestrator (一次测验会话)
//!     ↓
//! workflow::QuizNavigation (答题状态机，无 I/O)
//!     ↓
//! services (能力层：单题生成 / 批量生成 / 证书校验)
//!     ↓
//! clients + storage (基础设施：AI 接口、键值存储)
//! ```

pub mod session_orchestrator;

pub use session_orchestrator::{SessionOrchestrator, SessionPhase, DEFAULT_STAGGER};
