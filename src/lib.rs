//! # Cert Quiz
//!
//! 由 AI 实时出题的认证考试练习引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Clients / Storage）
//! - `clients/` - `TextGenerator` 接口与基于 async-openai 的 `LlmClient`
//! - `storage/` - 键值存储（内存 / 文件）与 `ProgressStore` 持久化
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `QuestionGenerator` - 单题生成（超时 + 重试 + 校验）
//! - `BatchGenerator` - 批量生成（每批最多 5 题）
//! - `CertificationValidator` - 证书名称校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - `QuizNavigation` 答题状态机，不做 I/O
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - `SessionOrchestrator`，持有会话并调度同步/后台出题
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{LlmClient, TextGenerator};
pub use config::Config;
pub use error::{AppError, AppResult, GenerationError};
pub use models::{Question, QuizConfig, QuizRecord, QuizSession};
pub use orchestrator::{SessionOrchestrator, SessionPhase};
pub use services::{BatchGenerator, CertificationValidator, QuestionGenerator, RetryPolicy};
pub use storage::{FileStore, MemoryStore, ProgressStore};
pub use workflow::{NavigationEvent, QuizNavigation};
