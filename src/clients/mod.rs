pub mod llm_client;

use async_trait::async_trait;

use crate::error::GenerationError;

pub use llm_client::LlmClient;

/// 外部文本生成端点
///
/// 只返回原始文本；题目的解析和校验由生成服务负责。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        system_message: Option<&str>,
        user_message: &str,
    ) -> Result<String, GenerationError>;
}
