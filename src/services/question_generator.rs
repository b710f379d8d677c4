//! 单题生成服务 - 业务能力层
//!
//! 只负责"生成一道合格的题"，不关心会话流程

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::TextGenerator;
use crate::error::GenerationError;
use crate::models::language::language_name;
use crate::models::Question;
use crate::services::prompts;
use crate::services::response_parser::parse_question;
use crate::services::retry::RetryPolicy;
use crate::utils::logging::truncate_text;

/// 单题生成服务
///
/// 职责：
/// - 构建单题提示词
/// - 超时 + 重试 + 退避
/// - 解析并校验响应，分配题目 id
#[derive(Clone)]
pub struct QuestionGenerator {
    backend: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl QuestionGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::single_question(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 生成一道题
    ///
    /// # 参数
    /// - `certificate_name`: 证书名称
    /// - `language`: 语言代码（如 "en"）
    /// - `question_number`: 第几题（从 1 开始，只用于提示模型换主题）
    pub async fn generate_one(
        &self,
        certificate_name: &str,
        language: &str,
        question_number: usize,
    ) -> Result<Question, GenerationError> {
        let prompt = prompts::single_question_prompt(
            certificate_name,
            language_name(language),
            question_number,
        );
        let label = format!("第 {} 题生成", question_number);

        let backend = &self.backend;
        let prompt = prompt.as_str();
        let question = self
            .policy
            .run(&label, move |attempt| async move {
                debug!("请求第 {} 题 (第 {} 次尝试)", question_number, attempt);
                let raw = backend
                    .generate_text(Some(prompts::SYSTEM_MESSAGE), prompt)
                    .await?;
                parse_question(&raw)
            })
            .await?;

        info!(
            "✓ 第 {} 题生成成功: {}",
            question_number,
            truncate_text(&question.question, 60)
        );
        Ok(question)
    }
}
