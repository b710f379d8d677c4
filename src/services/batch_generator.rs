//! 批量生成服务 - 业务能力层
//!
//! 一次请求生成多道题（最多 5 道），用于预先创建整套测验或填充证书题库。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::error::GenerationError;
use crate::models::language::language_name;
use crate::models::{GenerationProgress, Question, QuizConfig, QuizRecord};
use crate::services::prompts;
use crate::services::response_parser::parse_question_batch;
use crate::services::retry::RetryPolicy;
use crate::utils::logging;

/// 单次请求的最大题目数
pub const MAX_BATCH_SIZE: usize = 5;

/// 把总数切成不超过 `MAX_BATCH_SIZE` 的批次
pub fn chunk_sizes(total: usize) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(total.div_ceil(MAX_BATCH_SIZE));
    let mut remaining = total;
    while remaining > 0 {
        let size = remaining.min(MAX_BATCH_SIZE);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

/// 批量生成服务
#[derive(Clone)]
pub struct BatchGenerator {
    backend: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    batch_delay: Duration,
}

impl BatchGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::batch(),
            batch_delay: Duration::from_millis(500),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// 生成一批题目，返回其中结构有效的部分
    ///
    /// `count` 必须在 [1, 5] 内，否则不发请求直接报错。
    pub async fn generate_batch(
        &self,
        count: usize,
        certificate_name: &str,
        language: &str,
    ) -> Result<Vec<Question>, GenerationError> {
        if count == 0 || count > MAX_BATCH_SIZE {
            return Err(GenerationError::BatchSizeOutOfRange {
                requested: count,
                max: MAX_BATCH_SIZE,
            });
        }

        let prompt = prompts::batch_prompt(certificate_name, language_name(language), count);
        let backend = &self.backend;
        let prompt = prompt.as_str();

        let questions = self
            .policy
            .run("批量生成", move |attempt| async move {
                debug!("请求 {} 道题 (第 {} 次尝试)", count, attempt);
                let raw = backend
                    .generate_text(Some(prompts::SYSTEM_MESSAGE), prompt)
                    .await?;
                parse_question_batch(&raw)
            })
            .await?;

        if questions.len() < count {
            debug!("本批只得到 {}/{} 道有效题目", questions.len(), count);
        }
        Ok(questions)
    }

    /// 按批次生成整套测验
    ///
    /// 批次依次请求，中间间隔 `batch_delay`；某批重试耗尽后跳过，继续下一批。
    /// 全部失败时返回 `NothingGenerated`，否则题目数截断到请求的数量。
    /// 配置无效时不发任何请求，返回 `InvalidConfig`。
    pub async fn generate_quiz<F>(
        &self,
        config: &QuizConfig,
        mut on_progress: F,
    ) -> Result<QuizRecord, GenerationError>
    where
        F: FnMut(GenerationProgress),
    {
        config.validate()?;

        let total = config.number_of_questions;
        let batches = chunk_sizes(total);
        let total_batches = batches.len();

        on_progress(GenerationProgress {
            completed: 0,
            total,
            current_batch: 0,
            total_batches,
            status: "Starting quiz generation...".to_string(),
        });

        let mut all_questions: Vec<Question> = Vec::with_capacity(total);

        for (idx, batch_size) in batches.iter().copied().enumerate() {
            let batch_num = idx + 1;
            logging::log_batch_start(batch_num, total_batches, batch_size);

            match self
                .generate_batch(batch_size, &config.certificate_name, &config.language)
                .await
            {
                Ok(questions) => {
                    logging::log_batch_complete(batch_num, questions.len(), batch_size);
                    all_questions.extend(questions);
                }
                Err(e) => {
                    warn!("第 {} 批生成失败，跳过: {}", batch_num, e);
                }
            }

            on_progress(GenerationProgress {
                completed: all_questions.len().min(total),
                total,
                current_batch: batch_num,
                total_batches,
                status: format!("Generated batch {} of {}", batch_num, total_batches),
            });

            if batch_num < total_batches {
                sleep(self.batch_delay).await;
            }
        }

        if all_questions.is_empty() {
            return Err(GenerationError::NothingGenerated);
        }

        all_questions.truncate(total);

        on_progress(GenerationProgress {
            completed: all_questions.len(),
            total,
            current_batch: total_batches,
            total_batches,
            status: "Quiz generation completed!".to_string(),
        });

        Ok(QuizRecord::generated(
            config.certificate_id.clone(),
            config.certificate_name.clone(),
            config.language.clone(),
            all_questions,
        ))
    }
}
