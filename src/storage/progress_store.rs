//! 进度持久化
//!
//! 职责：
//! - 会话、测验、证书、题库、设置的读写
//! - 存储内容损坏时退回空值并告警，不让读取失败中断流程
//! - 测验 JSON 导入导出、存储统计

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::models::{AppSettings, Certificate, Question, QuestionSet, QuizRecord, QuizSession};
use crate::storage::kv_store::KeyValueStore;

pub const QUIZZES_KEY: &str = "quizcraft_quizzes";
pub const SESSIONS_KEY: &str = "quizcraft_sessions";
pub const CERTIFICATES_KEY: &str = "quizcraft_certificates";
pub const QUESTION_SETS_KEY: &str = "quizcraft_question_sets";
pub const SETTINGS_KEY: &str = "quizcraft_settings";

const ALL_KEYS: [&str; 5] = [
    QUIZZES_KEY,
    SESSIONS_KEY,
    CERTIFICATES_KEY,
    QUESTION_SETS_KEY,
    SETTINGS_KEY,
];

/// 存储统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub quiz_count: usize,
    pub session_count: usize,
    pub estimated_size: String,
}

/// 进度存储
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn load_or_default<T>(&self, key: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Default,
    {
        let Some(text) = self.kv.get(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str::<Option<T>>(&text) {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(e) => {
                warn!("存储数据 {} 无法解析，按空值处理: {}", key, e);
                Ok(T::default())
            }
        }
    }

    async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.kv.set(key, &text).await
    }

    // ========== 会话 ==========

    /// 读取全部会话，并修正分数缓存
    pub async fn load_sessions(&self) -> Result<HashMap<String, QuizSession>, StorageError> {
        let pairs: Vec<(String, QuizSession)> = self.load_or_default(SESSIONS_KEY).await?;

        Ok(pairs
            .into_iter()
            .map(|(id, mut session)| {
                if session.normalize() {
                    warn!("会话 {} 的分数与答题记录不一致，已按记录修正", id);
                }
                (id, session)
            })
            .collect())
    }

    /// 以 `[id, session]` 数组的形式保存全部会话（按创建时间排序）
    pub async fn save_sessions(&self, sessions: &HashMap<String, QuizSession>) -> Result<(), StorageError> {
        let mut pairs: Vec<(&String, &QuizSession)> = sessions.iter().collect();
        pairs.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then_with(|| a.0.cmp(b.0)));
        self.store(SESSIONS_KEY, &pairs).await
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<QuizSession>, StorageError> {
        Ok(self.load_sessions().await?.remove(session_id))
    }

    /// 按 id 插入或替换会话
    pub async fn save_progress(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut sessions = self.load_sessions().await?;
        sessions.insert(session.id.clone(), session.clone());
        self.save_sessions(&sessions).await?;
        debug!(
            "会话 {} 已保存 ({}/{} 题已作答)",
            session.id,
            session.answers.len(),
            session.target_questions
        );
        Ok(())
    }

    /// 保存已完成的会话
    ///
    /// 重做已保存的测验时把原测验标记为完成；否则另存一份 "(Complete)" 测验记录。
    pub async fn save_completion(
        &self,
        session: &QuizSession,
        source_quiz_id: Option<&str>,
    ) -> Result<(), StorageError> {
        self.save_progress(session).await?;

        match source_quiz_id {
            Some(quiz_id) => {
                if !self.mark_quiz_complete(quiz_id).await? {
                    warn!("重做的测验 {} 已不存在，跳过标记", quiz_id);
                }
            }
            None => {
                self.upsert_quiz(QuizRecord::from_completed_session(session)).await?;
            }
        }
        info!("✓ 已完成的测验已保存: {}", session.id);
        Ok(())
    }

    // ========== 测验 ==========

    pub async fn load_quizzes(&self) -> Result<Vec<QuizRecord>, StorageError> {
        self.load_or_default(QUIZZES_KEY).await
    }

    pub async fn save_quizzes(&self, quizzes: &[QuizRecord]) -> Result<(), StorageError> {
        self.store(QUIZZES_KEY, quizzes).await
    }

    pub async fn find_quiz(&self, quiz_id: &str) -> Result<Option<QuizRecord>, StorageError> {
        Ok(self
            .load_quizzes()
            .await?
            .into_iter()
            .find(|q| q.id == quiz_id))
    }

    /// 按 id 插入或替换测验
    pub async fn upsert_quiz(&self, quiz: QuizRecord) -> Result<(), StorageError> {
        let mut quizzes = self.load_quizzes().await?;
        match quizzes.iter_mut().find(|q| q.id == quiz.id) {
            Some(existing) => *existing = quiz,
            None => quizzes.push(quiz),
        }
        self.save_quizzes(&quizzes).await
    }

    /// 把测验标题标记为已完成，返回是否找到该测验
    pub async fn mark_quiz_complete(&self, quiz_id: &str) -> Result<bool, StorageError> {
        let mut quizzes = self.load_quizzes().await?;
        let Some(quiz) = quizzes.iter_mut().find(|q| q.id == quiz_id) else {
            return Ok(false);
        };
        quiz.mark_complete();
        self.save_quizzes(&quizzes).await?;
        Ok(true)
    }

    /// 导出测验为格式化的 JSON 文本
    pub async fn export_quiz_json(&self, quiz_id: &str) -> Result<String, StorageError> {
        let quiz = self
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                id: quiz_id.to_string(),
            })?;
        Ok(serde_json::to_string_pretty(&quiz)?)
    }

    /// 导入测验 JSON，校验后按 id 写入
    pub async fn import_quiz_json(&self, text: &str) -> Result<QuizRecord, StorageError> {
        let quiz = parse_quiz_import(text)?;
        self.upsert_quiz(quiz.clone()).await?;
        info!("✓ 已导入测验: {} ({} 题)", quiz.title, quiz.questions.len());
        Ok(quiz)
    }

    // ========== 证书与题库 ==========

    pub async fn load_certificates(&self) -> Result<Vec<Certificate>, StorageError> {
        self.load_or_default(CERTIFICATES_KEY).await
    }

    pub async fn save_certificates(&self, certificates: &[Certificate]) -> Result<(), StorageError> {
        self.store(CERTIFICATES_KEY, certificates).await
    }

    /// 按名称查找证书（忽略大小写），不存在时创建
    pub async fn find_or_create_certificate(&self, name: &str) -> Result<Certificate, StorageError> {
        let mut certificates = self.load_certificates().await?;
        if let Some(found) = certificates
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
        {
            return Ok(found.clone());
        }

        let certificate = Certificate::new(name.trim(), None);
        certificates.push(certificate.clone());
        self.save_certificates(&certificates).await?;
        Ok(certificate)
    }

    pub async fn load_question_sets(&self) -> Result<Vec<QuestionSet>, StorageError> {
        self.load_or_default(QUESTION_SETS_KEY).await
    }

    pub async fn save_question_sets(&self, sets: &[QuestionSet]) -> Result<(), StorageError> {
        self.store(QUESTION_SETS_KEY, sets).await
    }

    pub async fn question_set_for_certificate(
        &self,
        certificate_id: &str,
    ) -> Result<Option<QuestionSet>, StorageError> {
        Ok(self
            .load_question_sets()
            .await?
            .into_iter()
            .find(|s| s.certificate_id == certificate_id))
    }

    /// 把新题追加到证书题库；题库不存在时新建并关联到证书
    pub async fn create_or_update_question_set(
        &self,
        certificate_id: &str,
        new_questions: Vec<Question>,
    ) -> Result<QuestionSet, StorageError> {
        let mut sets = self.load_question_sets().await?;

        if let Some(set) = sets.iter_mut().find(|s| s.certificate_id == certificate_id) {
            set.questions.extend(new_questions);
            set.updated_at = Utc::now();
            let updated = set.clone();
            self.save_question_sets(&sets).await?;
            return Ok(updated);
        }

        let set = QuestionSet::new(certificate_id, new_questions);
        sets.push(set.clone());
        self.save_question_sets(&sets).await?;

        let mut certificates = self.load_certificates().await?;
        if let Some(certificate) = certificates.iter_mut().find(|c| c.id == certificate_id) {
            certificate.question_set_id = Some(set.id.clone());
            self.save_certificates(&certificates).await?;
        }
        Ok(set)
    }

    // ========== 设置 ==========

    pub async fn load_settings(&self) -> Result<AppSettings, StorageError> {
        self.load_or_default(SETTINGS_KEY).await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        self.store(SETTINGS_KEY, settings).await
    }

    // ========== 维护 ==========

    /// 清除全部数据
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        for key in ALL_KEYS {
            self.kv.remove(key).await?;
        }
        info!("已清除全部存储数据");
        Ok(())
    }

    /// 测验与会话数量，以及两者原始数据的大致体积
    pub async fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        let quiz_count = self.load_quizzes().await?.len();
        let session_count = self.load_sessions().await?.len();

        let quiz_bytes = self.kv.get(QUIZZES_KEY).await?.map_or(0, |s| s.len());
        let session_bytes = self.kv.get(SESSIONS_KEY).await?.map_or(0, |s| s.len());

        Ok(StorageInfo {
            quiz_count,
            session_count,
            estimated_size: format_size(quiz_bytes + session_bytes),
        })
    }
}

/// 超过 1024 字节时以 KB 显示（四舍五入）
pub fn format_size(bytes: usize) -> String {
    if bytes > 1024 {
        format!("{} KB", (bytes as f64 / 1024.0).round() as u64)
    } else {
        format!("{} B", bytes)
    }
}

#[derive(Deserialize)]
struct ImportProbe {
    id: Option<JsonValue>,
    title: Option<JsonValue>,
    questions: Option<JsonValue>,
}

/// 解析并校验导入的测验
pub fn parse_quiz_import(text: &str) -> Result<QuizRecord, StorageError> {
    let probe: ImportProbe = serde_json::from_str(text)
        .map_err(|e| StorageError::InvalidImport(format!("不是有效的 JSON 对象: {}", e)))?;

    for (field, value) in [("id", &probe.id), ("title", &probe.title), ("questions", &probe.questions)] {
        if value.as_ref().map_or(true, JsonValue::is_null) {
            return Err(StorageError::InvalidImport(format!("缺少字段 {}", field)));
        }
    }

    let quiz: QuizRecord =
        serde_json::from_str(text).map_err(|e| StorageError::InvalidImport(e.to_string()))?;

    if quiz.questions.is_empty() {
        return Err(StorageError::InvalidImport("题目列表为空".to_string()));
    }
    for (idx, question) in quiz.questions.iter().enumerate() {
        question
            .validate()
            .map_err(|reason| StorageError::InvalidImport(format!("第 {} 题: {}", idx + 1, reason)))?;
    }
    Ok(quiz)
}
