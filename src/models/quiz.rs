use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::Question;
use crate::models::session::QuizSession;

const COMPLETE_SUFFIX: &str = " (Complete)";
const IN_PROGRESS_SUFFIX: &str = " (In Progress)";

/// 保存下来的测验（可重做、可导出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub certificate_id: String,
    #[serde(default)]
    pub certificate_name: String,
    pub language: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl QuizRecord {
    /// 批量生成得到的新测验
    pub fn generated(
        certificate_id: impl Into<String>,
        certificate_name: impl Into<String>,
        language: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        let certificate_name = certificate_name.into();
        Self {
            id: format!("quiz-{}", Uuid::new_v4()),
            title: format!("{} Practice Quiz", certificate_name),
            certificate_id: certificate_id.into(),
            certificate_name,
            language: language.into(),
            questions,
            created_at: Utc::now(),
        }
    }

    /// 已完成会话对应的测验记录，沿用会话 id
    pub fn from_completed_session(session: &QuizSession) -> Self {
        Self {
            id: session.id.clone(),
            title: format!(
                "{} Practice Quiz{}",
                session.config.certificate_name, COMPLETE_SUFFIX
            ),
            certificate_id: session.config.certificate_id.clone(),
            certificate_name: session.config.certificate_name.clone(),
            language: session.config.language.clone(),
            questions: session.current_questions.clone(),
            created_at: session.created_at,
        }
    }

    /// 把标题标记为已完成（去掉旧的状态后缀）
    pub fn mark_complete(&mut self) {
        let base = self
            .title
            .replace(IN_PROGRESS_SUFFIX, "")
            .replace(COMPLETE_SUFFIX, "");
        self.title = format!("{}{}", base, COMPLETE_SUFFIX);
    }
}

/// 证书
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_set_id: Option<String>,
}

impl Certificate {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: format!("cert-{}", Uuid::new_v4()),
            name: name.into(),
            description,
            created_at: Utc::now(),
            question_set_id: None,
        }
    }
}

/// 证书的题库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub id: String,
    pub certificate_id: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionSet {
    pub fn new(certificate_id: impl Into<String>, questions: Vec<Question>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("qs-{}", Uuid::new_v4()),
            certificate_id: certificate_id.into(),
            questions,
            created_at: now,
            updated_at: now,
        }
    }

    /// 把题库转换成可以重做的测验
    pub fn to_quiz(&self, certificate: &Certificate, language: &str) -> QuizRecord {
        QuizRecord {
            id: format!("quiz-{}", Uuid::new_v4()),
            title: format!("{} Question Bank", certificate.name),
            certificate_id: certificate.id.clone(),
            certificate_name: certificate.name.clone(),
            language: language.to_string(),
            questions: self.questions.clone(),
            created_at: self.updated_at,
        }
    }
}

/// 用户设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub api_key: String,
    pub language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: "en".to_string(),
        }
    }
}

/// 批量生成进度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationProgress {
    pub completed: usize,
    pub total: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub status: String,
}
