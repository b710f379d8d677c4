use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, SessionError};
use crate::models::question::{AnswerRecord, Question};
use crate::models::quiz::QuizRecord;

/// 单次会话允许的最少题目数
pub const MIN_QUESTIONS: usize = 1;
/// 单次会话允许的最多题目数
pub const MAX_QUESTIONS: usize = 20;

/// 开始测验时提供的配置，会话期间不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub api_key: String,
    #[serde(default)]
    pub certificate_id: String,
    pub certificate_name: String,
    pub number_of_questions: usize,
    pub language: String,
}

impl QuizConfig {
    /// 在发起任何网络请求前校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.certificate_name.trim().is_empty() {
            return Err(ConfigError::MissingCertificate);
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::MissingLanguage);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.number_of_questions) {
            return Err(ConfigError::QuestionCountOutOfRange {
                count: self.number_of_questions,
                min: MIN_QUESTIONS,
                max: MAX_QUESTIONS,
            });
        }
        Ok(())
    }
}

/// 测验会话
///
/// 题目列表只追加；`score` 是答题记录的缓存，任何修改都经过下面的方法。
///
/// `target_questions` 开始时等于配置的题目数。后续题目无法获取时会被缩短到
/// 已获取的数量，因此保存的会话里它可能小于 `config.number_of_questions`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: String,
    pub target_questions: usize,
    pub current_questions: Vec<Question>,
    pub answers: Vec<AnswerRecord>,
    pub score: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub config: QuizConfig,
    /// 重做已保存的测验时的来源测验 id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quiz_id: Option<String>,
}

impl QuizSession {
    /// 新建会话，目标题目数取配置中的数量
    pub fn new(config: QuizConfig) -> Self {
        Self {
            id: format!("session-{}", Uuid::new_v4()),
            target_questions: config.number_of_questions,
            current_questions: Vec::new(),
            answers: Vec::new(),
            score: 0,
            completed: false,
            created_at: Utc::now(),
            config,
            source_quiz_id: None,
        }
    }

    /// 重做已保存的测验：题目直接使用，目标数等于题目数
    pub fn replaying(quiz: &QuizRecord) -> Self {
        let config = QuizConfig {
            api_key: String::new(),
            certificate_id: quiz.certificate_id.clone(),
            certificate_name: quiz.certificate_name.clone(),
            number_of_questions: quiz.questions.len(),
            language: quiz.language.clone(),
        };
        let mut session = Self::with_questions(config, quiz.questions.clone());
        session.source_quiz_id = Some(quiz.id.clone());
        session
    }

    /// 使用已有题目新建会话，目标数等于题目数
    pub fn with_questions(config: QuizConfig, questions: Vec<Question>) -> Self {
        let mut session = Self::new(config);
        session.target_questions = questions.len();
        session.current_questions = questions;
        session
    }

    /// 追加一道题；达到目标数后丢弃并返回 false
    pub fn push_question(&mut self, question: Question) -> bool {
        if self.current_questions.len() >= self.target_questions {
            return false;
        }
        self.current_questions.push(question);
        true
    }

    /// 追加答题记录并同步分数
    pub fn record_answer(&mut self, record: AnswerRecord) -> Result<(), SessionError> {
        if self.answers.len() >= self.current_questions.len() {
            return Err(SessionError::AnswerWithoutQuestion {
                answers: self.answers.len() + 1,
                questions: self.current_questions.len(),
            });
        }
        if record.is_correct {
            self.score += 1;
        }
        self.answers.push(record);
        Ok(())
    }

    /// 清空作答，只在题目已全部获取时使用
    pub fn reset_answers(&mut self) {
        self.answers.clear();
        self.score = 0;
        self.completed = false;
    }

    /// 按答题记录计算的分数
    pub fn computed_score(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }

    /// 从存储加载后重新计算分数缓存，返回缓存是否被修正
    pub fn normalize(&mut self) -> bool {
        let computed = self.computed_score();
        if computed != self.score {
            self.score = computed;
            return true;
        }
        false
    }

    pub fn remaining_to_acquire(&self) -> usize {
        self.target_questions.saturating_sub(self.current_questions.len())
    }

    /// 检查会话不变量
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_questions.len() > self.target_questions {
            return Err(format!(
                "题目数 {} 超过目标数 {}",
                self.current_questions.len(),
                self.target_questions
            ));
        }
        if self.answers.len() > self.current_questions.len() {
            return Err(format!(
                "答题数 {} 超过题目数 {}",
                self.answers.len(),
                self.current_questions.len()
            ));
        }
        if self.score != self.computed_score() {
            return Err(format!(
                "分数缓存 {} 与实际 {} 不一致",
                self.score,
                self.computed_score()
            ));
        }
        Ok(())
    }
}
