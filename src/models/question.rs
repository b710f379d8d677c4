use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 每道题固定的选项数量
pub const OPTION_COUNT: usize = 4;

/// 生成的选择题
///
/// 创建后不可变；`id` 由本地生成，不来自模型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: [String; OPTION_COUNT],
    pub correct_answer: usize,
    pub explanation: String,
}

impl Question {
    /// 用校验过的字段创建题目，并分配新的 id
    pub fn new(
        question: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_answer: usize,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: new_question_id(),
            question: question.into(),
            options,
            correct_answer,
            explanation: explanation.into(),
        }
    }

    /// 判断选择是否正确
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }

    /// 检查从外部导入的题目是否满足结构要求
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("题目 id 为空".to_string());
        }
        if self.question.trim().is_empty() {
            return Err("题干为空".to_string());
        }
        if self.correct_answer >= OPTION_COUNT {
            return Err(format!("正确答案索引 {} 超出范围", self.correct_answer));
        }
        if self.explanation.trim().is_empty() {
            return Err("解析为空".to_string());
        }
        Ok(())
    }
}

/// 一次作答记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected_answer: usize,
    pub is_correct: bool,
}

impl AnswerRecord {
    pub fn for_question(question: &Question, selected: usize) -> Self {
        Self {
            question_id: question.id.clone(),
            selected_answer: selected,
            is_correct: question.is_correct(selected),
        }
    }
}

fn new_question_id() -> String {
    format!("q-{}", Uuid::new_v4())
}
