//! 集成测试共用的文本生成替身
//!
//! 按提示词里的题号应答，因此同步请求和后台请求交错时结果仍然确定。

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cert_quiz::error::GenerationError;
use cert_quiz::models::{QuizConfig, QuizRecord};
use cert_quiz::{MemoryStore, ProgressStore, QuestionGenerator, TextGenerator};

#[derive(Default)]
pub struct NumberedBackend {
    /// 题号 -> 剩余失败次数
    failures: Mutex<HashMap<usize, usize>>,
    always_fail: HashSet<usize>,
    calls: Mutex<Vec<usize>>,
}

impl NumberedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第 `number` 题的前 `times` 次请求失败
    pub fn fail_times(self, number: usize, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(number, times);
        self
    }

    /// 第 `number` 题永远失败
    pub fn always_fail(mut self, number: usize) -> Self {
        self.always_fail.insert(number);
        self
    }

    /// 按请求顺序记录的题号
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for NumberedBackend {
    async fn generate_text(
        &self,
        _system_message: Option<&str>,
        user_message: &str,
    ) -> Result<String, GenerationError> {
        let number = question_number_of(user_message).unwrap_or(0);
        self.calls.lock().unwrap().push(number);

        if self.always_fail.contains(&number) {
            return Err(GenerationError::Request("503 Service Unavailable".into()));
        }
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&number) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(GenerationError::Request("503 Service Unavailable".into()));
                }
            }
        }

        Ok(question_json(number))
    }
}

/// 从单题提示词中取回题号
pub fn question_number_of(prompt: &str) -> Option<usize> {
    let rest = prompt.split("This is question number ").nth(1)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// 第 n 题：题干 "Question n?"，正确答案为 n % 4
pub fn question_value(number: usize) -> serde_json::Value {
    serde_json::json!({
        "question": format!("Question {}?", number),
        "options": ["Alpha", "Beta", "Gamma", "Delta"],
        "correctAnswer": number % 4,
        "explanation": format!("Explanation {}", number),
    })
}

/// 带代码块标记的单题响应
pub fn question_json(number: usize) -> String {
    format!("```json\n{}\n```", question_value(number))
}

pub fn quiz_config(count: usize) -> QuizConfig {
    QuizConfig {
        api_key: "test-key".into(),
        certificate_id: "cert-test".into(),
        certificate_name: "AWS SAA".into(),
        number_of_questions: count,
        language: "en".into(),
    }
}

pub fn generator(backend: &Arc<NumberedBackend>) -> QuestionGenerator {
    QuestionGenerator::new(backend.clone())
}

pub fn memory_store() -> ProgressStore {
    ProgressStore::new(Arc::new(MemoryStore::new()))
}

pub fn saved_quiz(count: usize) -> QuizRecord {
    let questions = (1..=count)
        .map(|n| {
            cert_quiz::Question::new(
                format!("Saved {}?", n),
                ["A", "B", "C", "D"].map(String::from),
                0,
                "A is right",
            )
        })
        .collect();
    QuizRecord::generated("cert-test", "AWS SAA", "en", questions)
}
