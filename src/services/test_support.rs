//! 测试替身：按脚本返回响应的文本生成端点

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::TextGenerator;
use crate::error::GenerationError;

#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(String),
    /// 一直不返回，等外层超时
    Stall,
}

pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(step: Step) -> Self {
        Self {
            fallback: Some(step),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedBackend {
    async fn generate_text(
        &self,
        _system_message: Option<&str>,
        user_message: &str,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(user_message.to_string());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .expect("script exhausted");

        match step {
            Step::Reply(text) => Ok(text),
            Step::Fail(message) => Err(GenerationError::Request(message)),
            Step::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GenerationError::Request("stalled".into()))
            }
        }
    }
}

pub fn valid_question_json(text: &str) -> String {
    serde_json::json!({
        "question": text,
        "options": ["Option A", "Option B", "Option C", "Option D"],
        "correctAnswer": 1,
        "explanation": "Option B is correct."
    })
    .to_string()
}
