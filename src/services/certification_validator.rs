//! 证书名称校验
//!
//! 让模型判断一个名称是否为真实存在的职业证书；响应无法解析时退回关键词规则。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clients::TextGenerator;
use crate::error::GenerationError;
use crate::services::prompts;
use crate::services::response_parser::strip_code_fences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub corrected_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub confidence: Confidence,
}

impl CertificationValidation {
    fn recognized(corrected_name: &str, description: &str) -> Self {
        Self {
            is_valid: true,
            corrected_name: corrected_name.to_string(),
            description: description.to_string(),
            suggestions: Vec::new(),
            confidence: Confidence::Medium,
        }
    }
}

/// 关键词规则，仅在模型响应不可用时使用
pub fn fallback_validation(certification_name: &str) -> CertificationValidation {
    let name = certification_name.to_lowercase();

    if name.contains("aws") && (name.contains("architect") || name.contains("saa")) {
        return CertificationValidation::recognized(
            "AWS Certified Solutions Architect Associate",
            "Cloud architecture certification for AWS. Validates distributed system design skills for developers.",
        );
    }

    if name.contains("google") || name.contains("gcp") || name.contains("cloud architect") {
        return CertificationValidation::recognized(
            "Google Cloud Professional Cloud Architect",
            "Cloud architecture certification for Google Cloud Platform. Validates cloud solution design skills.",
        );
    }

    if name.contains("comptia") || name.contains("security+") || name.contains("sec+") {
        return CertificationValidation::recognized(
            "CompTIA Security+",
            "Entry-level cybersecurity certification covering security principles and practices.",
        );
    }

    CertificationValidation {
        is_valid: false,
        corrected_name: String::new(),
        description: String::new(),
        suggestions: vec![
            "AWS Certified Solutions Architect".to_string(),
            "CompTIA Security+".to_string(),
            "Google Cloud Professional Cloud Architect".to_string(),
        ],
        confidence: Confidence::Low,
    }
}

/// 证书名称校验服务
#[derive(Clone)]
pub struct CertificationValidator {
    backend: Arc<dyn TextGenerator>,
}

impl CertificationValidator {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self { backend }
    }

    /// 校验证书名称
    ///
    /// 请求本身失败时返回错误；响应结构不对时使用关键词规则。
    pub async fn validate(&self, certification_name: &str) -> Result<CertificationValidation, GenerationError> {
        let prompt = prompts::certification_check_prompt(certification_name);
        let raw = self.backend.generate_text(None, &prompt).await?;

        let clean = strip_code_fences(&raw);
        match serde_json::from_str::<CertificationValidation>(&clean) {
            Ok(result) => {
                info!("✓ 证书校验完成: {} -> valid={}", certification_name, result.is_valid);
                Ok(result)
            }
            Err(e) => {
                warn!("证书校验响应无法解析 ({})，使用关键词规则", e);
                Ok(fallback_validation(certification_name))
            }
        }
    }
}
