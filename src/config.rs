use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::services::RetryPolicy;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 本地数据目录（每个存储键一个 JSON 文件）
    pub data_dir: String,
    /// 默认出题语言
    pub default_language: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 单题生成超时（秒）
    pub question_timeout_secs: u64,
    /// 批量生成超时（秒）
    pub batch_timeout_secs: u64,
    /// 失败后的最大重试次数
    pub max_retries: u32,
    /// 格式错误的响应是否也重试
    pub retry_invalid_responses: bool,
    /// 后台生成的请求间隔（毫秒）
    pub background_stagger_ms: u64,
    /// 批次之间的间隔（毫秒）
    pub batch_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            data_dir: "quiz_data".to_string(),
            default_language: "en".to_string(),
            verbose_logging: false,
            question_timeout_secs: 30,
            batch_timeout_secs: 60,
            max_retries: 2,
            retry_invalid_responses: true,
            background_stagger_ms: 500,
            batch_delay_ms: 500,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，文件中缺失的字段使用默认值，之后再应用环境变量
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            data_dir: std::env::var("QUIZ_DATA_DIR").unwrap_or(self.data_dir),
            default_language: std::env::var("QUIZ_LANGUAGE").unwrap_or(self.default_language),
            verbose_logging: parse_env("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            question_timeout_secs: parse_env("QUESTION_TIMEOUT_SECS").unwrap_or(self.question_timeout_secs),
            batch_timeout_secs: parse_env("BATCH_TIMEOUT_SECS").unwrap_or(self.batch_timeout_secs),
            max_retries: parse_env("MAX_RETRIES").unwrap_or(self.max_retries),
            retry_invalid_responses: parse_env("RETRY_INVALID_RESPONSES").unwrap_or(self.retry_invalid_responses),
            background_stagger_ms: parse_env("BACKGROUND_STAGGER_MS").unwrap_or(self.background_stagger_ms),
            batch_delay_ms: parse_env("BATCH_DELAY_MS").unwrap_or(self.batch_delay_ms),
        }
    }

    /// 单题生成使用的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(self.question_timeout_secs),
            retry_invalid_responses: self.retry_invalid_responses,
        }
    }

    /// 批量生成使用的重试策略
    pub fn batch_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.batch_timeout_secs),
            ..self.retry_policy()
        }
    }

    pub fn background_stagger(&self) -> Duration {
        Duration::from_millis(self.background_stagger_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// 解析环境变量，无法解析时记录警告并回退到默认值
fn parse_env<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            tracing::warn!("{}，使用默认值", err);
            None
        }
    }
}
