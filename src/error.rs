use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题目生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 会话状态错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
}

/// 题目生成错误
///
/// 前三种属于瞬时错误（超时、网络、空响应），其余是响应格式问题。
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 请求超时
    #[error("请求超时 ({timeout_secs} 秒)")]
    Timeout { timeout_secs: u64 },
    /// 调用 AI 接口失败
    #[error("AI 接口调用失败: {0}")]
    Request(String),
    /// AI 返回内容为空
    #[error("AI 返回内容为空")]
    EmptyResponse,
    /// 响应无法解析为 JSON
    #[error("无法将 AI 响应解析为 JSON")]
    Parse,
    /// 题目字段校验失败
    #[error("AI 返回的题目格式无效: {0}")]
    InvalidFormat(String),
    /// 批量响应不是数组
    #[error("AI 响应格式无效，应为 JSON 数组")]
    NotAnArray,
    /// 批量响应是空数组
    #[error("AI 返回的题目列表为空")]
    EmptyList,
    /// 批量响应中没有任何有效题目
    #[error("AI 响应中没有有效题目")]
    NoValidQuestions,
    /// 批量大小超出范围
    #[error("批量大小 {requested} 超出范围 [1, {max}]")]
    BatchSizeOutOfRange { requested: usize, max: usize },
    /// 重试次数耗尽
    #[error("题目生成失败 (已尝试 {attempts} 次): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<GenerationError>,
    },
    /// 所有批次都失败
    #[error("没有成功生成任何题目")]
    NothingGenerated,
    /// 测验配置无效，未发出请求
    #[error("测验配置无效: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl GenerationError {
    /// 是否为瞬时错误（网络/超时类）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout { .. }
                | GenerationError::Request(_)
                | GenerationError::EmptyResponse
        )
    }

    /// 取出重试耗尽前的最后一个错误
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            GenerationError::Exhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取失败
    #[error("读取 {key} 失败: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入失败
    #[error("写入 {key} 失败: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("JSON 序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    /// 内存存储锁异常
    #[error("存储锁异常: {0}")]
    Lock(String),
    /// 导入内容无效
    #[error("导入的题库格式无效: {0}")]
    InvalidImport(String),
    /// 记录不存在
    #[error("记录不存在: {id}")]
    NotFound { id: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API Key
    #[error("缺少 API Key")]
    MissingApiKey,
    /// 缺少证书名称
    #[error("缺少证书名称")]
    MissingCertificate,
    /// 缺少语言
    #[error("缺少目标语言")]
    MissingLanguage,
    /// 题目数量超出范围
    #[error("题目数量 {count} 超出范围 [{min}, {max}]")]
    QuestionCountOutOfRange { count: usize, min: usize, max: usize },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 会话状态错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 会话已经开始
    #[error("会话已经开始")]
    AlreadyStarted,
    /// 当前状态不允许重试
    #[error("当前状态无需重试")]
    NothingToRetry,
    /// 会话已结束
    #[error("会话已结束")]
    Finished,
    /// 答题记录超过已获取的题目数量
    #[error("答题记录数 {answers} 超过已获取题目数 {questions}")]
    AnswerWithoutQuestion { answers: usize, questions: usize },
    /// 测验没有任何题目
    #[error("测验没有题目")]
    NoQuestions,
    /// 保存的会话数据不一致
    #[error("会话数据损坏: {0}")]
    Corrupt(String),
    /// 题目尚未全部获取，不能重新开始
    #[error("题目尚未全部获取 ({acquired}/{target})")]
    QuestionsPending { acquired: usize, target: usize },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 AI 接口调用错误
    pub fn request_failed(source: impl std::fmt::Display) -> Self {
        AppError::Generation(GenerationError::Request(source.to_string()))
    }

    /// 创建导入格式错误
    pub fn invalid_import(reason: impl Into<String>) -> Self {
        AppError::Storage(StorageError::InvalidImport(reason.into()))
    }

    /// 创建记录不存在错误
    pub fn not_found(id: impl Into<String>) -> Self {
        AppError::Storage(StorageError::NotFound { id: id.into() })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(StorageError::Serialize(err))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
