//! 生成器抽象
//!
//! 核心只把外部生成服务看作 `prompt -> 文本`，可能失败；具体传输（Gemini / OpenAI 兼容 / Mock）实现 Generator。

use async_trait::async_trait;
use thiserror::Error;

/// 生成器调用错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// 上游返回非成功 HTTP 状态
    #[error("API Error: {status} {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Generator timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GeneratorError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GeneratorError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 4xx（除 408 / 429）重试无意义
    pub fn is_retryable(&self) -> bool {
        match self {
            GeneratorError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            GeneratorError::Transport(_) | GeneratorError::Timeout(_) => true,
            GeneratorError::Malformed(_) => false,
        }
    }
}

/// 外部文本生成器
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;

    /// 日志用名称
    fn name(&self) -> &str {
        "generator"
    }
}
