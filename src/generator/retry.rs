//! 超时与重试包装
//!
//! 每次外部调用都有上限：超时后按退避重试，重试耗尽则返回最后一次错误，由编排器降级处理。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::generator::{Generator, GeneratorError};

/// 超时 / 重试参数（默认：10 秒超时、重试 1 次、退避 500 毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// 为任意 Generator 加上超时与重试
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    config: RetryConfig,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn Generator>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.config.timeout, self.inner.generate(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(GeneratorError::Timeout(self.config.timeout.as_millis() as u64)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(
                        generator = self.inner.name(),
                        attempt,
                        error = %e,
                        "Generator call failed, retrying"
                    );
                    let delay = self.config.backoff * attempt;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;

    fn fast() -> RetryConfig {
        RetryConfig {
            timeout: Duration::from_millis(50),
            max_retries: 1,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_one_failure() {
        let mock = Arc::new(
            MockGenerator::new()
                .then_fail(GeneratorError::Status { status: 503, message: "busy".into() })
                .then_reply("ok"),
        );
        let gen = RetryingGenerator::new(mock.clone(), fast());
        assert_eq!(gen.generate("p").await.unwrap(), "ok");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_client_error() {
        let mock = Arc::new(
            MockGenerator::new()
                .then_fail(GeneratorError::Status { status: 400, message: "bad".into() })
                .then_reply("never"),
        );
        let gen = RetryingGenerator::new(mock.clone(), fast());
        let err = gen.generate("p").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_bounded() {
        let mock = Arc::new(MockGenerator::new().with_delay(Duration::from_secs(5)).then_reply("late"));
        let gen = RetryingGenerator::new(mock.clone(), fast());
        let err = gen.generate("p").await.unwrap_err();
        assert!(matches!(err, GeneratorError::Timeout(50)));
        assert_eq!(mock.calls(), 2);
    }
}
