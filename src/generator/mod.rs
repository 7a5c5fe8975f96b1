//! 生成器层：抽象与实现（Gemini / OpenAI 兼容 / Mock）+ 超时重试包装

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use gemini::{GeminiGenerator, GEMINI_FLASH};
pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;
pub use retry::{RetryConfig, RetryingGenerator};
pub use traits::{Generator, GeneratorError};

use crate::config::AppConfig;

/// 从配置构造超时重试参数
pub fn retry_config_from(cfg: &AppConfig) -> RetryConfig {
    let t = &cfg.generator.timeouts;
    RetryConfig {
        timeout: Duration::from_secs(t.request.max(1)),
        max_retries: t.retries,
        backoff: Duration::from_millis(t.backoff_ms),
    }
}

/// 根据配置与环境变量选择生成器后端（Gemini / OpenAI 兼容 / Mock），并套上超时重试
pub fn create_generator_from_config(cfg: &AppConfig) -> Arc<dyn Generator> {
    let provider = cfg.generator.provider.to_lowercase();
    let base = cfg.generator.base_url.as_deref();

    let inner: Arc<dyn Generator> = if provider == "gemini" && std::env::var("GEMINI_API_KEY").is_ok() {
        tracing::info!("Using Gemini generator ({})", cfg.generator.model);
        Arc::new(GeminiGenerator::new(base, &cfg.generator.model, None))
    } else if provider == "openai" && std::env::var("OPENAI_API_KEY").is_ok() {
        tracing::info!("Using OpenAI-compatible generator ({})", cfg.generator.model);
        Arc::new(OpenAiGenerator::new(base, &cfg.generator.model, None))
    } else {
        tracing::warn!("No API key set or provider '{}' unknown, using Mock generator", provider);
        Arc::new(MockGenerator::new())
    };

    Arc::new(RetryingGenerator::new(inner, retry_config_from(cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_selected() {
        let mut cfg = AppConfig::default();
        cfg.generator.provider = "mock".into();
        let generator = create_generator_from_config(&cfg);
        assert_eq!(generator.name(), "mock");
    }

    #[test]
    fn test_retry_config_defaults() {
        let rc = retry_config_from(&AppConfig::default());
        assert_eq!(rc, RetryConfig::default());
    }
}
