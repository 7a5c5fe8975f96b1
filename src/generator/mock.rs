//! Mock 生成器（用于测试与离线演示，无需 API）
//!
//! 响应来源依次为：按提示词关键字匹配的规则、按调用顺序消费的脚本、最后回显提示词。
//! 可注入延迟与闸门（Semaphore），便于测试超时与并发触发。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::generator::{Generator, GeneratorError};

type Reply = Result<String, GeneratorError>;

/// 可编排的 Mock 生成器
#[derive(Default)]
pub struct MockGenerator {
    rules: Vec<(String, Reply)>,
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提示词包含 needle 时固定返回 reply（优先于脚本）
    pub fn on_prompt_containing(mut self, needle: impl Into<String>, reply: Reply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn then_fail(self, err: GeneratorError) -> Self {
        self.push(Err(err))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每次调用先获取闸门许可；测试里用 `add_permits` 放行
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(self, reply: Reply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    fn next_reply(&self, prompt: &str) -> Reply {
        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            return reply.clone();
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.unwrap_or_else(|| {
            let preview: String = prompt.chars().take(80).collect();
            Ok(format!("Echo from Mock: {preview}"))
        })
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.next_reply(prompt);

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| GeneratorError::Transport(e.to_string()))?;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_take_precedence_over_script() {
        let mock = MockGenerator::new()
            .on_prompt_containing("JSON", Ok("{}".into()))
            .then_reply("scripted");
        assert_eq!(mock.generate("return JSON").await.unwrap(), "{}");
        assert_eq!(mock.generate("other").await.unwrap(), "scripted");
        assert!(mock.generate("other").await.unwrap().starts_with("Echo from Mock"));
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts().len(), 3);
    }
}
