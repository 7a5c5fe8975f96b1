//! 生成编排错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 ForgeError 决定使用离线默认值、保留上一次良好渲染或终止本轮。

use thiserror::Error;

use crate::generator::GeneratorError;

/// 生成 / 进化流程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForgeError {
    /// 上游生成器调用失败（HTTP 非 2xx 时携带状态码）
    #[error("Generator unavailable (status {status:?}): {message}")]
    GeneratorUnavailable { status: Option<u16>, message: String },

    #[error("Intent parse error: {0}")]
    IntentParse(String),

    /// 进化调用失败或返回不可用源码；保留上一次良好状态
    #[error("Evolution failed: {0}")]
    EvolutionFailed(String),

    #[error("Nothing to evolve yet")]
    NothingToEvolve,

    /// 已有周期在进行中，新的触发被拒绝
    #[error("A generation cycle is already in flight")]
    Busy,

    #[error("Cancelled")]
    Cancelled,
}

impl From<GeneratorError> for ForgeError {
    fn from(err: GeneratorError) -> Self {
        ForgeError::GeneratorUnavailable {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 用确定性离线内容替代（离线 Intent / 回退模板），流程继续
    SubstituteOffline,
    /// 保留上一次良好渲染，阶段置为 error
    KeepLastGood,
    /// 终止当前周期
    Abort,
}
