//! 合成与渲染错误

use thiserror::Error;

/// 合成失败原因；调用方一律退回 FallbackLibrary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// 清洗后没有可用源码（空串或缺少 GeneratedApp）
    #[error("No usable source")]
    EmptySource,

    /// 标记 / 语法错误（标签不匹配、未闭合、未知 Hook 等）
    #[error("Transpile error: {message}")]
    TranspileError { message: String },

    /// 转译成功但找不到入口组件
    #[error("Entry point `GeneratedApp` is missing")]
    EntryPointMissing,

    /// 试渲染时出错（未知标识符、不支持的调用等）
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },
}

impl SynthesisError {
    pub fn transpile(message: impl Into<String>) -> Self {
        SynthesisError::TranspileError {
            message: message.into(),
        }
    }
}

/// 已物化组件在绘制阶段出错
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Render error: {0}")]
pub struct RenderError(pub String);

impl From<RenderError> for SynthesisError {
    fn from(err: RenderError) -> Self {
        SynthesisError::Evaluation { message: err.0 }
    }
}
