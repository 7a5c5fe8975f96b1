//! 生成阶段状态机
//!
//! GenerationPhase = 阶段标签 + 展示文案。只有编排器推进阶段；非法迁移被拒绝并记日志。

use serde::Serialize;

/// 阶段标签
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Idle,
    Analyzing,
    Connecting,
    Generating,
    Rendering,
    Evolving,
    Complete,
    Error,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Idle => "idle",
            PhaseKind::Analyzing => "analyzing",
            PhaseKind::Connecting => "connecting",
            PhaseKind::Generating => "generating",
            PhaseKind::Rendering => "rendering",
            PhaseKind::Evolving => "evolving",
            PhaseKind::Complete => "complete",
            PhaseKind::Error => "error",
        }
    }

    /// 一个周期是否在进行中
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            PhaseKind::Analyzing
                | PhaseKind::Connecting
                | PhaseKind::Generating
                | PhaseKind::Rendering
                | PhaseKind::Evolving
        )
    }

    /// 允许的迁移。error 既是终态，也是降级后继续前进的中间态（离线替代后进入 generating / rendering）
    pub fn can_transition_to(&self, next: PhaseKind) -> bool {
        use PhaseKind::*;
        matches!(
            (self, next),
            (Idle, Analyzing)
                | (Analyzing, Connecting)
                | (Connecting, Generating)
                | (Generating, Rendering)
                | (Rendering, Complete)
                | (Evolving, Complete)
                | (Complete, Analyzing)
                | (Complete, Evolving)
                | (Error, Analyzing)
                | (Error, Evolving)
                | (Error, Generating)
                | (Error, Rendering)
                | (Analyzing | Connecting | Generating | Rendering | Evolving, Error)
        )
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前阶段与展示文案
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationPhase {
    pub kind: PhaseKind,
    pub message: String,
}

impl Default for GenerationPhase {
    fn default() -> Self {
        Self::new(PhaseKind::Idle, "Ready")
    }
}

impl GenerationPhase {
    pub fn new(kind: PhaseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == PhaseKind::Error
    }
}
