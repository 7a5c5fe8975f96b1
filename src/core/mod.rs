//! 核心编排层：错误与恢复、阶段状态机、生成历史、生成编排器

pub mod error;
pub mod history;
pub mod orchestrator;
pub mod recovery;
pub mod state;

pub use error::{ForgeError, RecoveryAction};
pub use history::{HistoryKind, HistoryLog, HistoryRecord, ResultSnapshot};
pub use orchestrator::{
    CycleReport, GenerationOrchestrator, OrchestratorCallbacks, OrchestratorOptions,
};
pub use recovery::RecoveryEngine;
pub use state::{GenerationPhase, PhaseKind};
