//! 错误恢复引擎
//!
//! 根据 ForgeError 类型返回 RecoveryAction，供编排器决定降级替代、保留上次结果还是终止。

use crate::core::{ForgeError, RecoveryAction};

/// 将错误映射为可执行动作（离线替代 / 保留上次 / 终止）
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &ForgeError) -> RecoveryAction {
        match err {
            ForgeError::GeneratorUnavailable { .. } | ForgeError::IntentParse(_) => {
                RecoveryAction::SubstituteOffline
            }
            ForgeError::EvolutionFailed(_) | ForgeError::NothingToEvolve => {
                RecoveryAction::KeepLastGood
            }
            ForgeError::Busy | ForgeError::Cancelled => RecoveryAction::Abort,
        }
    }

    /// 面向用户的简短状态文案
    pub fn user_message(&self, err: &ForgeError) -> String {
        match err {
            ForgeError::GeneratorUnavailable { status: Some(s), .. } => {
                format!("Generator unavailable (HTTP {s}), using offline defaults")
            }
            ForgeError::GeneratorUnavailable { status: None, .. } => {
                "Generator unavailable, using offline defaults".to_string()
            }
            ForgeError::IntentParse(_) => "Could not read intent, using offline defaults".to_string(),
            ForgeError::EvolutionFailed(_) => "Evolution failed, keeping previous version".to_string(),
            ForgeError::NothingToEvolve => "Nothing to evolve yet".to_string(),
            ForgeError::Busy => "Already working on a request".to_string(),
            ForgeError::Cancelled => "Generation cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_generator_unavailable() {
        let engine = RecoveryEngine::new();
        let err = ForgeError::GeneratorUnavailable {
            status: Some(503),
            message: "down".into(),
        };
        assert_eq!(engine.handle(&err), RecoveryAction::SubstituteOffline);
        assert!(engine.user_message(&err).contains("503"));
    }

    #[test]
    fn test_recovery_evolution_failed() {
        let engine = RecoveryEngine::new();
        let err = ForgeError::EvolutionFailed("timeout".into());
        assert_eq!(engine.handle(&err), RecoveryAction::KeepLastGood);
    }

    #[test]
    fn test_recovery_cancelled() {
        let engine = RecoveryEngine::new();
        assert_eq!(engine.handle(&ForgeError::Cancelled), RecoveryAction::Abort);
    }

    #[test]
    fn test_every_error_has_action_and_message() {
        let engine = RecoveryEngine::new();
        let all = [
            ForgeError::GeneratorUnavailable { status: None, message: "offline".into() },
            ForgeError::IntentParse("no json".into()),
            ForgeError::EvolutionFailed("refused".into()),
            ForgeError::NothingToEvolve,
            ForgeError::Busy,
            ForgeError::Cancelled,
        ];
        for err in &all {
            let expected = match err {
                ForgeError::GeneratorUnavailable { .. } | ForgeError::IntentParse(_) => {
                    RecoveryAction::SubstituteOffline
                }
                ForgeError::EvolutionFailed(_) | ForgeError::NothingToEvolve => RecoveryAction::KeepLastGood,
                ForgeError::Busy | ForgeError::Cancelled => RecoveryAction::Abort,
            };
            assert_eq!(engine.handle(err), expected, "{}", err);
            assert!(!engine.user_message(err).is_empty());
        }
    }
}
