//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FORGE__*` 覆盖（双下划线表示嵌套，如 `FORGE__GENERATOR__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::preview::DeviceFrame;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub generator: GeneratorSection,
    pub orchestrator: OrchestratorSection,
}

/// [app] 段：应用名、默认预览设备
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub device: DeviceFrame,
}

/// [generator] 段：后端选择、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    /// 后端：gemini / openai / mock；无对应 API Key 时退回 mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: GeneratorTimeoutsSection,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: crate::generator::GEMINI_FLASH.to_string(),
            base_url: None,
            timeouts: GeneratorTimeoutsSection::default(),
        }
    }
}

/// [generator.timeouts] 段：单次调用超时（秒）、重试次数、退避（毫秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorTimeoutsSection {
    pub request: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for GeneratorTimeoutsSection {
    fn default() -> Self {
        Self {
            request: 10,
            retries: 1,
            backoff_ms: 500,
        }
    }
}

/// [orchestrator] 段：阶段展示延迟、进化指令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// 阶段之间的展示延迟（毫秒），0 表示不等待
    pub phase_delay_ms: u64,
    pub evolution_directive: String,
}

pub const DEFAULT_EVOLUTION_DIRECTIVE: &str = "Improve the user experience: add clearer empty states, \
     smoother interactions and a more polished visual hierarchy while keeping every existing feature.";

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            phase_delay_ms: 400,
            evolution_directive: DEFAULT_EVOLUTION_DIRECTIVE.to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 FORGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；文件缺失或无法解析时报错
/// 3. 最后叠加环境变量 FORGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FORGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.generator.timeouts.request, 10);
        assert_eq!(cfg.generator.timeouts.retries, 1);
        assert_eq!(cfg.app.device, DeviceFrame::Desktop);
        assert!(!cfg.orchestrator.evolution_directive.is_empty());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[app]\ndevice = \"mobile\"\n\n[generator]\nprovider = \"mock\"\n\n[generator.timeouts]\nrequest = 3\n\n[orchestrator]\nphase_delay_ms = 0"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.device, DeviceFrame::Mobile);
        assert_eq!(cfg.generator.provider, "mock");
        assert_eq!(cfg.generator.timeouts.request, 3);
        assert_eq!(cfg.generator.timeouts.retries, 1);
        assert_eq!(cfg.orchestrator.phase_delay_ms, 0);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(missing)).is_err());
    }
}
