//! DARWIN-FORGE：生成式界面物化管线
//!
//! 模块划分：
//! - **agent**: 一次生成的 Agent 记录（Intent、界面参数、生成上下文）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 阶段状态机、历史、错误恢复、生成编排器
//! - **fallback**: 分类与回退模板库
//! - **generator**: 生成器抽象与实现（Gemini / OpenAI 兼容 / Mock）
//! - **intent**: Intent 模型、JSON 抽取、提示词
//! - **observability**: 日志初始化
//! - **preview**: 设备框与预览渲染器
//! - **synthesis**: 清洗、转译与沙箱渲染

pub mod agent;
pub mod config;
pub mod core;
pub mod fallback;
pub mod generator;
pub mod intent;
pub mod observability;
pub mod preview;
pub mod synthesis;

pub use crate::core::{ForgeError, GenerationOrchestrator, GenerationPhase, PhaseKind};
pub use crate::intent::Intent;
