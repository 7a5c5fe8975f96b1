//! 意图层：Intent 数据模型、JSON 抽取、离线默认值与提示词模板

pub mod extract;
pub mod prompts;
pub mod types;

pub use extract::{extract_intent, offline_intent};
pub use types::{Intent, SecurityLevel};
