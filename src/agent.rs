//! Agent 记录：一次生成的 Intent、原始提示、界面参数与生成上下文
//!
//! 编排器的「当前 Agent」槽位持有它；更新上下文返回新值，不原地修改。

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::intent::Intent;

/// 复杂度高于此值时布局为 complex
const COMPLEX_LAYOUT_THRESHOLD: i64 = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Simple,
    Complex,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UiParams {
    pub theme: Theme,
    pub layout: Layout,
    pub components: Vec<String>,
}

/// 三路并发生成的产物
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AgentContext {
    pub business_logic: String,
    pub simulated_backend: String,
    pub generated_ui: String,
}

/// 局部更新；None 字段保持原值
#[derive(Clone, Debug, Default)]
pub struct ContextUpdate {
    pub business_logic: Option<String>,
    pub simulated_backend: Option<String>,
    pub generated_ui: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Agent {
    pub id: String,
    pub raw_intent: Intent,
    pub original_prompt: String,
    pub ui_params: UiParams,
    pub context: AgentContext,
    pub timestamp: DateTime<Utc>,
}

impl Agent {
    pub fn create(raw_intent: Intent, original_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        let layout = if raw_intent.estimated_complexity > COMPLEX_LAYOUT_THRESHOLD {
            Layout::Complex
        } else {
            Layout::Simple
        };
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self {
            id: format!("agent_{}_{}", now.timestamp_millis(), suffix),
            ui_params: UiParams {
                theme: Theme::Dark,
                layout,
                components: raw_intent.components.clone(),
            },
            raw_intent,
            original_prompt: original_prompt.into(),
            context: AgentContext::default(),
            timestamp: now,
        }
    }

    pub fn with_context(&self, update: ContextUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.business_logic {
            next.context.business_logic = v;
        }
        if let Some(v) = update.simulated_backend {
            next.context.simulated_backend = v;
        }
        if let Some(v) = update.generated_ui {
            next.context.generated_ui = v;
        }
        next
    }
}
