//! Intent：从自然语言提示中抽取出的结构化界面描述
//!
//! 所有字段都可缺省；上游 JSON 可能缺字段、字段类型不对或枚举值越界，消费方一律退回默认值。

use serde::{Deserialize, Deserializer, Serialize};

/// 安全等级（未知取值按 Standard 处理）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Enterprise,
    #[default]
    Standard,
    Basic,
}

impl SecurityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Enterprise => "enterprise",
            SecurityLevel::Standard => "standard",
            SecurityLevel::Basic => "basic",
        }
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecurityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        let level = match raw.as_ref().and_then(|v| v.as_str()).map(str::to_lowercase) {
            Some(s) if s == "enterprise" => SecurityLevel::Enterprise,
            Some(s) if s == "basic" => SecurityLevel::Basic,
            _ => SecurityLevel::Standard,
        };
        Ok(level)
    }
}

/// 界面意图（字段命名与生成器返回的 JSON 一致，兼容 camelCase 别名）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_list")]
    pub entities: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub features: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub components: Vec<String>,
    #[serde(alias = "uiSpec", deserialize_with = "lenient_string")]
    pub ui_spec: String,
    #[serde(alias = "estimatedComplexity", deserialize_with = "lenient_complexity")]
    pub estimated_complexity: i64,
    #[serde(alias = "securityLevel")]
    pub security_level: SecurityLevel,
    #[serde(alias = "performanceBudget", deserialize_with = "lenient_string")]
    pub performance_budget: String,
    #[serde(alias = "techStack", deserialize_with = "lenient_list")]
    pub tech_stack: Vec<String>,
}

impl Intent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 名称为空时的展示名
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            "Generated App"
        } else {
            trimmed
        }
    }

    /// 复杂度夹到 1..=10
    pub fn complexity(&self) -> u8 {
        self.estimated_complexity.clamp(1, 10) as u8
    }

    /// 参与分类的关键词来源：features ∪ components ∪ name
    pub fn keyword_haystack(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .chain(self.components.iter())
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_complexity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        // "1-10" 之类的字符串取首个数字
        Some(serde_json::Value::String(s)) => s
            .split(|c: char| !c.is_ascii_digit() && c != '-')
            .find_map(|p| p.parse::<i64>().ok())
            .unwrap_or(0),
        _ => 0,
    })
}
