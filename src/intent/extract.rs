//! 从生成器回复中抽取 Intent JSON，以及离线默认 Intent

use crate::core::ForgeError;
use crate::intent::{Intent, SecurityLevel};

/// 从回复文本中取出第一个 `{` 到最后一个 `}` 之间的 JSON 并解析为 Intent
pub fn extract_intent(reply: &str) -> Result<Intent, ForgeError> {
    let trimmed = reply.trim();
    let json_str = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => {
            return Err(ForgeError::IntentParse(
                "No valid JSON found in response".to_string(),
            ))
        }
    };

    serde_json::from_str::<Intent>(json_str)
        .map_err(|e| ForgeError::IntentParse(format!("{}: {}", e, json_str)))
}

/// 生成器不可用时的确定性离线 Intent；名称取提示词中含 app / dashboard / platform 的词及其前一个词
pub fn offline_intent(prompt: &str) -> Intent {
    Intent {
        name: app_name_from_prompt(prompt),
        entities: vec!["User".into(), "Data".into()],
        features: vec!["CRUD Operations".into(), "Authentication".into()],
        components: vec!["Dashboard".into(), "Form".into(), "Table".into()],
        ui_spec: "Modern interface with dark theme".into(),
        estimated_complexity: 5,
        security_level: SecurityLevel::Standard,
        performance_budget: "< 250ms TTFB".into(),
        tech_stack: vec!["React".into(), "Tailwind".into(), "TypeScript".into()],
    }
}

const FILLER_WORDS: [&str; 8] = ["a", "an", "the", "my", "build", "create", "make", "simple"];

fn app_name_from_prompt(prompt: &str) -> String {
    let words: Vec<String> = prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    let Some(idx) = words.iter().position(|w| is_anchor_word(w)) else {
        return "Generated App".to_string();
    };

    let mut parts = Vec::new();
    if idx > 0 && !FILLER_WORDS.contains(&words[idx - 1].as_str()) {
        parts.push(capitalize(&words[idx - 1]));
    }
    parts.push(capitalize(&words[idx]));
    parts.join(" ")
}

const ANCHOR_WORDS: [&str; 4] = ["app", "application", "dashboard", "platform"];

/// 以锚点词结尾（可带复数 s），如 "app"、"webapp"、"dashboards"；"happy" 不算
fn is_anchor_word(word: &str) -> bool {
    let stem = word.strip_suffix('s').unwrap_or(word);
    ANCHOR_WORDS
        .iter()
        .any(|anchor| word.ends_with(anchor) || stem.ends_with(anchor))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_intent_from_fenced_reply() {
        let reply = "Sure!\n```json\n{\"name\": \"Shop\", \"features\": [\"Cart\"]}\n```";
        let intent = extract_intent(reply).unwrap();
        assert_eq!(intent.name, "Shop");
        assert_eq!(intent.features, vec!["Cart"]);
    }

    #[test]
    fn test_extract_intent_without_json() {
        let err = extract_intent("I cannot comply.").unwrap_err();
        assert!(matches!(err, ForgeError::IntentParse(_)));
    }

    #[test]
    fn test_extract_intent_broken_json() {
        assert!(extract_intent("{ name: oops }").is_err());
    }

    #[test]
    fn test_offline_intent_is_deterministic() {
        let a = offline_intent("Build a fitness dashboard for coaches");
        let b = offline_intent("Build a fitness dashboard for coaches");
        assert_eq!(a, b);
        assert_eq!(a.name, "Fitness Dashboard");
        assert_eq!(offline_intent("task dashboard with CRUD").name, "Task Dashboard");
        assert_eq!(offline_intent("Build a dashboard").name, "Dashboard");
    }

    #[test]
    fn test_offline_intent_default_name() {
        assert_eq!(offline_intent("something else").name, "Generated App");
    }

    #[test]
    fn test_app_name_needs_whole_anchor_word() {
        assert_eq!(app_name_from_prompt("a happy todo list"), "Generated App");
        assert_eq!(app_name_from_prompt("snappy appointment scheduler"), "Generated App");
        assert_eq!(app_name_from_prompt("wrapper for appointments"), "Generated App");
        assert_eq!(app_name_from_prompt("build a recipe app"), "Recipe App");
        assert_eq!(app_name_from_prompt("my travel webapp"), "Travel Webapp");
        assert_eq!(app_name_from_prompt("sales dashboards please"), "Sales Dashboards");
    }
}
