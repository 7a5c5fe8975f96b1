//! 发往生成器的提示词模板
//!
//! 约束生成器输出：只返回代码、组件名固定为 GeneratedApp。即便如此，输出依旧按不可信文本处理。

use crate::intent::Intent;
use crate::synthesis::ENTRY_POINT;

/// 意图抽取提示：要求只返回 JSON 对象
pub fn intent_prompt(user_prompt: &str) -> String {
    format!(
        r#"Analyze this user request and extract structured information for app generation:
"{user_prompt}"

Return ONLY a JSON object with this exact structure (no explanations, no markdown):
{{
  "name": "App name",
  "entities": ["Entity1", "Entity2"],
  "features": ["Feature1", "Feature2"],
  "ui_spec": "UI description",
  "performance_budget": "< 250ms TTFB",
  "security_level": "enterprise|standard|basic",
  "estimated_complexity": 1-10,
  "components": ["Component1", "Component2"],
  "tech_stack": ["React", "Tailwind", "TypeScript"]
}}

Focus on extracting concrete, actionable information."#
    )
}

/// 界面源码生成提示
pub fn ui_prompt(intent: &Intent) -> String {
    format!(
        r#"Generate ONLY executable React code for this app specification:

App Name: {name}
Features: {features}
Components needed: {components}
UI Spec: {ui_spec}

IMPORTANT RULES:
1. Return ONLY valid React code, NO explanations or markdown
2. Component must be named "{entry}"
3. Use Tailwind CSS classes for styling
4. Only use React hooks (useState, useEffect, useMemo, useCallback, useReducer, useRef, useContext)
5. Do not import third-party libraries

Example format:
const {entry} = () => {{
  const [items, setItems] = useState([]);
  return (
    <div className="p-6">...</div>
  );
}};"#,
        name = intent.display_name(),
        features = intent.features.join(", "),
        components = intent.components.join(", "),
        ui_spec = intent.ui_spec,
        entry = ENTRY_POINT,
    )
}

/// 业务逻辑说明生成提示
pub fn business_logic_prompt(intent: &Intent) -> String {
    format!(
        "Describe the core business rules for the app \"{}\" with entities [{}] and features [{}]. \
         Answer as a short bullet list, no code.",
        intent.display_name(),
        intent.entities.join(", "),
        intent.features.join(", "),
    )
}

/// 模拟后端接口生成提示
pub fn backend_prompt(intent: &Intent) -> String {
    format!(
        "List the REST endpoints a simulated backend for \"{}\" would expose for entities [{}]. \
         Security level: {}. Answer as `METHOD /path - purpose` lines only.",
        intent.display_name(),
        intent.entities.join(", "),
        intent.security_level,
    )
}

/// 进化提示：当前源码 + 进化指令
pub fn evolve_prompt(current_source: &str, directive: &str) -> String {
    format!(
        r#"Current app code:
{current_source}

Evolution request: {directive}

IMPORTANT RULES:
1. Return ONLY valid React code, NO explanations or markdown
2. Keep existing functionality intact
3. Add the requested improvements
4. Maintain component name "{ENTRY_POINT}"
5. Use Tailwind CSS for styling

Generate the improved version:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_prompt_mentions_entry_point_and_features() {
        let mut intent = Intent::named("Shop");
        intent.features = vec!["Cart".into(), "Checkout".into()];
        let p = ui_prompt(&intent);
        assert!(p.contains("GeneratedApp"));
        assert!(p.contains("Cart, Checkout"));
    }

    #[test]
    fn test_evolve_prompt_embeds_source() {
        let p = evolve_prompt("const GeneratedApp = () => <div/>;", "add dark mode");
        assert!(p.contains("<div/>"));
        assert!(p.contains("add dark mode"));
    }
}
