//! 回退库：Intent -> 一定可渲染的组件
//!
//! 纯函数且全域：任何 Intent（包括空 Intent）都能得到入口齐全、可渲染、源码可再次合成的组件。

pub mod category;
pub mod templates;

pub use category::{classify, Category};
pub use templates::{clip, js_string, TemplateSpec};

use crate::intent::Intent;
use crate::synthesis::ast::{Block, Element, Expr, FunctionDef, Item, Node, Program};
use crate::synthesis::{parse_program, MaterializedComponent, Origin, ENTRY_POINT};

/// 进入模板的 features 上限，远低于沙箱集合与步数上限
pub const MAX_FALLBACK_FEATURES: usize = 50;
/// 名称与单条 feature 的最大字符数
pub const MAX_FALLBACK_TEXT: usize = 200;

/// 按分类构造回退组件
pub fn build_fallback(intent: &Intent) -> MaterializedComponent {
    let category = classify(intent);
    build_for_category(category, intent)
}

/// 指定类别构造回退组件（名称取 Intent 展示名，features 原样列出）
pub fn build_for_category(category: Category, intent: &Intent) -> MaterializedComponent {
    let name = clip(intent.display_name(), MAX_FALLBACK_TEXT);
    let features: Vec<String> = intent
        .features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .take(MAX_FALLBACK_FEATURES)
        .map(|f| clip(f, MAX_FALLBACK_TEXT))
        .collect();
    if intent.features.len() > features.len() {
        tracing::debug!(total = intent.features.len(), kept = features.len(), "Fallback features truncated");
    }
    let source = TemplateSpec::for_category(category).source(&name, &features, intent);

    match parse_program(&source) {
        Ok(program) => MaterializedComponent::new(program, source, Origin::Fallback(category)),
        Err(e) => {
            tracing::error!(%category, "Fallback template failed to parse: {}", e);
            minimal_component(&name, category)
        }
    }
}

/// 模板自身出错时的最小组件：只有标题
fn minimal_component(name: &str, category: Category) -> MaterializedComponent {
    let markup = Node::Element(Element {
        tag: "div".to_string(),
        attrs: Vec::new(),
        children: vec![Node::Element(Element {
            tag: "h1".to_string(),
            attrs: Vec::new(),
            children: vec![Node::Text(name.to_string())],
        })],
    });
    let program = Program {
        items: vec![Item::Function(FunctionDef {
            name: ENTRY_POINT.to_string(),
            params: Vec::new(),
            block: Block {
                bindings: Vec::new(),
                result: Expr::Markup(Box::new(markup)),
            },
        })],
    };
    let source = format!(
        "const {} = () => <div><h1>{{{}}}</h1></div>;",
        ENTRY_POINT,
        js_string(name)
    );
    MaterializedComponent::new(program, source, Origin::Fallback(category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::SecurityLevel;
    use crate::synthesis::{ComponentSynthesizer, SandboxSynthesizer};

    fn intent(name: &str, features: &[&str]) -> Intent {
        Intent {
            name: name.to_string(),
            features: features.iter().map(|s| s.to_string()).collect(),
            ..Intent::default()
        }
    }

    #[test]
    fn test_every_category_renders_name_and_features() {
        for category in Category::PRIORITY {
            let intent = intent("Acme <Suite> \"Pro\"", &["Alpha feature", "Beta feature"]);
            let component = build_for_category(category, &intent);
            assert_eq!(component.origin(), Origin::Fallback(category));
            let view = component
                .render()
                .unwrap_or_else(|e| panic!("{category} failed to render: {e}"));
            let text = view.text_content();
            assert!(text.contains("Acme <Suite> \"Pro\""), "{category}: {text}");
            assert!(text.contains("Alpha feature"), "{category}");
            assert!(text.contains("Beta feature"), "{category}");
        }
    }

    #[test]
    fn test_fallback_source_resynthesizes() {
        for category in Category::PRIORITY {
            let component = build_for_category(category, &intent("Loop", &["x"]));
            let again = SandboxSynthesizer::new()
                .synthesize(component.source())
                .unwrap_or_else(|e| panic!("{category}: {e}"));
            assert_eq!(
                again.render().unwrap().to_markup(),
                component.render().unwrap().to_markup()
            );
        }
    }

    #[test]
    fn test_empty_intent_is_generic() {
        let component = build_fallback(&Intent::default());
        assert_eq!(component.origin(), Origin::Fallback(Category::Generic));
        let view = component.render().unwrap();
        let text = view.text_content();
        assert!(text.contains("Generated App"));
        assert!(text.contains("No features listed"));
        assert!(text.contains("Complexity 1/10"));
        assert!(text.contains("Security: standard"));
    }

    #[test]
    fn test_generic_footer_shows_intent_details() {
        let mut i = intent("Notebook", &[]);
        i.ui_spec = "Minimal light theme".into();
        i.estimated_complexity = 99;
        i.security_level = SecurityLevel::Enterprise;
        let view = build_fallback(&i).render().unwrap();
        let text = view.text_content();
        assert!(text.contains("Minimal light theme"));
        assert!(text.contains("Complexity 10/10"));
        assert!(text.contains("Security: enterprise"));
    }

    #[test]
    fn test_productivity_has_checkbox_per_task() {
        let view = build_fallback(&intent("Task Dashboard", &["CRUD"])).render().unwrap();
        let checkboxes: Vec<_> = view
            .find_by_tag("input")
            .into_iter()
            .filter(|n| n.attr("type") == Some("checkbox"))
            .collect();
        assert_eq!(
            checkboxes.len(),
            TemplateSpec::for_category(Category::Productivity).records.len()
        );
        assert!(view.text_content().contains("3 of 4 tasks open"));
    }

    #[test]
    fn test_finance_total_and_storefront_prices() {
        let view = build_fallback(&intent("Home budget", &[])).render().unwrap();
        assert!(view.text_content().contains("Balance: $3121.45"), "{}", view.text_content());

        let view = build_fallback(&intent("Gift shop", &[])).render().unwrap();
        assert!(view.text_content().contains("$79.50"));
        assert!(view.text_content().contains("Sold out"));
    }

    #[test]
    fn test_minimal_component_renders() {
        let component = minimal_component("Tiny", Category::Generic);
        assert_eq!(component.render().unwrap().to_markup(), "<div><h1>Tiny</h1></div>");
        assert!(parse_program(component.source()).is_ok());
    }

    #[test]
    fn test_oversized_intent_still_renders() {
        let mut big = intent(&"Mega ".repeat(5_000), &[]);
        big.features = (0..20_000).map(|i| format!("Feature {i}")).collect();
        big.ui_spec = "x".repeat(100_000);
        for category in Category::PRIORITY {
            let view = build_for_category(category, &big)
                .render()
                .unwrap_or_else(|e| panic!("{category} failed to render: {e}"));
            let text = view.text_content();
            assert!(text.contains("Feature 0"), "{category}");
            assert!(!text.contains(&format!("Feature {}", MAX_FALLBACK_FEATURES)), "{category}");
        }
    }

    #[test]
    fn test_clip_counts_chars() {
        assert_eq!(clip("Café au lait", 4), "Café...");
        assert_eq!(clip("short", 10), "short");
    }
}
