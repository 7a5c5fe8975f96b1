//! 回退模板分类
//!
//! 在 features ∪ components ∪ name 上做不区分大小写的整词匹配（允许复数词尾，驼峰名先拆词），
//! 按固定优先级取第一个命中的类别。

use std::sync::OnceLock;

use regex::Regex;

use crate::intent::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Dashboard,
    Storefront,
    Social,
    Productivity,
    Finance,
    Generic,
}

impl Category {
    /// 优先级从高到低
    pub const PRIORITY: [Category; 6] = [
        Category::Dashboard,
        Category::Storefront,
        Category::Social,
        Category::Productivity,
        Category::Finance,
        Category::Generic,
    ];

    /// 关键词（小写整词）；"dashboard" 本身不算，几乎所有应用都自称 dashboard
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::Dashboard => &[
                "analytics", "metric", "chart", "kpi", "report", "reporting", "insight", "monitor",
                "monitoring", "statistic", "stats",
            ],
            Category::Storefront => &[
                "shop", "shopping", "store", "storefront", "product", "cart", "commerce",
                "ecommerce", "catalog", "checkout", "retail",
            ],
            Category::Social => &[
                "social", "feed", "post", "friend", "follower", "chat", "comment", "community",
                "messaging",
            ],
            Category::Productivity => &[
                "task", "todo", "to-do", "kanban", "project", "note", "reminder", "checklist",
                "productivity",
            ],
            Category::Finance => &[
                "budget", "finance", "financial", "expense", "ledger", "transaction", "invoice",
                "bank", "banking", "payment", "wallet", "accounting",
            ],
            Category::Generic => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dashboard => "dashboard",
            Category::Storefront => "storefront",
            Category::Social => "social",
            Category::Productivity => "productivity",
            Category::Finance => "finance",
            Category::Generic => "generic",
        }
    }

    fn matcher(&self) -> Option<&'static Regex> {
        static MATCHERS: OnceLock<Vec<(Category, Regex)>> = OnceLock::new();
        let matchers = MATCHERS.get_or_init(|| {
            Category::PRIORITY
                .into_iter()
                .filter(|c| !c.keywords().is_empty())
                .map(|c| {
                    let alternatives: Vec<String> =
                        c.keywords().iter().map(|kw| regex::escape(kw)).collect();
                    let pattern = format!(r"\b(?:{})(?:s|es)?\b", alternatives.join("|"));
                    (c, Regex::new(&pattern).expect("static regex"))
                })
                .collect()
        });
        matchers.iter().find(|(c, _)| c == self).map(|(_, re)| re)
    }

    fn matches(&self, haystack: &[String]) -> bool {
        self.matcher()
            .is_some_and(|re| haystack.iter().any(|h| re.is_match(h)))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对 Intent 分类；没有任何关键词命中时为 Generic
pub fn classify(intent: &Intent) -> Category {
    let haystack: Vec<String> = intent.keyword_haystack().map(split_words).collect();
    Category::PRIORITY
        .into_iter()
        .find(|c| c.matches(&haystack))
        .unwrap_or(Category::Generic)
}

/// 驼峰拆词并转小写："RevenueChart" -> "revenue chart"
fn split_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev_lower = false;
    for c in text.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_with(features: &[&str], components: &[&str], name: &str) -> Intent {
        Intent {
            name: name.to_string(),
            features: features.iter().map(|s| s.to_string()).collect(),
            components: components.iter().map(|s| s.to_string()).collect(),
            ..Intent::default()
        }
    }

    #[test]
    fn test_single_keyword_per_category() {
        assert_eq!(classify(&intent_with(&["Budget planning"], &[], "")), Category::Finance);
        assert_eq!(classify(&intent_with(&[], &["ProductGrid"], "")), Category::Storefront);
        assert_eq!(classify(&intent_with(&["News feed"], &[], "")), Category::Social);
        assert_eq!(classify(&intent_with(&[], &[], "Task Board")), Category::Productivity);
        assert_eq!(classify(&intent_with(&["KPI tiles"], &[], "")), Category::Dashboard);
        assert_eq!(classify(&intent_with(&["Login"], &["Form"], "Thing")), Category::Generic);
    }

    #[test]
    fn test_priority_order_not_input_order() {
        let intent = intent_with(&["Expense ledger", "Shopping cart"], &[], "");
        assert_eq!(classify(&intent), Category::Storefront);

        let intent = intent_with(&["todo list"], &["RevenueChart"], "");
        assert_eq!(classify(&intent), Category::Dashboard);

        let intent = intent_with(&["Invoice export", "Project tracking"], &[], "");
        assert_eq!(classify(&intent), Category::Productivity);
    }

    #[test]
    fn test_case_insensitive_and_deterministic() {
        let intent = intent_with(&["SHOPPING"], &[], "");
        assert_eq!(classify(&intent), Category::Storefront);
        assert_eq!(classify(&intent), classify(&intent.clone()));
    }

    #[test]
    fn test_dashboard_word_alone_is_not_a_category_signal() {
        let intent = intent_with(&["CRUD Operations"], &["Dashboard", "Form", "Table"], "Task Dashboard");
        assert_eq!(classify(&intent), Category::Productivity);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert_eq!(classify(&intent_with(&[], &[], "Productivity Suite")), Category::Productivity);
        assert_ne!(classify(&intent_with(&["User feedback form"], &[], "")), Category::Social);
        assert_eq!(classify(&intent_with(&["Cloud storage"], &[], "")), Category::Generic);
        assert_eq!(classify(&intent_with(&["Restore backups"], &[], "")), Category::Generic);
        assert_eq!(classify(&intent_with(&[], &[], "Notebook")), Category::Generic);
    }

    #[test]
    fn test_plurals_and_camel_case_components() {
        assert_eq!(classify(&intent_with(&["Weekly reports"], &[], "")), Category::Dashboard);
        assert_eq!(classify(&intent_with(&[], &["TaskList"], "")), Category::Productivity);
        assert_eq!(classify(&intent_with(&[], &["CheckoutButton"], "")), Category::Storefront);
        assert_eq!(split_words("RevenueChart KPI"), "revenue chart kpi");
    }
}
