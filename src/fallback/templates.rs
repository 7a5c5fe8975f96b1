//! 分类模板：数据表 + 源码片段
//!
//! 每个模板输出完整的组件源码：常量前导（应用名、features、样例记录）加上类别专属的组件体。
//! 源码随后走与生成结果相同的解析路径。

use std::fmt::Write as _;

use crate::fallback::Category;
use crate::intent::Intent;

/// 样例记录；各类别对字段的解释不同（商品价格、交易金额、点赞数 ...）
#[derive(Debug, Clone, Copy)]
pub struct Record {
    pub title: &'static str,
    pub detail: &'static str,
    pub amount: f64,
    pub flag: bool,
}

const fn rec(title: &'static str, detail: &'static str, amount: f64, flag: bool) -> Record {
    Record {
        title,
        detail,
        amount,
        flag,
    }
}

/// 单个类别的模板描述
#[derive(Debug, Clone, Copy)]
pub struct TemplateSpec {
    pub category: Category,
    pub records: &'static [Record],
    body: &'static str,
}

pub static TEMPLATES: [TemplateSpec; 6] = [
    TemplateSpec {
        category: Category::Dashboard,
        records: &[
            rec("Active Users", "+12% vs last period", 1284.0, true),
            rec("Revenue", "+4.3% vs last period", 48250.0, true),
            rec("Churn", "-0.8% vs last period", 3.2, false),
            rec("Open Tickets", "5 awaiting reply", 27.0, false),
        ],
        body: DASHBOARD_BODY,
    },
    TemplateSpec {
        category: Category::Storefront,
        records: &[
            rec("Aurora Lamp", "Warm ambient lighting", 49.0, true),
            rec("Canvas Backpack", "Water resistant, 20L", 79.5, true),
            rec("Ceramic Mug", "Hand glazed, 350ml", 18.0, false),
            rec("Desk Plant", "Low maintenance succulent", 24.99, true),
        ],
        body: STOREFRONT_BODY,
    },
    TemplateSpec {
        category: Category::Social,
        records: &[
            rec("Maya Chen", "Just shipped our new onboarding flow!", 42.0, false),
            rec("Leo Park", "Anyone up for a design critique Friday?", 17.0, false),
            rec("Sam Rivera", "Weekly roundup is live, link in bio.", 8.0, true),
        ],
        body: SOCIAL_BODY,
    },
    TemplateSpec {
        category: Category::Productivity,
        records: &[
            rec("Draft project brief", "Due today", 1.0, true),
            rec("Review pull requests", "Due tomorrow", 2.0, false),
            rec("Plan sprint backlog", "Due Friday", 3.0, false),
            rec("Update roadmap", "Next week", 4.0, false),
        ],
        body: PRODUCTIVITY_BODY,
    },
    TemplateSpec {
        category: Category::Finance,
        records: &[
            rec("Salary", "Income - Mar 01", 4200.0, true),
            rec("Rent", "Housing - Mar 02", -1450.0, false),
            rec("Groceries", "Food - Mar 05", -186.4, false),
            rec("Freelance invoice", "Income - Mar 09", 650.0, true),
            rec("Utilities", "Bills - Mar 12", -92.15, false),
        ],
        body: FINANCE_BODY,
    },
    TemplateSpec {
        category: Category::Generic,
        records: &[
            rec("Overview", "Everything at a glance", 0.0, true),
            rec("Activity", "Recent changes and updates", 0.0, true),
            rec("Settings", "Tune the app to your needs", 0.0, false),
        ],
        body: GENERIC_BODY,
    },
];

impl TemplateSpec {
    pub fn for_category(category: Category) -> &'static TemplateSpec {
        TEMPLATES
            .iter()
            .find(|t| t.category == category)
            .unwrap_or(&TEMPLATES[TEMPLATES.len() - 1])
    }

    /// 生成完整源码
    pub fn source(&self, name: &str, features: &[String], intent: &Intent) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "const appName = {};", js_string(name));
        let features = features
            .iter()
            .map(|f| js_string(f))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "const features = [{}];", features);
        out.push_str("const records = [\n");
        for r in self.records {
            let _ = writeln!(
                out,
                "  {{ title: {}, detail: {}, amount: {}, flag: {} }},",
                js_string(r.title),
                js_string(r.detail),
                r.amount,
                r.flag
            );
        }
        out.push_str("];\n");
        if self.category == Category::Generic {
            let _ = writeln!(out, "const uiSpec = {};", js_string(&clip(intent.ui_spec.trim(), 500)));
            let _ = writeln!(out, "const complexity = {};", intent.complexity());
            let _ = writeln!(out, "const security = {};", js_string(intent.security_level.as_str()));
        }
        out.push('\n');
        out.push_str(self.body.replace("{{FEATURES}}", FEATURES_SECTION).trim_start());
        out
    }
}

/// 按字符截断，超长时以 "..." 结尾
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}

/// 双引号 JS 字符串字面量；反引号也转义，避免被当作 Markdown 围栏
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '`' => out.push_str("\\u0060"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

const FEATURES_SECTION: &str = r#"<section className="mt-8">
        <h2 className="text-lg font-semibold mb-2">Features</h2>
        <ul className="space-y-1">
          {features.length === 0 ? (
            <li className="text-slate-500">No features listed</li>
          ) : (
            features.map((feature) => (
              <li key={feature} className="text-slate-300">{feature}</li>
            ))
          )}
        </ul>
      </section>"#;

const DASHBOARD_BODY: &str = r#"
const GeneratedApp = () => {
  const [range, setRange] = useState("7d");
  const ranges = ["24h", "7d", "30d"];
  return (
    <div className="min-h-screen bg-slate-900 text-white p-6">
      <header className="flex items-center justify-between mb-6">
        <h1 className="text-3xl font-bold">{appName}</h1>
        <div className="flex gap-2">
          {ranges.map((r) => (
            <button
              key={r}
              className={r === range ? "px-3 py-1 rounded bg-cyan-500" : "px-3 py-1 rounded bg-slate-700"}
              onClick={() => setRange(r)}
            >
              {r}
            </button>
          ))}
        </div>
      </header>
      <p className="text-sm text-slate-400 mb-4">Showing the last {range}</p>
      <div className="grid grid-cols-2 gap-4">
        {records.map((m) => (
          <div key={m.title} className="bg-slate-800 p-4 rounded-lg">
            <p className="text-sm text-slate-400">{m.title}</p>
            <p className="text-2xl font-semibold">{m.amount.toLocaleString()}</p>
            <p className={m.flag ? "text-green-400 text-xs" : "text-red-400 text-xs"}>{m.detail}</p>
          </div>
        ))}
      </div>
      {{FEATURES}}
    </div>
  );
};
"#;

const STOREFRONT_BODY: &str = r#"
const GeneratedApp = () => {
  const [query, setQuery] = useState("");
  const [cart, setCart] = useState([]);
  const visible = records.filter((p) => p.title.toLowerCase().includes(query.trim().toLowerCase()));
  return (
    <div className="min-h-screen bg-slate-50 text-slate-900 p-6">
      <header className="flex items-center justify-between mb-6">
        <h1 className="text-3xl font-bold">{appName}</h1>
        <span className="rounded-full bg-slate-900 text-white px-3 py-1">Cart ({cart.length})</span>
      </header>
      <input
        type="search"
        className="w-full border rounded px-3 py-2 mb-4"
        placeholder="Search products"
        value={query}
        onChange={(e) => setQuery(e.target.value)}
      />
      <div className="grid grid-cols-2 gap-4">
        {visible.map((p) => (
          <div key={p.title} className="bg-white rounded-lg shadow p-4">
            <h2 className="font-semibold">{p.title}</h2>
            <p className="text-sm text-slate-500">{p.detail}</p>
            <p className="text-lg font-bold mt-2">${p.amount.toFixed(2)}</p>
            <button
              className="mt-2 w-full rounded bg-indigo-600 text-white py-1"
              disabled={!p.flag}
              onClick={() => setCart([...cart, p.title])}
            >
              {p.flag ? "Add to cart" : "Sold out"}
            </button>
          </div>
        ))}
      </div>
      {visible.length === 0 ? <p className="text-slate-500">No products match your search</p> : null}
      {{FEATURES}}
    </div>
  );
};
"#;

const SOCIAL_BODY: &str = r#"
const GeneratedApp = () => {
  const [draft, setDraft] = useState("");
  const [liked, setLiked] = useState(records.filter((post) => post.flag).map((post) => post.title));
  return (
    <div className="min-h-screen bg-slate-900 text-white p-6 max-w-xl mx-auto">
      <h1 className="text-3xl font-bold mb-4">{appName}</h1>
      <div className="bg-slate-800 rounded-lg p-4 mb-6">
        <textarea
          className="w-full bg-slate-900 rounded p-2"
          placeholder="Share something with your community"
          value={draft}
          onChange={(e) => setDraft(e.target.value)}
        />
        <button
          className="mt-2 rounded bg-cyan-500 px-4 py-1"
          disabled={draft.trim().length === 0}
          onClick={() => setDraft("")}
        >
          Post
        </button>
      </div>
      <ul className="space-y-4">
        {records.map((post) => (
          <li key={post.title} className="bg-slate-800 rounded-lg p-4">
            <p className="font-semibold">{post.title}</p>
            <p className="text-slate-300">{post.detail}</p>
            <button
              className="text-sm text-pink-400 mt-2"
              onClick={() => setLiked(liked.includes(post.title) ? liked.filter((t) => t !== post.title) : [...liked, post.title])}
            >
              {liked.includes(post.title) ? "Liked" : "Like"} ({post.amount + (liked.includes(post.title) ? 1 : 0)})
            </button>
          </li>
        ))}
      </ul>
      {{FEATURES}}
    </div>
  );
};
"#;

const PRODUCTIVITY_BODY: &str = r#"
const GeneratedApp = () => {
  const [tasks, setTasks] = useState(records);
  const [draft, setDraft] = useState("");
  const remaining = tasks.filter((t) => !t.flag).length;
  return (
    <div className="min-h-screen bg-slate-900 text-white p-6 max-w-2xl mx-auto">
      <header className="mb-6">
        <h1 className="text-3xl font-bold">{appName}</h1>
        <p className="text-slate-400">{remaining} of {tasks.length} tasks open</p>
      </header>
      <form
        className="flex gap-2 mb-4"
        onSubmit={(e) => {
          e.preventDefault();
          if (draft.trim()) {
            setTasks([...tasks, { title: draft.trim(), detail: "New", amount: tasks.length + 1, flag: false }]);
            setDraft("");
          }
        }}
      >
        <input
          type="text"
          className="flex-1 rounded bg-slate-800 px-3 py-2"
          placeholder="Add a task"
          value={draft}
          onChange={(e) => setDraft(e.target.value)}
        />
        <button type="submit" className="rounded bg-cyan-500 px-4">Add</button>
      </form>
      <ul className="space-y-2">
        {tasks.map((t) => (
          <li key={t.title} className="flex items-center gap-3 bg-slate-800 rounded p-3">
            <input
              type="checkbox"
              checked={t.flag}
              onChange={() => setTasks(tasks.map((x) => (x.title === t.title ? { ...x, flag: !x.flag } : x)))}
            />
            <span className={t.flag ? "line-through text-slate-500" : ""}>{t.title}</span>
            <span className="ml-auto text-xs text-slate-400">{t.detail}</span>
          </li>
        ))}
      </ul>
      {{FEATURES}}
    </div>
  );
};
"#;

const FINANCE_BODY: &str = r#"
const GeneratedApp = () => {
  const [filter, setFilter] = useState("all");
  const tabs = ["all", "income", "expense"];
  const visible = records.filter((t) => filter === "all" || (filter === "income" ? t.amount > 0 : t.amount < 0));
  const total = visible.reduce((sum, t) => sum + t.amount, 0);
  return (
    <div className="min-h-screen bg-slate-900 text-white p-6">
      <header className="flex items-center justify-between mb-6">
        <h1 className="text-3xl font-bold">{appName}</h1>
        <p className={total < 0 ? "text-red-400 text-xl" : "text-green-400 text-xl"}>
          Balance: {total < 0 ? "-" : ""}${Math.abs(total).toFixed(2)}
        </p>
      </header>
      <div className="flex gap-2 mb-4">
        {tabs.map((tab) => (
          <button
            key={tab}
            className={tab === filter ? "px-3 py-1 rounded bg-emerald-500" : "px-3 py-1 rounded bg-slate-700"}
            onClick={() => setFilter(tab)}
          >
            {tab}
          </button>
        ))}
      </div>
      <table className="w-full text-left">
        <tbody>
          {visible.map((t) => (
            <tr key={t.title} className="border-b border-slate-800">
              <td className="py-2">{t.title}</td>
              <td className="py-2 text-slate-400">{t.detail}</td>
              <td className={t.amount < 0 ? "py-2 text-right text-red-400" : "py-2 text-right text-green-400"}>
                {t.amount.toFixed(2)}
              </td>
            </tr>
          ))}
        </tbody>
      </table>
      {{FEATURES}}
    </div>
  );
};
"#;

const GENERIC_BODY: &str = r#"
const GeneratedApp = () => {
  const [count, setCount] = useState(0);
  return (
    <div className="min-h-screen bg-slate-900 text-white p-6">
      <div className="max-w-4xl mx-auto">
        <h1 className="text-3xl font-bold mb-6">{appName}</h1>
        <button className="rounded bg-cyan-500 px-4 py-2 mb-6" onClick={() => setCount(count + 1)}>
          Clicked {count} times
        </button>
        <div className="grid grid-cols-3 gap-6">
          {records.map((card) => (
            <div key={card.title} className="bg-slate-800 p-6 rounded-lg">
              <h2 className="text-xl font-semibold mb-2">{card.title}</h2>
              <p className="text-slate-400">{card.detail}</p>
            </div>
          ))}
        </div>
        {{FEATURES}}
        <footer className="mt-8 flex gap-4 text-xs text-slate-500">
          <span>{uiSpec || "No UI spec provided"}</span>
          <span>Complexity {complexity}/10</span>
          <span>Security: {security}</span>
        </footer>
      </div>
    </div>
  );
};
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escaping() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a \"b\" \\ c"), "\"a \\\"b\\\" \\\\ c\"");
        assert_eq!(js_string("x```y"), "\"x\\u0060\\u0060\\u0060y\"");
        assert_eq!(js_string("line\nbreak\u{1}"), "\"line\\nbreak\\u0001\"");
    }

    #[test]
    fn test_every_category_has_a_template() {
        for category in Category::PRIORITY {
            let spec = TemplateSpec::for_category(category);
            assert_eq!(spec.category, category);
            assert!(!spec.records.is_empty());
        }
    }

    #[test]
    fn test_source_contains_prelude_and_entry() {
        let intent = Intent::named("Ledger");
        let src = TemplateSpec::for_category(Category::Finance).source(
            "Ledger",
            &["Budgets".to_string()],
            &intent,
        );
        assert!(src.starts_with("const appName = \"Ledger\";"));
        assert!(src.contains("const features = [\"Budgets\"];"));
        assert!(src.contains("amount: -1450, flag: false"));
        assert!(src.contains("const GeneratedApp = () => {"));
        assert!(!src.contains("{{FEATURES}}"));
    }
}
