//! 源码清洗：去掉 Markdown 围栏、import / export 语句与多余说明文字
//!
//! 失败不抛错：没有入口标记且不是裸标记时返回空串，调用方据此判定「无可用源码」。
//! 输出满足幂等：`sanitize(sanitize(x)) == sanitize(x)`。

use std::sync::OnceLock;

use regex::Regex;

use crate::synthesis::ENTRY_POINT;

fn fence_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```([^\n`]*)\n?(.*?)```").expect("static regex"))
}

fn fence_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("static regex"))
}

fn lang_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_+\-]*$").expect("static regex"))
}

fn bare_ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][\w$]*\s*;?$").expect("static regex"))
}

fn entry_point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"\b{}\b", ENTRY_POINT)).expect("static regex"))
}

/// 单轮清洗不动点的迭代上限
const MAX_PASSES: usize = 16;

/// 清洗生成器原始输出，得到尽力而为的组件源码；无可用源码时返回空串
///
/// 单轮清洗迭代到不动点，剥掉一层后才暴露出来的模块语法与围栏也会被去掉。
pub fn sanitize(raw: &str) -> String {
    let mut current = sanitize_pass(raw);
    for _ in 0..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
    tracing::debug!("Sanitizer did not settle after {} passes", MAX_PASSES);
    current
}

fn sanitize_pass(raw: &str) -> String {
    let body = extract_fenced(raw);
    let body = strip_module_syntax(&body);
    let body = if mentions_entry_point(&body) {
        strip_prose(&body)
    } else {
        body
    };
    let body = body.trim();

    if mentions_entry_point(body) {
        body.to_string()
    } else if is_bare_markup(body) {
        format!("const {ENTRY_POINT} = () => (\n{body}\n);")
    } else {
        String::new()
    }
}

/// 文本中是否出现入口标识符
pub fn mentions_entry_point(text: &str) -> bool {
    entry_point_re().is_match(text)
}

fn is_bare_markup(text: &str) -> bool {
    text.starts_with('<') && text.ends_with('>')
}

/// 取第一个非空围栏块的内容；没有成对围栏时只去掉残留的围栏标记
fn extract_fenced(raw: &str) -> String {
    if !raw.contains("```") {
        return raw.to_string();
    }

    for caps in fence_block_re().captures_iter(raw) {
        let opening = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        let inner = if lang_tag_re().is_match(opening.trim()) {
            rest.to_string()
        } else {
            format!("{opening}\n{rest}")
        };
        if !inner.trim().is_empty() {
            return inner;
        }
    }

    let mut text = fence_token_re().replace_all(raw, "").into_owned();
    // 去掉标记后相邻反引号可能重新拼出围栏
    while text.contains("```") {
        text = text.replace("```", "");
    }
    text
}

fn is_import_start(line: &str) -> bool {
    ["import ", "import{", "import\"", "import'", "import*"]
        .iter()
        .any(|p| line.starts_with(p))
}

fn is_directive(line: &str) -> bool {
    let t = line.trim_end_matches(';');
    matches!(t, "'use client'" | "\"use client\"" | "'use strict'" | "\"use strict\"")
}

/// 剥掉行首所有 `export` / `export default` 前缀；返回余下代码与是否出现过 default
fn strip_export_prefixes(line: &str) -> (&str, bool) {
    let mut rest = line;
    let mut is_default = false;
    loop {
        if let Some(r) = rest.strip_prefix("export default ") {
            rest = r.trim_start();
            is_default = true;
        } else if let Some(r) = rest.strip_prefix("export ") {
            rest = r.trim_start();
        } else if rest == "export default" || rest == "export" {
            return ("", is_default);
        } else {
            return (rest, is_default);
        }
    }
}

/// 去掉 import、`export default X;`、export 前缀与指令行
fn strip_module_syntax(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_import = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if in_import {
            if trimmed.contains('}') || trimmed.ends_with(';') {
                in_import = false;
            }
            continue;
        }

        let (code, is_default) = strip_export_prefixes(trimmed);
        if is_import_start(code) {
            // 多行 import { a, b } from '...' 一直吞到右花括号
            in_import = code.contains('{') && !code.contains('}');
            continue;
        }
        if is_directive(code) || (is_default && bare_ident_re().is_match(code)) {
            continue;
        }
        if code.len() == trimmed.len() {
            out.push(line.to_string());
            continue;
        }
        if code.is_empty() {
            continue;
        }

        let indent = &line[..line.len() - line.trim_start().len()];
        if is_default && code.starts_with('(') {
            // 匿名默认导出的箭头函数，补上入口名
            out.push(format!("{indent}const {ENTRY_POINT} = {code}"));
        } else {
            out.push(format!("{indent}{code}"));
        }
    }

    out.join("\n")
}

fn is_code_start(line: &str) -> bool {
    const STARTS: [&str; 10] = [
        "const ", "let ", "var ", "function ", "function(", "async ", "class ", "//", "/*", "<",
    ];
    STARTS.iter().any(|p| line.starts_with(p))
}

fn is_code_end(line: &str) -> bool {
    line.ends_with(';')
        || line.ends_with('}')
        || line.ends_with(')')
        || line.ends_with('>')
        || line.ends_with("*/")
}

/// 去掉首个代码行之前、末个代码行之后的说明文字
fn strip_prose(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| is_code_start(l.trim())) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|l| is_code_end(l.trim()))
        .filter(|&e| e >= start)
        .unwrap_or(lines.len() - 1);

    lines[start..=end].join("\n")
}
