//! 渲染结果：与宿主无关的视图树，可序列化为 HTML 标记

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// 视图节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        /// 绑定了处理器的事件名（onClick、onChange ...），处理器本身从不执行
        handlers: Vec<String>,
        children: Vec<ViewNode>,
    },
    Text(String),
}

const VOID_TAGS: [&str; 8] = ["area", "br", "col", "hr", "img", "input", "meta", "source"];

impl ViewNode {
    pub fn element(tag: impl Into<String>, children: Vec<ViewNode>) -> Self {
        ViewNode::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            handlers: Vec::new(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ViewNode::Text(text.into())
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        if let ViewNode::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ViewNode::Element { tag, .. } => Some(tag),
            ViewNode::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            ViewNode::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            ViewNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[ViewNode] {
        match self {
            ViewNode::Element { children, .. } => children,
            ViewNode::Text(_) => &[],
        }
    }

    /// 所有文本拼接（不含标记）
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ViewNode::Text(t) => out.push_str(t),
            ViewNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// 深度优先遍历
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ViewNode)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&ViewNode> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if node.tag() == Some(tag) {
                found.push(node);
            }
        });
        found
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            ViewNode::Text(t) => out.push_str(&escape_text(t)),
            ViewNode::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let name = match name.as_str() {
                        "className" => "class",
                        "htmlFor" => "for",
                        other => other,
                    };
                    if value.is_empty() {
                        let _ = write!(out, " {}", name);
                    } else {
                        let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                    }
                }
                if VOID_TAGS.contains(&tag.as_str()) && children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_markup(out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

/// 一次渲染的完整输出
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedView {
    pub nodes: Vec<ViewNode>,
    /// 登记但未执行的 effect 数量
    pub effects_scheduled: usize,
}

impl RenderedView {
    pub fn to_markup(&self) -> String {
        self.nodes.iter().map(ViewNode::to_markup).collect()
    }

    pub fn text_content(&self) -> String {
        self.nodes.iter().map(ViewNode::text_content).collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&ViewNode> {
        self.nodes.iter().flat_map(|n| n.find_by_tag(tag)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_serialization() {
        let node = ViewNode::element(
            "div",
            vec![
                ViewNode::element("input", vec![])
                    .with_attr("type", "checkbox")
                    .with_attr("checked", ""),
                ViewNode::text("a < b & c"),
            ],
        )
        .with_attr("className", "p-4 \"x\"");
        assert_eq!(
            node.to_markup(),
            "<div class=\"p-4 &quot;x&quot;\"><input checked type=\"checkbox\" />a &lt; b &amp; c</div>"
        );
        assert_eq!(node.text_content(), "a < b & c");
    }

    #[test]
    fn test_find_by_tag() {
        let node = ViewNode::element(
            "ul",
            vec![
                ViewNode::element("li", vec![ViewNode::text("1")]),
                ViewNode::element("li", vec![ViewNode::text("2")]),
            ],
        );
        assert_eq!(node.find_by_tag("li").len(), 2);
        assert!(node.find_by_tag("span").is_empty());
    }
}
