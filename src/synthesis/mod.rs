//! 组件合成：清洗后的源码 -> 可调用的 MaterializedComponent
//!
//! 源码被解析成语法树，再由受限解释器求值为视图树。解释器不执行事件处理器与 effect，
//! 作用域里只有白名单 Hook 与少量内建对象。这只是语义上的收敛，并非进程级隔离。

pub mod ast;
pub mod error;
pub mod parser;
pub mod render;
pub mod sanitizer;
pub mod value;
pub mod view;

use std::sync::Arc;

pub use ast::Program;
pub use error::{RenderError, SynthesisError};
pub use parser::parse_program;
pub use render::render_program;
pub use sanitizer::sanitize;
pub use view::{RenderedView, ViewNode};

use crate::fallback::Category;
use crate::synthesis::ast::Item;

/// 入口组件名
pub const ENTRY_POINT: &str = "GeneratedApp";

/// 组件来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Synthesized,
    Fallback(Category),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Synthesized => f.write_str("synthesized"),
            Origin::Fallback(category) => write!(f, "fallback:{}", category),
        }
    }
}

/// 物化后的组件：无参可调用，每次 `render()` 都从头求值
#[derive(Debug, Clone)]
pub struct MaterializedComponent {
    program: Arc<Program>,
    source: String,
    origin: Origin,
}

impl MaterializedComponent {
    pub fn new(program: Program, source: impl Into<String>, origin: Origin) -> Self {
        Self {
            program: Arc::new(program),
            source: source.into(),
            origin,
        }
    }

    pub fn render(&self) -> Result<RenderedView, RenderError> {
        render_program(&self.program, ENTRY_POINT)
    }

    /// 规范化后的源码（可再次合成）
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// 合成端口：把清洗后的源码变成可渲染组件
pub trait ComponentSynthesizer: Send + Sync {
    fn synthesize(&self, sanitized: &str) -> Result<MaterializedComponent, SynthesisError>;
}

/// 默认实现：解析 + 受限解释器试渲染
#[derive(Debug, Default, Clone)]
pub struct SandboxSynthesizer;

impl SandboxSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

impl ComponentSynthesizer for SandboxSynthesizer {
    fn synthesize(&self, sanitized: &str) -> Result<MaterializedComponent, SynthesisError> {
        let source = sanitized.trim();
        if source.is_empty() || !sanitizer::mentions_entry_point(source) {
            return Err(SynthesisError::EmptySource);
        }

        let program = parse_program(source)?;
        let entry = program.items.iter().find(|item| match item {
            Item::Function(f) => f.name == ENTRY_POINT,
            Item::Opaque { name, .. } => name == ENTRY_POINT,
            Item::Const { .. } => false,
        });
        match entry {
            None => return Err(SynthesisError::EntryPointMissing),
            Some(Item::Opaque { reason, .. }) => {
                return Err(SynthesisError::transpile(format!(
                    "{} cannot be evaluated: {}",
                    ENTRY_POINT, reason
                )))
            }
            Some(_) => {}
        }

        let component = MaterializedComponent::new(program, source, Origin::Synthesized);
        let view = component.render()?;
        tracing::debug!(
            nodes = view.nodes.len(),
            effects = view.effects_scheduled,
            "Trial render succeeded"
        );
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(src: &str) -> Result<MaterializedComponent, SynthesisError> {
        SandboxSynthesizer::new().synthesize(src)
    }

    #[test]
    fn test_synthesize_counter() {
        let component = synth(
            r#"const GeneratedApp = () => {
  const [count, setCount] = useState(0);
  return (
    <div className="p-4">
      <button onClick={() => setCount(count + 1)}>Clicked {count} times</button>
    </div>
  );
};"#,
        )
        .expect("synthesize");
        assert_eq!(component.origin(), Origin::Synthesized);
        let view = component.render().expect("render");
        assert_eq!(
            view.to_markup(),
            "<div class=\"p-4\"><button>Clicked 0 times</button></div>"
        );
    }

    #[test]
    fn test_empty_and_unmarked_source() {
        assert_eq!(synth("").unwrap_err(), SynthesisError::EmptySource);
        assert_eq!(
            synth("const App = () => <div />;").unwrap_err(),
            SynthesisError::EmptySource
        );
    }

    #[test]
    fn test_marker_only_in_text_is_entry_point_missing() {
        let err = synth("const Title = () => <h1>GeneratedApp</h1>;").unwrap_err();
        assert_eq!(err, SynthesisError::EntryPointMissing);
    }

    #[test]
    fn test_mismatched_tags_is_transpile_error() {
        let err = synth("const GeneratedApp = () => <div><span></div>;").unwrap_err();
        assert!(matches!(err, SynthesisError::TranspileError { ref message } if message.contains("Mismatched tags")));
    }

    #[test]
    fn test_statement_heavy_entry_is_transpile_error() {
        let err = synth(
            "function GeneratedApp() {\n  for (let i = 0; i < 3; i++) {}\n  return <div />;\n}",
        )
        .unwrap_err();
        assert!(matches!(err, SynthesisError::TranspileError { .. }));
    }

    #[test]
    fn test_paint_failure_is_evaluation_error() {
        let err = synth("const GeneratedApp = () => <div>{window.location.href}</div>;").unwrap_err();
        assert!(matches!(err, SynthesisError::Evaluation { ref message } if message.contains("window is not defined")));
    }

    #[test]
    fn test_source_resynthesizes() {
        let first = synth("const GeneratedApp = () => <p>hi</p>;").unwrap();
        let second = synth(first.source()).unwrap();
        assert_eq!(
            first.render().unwrap().to_markup(),
            second.render().unwrap().to_markup()
        );
    }
}
