//! 预览渲染器：持有当前组件，合成失败时换上回退组件
//!
//! 每个周期：Empty → Compiling → {Rendered | Failed}。切换设备只重绘，不重新合成。

use std::sync::Arc;

use crate::fallback::build_fallback;
use crate::intent::Intent;
use crate::preview::DeviceFrame;
use crate::synthesis::{
    sanitize, ComponentSynthesizer, MaterializedComponent, Origin, RenderedView, SandboxSynthesizer,
    SynthesisError,
};

/// 面向用户的通用失败文案；具体原因只进日志
pub const RENDER_FAILED_MESSAGE: &str = "Failed to render generated app";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    Empty,
    Compiling,
    Rendered,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStatus {
    pub phase: RenderPhase,
    pub error_message: Option<String>,
}

impl RenderStatus {
    fn with_phase(phase: RenderPhase) -> Self {
        Self {
            phase,
            error_message: None,
        }
    }

    fn failed() -> Self {
        Self {
            phase: RenderPhase::Failed,
            error_message: Some(RENDER_FAILED_MESSAGE.to_string()),
        }
    }
}

/// 渲染输入
#[derive(Debug, Clone, Default)]
pub struct PreviewProps {
    pub source: String,
    pub intent: Option<Intent>,
    pub device: DeviceFrame,
}

/// 装进设备框的视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedView {
    pub device: DeviceFrame,
    pub view: RenderedView,
}

impl FramedView {
    pub fn to_markup(&self) -> String {
        format!(
            "<div class=\"{} bg-white rounded-lg overflow-hidden shadow-lg\" data-device=\"{}\"><div class=\"h-full overflow-auto\">{}</div></div>",
            self.device.size_class(),
            self.device,
            self.view.to_markup()
        )
    }
}

/// 一次 render 的结果
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub status: RenderStatus,
    pub origin: Option<Origin>,
    pub view: Option<FramedView>,
    /// 合成失败原因（若有），仅供日志与测试
    pub synthesis_error: Option<SynthesisError>,
}

pub struct PreviewRenderer {
    synthesizer: Arc<dyn ComponentSynthesizer>,
    current: Option<MaterializedComponent>,
    device: DeviceFrame,
    status: RenderStatus,
    syntheses: usize,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new(Arc::new(SandboxSynthesizer::new()))
    }
}

impl PreviewRenderer {
    pub fn new(synthesizer: Arc<dyn ComponentSynthesizer>) -> Self {
        Self {
            synthesizer,
            current: None,
            device: DeviceFrame::default(),
            status: RenderStatus::default(),
            syntheses: 0,
        }
    }

    pub fn with_device(mut self, device: DeviceFrame) -> Self {
        self.device = device;
        self
    }

    /// 新源码 / 新 Intent：清洗 + 合成，失败则按 Intent 回退
    pub fn render(&mut self, props: &PreviewProps) -> RenderOutcome {
        self.device = props.device;
        self.status = RenderStatus::with_phase(RenderPhase::Compiling);

        let synthesis_error = match self.synthesize(&props.source) {
            Ok(component) => {
                self.install(component);
                None
            }
            Err(e) => {
                tracing::warn!("Synthesis failed, falling back: {}", e);
                self.current = None;
                if let Some(intent) = &props.intent {
                    self.install(build_fallback(intent));
                }
                Some(e)
            }
        };

        let mut view = self.paint();
        // 合成结果绘制失败时再退一次
        if view.is_none() && self.origin() == Some(Origin::Synthesized) {
            if let Some(intent) = &props.intent {
                self.install(build_fallback(intent));
                view = self.paint();
            }
        }

        RenderOutcome {
            status: self.status.clone(),
            origin: self.origin(),
            view,
            synthesis_error,
        }
    }

    /// 只在合成成功时安装；失败时保留当前组件与状态不变
    pub fn try_install(&mut self, source: &str) -> Result<RenderOutcome, SynthesisError> {
        let component = self.synthesize(source)?;
        self.install(component);
        let view = self.paint();
        Ok(RenderOutcome {
            status: self.status.clone(),
            origin: self.origin(),
            view,
            synthesis_error: None,
        })
    }

    /// 切换设备框：重绘当前组件
    pub fn set_device(&mut self, device: DeviceFrame) -> Option<FramedView> {
        self.device = device;
        if self.current.is_none() {
            return None;
        }
        self.paint()
    }

    pub fn status(&self) -> &RenderStatus {
        &self.status
    }

    pub fn device(&self) -> DeviceFrame {
        self.device
    }

    pub fn current(&self) -> Option<&MaterializedComponent> {
        self.current.as_ref()
    }

    pub fn origin(&self) -> Option<Origin> {
        self.current.as_ref().map(MaterializedComponent::origin)
    }

    /// 累计合成次数
    pub fn syntheses(&self) -> usize {
        self.syntheses
    }

    fn synthesize(&mut self, source: &str) -> Result<MaterializedComponent, SynthesisError> {
        self.syntheses += 1;
        let sanitized = sanitize(source);
        tracing::debug!(raw = source.len(), sanitized = sanitized.len(), "Synthesizing component");
        self.synthesizer.synthesize(&sanitized)
    }

    fn install(&mut self, component: MaterializedComponent) {
        tracing::info!(origin = %component.origin(), "Installing component");
        self.current = Some(component);
    }

    fn paint(&mut self) -> Option<FramedView> {
        let Some(component) = &self.current else {
            self.status = RenderStatus::failed();
            return None;
        };
        match component.render() {
            Ok(view) => {
                self.status = RenderStatus::with_phase(RenderPhase::Rendered);
                Some(FramedView {
                    device: self.device,
                    view,
                })
            }
            Err(e) => {
                tracing::warn!(origin = %component.origin(), "Paint failed: {}", e);
                self.status = RenderStatus::failed();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::Category;

    const COUNTER: &str = "```jsx\nimport React, { useState } from 'react';\nconst GeneratedApp = () => {\n  const [n, setN] = useState(2);\n  return <p>n = {n}</p>;\n};\nexport default GeneratedApp;\n```";

    fn props(source: &str, intent: Option<Intent>) -> PreviewProps {
        PreviewProps {
            source: source.to_string(),
            intent,
            device: DeviceFrame::Desktop,
        }
    }

    #[test]
    fn test_initial_status_is_empty() {
        let renderer = PreviewRenderer::default();
        assert_eq!(renderer.status().phase, RenderPhase::Empty);
        assert!(renderer.current().is_none());
    }

    #[test]
    fn test_render_synthesized_source() {
        let mut renderer = PreviewRenderer::default();
        let outcome = renderer.render(&props(COUNTER, None));
        assert_eq!(outcome.status.phase, RenderPhase::Rendered);
        assert_eq!(outcome.origin, Some(Origin::Synthesized));
        assert_eq!(outcome.view.unwrap().view.text_content(), "n = 2");
    }

    #[test]
    fn test_failure_with_intent_uses_fallback() {
        let mut renderer = PreviewRenderer::default();
        let outcome = renderer.render(&props("I cannot comply.", Some(Intent::named("Todo Hub"))));
        assert_eq!(outcome.status.phase, RenderPhase::Rendered);
        assert_eq!(outcome.origin, Some(Origin::Fallback(Category::Productivity)));
        assert_eq!(outcome.synthesis_error, Some(SynthesisError::EmptySource));
        assert!(outcome.view.unwrap().view.text_content().contains("Todo Hub"));
    }

    #[test]
    fn test_oversized_intent_falls_back_to_rendered() {
        let mut intent = Intent::named("Huge task list");
        intent.features = vec!["Row".to_string(); 20_000];
        let mut renderer = PreviewRenderer::default();
        let outcome = renderer.render(&props("", Some(intent)));
        assert_eq!(outcome.status.phase, RenderPhase::Rendered);
        assert_eq!(outcome.origin, Some(Origin::Fallback(Category::Productivity)));
    }

    #[test]
    fn test_failure_without_intent_is_failed() {
        let mut renderer = PreviewRenderer::default();
        renderer.render(&props(COUNTER, None));
        let outcome = renderer.render(&props("const GeneratedApp = () => <div>;", None));
        assert_eq!(outcome.status.phase, RenderPhase::Failed);
        assert_eq!(
            outcome.status.error_message.as_deref(),
            Some(RENDER_FAILED_MESSAGE)
        );
        assert!(outcome.view.is_none());
        assert!(renderer.current().is_none());
    }

    #[test]
    fn test_device_change_does_not_resynthesize() {
        let mut renderer = PreviewRenderer::default();
        renderer.render(&props(COUNTER, None));
        assert_eq!(renderer.syntheses(), 1);
        let framed = renderer.set_device(DeviceFrame::Mobile).expect("repaint");
        assert_eq!(framed.device, DeviceFrame::Mobile);
        assert!(framed.to_markup().starts_with("<div class=\"w-64 h-96"));
        assert_eq!(renderer.syntheses(), 1);
    }

    #[test]
    fn test_try_install_keeps_last_good() {
        let mut renderer = PreviewRenderer::default();
        renderer.render(&props(COUNTER, None));
        let err = renderer.try_install("nothing useful").unwrap_err();
        assert_eq!(err, SynthesisError::EmptySource);
        assert_eq!(renderer.origin(), Some(Origin::Synthesized));
        assert_eq!(renderer.status().phase, RenderPhase::Rendered);

        let outcome = renderer
            .try_install("const GeneratedApp = () => <h2>v2</h2>;")
            .unwrap();
        assert_eq!(outcome.view.unwrap().view.to_markup(), "<h2>v2</h2>");
    }
}
