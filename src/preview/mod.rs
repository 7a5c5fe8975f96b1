//! 预览：设备框与渲染器

pub mod device;
pub mod renderer;

pub use device::{DeviceFrame, Viewport};
pub use renderer::{
    FramedView, PreviewProps, PreviewRenderer, RenderOutcome, RenderPhase, RenderStatus,
    RENDER_FAILED_MESSAGE,
};
