//! 预览设备框：只影响视口尺寸

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFrame {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// 视口尺寸（像素）；None 表示填满宿主
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl DeviceFrame {
    pub fn viewport(&self) -> Viewport {
        match self {
            DeviceFrame::Mobile => Viewport {
                width: Some(256),
                height: Some(384),
            },
            DeviceFrame::Tablet => Viewport {
                width: Some(320),
                height: Some(384),
            },
            DeviceFrame::Desktop => Viewport {
                width: None,
                height: None,
            },
        }
    }

    /// 框体尺寸对应的 Tailwind 类
    pub fn size_class(&self) -> &'static str {
        match self {
            DeviceFrame::Mobile => "w-64 h-96",
            DeviceFrame::Tablet => "w-80 h-96",
            DeviceFrame::Desktop => "w-full h-full",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceFrame::Desktop => "desktop",
            DeviceFrame::Tablet => "tablet",
            DeviceFrame::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for DeviceFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(DeviceFrame::Desktop),
            "tablet" => Ok(DeviceFrame::Tablet),
            "mobile" => Ok(DeviceFrame::Mobile),
            other => Err(format!("unknown device '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewports() {
        assert_eq!(DeviceFrame::Mobile.viewport().width, Some(256));
        assert_eq!(DeviceFrame::Tablet.viewport().width, Some(320));
        assert_eq!(DeviceFrame::Tablet.viewport().height, Some(384));
        assert_eq!(DeviceFrame::Desktop.viewport().width, None);
        assert_eq!(DeviceFrame::default(), DeviceFrame::Desktop);
    }

    #[test]
    fn test_parse_device() {
        assert_eq!("Mobile".parse::<DeviceFrame>(), Ok(DeviceFrame::Mobile));
        assert!("watch".parse::<DeviceFrame>().is_err());
        let d: DeviceFrame = serde_json::from_str("\"tablet\"").unwrap();
        assert_eq!(d, DeviceFrame::Tablet);
    }
}
