//! View capture seam. The host application owns the views; the pipeline
//! only asks for frames. Implementations return `None` rather than failing.

use crate::codec::{self, RawFrame};
use std::path::{Path, PathBuf};

pub trait ViewCapture: Send + Sync {
    fn capture_active_view(&self) -> Option<RawFrame>;

    /// View names in display order.
    fn list_available_views(&self) -> Vec<String>;

    fn capture_view_by_name(&self, name: &str) -> Option<RawFrame>;
}

/// Treats image files as views, named by file stem. The first file is the
/// active view.
pub struct ImageFileCapture {
    paths: Vec<PathBuf>,
}

impl ImageFileCapture {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    fn view_name(path: &Path) -> String {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    fn load(path: &Path) -> Option<RawFrame> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        match codec::decode_bytes(&bytes) {
            Ok(image) if image.width() > 0 && image.height() > 0 => {
                Some(codec::image_to_frame(&image))
            }
            Ok(_) => {
                log::warn!("{} has invalid dimensions", path.display());
                None
            }
            Err(e) => {
                log::warn!("Cannot decode {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl ViewCapture for ImageFileCapture {
    fn capture_active_view(&self) -> Option<RawFrame> {
        match self.paths.first() {
            Some(path) => Self::load(path),
            None => {
                log::warn!("No active view found.");
                None
            }
        }
    }

    fn list_available_views(&self) -> Vec<String> {
        self.paths.iter().map(|path| Self::view_name(path)).collect()
    }

    fn capture_view_by_name(&self, name: &str) -> Option<RawFrame> {
        match self.paths.iter().find(|path| Self::view_name(path) == name) {
            Some(path) => Self::load(path),
            None => {
                log::warn!("View '{}' not found.", name);
                None
            }
        }
    }
}

#[cfg(feature = "screen")]
pub use screen::MonitorCapture;

#[cfg(feature = "screen")]
mod screen {
    use super::ViewCapture;
    use crate::codec::{self, RawFrame};
    use image::DynamicImage;
    use xcap::Monitor;

    /// Monitors as views; the primary monitor is the active one.
    pub struct MonitorCapture;

    impl MonitorCapture {
        fn grab(monitor: &Monitor) -> Option<RawFrame> {
            match monitor.capture_image() {
                Ok(image) => Some(codec::image_to_frame(&DynamicImage::ImageRgba8(image))),
                Err(e) => {
                    log::warn!("Screen capture failed: {}", e);
                    None
                }
            }
        }

        fn monitors() -> Vec<Monitor> {
            Monitor::all().unwrap_or_else(|e| {
                log::warn!("Failed to enumerate monitors: {}", e);
                Vec::new()
            })
        }
    }

    impl ViewCapture for MonitorCapture {
        fn capture_active_view(&self) -> Option<RawFrame> {
            let monitors = Self::monitors();
            let primary = monitors
                .iter()
                .find(|m| m.is_primary().unwrap_or(false))
                .or_else(|| monitors.first())?;
            Self::grab(primary)
        }

        fn list_available_views(&self) -> Vec<String> {
            Self::monitors()
                .iter()
                .filter_map(|m| m.name().ok())
                .collect()
        }

        fn capture_view_by_name(&self, name: &str) -> Option<RawFrame> {
            let monitors = Self::monitors();
            let monitor = monitors
                .iter()
                .find(|m| m.name().map(|n| n == name).unwrap_or(false));
            match monitor {
                Some(monitor) => Self::grab(monitor),
                None => {
                    log::warn!("Monitor '{}' not found.", name);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceEncoding;
    use image::{DynamicImage, Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([5, 5, 5])));
        let bytes = codec::encode_bytes(&image, SourceEncoding::Png, 90).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn files_act_as_named_views() {
        let dir = tempfile::tempdir().unwrap();
        let front = write_png(dir.path(), "Front.png", 8, 6);
        let top = write_png(dir.path(), "Top.png", 4, 4);
        let capture = ImageFileCapture::new(vec![front, top]);

        assert_eq!(capture.list_available_views(), vec!["Front", "Top"]);
        let active = capture.capture_active_view().unwrap();
        assert_eq!((active.width, active.height), (8, 6));
        let top = capture.capture_view_by_name("Top").unwrap();
        assert_eq!((top.width, top.height), (4, 4));
    }

    #[test]
    fn missing_views_yield_none() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("Broken.png");
        std::fs::write(&garbage, b"not a png").unwrap();

        let capture = ImageFileCapture::new(vec![garbage, dir.path().join("Gone.png")]);
        assert!(capture.capture_active_view().is_none());
        assert!(capture.capture_view_by_name("Gone").is_none());
        assert!(capture.capture_view_by_name("Perspective").is_none());
        assert!(ImageFileCapture::new(Vec::new()).capture_active_view().is_none());
    }
}
