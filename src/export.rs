use crate::codec;
use crate::config::SourceEncoding;
use crate::error::{RenderError, Result};
use chrono::{DateTime, Local};
use image::DynamicImage;
use std::path::PathBuf;

/// Where a finished result goes. `Ok(None)` means the user backed out of
/// choosing a destination.
pub trait ResultExporter: Send + Sync {
    fn export(&self, image: &DynamicImage) -> Result<Option<PathBuf>>;
}

/// `AIRender_<yyyyMMdd_HHmmss>.png` (or `.jpg`) for the given moment.
pub fn default_file_name(at: DateTime<Local>, encoding: SourceEncoding) -> String {
    let ext = match encoding {
        SourceEncoding::Png => "png",
        SourceEncoding::Jpeg => "jpg",
    };
    format!("AIRender_{}.{}", at.format("%Y%m%d_%H%M%S"), ext)
}

/// Writes each result into a fixed directory under a timestamped name.
pub struct DirectoryExporter {
    dir: PathBuf,
    encoding: SourceEncoding,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            encoding: SourceEncoding::Png,
        }
    }

    pub fn with_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl ResultExporter for DirectoryExporter {
    fn export(&self, image: &DynamicImage) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(RenderError::Io(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        let path = self
            .dir
            .join(default_file_name(Local::now(), self.encoding));
        codec::save_image(image, &path)?;
        log::info!("Result saved to: {}", path.display());
        Ok(Some(path))
    }
}

/// Writes to one path chosen up front, e.g. from a save dialog.
pub struct FileExporter {
    path: PathBuf,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultExporter for FileExporter {
    fn export(&self, image: &DynamicImage) -> Result<Option<PathBuf>> {
        codec::save_image(image, &self.path)?;
        log::info!("Result saved to: {}", self.path.display());
        Ok(Some(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{Rgb, RgbImage};

    fn result_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([200, 100, 50])))
    }

    #[test]
    fn file_name_uses_timestamp_and_extension() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_file_name(at, SourceEncoding::Png),
            "AIRender_20260309_140507.png"
        );
        assert_eq!(
            default_file_name(at, SourceEncoding::Jpeg),
            "AIRender_20260309_140507.jpg"
        );
    }

    #[test]
    fn directory_exporter_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DirectoryExporter::new(dir.path()).with_encoding(SourceEncoding::Jpeg);
        let path = exporter.export(&result_image()).unwrap().unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "jpg");
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (6, 4));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DirectoryExporter::new(dir.path().join("nope"));
        assert!(matches!(
            exporter.export(&result_image()),
            Err(RenderError::Io(_))
        ));
    }

    #[test]
    fn file_exporter_honours_chosen_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("render.png");
        let saved = FileExporter::new(&target).export(&result_image()).unwrap();
        assert_eq!(saved.as_deref(), Some(target.as_path()));
        assert!(target.exists());
    }
}
