pub mod normalizer;

use crate::error::{AnalystError, Result};
use image::ImageFormat;
use std::fs;
use std::path::Path;

pub use normalizer::{normalize, thumbnail_height, NormalizedImage, Thumbnail, THUMBNAIL_WIDTH};

/// Raster formats accepted by the upload interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpeg,
    Png,
    Gif,
}

impl UploadFormat {
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "png", "jpeg", "gif"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(UploadFormat::Jpeg),
            "png" => Some(UploadFormat::Png),
            "gif" => Some(UploadFormat::Gif),
            _ => None,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(UploadFormat::Jpeg),
            ImageFormat::Png => Some(UploadFormat::Png),
            ImageFormat::Gif => Some(UploadFormat::Gif),
            _ => None,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            UploadFormat::Jpeg => ImageFormat::Jpeg,
            UploadFormat::Png => ImageFormat::Png,
            UploadFormat::Gif => ImageFormat::Gif,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFormat::Jpeg => "jpeg",
            UploadFormat::Png => "png",
            UploadFormat::Gif => "gif",
        }
    }
}

/// One uploaded file: raw bytes plus the format its name declares.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub name: String,
    pub format: UploadFormat,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let ext = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let format = UploadFormat::from_extension(ext)
            .ok_or_else(|| AnalystError::UnsupportedFormat(name.clone()))?;

        Ok(Self {
            name,
            format,
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        // Reject by name before touching the file.
        let probe = Self::new(name.clone(), Vec::new())?;
        let bytes = fs::read(path)
            .map_err(|e| AnalystError::IoError(format!("{}: {}", path.display(), e)))?;
        log::debug!("Read upload {} ({} bytes)", name, bytes.len());

        Ok(Self { bytes, ..probe })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_whitelist() {
        assert_eq!(UploadFormat::from_extension("JPG"), Some(UploadFormat::Jpeg));
        assert_eq!(UploadFormat::from_extension("jpeg"), Some(UploadFormat::Jpeg));
        assert_eq!(UploadFormat::from_extension("png"), Some(UploadFormat::Png));
        assert_eq!(UploadFormat::from_extension("gif"), Some(UploadFormat::Gif));
        assert_eq!(UploadFormat::from_extension("webp"), None);
        assert_eq!(UploadFormat::from_extension(""), None);

        assert_eq!(UploadFormat::from_image_format(ImageFormat::Gif), Some(UploadFormat::Gif));
        assert_eq!(UploadFormat::from_image_format(ImageFormat::Bmp), None);
    }

    #[test]
    fn test_upload_rejects_unlisted_names() {
        let err = UploadedImage::new("chart.bmp", vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, AnalystError::UnsupportedFormat("chart.bmp".into()));

        let err = UploadedImage::new("no_extension", vec![]).unwrap_err();
        assert!(matches!(err, AnalystError::UnsupportedFormat(_)));

        let ok = UploadedImage::new("heatmap.PNG", vec![0]).unwrap();
        assert_eq!(ok.format, UploadFormat::Png);
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = UploadedImage::from_path(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, AnalystError::IoError(_)));
    }
}
