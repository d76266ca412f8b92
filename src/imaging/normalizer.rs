use super::{UploadFormat, UploadedImage};
use crate::error::{AnalystError, Result};
use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Width of every thumbnail sent to the model.
pub const THUMBNAIL_WIDTH: u32 = 128;

/// Upload converted to opaque 8-bit RGB.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pixels: RgbImage,
    format: UploadFormat,
    flattened: bool,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        image::ColorType::Rgb8.channel_count()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn format(&self) -> UploadFormat {
        self.format
    }

    /// True when the source carried transparency that was composited onto white.
    pub fn was_flattened(&self) -> bool {
        self.flattened
    }

    pub fn thumbnail(&self) -> Result<Thumbnail> {
        Thumbnail::from_normalized(self)
    }
}

/// Reduced copy of a [`NormalizedImage`]; the only image that leaves the process.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pixels: RgbImage,
}

impl Thumbnail {
    pub fn from_normalized(image: &NormalizedImage) -> Result<Self> {
        let height = thumbnail_height(image.width(), image.height())?;
        let pixels = image::imageops::resize(
            &image.pixels,
            THUMBNAIL_WIDTH,
            height,
            FilterType::Lanczos3,
        );

        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn mime_type(&self) -> &'static str {
        "image/png"
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| AnalystError::DecodeError(format!("thumbnail encode failed: {}", e)))?;
        Ok(out.into_inner())
    }
}

/// round(height * THUMBNAIL_WIDTH / width), never below one pixel.
pub fn thumbnail_height(width: u32, height: u32) -> Result<u32> {
    if width == 0 || height == 0 {
        return Err(AnalystError::DecodeError(format!(
            "image has zero dimension ({}x{})",
            width, height
        )));
    }
    let scaled = (height as f64 * THUMBNAIL_WIDTH as f64 / width as f64).round();
    Ok(scaled.max(1.0) as u32)
}

/// Decodes by content; the name's extension only decides when the bytes carry
/// no recognisable signature.
pub fn normalize(upload: &UploadedImage) -> Result<NormalizedImage> {
    let format = match image::guess_format(&upload.bytes) {
        Ok(detected) => UploadFormat::from_image_format(detected).ok_or_else(|| {
            AnalystError::UnsupportedFormat(format!("{} (content is {:?})", upload.name, detected))
        })?,
        Err(_) => upload.format,
    };
    if format != upload.format {
        log::debug!(
            "{} is named as {} but contains {}",
            upload.name,
            upload.format.as_str(),
            format.as_str()
        );
    }

    let decoded = image::load_from_memory_with_format(&upload.bytes, format.image_format())
        .map_err(|e| AnalystError::DecodeError(format!("{}: {}", upload.name, e)))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(AnalystError::DecodeError(format!(
            "{}: image has no pixels",
            upload.name
        )));
    }

    let flattened = decoded.color().has_alpha();
    let pixels = if flattened {
        flatten_onto_white(&decoded)
    } else {
        decoded.to_rgb8()
    };

    log::debug!(
        "Normalized {} ({}x{}, {:?}, flattened: {})",
        upload.name,
        pixels.width(),
        pixels.height(),
        decoded.color(),
        flattened
    );

    Ok(NormalizedImage {
        pixels,
        format,
        flattened,
    })
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut canvas = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        canvas.put_pixel(x, y, Rgb([blend(r, a), blend(g, a), blend(b, a)]));
    }

    canvas
}

fn blend(channel: u8, alpha: u8) -> u8 {
    let alpha = alpha as u32;
    ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}
