//! Image decoding, resizing and re-encoding.
//!
//! [`transform()`] takes raw bytes and a [`TransformSpec`] and produces a
//! [`TransformResult`]. It is CPU-bound and synchronous; async callers should
//! run it on a blocking thread.
//!
//! Resizing never enlarges: the requested box is clamped to the source on
//! each axis before the [`Fit`] is applied (see [`geometry::plan`]).

mod encode;
pub mod error;
pub mod geometry;
mod options;

pub use crate::encode::format_name;
use crate::error::{ErrorKind, Result};
use crate::geometry::{Layout, Size};
pub use crate::options::{Background, Fit, OutputFormat, Position, Quality, TransformSpec};
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

/// Pixels plus the format they were decoded from.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Observed properties of an encoded output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `webp` or `jpeg`.
    pub format: String,
    pub size_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct TransformResult {
    pub data: Vec<u8>,
    pub metadata: ImageMetadata,
}

/// Decode `data`, guessing the format from its magic bytes.
///
/// With `apply_orientation`, the EXIF orientation reported by the decoder is
/// baked into the pixels. Otherwise pixels come back exactly as stored.
pub fn decode(data: &[u8], apply_orientation: bool) -> Result<DecodedImage> {
    if data.is_empty() {
        exn::bail!(ErrorKind::CodecFailure("empty input".to_string()));
    }
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ErrorKind::CodecFailure(e.to_string()))?;
    let Some(format) = reader.format() else {
        exn::bail!(ErrorKind::CodecFailure("unrecognised image format".to_string()));
    };
    let mut decoder = reader.into_decoder().map_err(|e| ErrorKind::CodecFailure(e.to_string()))?;
    // A broken EXIF block should not sink an otherwise readable image.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| ErrorKind::CodecFailure(e.to_string()))?;
    if apply_orientation {
        image.apply_orientation(orientation);
    }
    Ok(DecodedImage { image, format })
}

/// Run the full decode, resize, encode sequence.
///
/// Output never carries EXIF, ICC or XMP metadata: none of the encoders used
/// here write it. `strip_metadata` therefore only controls whether the EXIF
/// orientation is applied to the pixels first.
pub fn transform(data: &[u8], spec: &TransformSpec) -> Result<TransformResult> {
    let decoded = decode(data, spec.strip_metadata)?;
    let source = Size::new(decoded.image.width(), decoded.image.height());
    let layout = geometry::plan(source, spec.width, spec.height, spec.fit, spec.position);
    tracing::trace!(?source, ?layout, format = %spec.format, "Planned transform");
    let image = apply(decoded.image, layout, spec);
    let encoded = encode::encode(&image, decoded.format, spec)?;
    let metadata = ImageMetadata {
        width: image.width(),
        height: image.height(),
        format: format_name(encoded.format),
        size_bytes: encoded.data.len(),
    };
    tracing::debug!(
        width = metadata.width,
        height = metadata.height,
        format = %metadata.format,
        input_bytes = data.len(),
        output_bytes = metadata.size_bytes,
        "Transformed image"
    );
    Ok(TransformResult { data: encoded.data, metadata })
}

fn resample(image: DynamicImage, size: Size) -> DynamicImage {
    if image.width() == size.width && image.height() == size.height {
        return image;
    }
    image.resize_exact(size.width, size.height, FilterType::Lanczos3)
}

fn apply(image: DynamicImage, layout: Layout, spec: &TransformSpec) -> DynamicImage {
    match layout {
        Layout::Keep => image,
        Layout::Scale(size) => resample(image, size),
        Layout::Crop { scaled, x, y, size } => resample(image, scaled).crop_imm(x, y, size.width, size.height),
        Layout::Pad { scaled, x, y, canvas } => {
            let content = resample(image, scaled).to_rgba8();
            let mut padded = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba(spec.background.0));
            imageops::overlay(&mut padded, &content, i64::from(x), i64::from(y));
            DynamicImage::ImageRgba8(padded)
        },
    }
}

/// MIME type for a format name as reported in [`ImageMetadata::format`].
pub fn content_type(format: &str) -> &'static str {
    match format {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
