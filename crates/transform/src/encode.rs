use crate::error::{ErrorKind, Result};
use crate::options::{Background, OutputFormat, TransformSpec};
use image::codecs::avif::AvifEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ColorType, DynamicImage, ExtendedColorType, ImageError, ImageFormat, Rgb, RgbImage, Rgba};
use std::borrow::Cow;
use std::io::Cursor;

/// ravif speed, 1 (slowest) to 10 (fastest).
const AVIF_SPEED: u8 = 6;

pub(crate) struct Encoded {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

fn codec(err: ImageError) -> ErrorKind {
    ErrorKind::CodecFailure(err.to_string())
}

/// Encode `img` per `spec.format`. `source` is the format the pixels were
/// decoded from, used by [`OutputFormat::Original`].
pub(crate) fn encode(img: &DynamicImage, source: ImageFormat, spec: &TransformSpec) -> Result<Encoded> {
    let img = match img.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => Cow::Owned(to_8bit(img)),
        _ => Cow::Borrowed(img),
    };
    let quality = spec.quality.get();
    let mut data = Vec::new();
    let format = match spec.format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut data, quality);
            flatten(&img, spec.background).write_with_encoder(encoder).map_err(codec)?;
            ImageFormat::Jpeg
        },
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(&mut data, CompressionType::Best, PngFilter::Adaptive);
            img.write_with_encoder(encoder).map_err(codec)?;
            ImageFormat::Png
        },
        OutputFormat::Webp => {
            data = encode_webp(&img, quality)?;
            ImageFormat::WebP
        },
        OutputFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut data, AVIF_SPEED, quality);
            to_8bit(&img).write_with_encoder(encoder).map_err(codec)?;
            ImageFormat::Avif
        },
        OutputFormat::Gif => {
            let rgba = img.to_rgba8();
            // The trailer is written when the encoder drops.
            let mut encoder = GifEncoder::new(&mut data);
            encoder.encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8).map_err(codec)?;
            drop(encoder);
            ImageFormat::Gif
        },
        OutputFormat::Original => {
            let img = match source {
                ImageFormat::Jpeg => Cow::Owned(flatten(&img, spec.background)),
                _ => img,
            };
            img.write_to(&mut Cursor::new(&mut data), source).map_err(codec)?;
            source
        },
    };
    if data.is_empty() {
        exn::bail!(ErrorKind::CodecFailure(format!("{} encoder produced no output", format_name(format))));
    }
    Ok(Encoded { data, format })
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode_simple(false, f32::from(quality))
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode_simple(false, f32::from(quality))
    };
    match encoded {
        Ok(memory) => Ok(memory.to_vec()),
        Err(e) => exn::bail!(ErrorKind::CodecFailure(format!("webp encoder: {e:?}"))),
    }
}

fn to_8bit(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Composite any alpha channel onto `background`, for formats without one.
fn flatten(img: &DynamicImage, background: Background) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }
    let [br, bg, bb, _] = background.0;
    let rgba = img.to_rgba8();
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u16::from(a);
        // Max is 255 * 255 + 127, well inside u16.
        let blend = |fg: u8, bg: u8| ((u16::from(fg) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r, br), blend(g, bg), blend(b, bb)])
    });
    DynamicImage::ImageRgb8(rgb)
}

/// Short lowercase name for a format, as reported in results.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        other => match other.extensions_str().first() {
            Some(ext) => (*ext).to_string(),
            None => format!("{other:?}").to_lowercase(),
        },
    }
}
