//! Image codec capability
//!
//! [`ImageCodec`] is the seam between the request processor and pixel work. Everything
//! here is blocking; async callers run it on the blocking thread pool.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageReader};
use imgserver_core::{ImageFormat, Size};

use crate::error::{CodecError, CodecResult};
use crate::image::ImageResize;
use crate::publish::write_atomic;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone)]
enum Pixels {
    /// Bytes as read from disk, not decoded yet
    Encoded(Bytes),
    Decoded(DynamicImage),
}

/// An opened image: its native size and format plus either the encoded bytes or pixels.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    size: Size,
    format: ImageFormat,
    pixels: Pixels,
}

impl ImageHandle {
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    fn decode(&self) -> CodecResult<DynamicImage> {
        match &self.pixels {
            Pixels::Decoded(img) => Ok(img.clone()),
            Pixels::Encoded(data) => ImageReader::with_format(
                Cursor::new(data.as_ref()),
                to_image_format(self.format),
            )
            .decode()
            .map_err(|e| CodecError::Corrupt(e.to_string())),
        }
    }
}

pub trait ImageCodec: Send + Sync {
    /// Read the file and detect its format and dimensions. Pixel data is not decoded yet.
    fn open(&self, path: &Path) -> CodecResult<ImageHandle>;

    /// Check that the whole image decodes.
    fn verify(&self, handle: &ImageHandle) -> CodecResult<()>;

    /// Scale to cover `target` and crop the overflow around the center.
    fn resize_crop_to_fit(&self, handle: &ImageHandle, target: Size) -> CodecResult<ImageHandle>;

    /// Encode `handle` as `format` and publish it atomically at `path`.
    fn save(&self, handle: &ImageHandle, path: &Path, format: ImageFormat) -> CodecResult<()>;
}

/// Codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> CodecResult<Vec<u8>> {
        let encode_err = |e: image::ImageError| CodecError::Encode {
            format,
            reason: e.to_string(),
        };

        let estimated_size = img.width() as usize * img.height() as usize * 3;
        let mut buffer = Vec::with_capacity(estimated_size);

        let img = normalize_color(img, format);
        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
                img.write_with_encoder(encoder)
            }
            other => img.write_to(&mut Cursor::new(&mut buffer), to_image_format(other)),
        }
        .map_err(encode_err)?;

        Ok(buffer)
    }
}

/// Convert `img` to a pixel layout the encoder for `format` accepts.
///
/// Decoders hand back whatever the source stored (gray, gray+alpha, 16-bit, float) while
/// most encoders only take a few layouts.
fn normalize_color(img: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    let current = img.color();
    let target = match (format, current) {
        // JPEG has no alpha channel
        (ImageFormat::Jpeg, _) => ColorType::Rgb8,
        (ImageFormat::Gif | ImageFormat::WebP | ImageFormat::Ico, _) => ColorType::Rgba8,
        (ImageFormat::Bmp, color) if color.has_alpha() => ColorType::Rgba8,
        (ImageFormat::Bmp, _) => ColorType::Rgb8,
        (ImageFormat::Png | ImageFormat::Tiff, ColorType::Rgb32F | ColorType::Rgba32F) => {
            ColorType::Rgba16
        }
        (ImageFormat::Tiff, ColorType::La8) => ColorType::Rgba8,
        (ImageFormat::Tiff, ColorType::La16) => ColorType::Rgba16,
        (_, color) => color,
    };

    if current == target {
        return Cow::Borrowed(img);
    }
    Cow::Owned(match target {
        ColorType::Rgb8 => DynamicImage::ImageRgb8(img.to_rgb8()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(img.to_rgba16()),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    })
}

impl ImageCodec for ImageRsCodec {
    fn open(&self, path: &Path) -> CodecResult<ImageHandle> {
        let unreadable = |reason: String| CodecError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let data = Bytes::from(std::fs::read(path).map_err(|e| CodecError::io(path, e))?);

        let detected = image::guess_format(&data).map_err(|e| unreadable(e.to_string()))?;
        let format = from_image_format(detected)
            .ok_or_else(|| unreadable(format!("unsupported format {:?}", detected)))?;

        let (width, height) = ImageReader::with_format(Cursor::new(data.as_ref()), detected)
            .into_dimensions()
            .map_err(|e| unreadable(e.to_string()))?;
        let size = Size::new(width, height).map_err(|e| unreadable(e.to_string()))?;

        Ok(ImageHandle {
            size,
            format,
            pixels: Pixels::Encoded(data),
        })
    }

    fn verify(&self, handle: &ImageHandle) -> CodecResult<()> {
        let img = handle.decode()?;
        if (img.width(), img.height()) != (handle.size.width, handle.size.height) {
            return Err(CodecError::Corrupt(format!(
                "header says {} but pixel data is {}x{}",
                handle.size,
                img.width(),
                img.height()
            )));
        }
        Ok(())
    }

    fn resize_crop_to_fit(&self, handle: &ImageHandle, target: Size) -> CodecResult<ImageHandle> {
        let img = handle.decode()?;
        let resized = ImageResize::crop_to_fit(&img, target.width, target.height);
        Ok(ImageHandle {
            size: target,
            format: handle.format,
            pixels: Pixels::Decoded(resized),
        })
    }

    fn save(&self, handle: &ImageHandle, path: &Path, format: ImageFormat) -> CodecResult<()> {
        let data = match &handle.pixels {
            // Untouched input in its own format is published as is
            Pixels::Encoded(data) if handle.format == format => data.to_vec(),
            _ => Self::encode(&handle.decode()?, format)?,
        };

        tracing::debug!(
            path = %path.display(),
            format = %format,
            size = %handle.size,
            bytes = data.len(),
            "Saving image"
        );
        write_atomic(path, &data)
    }
}

fn to_image_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Tiff => image::ImageFormat::Tiff,
        ImageFormat::WebP => image::ImageFormat::WebP,
        ImageFormat::Ico => image::ImageFormat::Ico,
    }
}

fn from_image_format(format: image::ImageFormat) -> Option<ImageFormat> {
    match format {
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::Gif => Some(ImageFormat::Gif),
        image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
        image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
        image::ImageFormat::WebP => Some(ImageFormat::WebP),
        image::ImageFormat::Ico => Some(ImageFormat::Ico),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage};

    fn write_fixture(dir: &Path, name: &str, width: u32, height: u32, format: image::ImageFormat) {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        img.save_with_format(dir.join(name), format).unwrap();
    }

    #[test]
    fn test_open_detects_size_and_format() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "pic.jpg", 800, 600, image::ImageFormat::Jpeg);
        write_fixture(dir.path(), "pic.bin", 20, 10, image::ImageFormat::Png);

        let codec = ImageRsCodec::new();
        let handle = codec.open(&dir.path().join("pic.jpg")).unwrap();
        assert_eq!(handle.size(), Size::new(800, 600).unwrap());
        assert_eq!(handle.format(), ImageFormat::Jpeg);
        codec.verify(&handle).unwrap();

        // format comes from content, not the extension
        let handle = codec.open(&dir.path().join("pic.bin")).unwrap();
        assert_eq!(handle.format(), ImageFormat::Png);
    }

    #[test]
    fn test_open_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = ImageRsCodec::new().open(&path).unwrap_err();
        assert!(err.is_unrecognized());
    }

    #[test]
    fn test_verify_rejects_truncated_image() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "pic.png", 64, 64, image::ImageFormat::Png);
        let full = std::fs::read(dir.path().join("pic.png")).unwrap();
        let truncated = dir.path().join("truncated.png");
        std::fs::write(&truncated, &full[..full.len() / 2]).unwrap();

        let codec = ImageRsCodec::new();
        let handle = codec.open(&truncated).unwrap();
        assert!(matches!(codec.verify(&handle), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn test_resize_and_save_in_other_format() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "pic.jpg", 800, 600, image::ImageFormat::Jpeg);

        let codec = ImageRsCodec::new();
        let handle = codec.open(&dir.path().join("pic.jpg")).unwrap();
        let target = Size::new(100, 100).unwrap();
        let resized = codec.resize_crop_to_fit(&handle, target).unwrap();
        assert_eq!(resized.size(), target);

        let out = dir.path().join("out.png");
        codec.save(&resized, &out, ImageFormat::Png).unwrap();

        let decoded = image::open(&out).unwrap();
        assert_eq!(decoded.dimensions(), (100, 100));
        assert_eq!(
            image::guess_format(&std::fs::read(&out).unwrap()).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_save_rgba_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(40, 30, image::Rgba([10, 20, 30, 100]));
        img.save_with_format(dir.path().join("alpha.png"), image::ImageFormat::Png)
            .unwrap();

        let codec = ImageRsCodec::new();
        let handle = codec.open(&dir.path().join("alpha.png")).unwrap();
        let out = dir.path().join("alpha.jpg");
        codec.save(&handle, &out, ImageFormat::Jpeg).unwrap();

        let decoded = image::open(&out).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn test_save_same_format_keeps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "pic.jpg", 80, 60, image::ImageFormat::Jpeg);

        let codec = ImageRsCodec::new();
        let handle = codec.open(&dir.path().join("pic.jpg")).unwrap();
        let out = dir.path().join("copy.jpg");
        codec.save(&handle, &out, ImageFormat::Jpeg).unwrap();

        assert_eq!(
            std::fs::read(&out).unwrap(),
            std::fs::read(dir.path().join("pic.jpg")).unwrap()
        );
    }

    fn assert_converts_to_gif(source: &Path) {
        let codec = ImageRsCodec::new();
        let handle = codec.open(source).unwrap();
        let resized = codec
            .resize_crop_to_fit(&handle, Size::new(16, 16).unwrap())
            .unwrap();
        let out = source.with_extension("gif");
        codec.save(&resized, &out, ImageFormat::Gif).unwrap();

        let reopened = codec.open(&out).unwrap();
        assert_eq!(reopened.format(), ImageFormat::Gif);
        assert_eq!(reopened.size(), Size::new(16, 16).unwrap());
        codec.verify(&reopened).unwrap();
    }

    #[test]
    fn test_grayscale_jpeg_to_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.jpg");
        GrayImage::from_fn(64, 48, |x, _| Luma([(x * 4) as u8]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();

        assert_converts_to_gif(&path);
    }

    #[test]
    fn test_gray_alpha_png_to_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray_alpha.png");
        let img: ImageBuffer<LumaA<u8>, Vec<u8>> =
            ImageBuffer::from_fn(40, 40, |x, y| LumaA([(x * 6) as u8, (y * 6) as u8]));
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();

        assert_converts_to_gif(&path);
    }

    #[test]
    fn test_sixteen_bit_png_to_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.png");
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_fn(32, 24, |x, y| Rgb([(x * 2000) as u16, (y * 2000) as u16, 40000]));
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();

        assert_converts_to_gif(&path);
    }

    #[test]
    fn test_normalize_color_per_target() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert_eq!(normalize_color(&gray, ImageFormat::Gif).color(), ColorType::Rgba8);
        assert_eq!(normalize_color(&gray, ImageFormat::Bmp).color(), ColorType::Rgb8);
        assert_eq!(normalize_color(&gray, ImageFormat::Jpeg).color(), ColorType::Rgb8);
        assert!(matches!(normalize_color(&gray, ImageFormat::Png), Cow::Borrowed(_)));

        let deep = DynamicImage::ImageRgb32F(image::Rgb32FImage::new(4, 4));
        assert_eq!(normalize_color(&deep, ImageFormat::Png).color(), ColorType::Rgba16);
    }

    #[test]
    fn test_gray_alpha_to_every_format() {
        let gray_alpha = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(8, 8, LumaA([90, 200])));
        for format in ImageFormat::ALL {
            let encoded = ImageRsCodec::encode(&gray_alpha, format)
                .unwrap_or_else(|e| panic!("{} failed: {}", format, e));
            assert!(!encoded.is_empty());
        }
    }
}
