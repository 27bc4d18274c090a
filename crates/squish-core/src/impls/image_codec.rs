//! ImageCodec - `image` クレートによる Codec 実装
//!
//! decode / resize / encode は CPU を使うブロッキング処理なので
//! `spawn_blocking` で実行し、他のアイテムの処理を止めません。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::ports::{Codec, CodecError, OutputFormat, TransformParams};

/// Resizes so the larger side fits `max_dimension` and re-encodes.
///
/// `quality` は WebP と JPEG に効き、PNG では無視されます。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Codec for ImageCodec {
    async fn transform(
        &self,
        source: &Path,
        dest: &Path,
        params: &TransformParams,
    ) -> Result<(), CodecError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        let params = params.clone();

        tokio::task::spawn_blocking(move || {
            let result = encode_file(&source, &dest, &params);
            if result.is_err() {
                // 書きかけのファイルは残さない
                let _ = std::fs::remove_file(&dest);
            }
            result
        })
        .await
        .map_err(|e| CodecError::Aborted(e.to_string()))?
    }
}

fn encode_file(source: &Path, dest: &Path, params: &TransformParams) -> Result<(), CodecError> {
    // upload は拡張子なしで保存されるので中身から形式を推定する
    let image = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let image = shrink_to_fit(image, params.max_dimension);

    let mut writer = BufWriter::new(File::create(dest)?);
    match params.format {
        OutputFormat::Webp => {
            let encoded = encode_webp(&image, params.quality)?;
            writer.write_all(&encoded)?;
        }
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, params.quality))
            .map_err(|e| CodecError::Encode(e.to_string()))?,
        OutputFormat::Png => image
            .write_with_encoder(PngEncoder::new(&mut writer))
            .map_err(|e| CodecError::Encode(e.to_string()))?,
    }
    writer.flush()?;
    Ok(())
}

/// Lossy WebP at `quality` (1-100).
fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let memory = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, f32::from(quality))
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(false, f32::from(quality))
    }
    .map_err(|e| CodecError::Encode(format!("webp: {e:?}")))?;
    Ok(memory.to_vec())
}

/// Never upscales.
fn shrink_to_fit(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use rstest::rstest;

    fn write_png(path: &Path, width: u32, height: u32) {
        let image = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        image.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[rstest]
    #[case::webp(OutputFormat::Webp)]
    #[case::jpeg(OutputFormat::Jpeg)]
    #[case::png(OutputFormat::Png)]
    #[tokio::test]
    async fn transform_shrinks_large_images(#[case] format: OutputFormat) {
        let dir = tempfile::tempdir().unwrap();
        // transport と同じく拡張子なしで保存
        let source = dir.path().join("upload-1");
        let dest = dir.path().join(format!("out.{}", format.extension()));
        write_png(&source, 400, 200);

        let params = TransformParams {
            max_dimension: 100,
            format,
            quality: 80,
        };
        ImageCodec::new()
            .transform(&source, &dest, &params)
            .await
            .unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[tokio::test]
    async fn transform_keeps_small_images_at_their_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload-1");
        let dest = dir.path().join("out.png");
        write_png(&source, 30, 20);

        let params = TransformParams {
            max_dimension: 800,
            format: OutputFormat::Png,
            quality: 80,
        };
        ImageCodec::new()
            .transform(&source, &dest, &params)
            .await
            .unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (30, 20));
    }

    #[tokio::test]
    async fn corrupt_input_fails_and_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload-1");
        let dest = dir.path().join("out.webp");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let err = ImageCodec::new()
            .transform(&source, &dest, &TransformParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CodecError::Decode(_)), "{err}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageCodec::new()
            .transform(
                &dir.path().join("missing"),
                &dir.path().join("out.webp"),
                &TransformParams::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CodecError::Io(_)), "{err}");
    }

    /// Deterministic noise so lossy encoders have something to drop.
    fn write_noisy_png(path: &Path, width: u32, height: u32) {
        let mut state: u32 = 0x2545_f491;
        let image = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            image::Rgb([r, g, b])
        });
        image.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[rstest]
    #[case::webp(OutputFormat::Webp)]
    #[case::jpeg(OutputFormat::Jpeg)]
    #[tokio::test]
    async fn lower_quality_gives_smaller_output(#[case] format: OutputFormat) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload-1");
        write_noisy_png(&source, 300, 200);

        let mut sizes = Vec::new();
        for quality in [10u8, 90] {
            let dest = dir.path().join(format!("q{quality}.{}", format.extension()));
            let params = TransformParams {
                max_dimension: 800,
                format,
                quality,
            };
            ImageCodec::new()
                .transform(&source, &dest, &params)
                .await
                .unwrap();
            sizes.push(std::fs::metadata(&dest).unwrap().len());
        }

        assert!(sizes[0] < sizes[1], "{sizes:?}");
    }

    #[tokio::test]
    async fn default_params_produce_a_smaller_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload-1");
        write_noisy_png(&source, 1200, 900);
        let dest = dir.path().join("out.webp");

        ImageCodec::new()
            .transform(&source, &dest, &TransformParams::default())
            .await
            .unwrap();

        let original = std::fs::metadata(&source).unwrap().len();
        let compressed = std::fs::metadata(&dest).unwrap().len();
        assert!(compressed < original, "{compressed} >= {original}");
        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (800, 600));
    }
}
