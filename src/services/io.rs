//! Image file input/output

use crate::{
    config::OutputFormat,
    error::{BgRemovalError, Result},
};
use image::DynamicImage;
use std::path::Path;

/// Loads inputs and writes results through the `image` crate
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Tries extension-based detection first and falls back to sniffing the
    /// content, so misnamed files still load.
    ///
    /// # Errors
    /// - `BgRemovalError::Io` when the file is missing or unreadable
    /// - `BgRemovalError::Decode` when neither detection method can decode it
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgRemovalError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(ext_err) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Trying content detection.",
                    path_ref.display(),
                    ext_err
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    BgRemovalError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    BgRemovalError::decode(format!(
                        "{} ({} bytes): {}",
                        path_ref.display(),
                        data.len(),
                        content_err
                    ))
                })
            },
        }
    }

    /// Decode an in-memory encoded image
    ///
    /// # Errors
    /// Returns `BgRemovalError::Decode` for empty, truncated or unknown data
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(BgRemovalError::decode("input is empty"));
        }
        image::load_from_memory(bytes).map_err(|e| BgRemovalError::decode(e.to_string()))
    }

    /// Read everything from an async reader and decode it
    ///
    /// # Errors
    /// - `BgRemovalError::Io` when reading the stream fails
    /// - `BgRemovalError::Decode` when the bytes are not an image
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        log::debug!("Read {} bytes from stream", buffer.len());
        Self::load_from_bytes(&buffer)
    }

    /// Write `image` to `path` in `format`, creating parent directories
    ///
    /// `quality` applies to JPEG only. `Rgba8` writes the raw pixel bytes.
    ///
    /// # Errors
    /// - `BgRemovalError::Io` when the directory or file cannot be written
    /// - `BgRemovalError::Processing` when encoding fails
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BgRemovalError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        let result = match format {
            OutputFormat::Png => image.save_with_format(path_ref, image::ImageFormat::Png),
            OutputFormat::Tiff => image.save_with_format(path_ref, image::ImageFormat::Tiff),
            OutputFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
                .save_with_format(path_ref, image::ImageFormat::WebP),
            OutputFormat::Jpeg => {
                let file = std::fs::File::create(path_ref)
                    .map_err(|e| BgRemovalError::file_io_error("create", path_ref, &e))?;
                let mut writer = std::io::BufWriter::new(file);
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality);
                encoder.encode_image(&image.to_rgb8())
            },
            OutputFormat::Rgba8 => {
                std::fs::write(path_ref, image.to_rgba8().as_raw())
                    .map_err(|e| BgRemovalError::file_io_error("write RGBA8 data", path_ref, &e))?;
                log::debug!("Wrote raw RGBA8 data to {}", path_ref.display());
                return Ok(());
            },
        };

        result.map_err(|e| {
            BgRemovalError::processing_stage_error(
                "image saving",
                &format!("Failed to encode {:?}: {}", format, e),
                Some(&path_ref.display().to_string()),
            )
        })?;

        log::debug!("Saved {:?} image to {}", format, path_ref.display());
        Ok(())
    }

    /// True when the extension names an input format this build can decode
    #[must_use]
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return false;
        };
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "tiff" | "tif" => true,
            "webp" => cfg!(feature = "webp-support"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(6, 4, |x, y| {
            Rgba([(x * 40) as u8, (y * 60) as u8, 100, if x < 3 { 255 } else { 0 }])
        }))
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("a.JPG"));
        assert!(ImageIOService::is_supported_format("dir/b.tif"));
        assert!(!ImageIOService::is_supported_format("c.gif"));
        assert!(!ImageIOService::is_supported_format("no_extension"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));
        assert!(err.to_string().contains("here.png"));
    }

    #[test]
    fn test_load_from_bytes_invalid_and_empty() {
        assert!(matches!(
            ImageIOService::load_from_bytes(b"not an image"),
            Err(BgRemovalError::Decode(_))
        ));
        let err = ImageIOService::load_from_bytes(&[]).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load image"));
    }

    #[test]
    fn test_png_round_trip_preserves_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        let image = sample();

        ImageIOService::save_image(&image, &path, OutputFormat::Png, 90).unwrap();
        let loaded = ImageIOService::load_image(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image.to_rgba8());
    }

    #[test]
    fn test_misnamed_file_loads_by_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actually_png.jpg");
        ImageIOService::save_image(&sample(), dir.path().join("src.png"), OutputFormat::Png, 90)
            .unwrap();
        std::fs::copy(dir.path().join("src.png"), &path).unwrap();

        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.to_rgba8().dimensions(), (6, 4));
    }

    #[test]
    fn test_save_rgba8_and_jpeg() {
        let dir = tempdir().unwrap();
        let raw_path = dir.path().join("out.raw");
        ImageIOService::save_image(&sample(), &raw_path, OutputFormat::Rgba8, 90).unwrap();
        assert_eq!(std::fs::read(&raw_path).unwrap().len(), 6 * 4 * 4);

        let jpg_path = dir.path().join("out.jpg");
        ImageIOService::save_image(&sample(), &jpg_path, OutputFormat::Jpeg, 80).unwrap();
        let loaded = ImageIOService::load_image(&jpg_path).unwrap();
        assert_eq!(loaded.color(), image::ColorType::Rgb8);
    }

    #[tokio::test]
    async fn test_load_from_reader() {
        let mut bytes = Vec::new();
        sample()
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let loaded = ImageIOService::load_from_reader(bytes.as_slice()).await.unwrap();
        assert_eq!(loaded.to_rgba8(), sample().to_rgba8());
    }
}
