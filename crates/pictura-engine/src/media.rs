use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Raw image bytes paired with the MIME type sent alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePart {
    pub fn detect(bytes: Vec<u8>) -> Self {
        let mime_type = detect_mime_type(&bytes);
        Self { bytes, mime_type }
    }

    pub fn with_mime(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn base64_data(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

/// Probes the encoded format; anything unrecognized is reported as JPEG.
pub fn detect_mime_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::{detect_mime_type, ImagePart, DEFAULT_MIME_TYPE};

    fn encoded(format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format)?;
        Ok(out.into_inner())
    }

    #[test]
    fn detects_png_and_jpeg() -> anyhow::Result<()> {
        assert_eq!(detect_mime_type(&encoded(ImageFormat::Png)?), "image/png");
        assert_eq!(detect_mime_type(&encoded(ImageFormat::Jpeg)?), "image/jpeg");
        Ok(())
    }

    #[test]
    fn unknown_bytes_default_to_jpeg() {
        assert_eq!(detect_mime_type(b"not an image"), DEFAULT_MIME_TYPE);
        assert_eq!(detect_mime_type(&[]), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn image_part_encodes_base64() -> anyhow::Result<()> {
        let part = ImagePart::detect(encoded(ImageFormat::Png)?);
        assert_eq!(part.mime_type, "image/png");
        assert!(part.base64_data().starts_with("iVBORw0KGgo"));

        let explicit = ImagePart::with_mime(vec![1, 2, 3], "image/webp");
        assert_eq!(explicit.base64_data(), "AQID");
        Ok(())
    }
}
