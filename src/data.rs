use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;
use std::path::Path;

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub name: Option<String>,
}

impl DataAttachment {
    /// Wraps bytes that must already be a PNG image.
    pub fn png(bytes: Vec<u8>) -> Result<Self> {
        match sniff_mime(&bytes).as_deref() {
            Some(PNG_MIME) => Ok(Self {
                bytes,
                mime: PNG_MIME.to_string(),
                name: None,
            }),
            Some(other) => Err(anyhow!("expected PNG data (detected '{}')", other)),
            None => Err(anyhow!("expected PNG data (unrecognized bytes)")),
        }
    }

    /// Decodes a `data:image/png;base64,...` URL. The header is optional.
    pub fn from_data_url(value: &str) -> Result<Self> {
        let payload = strip_data_url_header(value);
        let bytes = BASE64
            .decode(payload.trim())
            .with_context(|| "image payload is not valid base64")?;
        Self::png(bytes)
    }

    /// Loads any raster image and re-encodes it to PNG when needed.
    pub fn load_image(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(|value| value.to_string());
        let mut attachment = Self::from_image_bytes(bytes)?;
        attachment.name = name;
        Ok(attachment)
    }

    pub fn from_image_bytes(bytes: Vec<u8>) -> Result<Self> {
        match sniff_mime(&bytes) {
            Some(mime) if mime == PNG_MIME => Self::png(bytes),
            Some(mime) if mime.starts_with("image/") => {
                let png = encode_png(&bytes)
                    .with_context(|| format!("failed to convert {} to PNG", mime))?;
                Self::png(png)
            }
            Some(mime) => Err(anyhow!("expected image data (detected '{}')", mime)),
            None => Err(anyhow!("unable to detect image format")),
        }
    }
}

pub fn sniff_mime(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|kind| kind.mime_type().to_string())
}

fn strip_data_url_header(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

fn encode_png(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let mut out = Cursor::new(Vec::new());
    decoded.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_luma8(4, 4)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_header_is_stripped() {
        let png = sample_png();
        let url = format!("data:image/png;base64,{}", BASE64.encode(&png));
        let attachment = DataAttachment::from_data_url(&url).unwrap();
        assert_eq!(attachment.bytes, png);
        assert_eq!(attachment.mime, PNG_MIME);

        let bare = DataAttachment::from_data_url(&BASE64.encode(&png)).unwrap();
        assert_eq!(bare.bytes, png);
    }

    #[test]
    fn non_png_bytes_are_rejected_as_png() {
        assert!(DataAttachment::png(b"hello world".to_vec()).is_err());
        assert!(DataAttachment::from_data_url("data:image/png;base64,***").is_err());
    }

    #[test]
    fn other_rasters_are_converted() {
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(3, 3)
            .write_to(&mut out, image::ImageFormat::Bmp)
            .unwrap();
        let attachment = DataAttachment::from_image_bytes(out.into_inner()).unwrap();
        assert_eq!(attachment.mime, PNG_MIME);
        assert_eq!(sniff_mime(&attachment.bytes).as_deref(), Some(PNG_MIME));
    }
}
