//! Concept-image payloads: inline base64 from the image model, carried as
//! `data:` URLs, decoded into textures for the 3D scene.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use forge_core::Texture;

#[derive(Debug)]
pub enum ImageError {
    NotDataUrl,
    Base64(base64::DecodeError),
    Decode(image::ImageError),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::NotDataUrl => write!(f, "not a base64 data URL"),
            ImageError::Base64(e) => write!(f, "invalid base64 image data: {e}"),
            ImageError::Decode(e) => write!(f, "unreadable image: {e}"),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<base64::DecodeError> for ImageError {
    fn from(e: base64::DecodeError) -> Self {
        ImageError::Base64(e)
    }
}

impl From<image::ImageError> for ImageError {
    fn from(e: image::ImageError) -> Self {
        ImageError::Decode(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// From the model's `inlineData` part: base64 text plus MIME type.
    pub fn from_inline(mime_type: &str, data: &str) -> Result<Self, ImageError> {
        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes: BASE64.decode(data.trim())?,
        })
    }

    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url.strip_prefix("data:").ok_or(ImageError::NotDataUrl)?;
        let (mime_type, data) = rest.split_once(";base64,").ok_or(ImageError::NotDataUrl)?;
        Self::from_inline(mime_type, data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    /// Decode far enough to learn the dimensions and prove the bytes are an
    /// image; the encoded form is kept for export.
    pub fn to_texture(&self) -> Result<Texture, ImageError> {
        let decoded = image::load_from_memory(&self.bytes)?;
        Ok(Texture {
            mime_type: self.mime_type.clone(),
            bytes: self.bytes.clone(),
            width: decoded.width(),
            height: decoded.height(),
        })
    }
}

/// Texture for a `data:` image URL.
pub fn decode_texture(url: &str) -> Result<Texture, ImageError> {
    ImagePayload::from_data_url(url)?.to_texture()
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(3, 2, image::Rgb([0, 200, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_round_trip() {
        let payload = ImagePayload {
            mime_type: "image/png".into(),
            bytes: tiny_png(),
        };
        let url = payload.to_data_url();
        assert!(url.starts_with("data:image/png;base64,iVBOR"));
        assert_eq!(ImagePayload::from_data_url(&url).unwrap(), payload);
    }

    #[test]
    fn test_texture_dimensions() {
        let url = ImagePayload {
            mime_type: "image/png".into(),
            bytes: tiny_png(),
        }
        .to_data_url();
        let texture = decode_texture(&url).unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.mime_type, "image/png");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            ImagePayload::from_data_url("https://example.com/a.png"),
            Err(ImageError::NotDataUrl)
        ));
        assert!(matches!(
            ImagePayload::from_data_url("data:image/png;base64,@@@"),
            Err(ImageError::Base64(_))
        ));
        let junk = ImagePayload {
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3, 4],
        };
        assert!(matches!(junk.to_texture(), Err(ImageError::Decode(_))));
    }
}
