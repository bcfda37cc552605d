use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const WEBP: &str = "image/webp";
pub const GIF: &str = "image/gif";

/// One generated image, in whatever form the backend handed it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// A reference the viewer fetches itself.
    Url(String),
    /// Raw image bytes.
    Inline { media_type: String, bytes: Vec<u8> },
}

impl GeneratedImage {
    pub fn inline(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        GeneratedImage::Inline {
            media_type: media_type.into(),
            bytes,
        }
    }

    /// A URI an image viewer or `<img src>` can display directly.
    pub fn display_uri(&self) -> String {
        match self {
            GeneratedImage::Url(url) => url.clone(),
            GeneratedImage::Inline { media_type, bytes } => {
                format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
            }
        }
    }

    pub fn media_type(&self) -> Option<&str> {
        match self {
            GeneratedImage::Url(_) => None,
            GeneratedImage::Inline { media_type, .. } => Some(media_type),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GeneratedImage::Url(url) => url.len(),
            GeneratedImage::Inline { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Results of one comparison cycle. Both sides are always present together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub base: GeneratedImage,
    pub trained: GeneratedImage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub image: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl GenerateResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    pub fn error_message(&self) -> String {
        if let Some(message) = &self.message {
            message.clone()
        } else if !self.errors.is_empty() {
            self.errors.join("; ")
        } else {
            "unknown error".to_string()
        }
    }
}

/// Guesses the media type of an image from its leading bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(PNG)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(JPEG)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(WEBP)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(GIF)
    } else {
        None
    }
}

/// File extension for a media type, used when saving images.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        PNG => "png",
        JPEG | "image/jpg" => "jpg",
        WEBP => "webp",
        GIF => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_display_uri() {
        let url = GeneratedImage::Url("https://cdn.example/fox.png".into());
        assert_eq!(url.display_uri(), "https://cdn.example/fox.png");
        assert_eq!(url.media_type(), None);

        let inline = GeneratedImage::inline(PNG, vec![1, 2, 3]);
        assert_eq!(inline.display_uri(), "data:image/png;base64,AQID");
        assert_eq!(inline.media_type(), Some("image/png"));
        assert_eq!(inline.len(), 3);
    }

    #[test]
    fn test_sniff_media_type() {
        let mut png = PNG_HEADER.to_vec();
        png.extend_from_slice(b"rest");
        assert_eq!(sniff_media_type(&png), Some(PNG));
        assert_eq!(sniff_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(JPEG));
        assert_eq!(sniff_media_type(b"RIFF\0\0\0\0WEBPVP8 "), Some(WEBP));
        assert_eq!(sniff_media_type(b"GIF89a..."), Some(GIF));
        assert_eq!(sniff_media_type(b"{\"image\":1}"), None);
        assert_eq!(sniff_media_type(&[]), None);
    }

    #[test]
    fn test_error_envelope() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"status": "error", "errors": ["missing fields: prompt"]}"#,
        )
        .unwrap();
        assert!(response.is_error());
        assert_eq!(response.error_message(), "missing fields: prompt");

        let response: GenerateResponse =
            serde_json::from_str(r#"{"status": "ok", "trained_model": true, "image": "AQID"}"#)
                .unwrap();
        assert!(!response.is_error());
        assert_eq!(response.image.as_deref(), Some("AQID"));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(PNG), "png");
        assert_eq!(extension_for("image/jpg"), "jpg");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
