use crate::{
    config::CompareConfig,
    error::{CompareError, Result},
    models::{sniff_media_type, GenerateResponse, GeneratedImage, ModelTarget, PNG},
};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Turns a generation response into an image.
///
/// Accepts a raw image body, or JSON carrying `image` as a URL, a
/// root-relative path, a data URI or bare base64.
pub fn decode_response(
    config: &CompareConfig,
    target: ModelTarget,
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<GeneratedImage> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    if !(200..300).contains(&status) {
        return Err(CompareError::Status {
            target,
            status,
            message: error_message(body),
        });
    }

    match mime.as_deref() {
        Some(ct) if ct.starts_with("image/") => {
            if body.is_empty() {
                return Err(CompareError::decode(target, "empty image body"));
            }
            Ok(GeneratedImage::inline(ct, body.to_vec()))
        }
        Some(ct) if ct.contains("json") => decode_json(config, target, body),
        _ => {
            // Missing or generic content type; let the bytes decide.
            if let Some(media_type) = sniff_media_type(body) {
                Ok(GeneratedImage::inline(media_type, body.to_vec()))
            } else if body.first() == Some(&b'{') {
                decode_json(config, target, body)
            } else {
                Err(CompareError::decode(
                    target,
                    format!(
                        "unrecognized payload of {} bytes (content type {})",
                        body.len(),
                        content_type.unwrap_or("none")
                    ),
                ))
            }
        }
    }
}

fn decode_json(config: &CompareConfig, target: ModelTarget, body: &[u8]) -> Result<GeneratedImage> {
    let response: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| CompareError::decode(target, format!("invalid JSON: {}", e)))?;

    if response.is_error() {
        return Err(CompareError::Status {
            target,
            status: 200,
            message: response.error_message(),
        });
    }

    let image = response
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CompareError::decode(target, "response has no image"))?;

    decode_image_field(config, target, image)
}

fn decode_image_field(
    config: &CompareConfig,
    target: ModelTarget,
    image: &str,
) -> Result<GeneratedImage> {
    if image.starts_with("http://") || image.starts_with("https://") {
        return Ok(GeneratedImage::Url(image.to_string()));
    }
    if image.starts_with('/') {
        return Ok(GeneratedImage::Url(config.resolve(image)));
    }
    if let Some(rest) = image.strip_prefix("data:") {
        return decode_data_uri(target, rest);
    }

    let bytes = STANDARD
        .decode(image)
        .map_err(|e| CompareError::decode(target, format!("invalid base64 image: {}", e)))?;
    let media_type = sniff_media_type(&bytes).unwrap_or(PNG);
    Ok(GeneratedImage::inline(media_type, bytes))
}

fn decode_data_uri(target: ModelTarget, rest: &str) -> Result<GeneratedImage> {
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| CompareError::decode(target, "malformed data URI"))?;

    let (media_type, is_base64) = match header.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (header, false),
    };
    if !is_base64 {
        return Err(CompareError::decode(
            target,
            "data URI is not base64 encoded",
        ));
    }

    let bytes = STANDARD
        .decode(data)
        .map_err(|e| CompareError::decode(target, format!("invalid base64 in data URI: {}", e)))?;
    let media_type = if media_type.is_empty() {
        sniff_media_type(&bytes).unwrap_or(PNG)
    } else {
        media_type
    };
    Ok(GeneratedImage::inline(media_type, bytes))
}

/// Best-effort message from an error body.
fn error_message(body: &[u8]) -> String {
    if let Ok(response) = serde_json::from_slice::<GenerateResponse>(body) {
        if response.message.is_some() || !response.errors.is_empty() {
            return response.error_message();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "no response body".to_string()
    } else {
        text.chars().take(200).collect()
    }
}
