use crate::{
    client::{decode::decode_response, ImageBackend},
    config::CompareConfig,
    error::{CompareError, Result},
    logger,
    models::{GeneratedImage, ModelTarget},
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;

/// HTTP client for the base and trained generation endpoints.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    config: CompareConfig,
}

impl ImageClient {
    pub fn new(config: CompareConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CompareError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Fetches the bytes behind an image, following URLs when needed.
    pub async fn fetch_bytes(
        &self,
        target: ModelTarget,
        image: &GeneratedImage,
    ) -> Result<(String, Vec<u8>)> {
        let url = match image {
            GeneratedImage::Inline { media_type, bytes } => {
                return Ok((media_type.clone(), bytes.clone()))
            }
            GeneratedImage::Url(url) => url,
        };

        log::debug!("Downloading {} image from {}", target, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CompareError::Request { target, source })?;

        let status = response.status().as_u16();
        let content_type = header_value(&response);
        let body = response
            .bytes()
            .await
            .map_err(|source| CompareError::Request { target, source })?;

        match decode_response(&self.config, target, status, content_type.as_deref(), &body)? {
            GeneratedImage::Inline { media_type, bytes } => Ok((media_type, bytes)),
            GeneratedImage::Url(_) => Err(CompareError::decode(
                target,
                format!("{} did not return image data", url),
            )),
        }
    }
}

#[async_trait]
impl ImageBackend for ImageClient {
    async fn generate(&self, target: ModelTarget, payload: Value) -> Result<GeneratedImage> {
        let url = self.config.endpoint(target);

        log::info!("🎨 Requesting {} image from {}", target, url);
        log::debug!("{} payload: {}", target, payload);

        let _timer = logger::timer(format!("{} generation", target));

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| {
                log::error!("❌ {} request failed: {}", target, source);
                CompareError::Request { target, source }
            })?;

        let status = response.status().as_u16();
        let content_type = header_value(&response);
        let body = response
            .bytes()
            .await
            .map_err(|source| CompareError::Request { target, source })?;

        log::debug!(
            "{} responded {} ({}, {} bytes)",
            target,
            status,
            content_type.as_deref().unwrap_or("no content type"),
            body.len()
        );

        decode_response(&self.config, target, status, content_type.as_deref(), &body)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = self.config.health_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CompareError::Unhealthy(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CompareError::Unhealthy(format!("invalid health response: {}", e)))?;

        Ok(body.get("status").and_then(Value::as_str) == Some("ok"))
    }
}

fn header_value(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationParams, WireFormat, PNG};
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;

    const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn client_for(server: &MockServer, format: WireFormat) -> ImageClient {
        ImageClient::new(
            CompareConfig::new()
                .with_base_url(server.base_url())
                .with_wire_format(format),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn generate_posts_payload_and_reads_raw_png() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate/trained")
                    .header("content-type", "application/json")
                    .body_includes("\"prompt\":\"a red fox\"")
                    .body_includes("\"steps\":30")
                    .body_includes("\"seed\":-1")
                    .body_includes("\"sampler\":\"DPM++ 2M\"");
                then.status(200)
                    .header("content-type", "image/png")
                    .body(PNG_BYTES);
            })
            .await;

        let client = client_for(&server, WireFormat::Ui);
        let payload = WireFormat::Ui.trained_payload("a red fox", &GenerationParams::default());
        let image = client.generate(ModelTarget::Trained, payload).await?;

        mock.assert_async().await;
        assert_eq!(image, GeneratedImage::inline(PNG, PNG_BYTES.to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn generate_reads_json_url() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate/base")
                    .json_body(json!({ "prompt": "a red fox" }));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "image": "/outputs/base-1.png" }));
            })
            .await;

        let client = client_for(&server, WireFormat::Ui);
        let image = client
            .generate(ModelTarget::Base, WireFormat::Ui.base_payload("a red fox"))
            .await?;

        mock.assert_async().await;
        assert_eq!(image, GeneratedImage::Url(server.url("/outputs/base-1.png")));
        Ok(())
    }

    #[tokio::test]
    async fn generate_surfaces_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate/trained");
                then.status(500)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "status": "error",
                        "message": "invalid lora_scale; expected a number"
                    }));
            })
            .await;

        let client = client_for(&server, WireFormat::Diffusers);
        let err = client
            .generate(ModelTarget::Trained, json!({ "prompt": "x" }))
            .await
            .unwrap_err();

        match err {
            CompareError::Status {
                target,
                status,
                message,
            } => {
                assert_eq!(target, ModelTarget::Trained);
                assert_eq!(status, 500);
                assert_eq!(message, "invalid lora_scale; expected a number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_reports_transport_errors() {
        // Nothing listens on port 9 locally.
        let client = ImageClient::new(CompareConfig::new().with_base_url("http://127.0.0.1:9"))
            .unwrap();
        let err = client
            .generate(ModelTarget::Base, json!({ "prompt": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::Request {
                target: ModelTarget::Base,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fetch_bytes_follows_urls() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/outputs/trained-1.png");
                then.status(200)
                    .header("content-type", "image/png")
                    .body(PNG_BYTES);
            })
            .await;

        let client = client_for(&server, WireFormat::Ui);
        let (media_type, bytes) = client
            .fetch_bytes(
                ModelTarget::Trained,
                &GeneratedImage::Url(server.url("/outputs/trained-1.png")),
            )
            .await?;
        assert_eq!(media_type, PNG);
        assert_eq!(bytes, PNG_BYTES.to_vec());

        let inline = GeneratedImage::inline("image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        let (media_type, bytes) = client.fetch_bytes(ModelTarget::Base, &inline).await?;
        assert_eq!(media_type, "image/jpeg");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
        Ok(())
    }

    #[tokio::test]
    async fn health_check_reads_status() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let client = client_for(&server, WireFormat::Ui);
        assert!(client.health_check().await?);
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn health_check_false_on_failure_status() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503);
            })
            .await;

        let client = client_for(&server, WireFormat::Ui);
        assert!(!client.health_check().await?);
        Ok(())
    }

    #[test]
    fn new_rejects_invalid_config() {
        assert!(matches!(
            ImageClient::new(CompareConfig::new().with_base_url("ftp://example")),
            Err(CompareError::Config(_))
        ));
    }
}
