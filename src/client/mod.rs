pub mod decode;
pub mod image_client;

use crate::{
    error::Result,
    models::{GeneratedImage, ModelTarget},
};
use async_trait::async_trait;
use serde_json::Value;

pub use image_client::ImageClient;

/// Something that turns a generation payload into an image.
///
/// [`ImageClient`] talks HTTP; tests substitute scripted backends.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, target: ModelTarget, payload: Value) -> Result<GeneratedImage>;

    async fn health_check(&self) -> Result<bool>;
}
