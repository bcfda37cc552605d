use crate::{
    client::ImageClient,
    error::Result,
    models::{extension_for, ImagePair, ModelTarget},
};
use std::path::{Path, PathBuf};

/// Where a comparison's two images ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPair {
    pub base_path: PathBuf,
    pub trained_path: PathBuf,
}

/// Writes both images of `pair` into `dir` as `base.<ext>` and `trained.<ext>`.
///
/// URL results are downloaded first.
pub async fn save_pair(client: &ImageClient, pair: &ImagePair, dir: &Path) -> Result<SavedPair> {
    tokio::fs::create_dir_all(dir).await?;

    let base_path = save_one(client, ModelTarget::Base, &pair.base, dir).await?;
    let trained_path = save_one(client, ModelTarget::Trained, &pair.trained, dir).await?;

    Ok(SavedPair {
        base_path,
        trained_path,
    })
}

async fn save_one(
    client: &ImageClient,
    target: ModelTarget,
    image: &crate::models::GeneratedImage,
    dir: &Path,
) -> Result<PathBuf> {
    let (media_type, bytes) = client.fetch_bytes(target, image).await?;
    let path = dir.join(format!("{}.{}", target, extension_for(&media_type)));
    tokio::fs::write(&path, &bytes).await?;
    log::info!("💾 Saved {} image to {}", target, path.display());
    Ok(path)
}
