use std::path::PathBuf;

use tokio::fs;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::store::StoreError;

/// Persists uploaded product images under the public directory and hands
/// back the URL they are served under. Stands in for the image CDN.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_url: String,
}

impl ImageStore {
    pub fn new(config: &AppConfig) -> Self {
        ImageStore {
            root: config.public_dir.join("img").join("products"),
            public_url: config.public_url.clone(),
        }
    }

    pub async fn save(&self, extension: &str, data: &[u8]) -> Result<String, StoreError> {
        fs::create_dir_all(&self.root).await?;
        let file_name = format!("{}.{extension}", Uuid::new_v4());
        fs::write(self.root.join(&file_name), data).await?;
        Ok(format!("{}/img/products/{file_name}", self.public_url))
    }
}
