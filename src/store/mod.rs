use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, StorageBackend};
use crate::models::{
    NewProduct, NewReview, Product, Review, UpdateProductRequest, UpdateReviewRequest,
};

pub mod file;
pub mod mongo;

pub use file::FileStore;
pub use mongo::MongoStore;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("bson encoding error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StoreError {
    pub fn no_product(id: &str) -> Self {
        StoreError::NotFound(format!("No product with id {id}"))
    }

    pub fn no_review(id: &str) -> Self {
        StoreError::NotFound(format!("No review with id {id}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    Category,
    CreatedAt,
}

impl SortField {
    pub fn parse(field: &str) -> Option<SortField> {
        match field {
            "name" => Some(SortField::Name),
            "price" => Some(SortField::Price),
            "category" => Some(SortField::Category),
            "createdAt" => Some(SortField::CreatedAt),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Category => "category",
            SortField::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub field: SortField,
    pub ascending: bool,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub category: Option<String>,
    pub limit: i64,
    pub skip: i64,
    pub sort: Option<SortSpec>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            category: None,
            limit: DEFAULT_PAGE_SIZE,
            skip: 0,
            sort: None,
        }
    }
}

#[derive(Debug)]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Total match count before pagination, for page-count computation.
    pub total: u64,
}

/// The persistence port. Both back-ends satisfy it; everything above never
/// branches on which one is active.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, StoreError>;
    async fn get_product(&self, id: &str) -> Result<Product, StoreError>;
    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(
        &self,
        id: &str,
        patch: UpdateProductRequest,
    ) -> Result<Product, StoreError>;
    /// Also removes the product's reviews.
    async fn delete_product(&self, id: &str) -> Result<(), StoreError>;
    async fn set_product_image(&self, id: &str, image_url: &str) -> Result<Product, StoreError>;

    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>, StoreError>;
    async fn get_review(&self, product_id: &str, review_id: &str)
        -> Result<Review, StoreError>;
    async fn create_review(
        &self,
        product_id: &str,
        new: NewReview,
    ) -> Result<Review, StoreError>;
    async fn update_review(
        &self,
        product_id: &str,
        review_id: &str,
        patch: UpdateReviewRequest,
    ) -> Result<Review, StoreError>;
    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<(), StoreError>;
}

/// Builds the back-end selected by configuration.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn CatalogStore>, StoreError> {
    match config.backend {
        StorageBackend::Mongo => Ok(Arc::new(
            MongoStore::connect(&config.mongo_uri, &config.database_name).await?,
        )),
        StorageBackend::File => Ok(Arc::new(FileStore::open(&config.data_dir).await?)),
    }
}
