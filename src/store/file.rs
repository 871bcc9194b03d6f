use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, ListQuery, ProductPage, SortField, StoreError};
use crate::models::{
    NewProduct, NewReview, Product, Review, UpdateProductRequest, UpdateReviewRequest,
    PLACEHOLDER_IMAGE_URL,
};

/// Flat-file back-end: `products.json` and `reviews.json`, each an array of
/// records. Every mutation is a read-modify-write of the whole collection,
/// serialized by a per-collection lock; the file itself is replaced
/// atomically through a temp file + rename. Cross-collection operations
/// take the locks in products-then-reviews order.
pub struct FileStore {
    products_path: PathBuf,
    reviews_path: PathBuf,
    products_lock: RwLock<()>,
    reviews_lock: RwLock<()>,
}

/// On-disk product shape; reviews live in their own collection keyed by
/// `productId` and are joined on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRecord {
    id: String,
    name: String,
    description: String,
    brand: String,
    category: String,
    image_url: String,
    price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRecord {
    fn hydrate(self, reviews: &[Review]) -> Product {
        let reviews = reviews
            .iter()
            .filter(|review| review.product_id == self.id)
            .cloned()
            .collect();
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            brand: self.brand,
            category: self.category,
            image_url: self.image_url,
            price: self.price,
            reviews,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FileStore {
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).await?;
        Ok(FileStore {
            products_path: dir.join("products.json"),
            reviews_path: dir.join("reviews.json"),
            products_lock: RwLock::new(()),
            reviews_lock: RwLock::new(()),
        })
    }

    async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(items)?).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Merge-style mutation shared by update and image attachment.
    async fn mutate_product(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ProductRecord) + Send,
    ) -> Result<Product, StoreError> {
        let _products = self.products_lock.write().await;
        let mut records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::no_product(id))?;
        apply(record);
        record.updated_at = Utc::now();
        let updated = record.clone();
        Self::write_collection(&self.products_path, &records).await?;

        let _reviews = self.reviews_lock.read().await;
        let reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        Ok(updated.hydrate(&reviews))
    }

    async fn product_exists(&self, id: &str) -> Result<(), StoreError> {
        let records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;
        if records.iter().any(|record| record.id == id) {
            Ok(())
        } else {
            Err(StoreError::no_product(id))
        }
    }
}

#[async_trait]
impl CatalogStore for FileStore {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, StoreError> {
        let _products = self.products_lock.read().await;
        let _reviews = self.reviews_lock.read().await;
        let mut records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;

        if let Some(category) = &query.category {
            records.retain(|record| record.category.eq_ignore_ascii_case(category));
        }
        if let Some(sort) = query.sort {
            records.sort_by(|a, b| {
                let ordering = match sort.field {
                    SortField::Name => a.name.cmp(&b.name),
                    SortField::Price => a.price.total_cmp(&b.price),
                    SortField::Category => a.category.cmp(&b.category),
                    SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                };
                if sort.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        let total = records.len() as u64;
        let reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        let items = records
            .into_iter()
            .skip(query.skip.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|record| record.hydrate(&reviews))
            .collect();
        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
        let _products = self.products_lock.read().await;
        let _reviews = self.reviews_lock.read().await;
        let records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;
        let record = records
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::no_product(id))?;
        let reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        Ok(record.hydrate(&reviews))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let record = ProductRecord {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            brand: new.brand,
            category: new.category,
            image_url: new
                .image_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            price: new.price,
            created_at: now,
            updated_at: now,
        };

        let _products = self.products_lock.write().await;
        let mut records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;
        let product = record.clone().hydrate(&[]);
        records.push(record);
        Self::write_collection(&self.products_path, &records).await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &str,
        patch: UpdateProductRequest,
    ) -> Result<Product, StoreError> {
        self.mutate_product(id, move |record| {
            if let Some(name) = patch.name {
                record.name = name;
            }
            if let Some(description) = patch.description {
                record.description = description;
            }
            if let Some(brand) = patch.brand {
                record.brand = brand;
            }
            if let Some(category) = patch.category {
                record.category = category;
            }
            if let Some(image_url) = patch.image_url {
                record.image_url = image_url;
            }
            if let Some(price) = patch.price {
                record.price = price;
            }
        })
        .await
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        let _products = self.products_lock.write().await;
        let mut records: Vec<ProductRecord> = Self::read_collection(&self.products_path).await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(StoreError::no_product(id));
        }
        Self::write_collection(&self.products_path, &records).await?;

        // Cascade: a deleted product leaves no orphaned reviews behind.
        let _reviews = self.reviews_lock.write().await;
        let mut reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        reviews.retain(|review| review.product_id != id);
        Self::write_collection(&self.reviews_path, &reviews).await?;
        Ok(())
    }

    async fn set_product_image(&self, id: &str, image_url: &str) -> Result<Product, StoreError> {
        let image_url = image_url.to_string();
        self.mutate_product(id, move |record| {
            record.image_url = image_url;
        })
        .await
    }

    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>, StoreError> {
        let _products = self.products_lock.read().await;
        self.product_exists(product_id).await?;
        let _reviews = self.reviews_lock.read().await;
        let reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        Ok(reviews
            .into_iter()
            .filter(|review| review.product_id == product_id)
            .collect())
    }

    async fn get_review(
        &self,
        product_id: &str,
        review_id: &str,
    ) -> Result<Review, StoreError> {
        self.list_reviews(product_id)
            .await?
            .into_iter()
            .find(|review| review.id == review_id)
            .ok_or_else(|| StoreError::no_review(review_id))
    }

    async fn create_review(
        &self,
        product_id: &str,
        new: NewReview,
    ) -> Result<Review, StoreError> {
        let _products = self.products_lock.read().await;
        self.product_exists(product_id).await?;

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            comment: new.comment,
            rate: new.rate,
            created_at: now,
            updated_at: now,
        };

        let _reviews = self.reviews_lock.write().await;
        let mut reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        reviews.push(review.clone());
        Self::write_collection(&self.reviews_path, &reviews).await?;
        Ok(review)
    }

    async fn update_review(
        &self,
        product_id: &str,
        review_id: &str,
        patch: UpdateReviewRequest,
    ) -> Result<Review, StoreError> {
        let _products = self.products_lock.read().await;
        self.product_exists(product_id).await?;

        let _reviews = self.reviews_lock.write().await;
        let mut reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        let review = reviews
            .iter_mut()
            .find(|review| review.id == review_id && review.product_id == product_id)
            .ok_or_else(|| StoreError::no_review(review_id))?;
        if let Some(comment) = patch.comment {
            review.comment = comment;
        }
        if let Some(rate) = patch.rate {
            review.rate = rate;
        }
        review.updated_at = Utc::now();
        let updated = review.clone();
        Self::write_collection(&self.reviews_path, &reviews).await?;
        Ok(updated)
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<(), StoreError> {
        let _products = self.products_lock.read().await;
        self.product_exists(product_id).await?;

        let _reviews = self.reviews_lock.write().await;
        let mut reviews: Vec<Review> = Self::read_collection(&self.reviews_path).await?;
        let before = reviews.len();
        reviews.retain(|review| !(review.id == review_id && review.product_id == product_id));
        if reviews.len() == before {
            return Err(StoreError::no_review(review_id));
        }
        Self::write_collection(&self.reviews_path, &reviews).await?;
        Ok(())
    }
}
