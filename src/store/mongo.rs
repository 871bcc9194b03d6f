use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use super::{CatalogStore, ListQuery, ProductPage, StoreError};
use crate::models::{
    NewProduct, NewReview, Product, Review, UpdateProductRequest, UpdateReviewRequest,
    PLACEHOLDER_IMAGE_URL,
};

/// Document-store back-end: one `products` collection with reviews embedded
/// as a BSON array, mutated through targeted `$set`/`$push`/`$pull` updates
/// so review operations ride on the store's per-document atomicity.
pub struct MongoStore {
    products: Collection<ProductDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProductDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    description: String,
    brand: String,
    category: String,
    #[serde(rename = "imageUrl")]
    image_url: String,
    price: f64,
    #[serde(default)]
    reviews: Vec<ReviewDoc>,
    #[serde(rename = "createdAt", with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReviewDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    comment: String,
    rate: i32,
    #[serde(rename = "createdAt", with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl ProductDoc {
    fn into_product(self) -> Product {
        let id = self.id.to_hex();
        let reviews = self
            .reviews
            .into_iter()
            .map(|review| review.into_review(&id))
            .collect();
        Product {
            id,
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

impl ReviewDoc {
    /// The wire model always carries the back-reference; for embedded
    /// reviews it comes from the containing document.
    fn into_review(self, product_id: &str) -> Review {
        Review {
            id: self.id.to_hex(),
            product_id: product_id.to_string(),
            comment: self.comment,
            rate: self.rate,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Ids are opaque to callers, so a malformed hex id is indistinguishable
/// from an unknown one.
fn parse_product_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::no_product(id))
}

fn parse_review_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::no_review(id))
}

fn filter_doc(query: &ListQuery) -> Document {
    match &query.category {
        Some(category) => doc! {
            "category": {
                "$regex": format!("^{}$", regex::escape(category)),
                "$options": "i",
            }
        },
        None => doc! {},
    }
}

fn bson_now() -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_chrono(Utc::now())
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let products = client.database(database_name).collection("products");
        Ok(MongoStore { products })
    }

    async fn find_doc(&self, id: ObjectId) -> Result<Option<ProductDoc>, StoreError> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    /// Distinguishes "product missing" from "review missing" after a
    /// targeted review update matched nothing.
    async fn review_miss(&self, product_oid: ObjectId, product_id: &str, review_id: &str) -> StoreError {
        match self.find_doc(product_oid).await {
            Ok(Some(_)) => StoreError::no_review(review_id),
            Ok(None) => StoreError::no_product(product_id),
            Err(err) => err,
        }
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, StoreError> {
        let filter = filter_doc(query);
        let total = self.products.count_documents(filter.clone(), None).await?;

        let mut options = FindOptions::builder()
            .limit(query.limit)
            .skip(query.skip.max(0) as u64)
            .build();
        if let Some(sort) = query.sort {
            let mut sort_doc = Document::new();
            sort_doc.insert(sort.field.key(), if sort.ascending { 1 } else { -1 });
            options.sort = Some(sort_doc);
        }

        let mut cursor = self.products.find(filter, options).await?;
        let mut items = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            items.push(doc.into_product());
        }
        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
        let oid = parse_product_id(id)?;
        let doc = self
            .find_doc(oid)
            .await?
            .ok_or_else(|| StoreError::no_product(id))?;
        Ok(doc.into_product())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let doc = ProductDoc {
            id: ObjectId::new(),
            name: new.name,
            description: new.description,
            brand: new.brand,
            category: new.category,
            image_url: new
                .image_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            price: new.price,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.products.insert_one(&doc, None).await?;
        Ok(doc.into_product())
    }

    async fn update_product(
        &self,
        id: &str,
        patch: UpdateProductRequest,
    ) -> Result<Product, StoreError> {
        let oid = parse_product_id(id)?;

        let mut set_doc = doc! {};
        if let Some(name) = patch.name {
            set_doc.insert("name", name);
        }
        if let Some(description) = patch.description {
            set_doc.insert("description", description);
        }
        if let Some(brand) = patch.brand {
            set_doc.insert("brand", brand);
        }
        if let Some(category) = patch.category {
            set_doc.insert("category", category);
        }
        if let Some(image_url) = patch.image_url {
            set_doc.insert("imageUrl", image_url);
        }
        if let Some(price) = patch.price {
            set_doc.insert("price", price);
        }
        set_doc.insert("updatedAt", bson_now());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .products
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set_doc }, options)
            .await?
            .ok_or_else(|| StoreError::no_product(id))?;
        Ok(updated.into_product())
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        let oid = parse_product_id(id)?;
        // Reviews are embedded, so the cascade is the delete itself.
        let result = self.products.delete_one(doc! { "_id": oid }, None).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::no_product(id));
        }
        Ok(())
    }

    async fn set_product_image(&self, id: &str, image_url: &str) -> Result<Product, StoreError> {
        let oid = parse_product_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .products
            .find_one_and_update(
                doc! { "_id": oid },
                doc! { "$set": { "imageUrl": image_url, "updatedAt": bson_now() } },
                options,
            )
            .await?
            .ok_or_else(|| StoreError::no_product(id))?;
        Ok(updated.into_product())
    }

    async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>, StoreError> {
        Ok(self.get_product(product_id).await?.reviews)
    }

    async fn get_review(
        &self,
        product_id: &str,
        review_id: &str,
    ) -> Result<Review, StoreError> {
        parse_review_id(review_id)?;
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
        let oid = parse_product_id(product_id)?;
        let now = Utc::now();
        let review_doc = ReviewDoc {
            id: ObjectId::new(),
            comment: new.comment,
            rate: new.rate,
            created_at: now,
            updated_at: now,
        };

        let update = doc! { "$push": { "reviews": to_bson(&review_doc)? } };
        let result = self.products.update_one(doc! { "_id": oid }, update, None).await?;
        if result.matched_count == 0 {
            return Err(StoreError::no_product(product_id));
        }
        Ok(review_doc.into_review(product_id))
    }

    async fn update_review(
        &self,
        product_id: &str,
        review_id: &str,
        patch: UpdateReviewRequest,
    ) -> Result<Review, StoreError> {
        let oid = parse_product_id(product_id)?;
        let rid = parse_review_id(review_id)?;

        let mut set_doc = doc! {};
        if let Some(comment) = patch.comment {
            set_doc.insert("reviews.$.comment", comment);
        }
        if let Some(rate) = patch.rate {
            set_doc.insert("reviews.$.rate", rate);
        }
        set_doc.insert("reviews.$.updatedAt", bson_now());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .products
            .find_one_and_update(
                doc! { "_id": oid, "reviews._id": rid },
                doc! { "$set": set_doc },
                options,
            )
            .await?;
        match updated {
            Some(product) => product
                .reviews
                .into_iter()
                .find(|review| review.id == rid)
                .map(|review| review.into_review(product_id))
                .ok_or_else(|| StoreError::no_review(review_id)),
            None => Err(self.review_miss(oid, product_id, review_id).await),
        }
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<(), StoreError> {
        let oid = parse_product_id(product_id)?;
        let rid = parse_review_id(review_id)?;

        let result = self
            .products
            .update_one(
                doc! { "_id": oid, "reviews._id": rid },
                doc! { "$pull": { "reviews": { "_id": rid } } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(self.review_miss(oid, product_id, review_id).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_map_to_not_found() {
        assert!(matches!(
            parse_product_id("definitely-not-hex"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            parse_review_id(""),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn category_filter_is_anchored_and_escaped() {
        let query = ListQuery {
            category: Some("c++ (used)".to_string()),
            ..ListQuery::default()
        };
        let filter = filter_doc(&query);
        let inner = filter.get_document("category").expect("regex clause");
        let pattern = inner.get_str("$regex").expect("pattern");
        assert!(pattern.starts_with('^') && pattern.ends_with('$'));
        assert!(pattern.contains(r"c\+\+"), "metacharacters must be escaped");
        assert_eq!(inner.get_str("$options").expect("options clause"), "i");
    }

    #[test]
    fn no_category_means_empty_filter() {
        assert!(filter_doc(&ListQuery::default()).is_empty());
    }
}
