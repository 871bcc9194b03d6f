use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{collect_field_errors, ApiError, FieldError};

/// Served until a real image is attached via the upload endpoint.
pub const PLACEHOLDER_IMAGE_URL: &str = "/img/products/placeholder.jpg";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub image_url: String,
    pub price: f64,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub comment: String,
    pub rate: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated product creation; the storage back-end assigns id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub image_url: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub comment: String,
    pub rate: i32,
}

/// Fields are Options so that every missing-required and out-of-bounds
/// violation can be reported in one response instead of failing on the
/// first absent field at deserialization time.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "name must be a non-empty string"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "description must be a non-empty string"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "brand must be a non-empty string"))]
    pub brand: Option<String>,
    #[validate(length(min = 1, message = "category must be a non-empty string"))]
    pub category: Option<String>,
    #[validate(url(message = "imageUrl must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(range(min = 0.0, message = "price must be a non-negative number"))]
    pub price: Option<f64>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, ApiError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(source) => collect_field_errors(&source),
        };
        for (field, missing) in [
            ("name", self.name.is_none()),
            ("description", self.description.is_none()),
            ("brand", self.brand.is_none()),
            ("category", self.category.is_none()),
            ("price", self.price.is_none()),
        ] {
            if missing {
                errors.push(FieldError::required(field));
            }
        }
        let (Some(name), Some(description), Some(brand), Some(category), Some(price)) =
            (self.name, self.description, self.brand, self.category, self.price)
        else {
            return Err(ApiError::validation(errors));
        };
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }
        Ok(NewProduct {
            name,
            description,
            brand,
            category,
            image_url: self.image_url,
            price,
        })
    }
}

/// Partial update; present fields are merged over the stored record.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "name must be a non-empty string"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "description must be a non-empty string"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "brand must be a non-empty string"))]
    pub brand: Option<String>,
    #[validate(length(min = 1, message = "category must be a non-empty string"))]
    pub category: Option<String>,
    #[validate(url(message = "imageUrl must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(range(min = 0.0, message = "price must be a non-negative number"))]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "comment must be a non-empty string"))]
    pub comment: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rate must be an integer between 1 and 5"))]
    pub rate: Option<i32>,
}

impl CreateReviewRequest {
    pub fn into_new_review(self) -> Result<NewReview, ApiError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(source) => collect_field_errors(&source),
        };
        for (field, missing) in [
            ("comment", self.comment.is_none()),
            ("rate", self.rate.is_none()),
        ] {
            if missing {
                errors.push(FieldError::required(field));
            }
        }
        let (Some(comment), Some(rate)) = (self.comment, self.rate) else {
            return Err(ApiError::validation(errors));
        };
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }
        Ok(NewReview { comment, rate })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, message = "comment must be a non-empty string"))]
    pub comment: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rate must be an integer between 1 and 5"))]
    pub rate: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_of(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(list) => list.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_create_payload_reports_every_required_field() {
        let request: CreateProductRequest = serde_json::from_value(serde_json::json!({}))
            .expect("empty object deserializes");
        let fields = fields_of(request.into_new_product().unwrap_err());
        assert_eq!(fields, ["brand", "category", "description", "name", "price"]);
    }

    #[test]
    fn negative_price_and_missing_name_are_both_reported() {
        let request: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "description": "Oak desk",
            "brand": "Acme",
            "category": "furniture",
            "price": -1.0,
        }))
        .expect("payload deserializes");
        let fields = fields_of(request.into_new_product().unwrap_err());
        assert_eq!(fields, ["name", "price"]);
    }

    #[test]
    fn valid_create_payload_passes_through() {
        let request: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Desk",
            "description": "Oak desk",
            "brand": "Acme",
            "category": "furniture",
            "price": 199.0,
        }))
        .expect("payload deserializes");
        let new_product = request.into_new_product().expect("payload is valid");
        assert_eq!(new_product.name, "Desk");
        assert_eq!(new_product.image_url, None);
    }

    #[test]
    fn review_rate_out_of_bounds_is_rejected() {
        for rate in [0, 6, 7] {
            let request: CreateReviewRequest = serde_json::from_value(serde_json::json!({
                "comment": "decent",
                "rate": rate,
            }))
            .expect("payload deserializes");
            let fields = fields_of(request.into_new_review().unwrap_err());
            assert_eq!(fields, ["rate"], "rate {rate} should be rejected");
        }
    }

    #[test]
    fn review_rate_bounds_are_inclusive() {
        for rate in [1, 5] {
            let request: CreateReviewRequest = serde_json::from_value(serde_json::json!({
                "comment": "decent",
                "rate": rate,
            }))
            .expect("payload deserializes");
            assert!(request.into_new_review().is_ok(), "rate {rate} is in bounds");
        }
    }

    #[test]
    fn malformed_image_url_is_rejected() {
        let request: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Desk",
            "description": "Oak desk",
            "brand": "Acme",
            "category": "furniture",
            "imageUrl": "not a url",
            "price": 199.0,
        }))
        .expect("payload deserializes");
        let fields = fields_of(request.into_new_product().unwrap_err());
        assert_eq!(fields, ["imageUrl"]);
    }
}
