use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{debug, info};
use validator::Validate;

use crate::errors::{collect_field_errors, ApiError};
use crate::models::{CreateReviewRequest, UpdateReviewRequest};
use crate::store::CatalogStore;

type Store = web::Data<dyn CatalogStore>;

pub async fn create_review(
    store: Store,
    id: web::Path<String>,
    payload: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Creating review for product: {}", id);
    let new_review = payload.into_inner().into_new_review()?;
    let review = store.create_review(&id, new_review).await?;
    info!("Review created successfully with ID: {}", review.id);
    Ok(HttpResponse::Created().json(json!({ "id": review.id })))
}

pub async fn list_reviews(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    debug!("Fetching reviews for product: {}", id);
    let reviews = store.list_reviews(&id).await?;
    info!("Retrieved {} reviews for product {}", reviews.len(), id);
    Ok(HttpResponse::Ok().json(reviews))
}

pub async fn get_review(
    store: Store,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (product_id, review_id) = path.into_inner();
    debug!("Fetching review {} of product {}", review_id, product_id);
    let review = store.get_review(&product_id, &review_id).await?;
    Ok(HttpResponse::Ok().json(review))
}

pub async fn update_review(
    store: Store,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let (product_id, review_id) = path.into_inner();
    debug!("Updating review {} of product {}", review_id, product_id);
    let patch = payload.into_inner();
    if let Err(source) = patch.validate() {
        return Err(ApiError::validation(collect_field_errors(&source)));
    }
    let review = store.update_review(&product_id, &review_id, patch).await?;
    info!("Review updated successfully: {}", review_id);
    Ok(HttpResponse::Ok().json(review))
}

pub async fn delete_review(
    store: Store,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (product_id, review_id) = path.into_inner();
    debug!("Deleting review {} of product {}", review_id, product_id);
    store.delete_review(&product_id, &review_id).await?;
    info!("Review deleted successfully: {}", review_id);
    Ok(HttpResponse::NoContent().finish())
}
