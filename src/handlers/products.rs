use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::{collect_field_errors, ApiError};
use crate::media::ImageStore;
use crate::models::{CreateProductRequest, Product, UpdateProductRequest};
use crate::pagination::{self, ListParams, PageLinks};
use crate::store::CatalogStore;

type Store = web::Data<dyn CatalogStore>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub links: PageLinks,
    pub total: u64,
    pub number_of_pages: u64,
    pub products: Vec<Product>,
}

pub async fn create_product(
    store: Store,
    payload: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Creating new product");
    let new_product = payload.into_inner().into_new_product()?;
    let product = store.create_product(new_product).await?;
    info!("Product created successfully with ID: {}", product.id);
    Ok(HttpResponse::Created().json(json!({ "id": product.id })))
}

pub async fn list_products(
    store: Store,
    config: web::Data<AppConfig>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let query = params.into_inner().into_query()?;
    debug!("Fetching products: {:?}", query);
    let page = store.list_products(&query).await?;
    info!("Retrieved {} of {} products", page.items.len(), page.total);

    let base_url = format!("{}/products", config.public_url);
    Ok(HttpResponse::Ok().json(ProductListResponse {
        links: pagination::page_links(&base_url, &query, page.total),
        total: page.total,
        number_of_pages: pagination::number_of_pages(page.total, query.limit),
        products: page.items,
    }))
}

pub async fn get_product(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    debug!("Fetching product with ID: {}", id);
    let product = store.get_product(&id).await?;
    info!("Product found: {}", id);
    Ok(HttpResponse::Ok().json(product))
}

pub async fn update_product(
    store: Store,
    id: web::Path<String>,
    payload: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Updating product {}: {:?}", id, payload);
    let patch = payload.into_inner();
    if let Err(source) = patch.validate() {
        return Err(ApiError::validation(collect_field_errors(&source)));
    }
    let product = store.update_product(&id, patch).await?;
    info!("Product updated successfully: {}", id);
    Ok(HttpResponse::Ok().json(product))
}

pub async fn delete_product(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    debug!("Deleting product: {}", id);
    store.delete_product(&id).await?;
    info!("Product deleted successfully: {}", id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn upload_product_image(
    store: Store,
    images: web::Data<ImageStore>,
    id: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    debug!("Uploading image for product: {}", id);
    // Reject unknown products before consuming the upload.
    store.get_product(&id).await?;

    let mut uploaded = None;
    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        if field.name() != "image" {
            continue;
        }
        let extension = match field.content_type().map(|mime| mime.essence_str()) {
            Some("image/png") => "png",
            Some("image/jpeg") => "jpg",
            Some("image/gif") => "gif",
            Some("image/webp") => "webp",
            _ => {
                return Err(ApiError::BadRequest(
                    "image must be uploaded as png, jpeg, gif or webp".to_string(),
                ))
            }
        };
        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            data.extend_from_slice(&chunk);
        }
        uploaded = Some(images.save(extension, &data).await?);
        break;
    }

    let image_url = uploaded.ok_or_else(|| {
        ApiError::BadRequest("no file supplied in the \"image\" field".to_string())
    })?;
    let product = store.set_product_image(&id, &image_url).await?;
    info!("Image attached to product {}: {}", id, image_url);
    Ok(HttpResponse::Ok().json(product))
}

fn bad_multipart(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart payload: {err}"))
}
