use actix_web::web;

pub mod products;
pub mod reviews;

use crate::errors;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(errors::json_config())
        .app_data(errors::query_config())
        .service(
            web::scope("/products")
                .route("", web::post().to(products::create_product))
                .route("", web::get().to(products::list_products))
                .route("/{productId}", web::get().to(products::get_product))
                .route("/{productId}", web::put().to(products::update_product))
                .route("/{productId}", web::delete().to(products::delete_product))
                .route(
                    "/{productId}/upload",
                    web::post().to(products::upload_product_image),
                )
                .route("/{productId}/reviews", web::post().to(reviews::create_review))
                .route("/{productId}/reviews", web::get().to(reviews::list_reviews))
                .route(
                    "/{productId}/reviews/{reviewId}",
                    web::get().to(reviews::get_review),
                )
                .route(
                    "/{productId}/reviews/{reviewId}",
                    web::put().to(reviews::update_review),
                )
                .route(
                    "/{productId}/reviews/{reviewId}",
                    web::delete().to(reviews::delete_review),
                ),
        );
}
