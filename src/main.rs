use actix_cors::Cors;
use actix_files::Files;
use actix_web::{http::header, web, App, HttpServer};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use catalog_api::config::AppConfig;
use catalog_api::handlers;
use catalog_api::media::ImageStore;
use catalog_api::store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("actix_web=info".parse().expect("valid directive"))
                .add_directive("catalog_api=debug".parse().expect("valid directive")),
        )
        .init();

    info!("Starting catalog API server");

    let config = AppConfig::init();
    let store = store::connect(&config)
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    info!("Storage backend ready: {:?}", config.backend);

    let images = ImageStore::new(&config);
    let listen_addr = config.listen_addr.clone();

    let store_data = web::Data::from(store);
    let config_data = web::Data::new(config.clone());
    let images_data = web::Data::new(images);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600);
        for origin in &config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(store_data.clone())
            .app_data(config_data.clone())
            .app_data(images_data.clone())
            .configure(handlers::configure)
            .service(Files::new("/img", config.public_dir.join("img")))
    })
    .bind(&listen_addr)?
    .run()
    .await
}
