use std::env;
use std::path::PathBuf;

use dotenv::dotenv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Mongo,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub backend: StorageBackend,
    pub mongo_uri: String,
    pub database_name: String,
    pub data_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Base URL clients reach the server under; pagination links and image
    /// URLs are built from it.
    pub public_url: String,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn init() -> Self {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3420".to_string());
        let listen_addr = format!("{host}:{port}");

        let backend = match env::var("STORAGE_BACKEND").as_deref().unwrap_or("file") {
            "mongo" => StorageBackend::Mongo,
            _ => StorageBackend::File,
        };

        let mongo_uri = env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let database_name =
            env::var("DATABASE_NAME").unwrap_or_else(|_| "catalog_db".to_string());

        let data_dir =
            PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
        let public_dir =
            PathBuf::from(env::var("PUBLIC_DIR").unwrap_or_else(|_| "./public".to_string()));

        let public_url = env::var("BE_URL").unwrap_or_else(|_| format!("http://{listen_addr}"));

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        AppConfig {
            listen_addr,
            backend,
            mongo_uri,
            database_name,
            data_dir,
            public_dir,
            public_url,
            allowed_origins,
        }
    }
}
