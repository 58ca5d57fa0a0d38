pub mod classifier;
pub mod config;
pub mod handlers;
pub mod models;
pub mod preprocess;
pub mod service;
pub mod state;

use actix_cors::Cors;
use actix_web::web;

pub use classifier::{Classifier, ModelError, OnnxClassifier};
pub use config::ServerConfig;
pub use service::PredictionService;
pub use state::AppState;

/// Registers the three public routes. State is attached by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/ping").route(web::get().to(handlers::ping)))
        .service(web::resource("/predict").route(web::post().to(handlers::predict)));
}

/// Cross-origin policy: listed origins only, with credentials, any method or header.
pub fn cors<S: AsRef<str>>(origins: &[S]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| {
            cors.allowed_origin(origin.as_ref())
        })
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}
