use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;

use blight_server::{configure, cors, AppState, OnnxClassifier, PredictionService, ServerConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    config.validate()?;

    info!("Loading model from {}", config.model_path.display());
    let classifier = OnnxClassifier::load(&config.model_path, config.layout)
        .context("model could not be loaded, refusing to start")?;
    info!("Model ready, input layout {:?}", classifier.layout());

    let state = web::Data::new(
        AppState::new(PredictionService::new(classifier, config.layout))
            .with_max_upload_bytes(config.max_upload_bytes),
    );
    let origins = config.allowed_origins.clone();

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&origins))
            .app_data(state.clone())
            .configure(configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    info!("Server running at http://{}:{}", config.host, config.port);
    server
        .bind((config.host.as_str(), config.port))
        .with_context(|| format!("could not bind {}:{}", config.host, config.port))?
        .run()
        .await?;

    Ok(())
}
