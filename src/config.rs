use std::path::PathBuf;

use actix_web::http::Uri;
use anyhow::{ensure, Context};
use clap::{ArgAction, Parser};

use crate::preprocess::TensorLayout;
use crate::state::DEFAULT_MAX_UPLOAD_BYTES;

/// Potato leaf disease classifier over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "blight-server", version, about)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// ONNX model loaded at startup
    #[arg(short, long, default_value = "./saved_models/1/model.onnx")]
    pub model_path: PathBuf,

    /// Axis order of the model input
    #[arg(long, value_enum, default_value_t = TensorLayout::Nhwc)]
    pub layout: TensorLayout,

    /// Largest accepted upload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Origin allowed to call the API cross-site (repeatable)
    #[arg(
        long = "allowed-origin",
        action = ArgAction::Append,
        default_values = ["http://localhost", "http://localhost:3000"]
    )]
    pub allowed_origins: Vec<String>,

    /// Worker threads; defaults to the number of physical cores
    #[arg(long)]
    pub workers: Option<usize>,
}

impl ServerConfig {
    /// Fails on origins the CORS layer would refuse while building the app.
    pub fn validate(&self) -> anyhow::Result<()> {
        for origin in &self.allowed_origins {
            check_origin(origin)?;
        }
        Ok(())
    }
}

fn check_origin(origin: &str) -> anyhow::Result<()> {
    ensure!(
        origin != "*",
        "wildcard origin `*` cannot be combined with credentials, list origins explicitly"
    );

    let uri: Uri = origin
        .parse()
        .with_context(|| format!("`{origin}` is not a valid origin"))?;
    ensure!(
        matches!(uri.scheme_str(), Some("http") | Some("https")),
        "origin `{origin}` must start with http:// or https://"
    );
    ensure!(
        uri.authority().is_some(),
        "origin `{origin}` has no host"
    );
    ensure!(
        matches!(uri.path_and_query().map(|p| p.as_str()), None | Some("") | Some("/"))
            && !origin.ends_with('/'),
        "origin `{origin}` must not carry a path"
    );
    Ok(())
}
