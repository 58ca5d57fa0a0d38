use crate::service::PredictionService;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared by all workers through `web::Data`; never mutated after startup.
pub struct AppState {
    pub service: PredictionService,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
