use serde::{Serialize, Serializer};

/// Body returned when the upload cannot be decoded as an image.
pub const DECODE_FAILURE_MESSAGE: &str =
    "Could not process the image. Ensure it is a valid image format.";

/// Class names in model output-index order.
pub const LABELS: [&str; 3] = ["Early Blight", "Late Blight", "Healthy"];

/// Leaf conditions the model was trained on, in output-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiseaseClass {
    EarlyBlight = 0,
    LateBlight = 1,
    Healthy = 2,
}

impl DiseaseClass {
    pub const ALL: [DiseaseClass; 3] = [
        DiseaseClass::EarlyBlight,
        DiseaseClass::LateBlight,
        DiseaseClass::Healthy,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        LABELS[self as usize]
    }
}

impl Serialize for DiseaseClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "class")]
    pub class_label: DiseaseClass,
    pub confidence: f32,
}

/// `{"error": ...}`, the only error shape the API sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// What `/predict` answers with. Both variants share a status code, so the
/// JSON carries no tag: callers look for the `error` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Prediction(PredictionResult),
    Failure(ErrorBody),
}

impl PredictionOutcome {
    pub fn decode_failure() -> Self {
        PredictionOutcome::Failure(ErrorBody::new(DECODE_FAILURE_MESSAGE))
    }
}

impl From<PredictionResult> for PredictionOutcome {
    fn from(result: PredictionResult) -> Self {
        PredictionOutcome::Prediction(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classes_follow_model_output_order() {
        assert_eq!(DiseaseClass::from_index(0), Some(DiseaseClass::EarlyBlight));
        assert_eq!(DiseaseClass::from_index(1), Some(DiseaseClass::LateBlight));
        assert_eq!(DiseaseClass::from_index(2), Some(DiseaseClass::Healthy));
        assert_eq!(DiseaseClass::from_index(3), None);
    }

    #[test]
    fn labels_match_serialized_names() {
        for (index, class) in DiseaseClass::ALL.into_iter().enumerate() {
            assert_eq!(class.label(), LABELS[index]);
            assert_eq!(serde_json::to_value(class).unwrap(), json!(LABELS[index]));
        }
        assert_eq!(
            serde_json::to_value(DiseaseClass::EarlyBlight).unwrap(),
            json!("Early Blight")
        );
    }

    #[test]
    fn prediction_serializes_without_tag() {
        let outcome = PredictionOutcome::from(PredictionResult {
            class_label: DiseaseClass::LateBlight,
            confidence: 0.5,
        });

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "class": "Late Blight", "confidence": 0.5 })
        );
    }

    #[test]
    fn error_body_and_decode_failure_share_a_shape() {
        assert_eq!(
            serde_json::to_value(ErrorBody::new("boom")).unwrap(),
            json!({ "error": "boom" })
        );
        assert_eq!(
            PredictionOutcome::decode_failure(),
            PredictionOutcome::Failure(ErrorBody::new(DECODE_FAILURE_MESSAGE))
        );
    }

    #[test]
    fn decode_failure_has_only_error_key() {
        assert_eq!(
            serde_json::to_value(PredictionOutcome::decode_failure()).unwrap(),
            json!({ "error": "Could not process the image. Ensure it is a valid image format." })
        );
    }
}
