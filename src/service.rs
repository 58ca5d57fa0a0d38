use thiserror::Error;

use crate::classifier::{Classifier, ModelError};
use crate::models::{DiseaseClass, PredictionResult};
use crate::preprocess::{self, DecodeError, TensorLayout};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Decode, classify, pick the top class. Built once at startup and shared
/// read-only by every request.
pub struct PredictionService {
    classifier: Box<dyn Classifier>,
    layout: TensorLayout,
}

impl PredictionService {
    pub fn new<C>(classifier: C, layout: TensorLayout) -> Self
    where
        C: Classifier + 'static,
    {
        Self {
            classifier: Box::new(classifier),
            layout,
        }
    }

    /// Blocking: runs the full forward pass on the calling thread.
    pub fn predict(&self, bytes: &[u8]) -> Result<PredictionResult, PredictError> {
        let batch = preprocess::preprocess(bytes, self.layout)?;
        let probabilities = self.classifier.classify(batch)?;

        if probabilities.len() != DiseaseClass::ALL.len() {
            return Err(ModelError::OutputShape {
                expected: DiseaseClass::ALL.len(),
                actual: probabilities.len(),
            }
            .into());
        }

        let (index, confidence) = arg_max(&probabilities)
            .ok_or_else(|| ModelError::Inference("model returned only NaN scores".to_string()))?;
        let class_label = DiseaseClass::from_index(index).ok_or(ModelError::OutputShape {
            expected: DiseaseClass::ALL.len(),
            actual: probabilities.len(),
        })?;

        Ok(PredictionResult {
            class_label,
            confidence,
        })
    }
}

/// Index and value of the largest score. The first of several equal maxima
/// wins; NaN never does.
pub fn arg_max(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (index, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((index, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use ndarray::Array4;
    use std::io::Cursor;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn classify(&self, batch: Array4<f32>) -> Result<Vec<f32>, ModelError> {
            assert_eq!(batch.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn classify(&self, _batch: Array4<f32>) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::Inference("out of memory".to_string()))
        }
    }

    fn green_png() -> Vec<u8> {
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 255, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn arg_max_picks_largest() {
        assert_eq!(arg_max(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn arg_max_prefers_first_on_tie() {
        assert_eq!(arg_max(&[0.4, 0.4, 0.2]), Some((0, 0.4)));
    }

    #[test]
    fn arg_max_skips_nan() {
        assert_eq!(arg_max(&[f32::NAN, 0.3, 0.1]), Some((1, 0.3)));
        assert_eq!(arg_max(&[f32::NAN]), None);
        assert_eq!(arg_max(&[]), None);
    }

    #[test]
    fn top_class_and_its_probability_are_returned() {
        let service = PredictionService::new(Fixed(vec![0.05, 0.15, 0.8]), TensorLayout::Nhwc);

        let result = service.predict(&green_png()).unwrap();

        assert_eq!(result.class_label, DiseaseClass::Healthy);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn decode_failure_is_propagated() {
        let service = PredictionService::new(Fixed(vec![1.0, 0.0, 0.0]), TensorLayout::Nhwc);

        assert!(matches!(
            service.predict(b""),
            Err(PredictError::Decode(DecodeError::Empty))
        ));
        assert!(matches!(
            service.predict(b"plain text"),
            Err(PredictError::Decode(_))
        ));
    }

    #[test]
    fn wrong_output_length_is_an_error() {
        let service = PredictionService::new(Fixed(vec![0.5, 0.5]), TensorLayout::Nhwc);

        assert!(matches!(
            service.predict(&green_png()),
            Err(PredictError::Model(ModelError::OutputShape {
                expected: 3,
                actual: 2
            }))
        ));
    }

    #[test]
    fn one_service_serves_concurrent_callers() {
        let service = std::sync::Arc::new(PredictionService::new(
            Fixed(vec![0.25, 0.5, 0.25]),
            TensorLayout::Nhwc,
        ));
        let png = green_png();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| service.predict(&png).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap().class_label, DiseaseClass::LateBlight);
            }
        });
    }

    #[test]
    fn classifier_errors_are_propagated() {
        let service = PredictionService::new(Broken, TensorLayout::Nhwc);

        assert!(matches!(
            service.predict(&green_png()),
            Err(PredictError::Model(ModelError::Inference(_)))
        ));
    }
}
