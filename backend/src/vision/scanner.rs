use shared::MedicineInfo;
use std::sync::Arc;

use super::client::ImageAnnotator;
use super::extract::{UNKNOWN_MEDICINE, extract_medicine_name};
use crate::genai::ai_studio_service::AiStudioService;
use crate::genai::fallback;

pub const NOT_DETECTED_NAME: &str = "Medicine Not Clearly Detected";

const TEXT_PREVIEW_CHARS: usize = 100;

/// Record returned whenever the image yields no usable text.
pub fn not_detected() -> MedicineInfo {
    MedicineInfo {
        medicine_name: NOT_DETECTED_NAME.to_string(),
        description: "The medicine package could not be read clearly. Retake the photo in good lighting with the label in focus."
            .to_string(),
        uses: fallback::DEFAULT_USES.to_string(),
        side_effects: fallback::DEFAULT_SIDE_EFFECTS.to_string(),
        dosage: fallback::DEFAULT_DOSAGE.to_string(),
    }
}

/// Non-AI record built straight from the OCR text and labels.
pub fn basic_info(medicine_name: &str, text: &str, labels: &[String]) -> MedicineInfo {
    let preview: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    let mut description = format!(
        "Medicine identified from package text: {}...",
        preview.replace('\n', " ")
    );
    if !labels.is_empty() {
        description.push_str(&format!(" Detected: {}.", labels.join(", ")));
    }

    MedicineInfo {
        medicine_name: medicine_name.to_string(),
        description,
        uses: fallback::DEFAULT_USES.to_string(),
        side_effects: fallback::DEFAULT_SIDE_EFFECTS.to_string(),
        dosage: fallback::DEFAULT_DOSAGE.to_string(),
    }
}

#[derive(Clone)]
pub struct MedicineScanner {
    annotator: Arc<dyn ImageAnnotator>,
    ai_service: AiStudioService,
}

impl MedicineScanner {
    pub fn new(annotator: Arc<dyn ImageAnnotator>, ai_service: AiStudioService) -> Self {
        Self {
            annotator,
            ai_service,
        }
    }

    /// Identifies the medicine in a base64 image. Never fails: vision
    /// errors yield [`not_detected`], enrichment errors yield [`basic_info`].
    pub async fn analyze_medicine(&self, image_base64: &str) -> MedicineInfo {
        let (_, payload) = shared::split_data_url(image_base64);
        let annotations = match self.annotator.annotate(payload).await {
            Ok(annotations) => annotations,
            Err(e) => {
                log::error!("Vision API error: {}", e);
                return not_detected();
            }
        };

        let text = match annotations.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => {
                log::info!("No text detected in image");
                return not_detected();
            }
        };

        let medicine_name = extract_medicine_name(text);
        log::info!("Extracted medicine name candidate: {}", medicine_name);

        if medicine_name == UNKNOWN_MEDICINE {
            return basic_info(&medicine_name, text, &annotations.labels);
        }

        match self.ai_service.try_medicine_info(&medicine_name).await {
            Ok(info) => info,
            Err(e) => {
                log::warn!(
                    "Enrichment failed for '{}', returning basic info: {}",
                    medicine_name,
                    e
                );
                basic_info(&medicine_name, text, &annotations.labels)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::ai_studio_service::tests::CannedModel;
    use crate::vision::client::{VisionAnnotations, VisionError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedAnnotator(Result<VisionAnnotations, u16>);

    #[async_trait]
    impl ImageAnnotator for FixedAnnotator {
        async fn annotate(&self, _image_base64: &str) -> Result<VisionAnnotations, VisionError> {
            match &self.0 {
                Ok(annotations) => Ok(annotations.clone()),
                Err(status) => Err(VisionError::Status {
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    fn annotations(text: Option<&str>, labels: &[&str]) -> Arc<FixedAnnotator> {
        Arc::new(FixedAnnotator(Ok(VisionAnnotations {
            text: text.map(str::to_string),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })))
    }

    const ENRICHED: &str = r#"{"medicineName":"Paracetamol","description":"Pain reliever","uses":"Pain","sideEffects":"Rare","dosage":"500mg"}"#;

    #[actix_web::test]
    async fn missing_text_yields_not_detected() {
        let model = CannedModel::replying(ENRICHED);
        let scanner = MedicineScanner::new(
            annotations(None, &["Box"]),
            AiStudioService::new(model.clone()),
        );
        let info = scanner.analyze_medicine("aGk=").await;
        assert_eq!(info.medicine_name, NOT_DETECTED_NAME);
        assert_eq!(model.calls(), 0);
    }

    #[actix_web::test]
    async fn vision_failure_yields_not_detected() {
        let scanner = MedicineScanner::new(
            Arc::new(FixedAnnotator(Err(403))),
            AiStudioService::new(CannedModel::replying(ENRICHED)),
        );
        assert_eq!(scanner.analyze_medicine("aGk=").await, not_detected());
    }

    #[actix_web::test]
    async fn detected_name_is_enriched() {
        let model = CannedModel::replying(ENRICHED);
        let scanner = MedicineScanner::new(
            annotations(Some("PARACETAMOL 500mg Tablets"), &[]),
            AiStudioService::new(model.clone()),
        );
        let info = scanner.analyze_medicine("aGk=").await;
        assert_eq!(info.medicine_name, "Paracetamol");
        assert!(model.prompts.lock().unwrap()[0].contains("\"PARACETAMOL\""));
    }

    #[actix_web::test]
    async fn enrichment_failure_yields_basic_info() {
        let scanner = MedicineScanner::new(
            annotations(Some("PARACETAMOL 500mg Tablets"), &["Medicine", "Pill"]),
            AiStudioService::new(CannedModel::failing(500)),
        );
        let info = scanner.analyze_medicine("aGk=").await;
        assert_eq!(info.medicine_name, "PARACETAMOL");
        assert!(info.description.contains("PARACETAMOL 500mg Tablets"));
        assert!(info.description.contains("Medicine, Pill"));
    }

    /// Keeps every payload sent to the vision endpoint.
    #[derive(Default)]
    struct RecordingAnnotator {
        payloads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageAnnotator for RecordingAnnotator {
        async fn annotate(&self, image_base64: &str) -> Result<VisionAnnotations, VisionError> {
            self.payloads.lock().unwrap().push(image_base64.to_string());
            Ok(VisionAnnotations::default())
        }
    }

    #[actix_web::test]
    async fn data_url_prefix_never_reaches_vision() {
        let annotator = Arc::new(RecordingAnnotator::default());
        let scanner = MedicineScanner::new(
            annotator.clone(),
            AiStudioService::new(CannedModel::replying(ENRICHED)),
        );
        scanner.analyze_medicine("data:image/jpeg;base64,aGVsbG8=").await;
        scanner.analyze_medicine("aGVsbG8=").await;
        assert_eq!(
            *annotator.payloads.lock().unwrap(),
            vec!["aGVsbG8=".to_string(), "aGVsbG8=".to_string()]
        );
    }

    #[actix_web::test]
    async fn unknown_name_skips_enrichment() {
        let model = CannedModel::replying(ENRICHED);
        let scanner = MedicineScanner::new(
            annotations(Some("10 mg"), &[]),
            AiStudioService::new(model.clone()),
        );
        let info = scanner.analyze_medicine("aGk=").await;
        assert_eq!(info.medicine_name, UNKNOWN_MEDICINE);
        assert_eq!(model.calls(), 0);
    }

    #[actix_web::test]
    async fn identical_responses_give_identical_results() {
        let scanner = MedicineScanner::new(
            annotations(Some("Ibuprofen 200mg"), &["Drug"]),
            AiStudioService::new(CannedModel::replying(ENRICHED)),
        );
        let first = scanner.analyze_medicine("aGk=").await;
        let second = scanner.analyze_medicine("aGk=").await;
        assert_eq!(first, second);
    }
}
