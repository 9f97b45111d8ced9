use shared::{DiagnosisRequest, DiagnosisResponse, MedicineInfo};
use std::sync::Arc;

use super::client::{GenAiError, LanguageModel};
use super::{fallback, parser, prompt};

/// Medicine information and diagnosis requests against a language model.
/// The public operations never fail: every error is logged and replaced
/// with the canned fallback.
#[derive(Clone)]
pub struct AiStudioService {
    model: Arc<dyn LanguageModel>,
}

impl AiStudioService {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn try_medicine_info(&self, medicine_name: &str) -> Result<MedicineInfo, GenAiError> {
        let text = self
            .model
            .generate(&prompt::medicine_info_prompt(medicine_name))
            .await?;
        parser::parse_medicine_info(&text, medicine_name)
    }

    pub async fn medicine_info(&self, medicine_name: &str) -> MedicineInfo {
        match self.try_medicine_info(medicine_name).await {
            Ok(info) => info,
            Err(e) => {
                log::error!("Medicine info request failed for '{}': {}", medicine_name, e);
                fallback::medicine_info(medicine_name)
            }
        }
    }

    pub async fn diagnose(&self, request: &DiagnosisRequest) -> DiagnosisResponse {
        if request.symptoms.trim().is_empty() {
            log::warn!("Diagnosis requested without symptoms, returning fallback");
            return fallback::diagnosis(request);
        }

        let result = match self.model.generate(&prompt::diagnosis_prompt(request)).await {
            Ok(text) => parser::parse_diagnosis(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                log::info!(
                    "Diagnosis produced {} candidate conditions",
                    response.possible_diseases.len()
                );
                response
            }
            Err(e) => {
                log::error!("Diagnosis request failed: {}", e);
                fallback::diagnosis(request)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays one canned result and records every prompt it receives.
    pub(crate) struct CannedModel {
        response: Result<String, u16>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedModel {
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                response: Err(status),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(&self, prompt: &str) -> Result<String, GenAiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(GenAiError::Status {
                    status: *status,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn request(symptoms: &str) -> DiagnosisRequest {
        DiagnosisRequest {
            symptoms: symptoms.into(),
            diet: "rice and beans".into(),
            location: "Kampala".into(),
        }
    }

    #[actix_web::test]
    async fn medicine_info_falls_back_on_http_error() {
        let service = AiStudioService::new(CannedModel::failing(503));
        let info = service.medicine_info("Ibuprofen").await;
        assert_eq!(info, fallback::medicine_info("Ibuprofen"));
    }

    #[actix_web::test]
    async fn medicine_info_falls_back_on_prose_reply() {
        let service = AiStudioService::new(CannedModel::replying("I am not sure."));
        let info = service.medicine_info("Ibuprofen").await;
        assert_eq!(info.medicine_name, "Ibuprofen");
        assert_eq!(info.dosage, fallback::DEFAULT_DOSAGE);
    }

    #[actix_web::test]
    async fn try_medicine_info_surfaces_errors() {
        let service = AiStudioService::new(CannedModel::failing(500));
        assert!(service.try_medicine_info("Ibuprofen").await.is_err());
    }

    #[actix_web::test]
    async fn diagnosis_parses_model_output() {
        let model = CannedModel::replying(
            r#"{"diseases":[{"name":"Typhoid","probability":70,"description":"Bacterial"}],"recommendations":"See a doctor"}"#,
        );
        let service = AiStudioService::new(model.clone());
        let response = service.diagnose(&request("fever")).await;
        assert_eq!(response.possible_diseases[0].name, "Typhoid");
        assert_eq!(response.recommendations, "See a doctor");
        assert!(model.prompts.lock().unwrap()[0].contains("Symptoms: fever"));
    }

    #[actix_web::test]
    async fn empty_symptoms_return_fallback_without_calling_model() {
        let model = CannedModel::replying("{}");
        let service = AiStudioService::new(model.clone());
        let response = service.diagnose(&request("   ")).await;
        assert_eq!(response.possible_diseases.len(), 3);
        assert_eq!(model.calls(), 0);
    }

    #[actix_web::test]
    async fn diagnosis_falls_back_on_error() {
        let service = AiStudioService::new(CannedModel::failing(429));
        let response = service.diagnose(&request("cough")).await;
        assert_eq!(response, fallback::diagnosis(&request("cough")));
    }
}
