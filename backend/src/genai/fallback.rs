//! Canned responses used whenever a vendor call or its parsing fails.

use shared::{DiagnosisRequest, DiagnosisResponse, Disease, MedicineInfo};

pub const DEFAULT_DESCRIPTION: &str =
    "No detailed description is available. Please consult a healthcare provider or pharmacist.";
pub const DEFAULT_USES: &str = "Consult a healthcare provider for proper usage information.";
pub const DEFAULT_SIDE_EFFECTS: &str =
    "Please refer to the package insert or consult a healthcare provider for complete side effects information.";
pub const DEFAULT_DOSAGE: &str =
    "Follow the dosage instructions on the package or as prescribed by a healthcare provider.";

pub const UNKNOWN_CONDITION: &str = "Unknown Condition";
pub const NO_DESCRIPTION: &str = "No description available";
pub const DEFAULT_RECOMMENDATIONS: &str =
    "Please consult a healthcare provider for proper diagnosis.";

pub fn medicine_info(medicine_name: &str) -> MedicineInfo {
    MedicineInfo {
        medicine_name: medicine_name.to_string(),
        description: DEFAULT_DESCRIPTION.to_string(),
        uses: DEFAULT_USES.to_string(),
        side_effects: DEFAULT_SIDE_EFFECTS.to_string(),
        dosage: DEFAULT_DOSAGE.to_string(),
    }
}

pub fn diagnosis(request: &DiagnosisRequest) -> DiagnosisResponse {
    DiagnosisResponse {
        possible_diseases: vec![
            Disease {
                name: "General Health Assessment Needed".to_string(),
                probability: 50,
                description: "Your symptoms need a professional evaluation to determine the cause."
                    .to_string(),
            },
            Disease {
                name: "Possible Viral Infection".to_string(),
                probability: 30,
                description: "Many common symptoms are caused by viral infections that resolve with rest and fluids."
                    .to_string(),
            },
            Disease {
                name: "Stress-Related Symptoms".to_string(),
                probability: 20,
                description: "Stress, poor sleep and diet changes can produce physical symptoms."
                    .to_string(),
            },
        ],
        recommendations: format!(
            "We could not complete a detailed analysis. Based on your reported symptoms ({}), recent diet ({}) and location ({}), please consult a healthcare provider for a proper medical evaluation. Seek urgent care if your symptoms are severe or worsening.",
            request.symptoms, request.diet, request.location
        ),
    }
}
