use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanRequest {
    /// Base64 image content, without a `data:` URL prefix.
    pub image_data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Splits `data:<mime>;base64,<payload>` into its mime type and payload.
/// Plain base64 comes back trimmed, without a mime type.
pub fn split_data_url(image: &str) -> (Option<&str>, &str) {
    let image = image.trim();
    match image
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, payload)) => (Some(mime).filter(|m| !m.is_empty()), payload.trim()),
        None => (None, image),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineInfo {
    pub medicine_name: String,
    pub description: String,
    pub uses: String,
    pub side_effects: String,
    pub dosage: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Disease {
    pub name: String,
    /// Likelihood in percent, always within 0..=100.
    pub probability: u8,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagnosisRequest {
    pub symptoms: String,
    pub diet: String,
    pub location: String,
}

impl DiagnosisRequest {
    pub fn trimmed(&self) -> Self {
        Self {
            symptoms: self.symptoms.trim().to_string(),
            diet: self.diet.trim().to_string(),
            location: self.location.trim().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResponse {
    pub possible_diseases: Vec<Disease>,
    pub recommendations: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScanResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    pub medicine_name: String,
    pub description: String,
    pub uses: String,
    pub side_effects: String,
    pub dosage: String,
    pub created_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(user_id: Uuid, image_url: String, info: MedicineInfo) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            image_url,
            medicine_name: info.medicine_name,
            description: info.description,
            uses: info.uses,
            side_effects: info.side_effects,
            dosage: info.dosage,
            created_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagnosisResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symptoms: String,
    pub diet: String,
    pub location: String,
    pub possible_diseases: Vec<Disease>,
    pub recommendations: String,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisResult {
    pub fn new(user_id: Uuid, request: DiagnosisRequest, response: DiagnosisResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symptoms: request.symptoms,
            diet: request.diet,
            location: request.location,
            possible_diseases: response.possible_diseases,
            recommendations: response.recommendations,
            created_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: Option<String>,
    pub gender: String,
    pub medical_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// The empty profile created on first access.
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            full_name: String::new(),
            phone: String::new(),
            date_of_birth: None,
            gender: String::new(),
            medical_conditions: Vec::new(),
            allergies: Vec::new(),
            emergency_contact_name: String::new(),
            emergency_contact_phone: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub medical_conditions: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityItem {
    Scan(ScanResult),
    Diagnosis(DiagnosisResult),
}

impl ActivityItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ActivityItem::Scan(scan) => scan.created_at,
            ActivityItem::Diagnosis(diagnosis) => diagnosis.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EmailUpdate {
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_split_off() {
        assert_eq!(
            split_data_url("data:image/png;base64,aGVsbG8="),
            (Some("image/png"), "aGVsbG8=")
        );
        assert_eq!(split_data_url(" aGVsbG8=\n"), (None, "aGVsbG8="));
        assert_eq!(split_data_url("data:;base64,aGk="), (None, "aGk="));
    }

    #[test]
    fn medicine_info_uses_camel_case_keys() {
        let info = MedicineInfo {
            medicine_name: "Ibuprofen".into(),
            description: "d".into(),
            uses: "u".into(),
            side_effects: "s".into(),
            dosage: "x".into(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["medicineName"], "Ibuprofen");
        assert_eq!(value["sideEffects"], "s");
    }

    #[test]
    fn activity_items_are_tagged_by_type() {
        let scan = ScanResult::new(
            Uuid::new_v4(),
            String::new(),
            MedicineInfo {
                medicine_name: "A".into(),
                description: String::new(),
                uses: String::new(),
                side_effects: String::new(),
                dosage: String::new(),
            },
        );
        let value = serde_json::to_value(ActivityItem::Scan(scan)).unwrap();
        assert_eq!(value["type"], "scan");
        assert_eq!(value["medicine_name"], "A");
    }

    #[test]
    fn default_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("555".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn diagnosis_request_trims_every_field() {
        let request = DiagnosisRequest {
            symptoms: "  cough ".into(),
            diet: "\trice\n".into(),
            location: " Lagos".into(),
        };
        let trimmed = request.trimmed();
        assert_eq!(trimmed.symptoms, "cough");
        assert_eq!(trimmed.diet, "rice");
        assert_eq!(trimmed.location, "Lagos");
    }
}
