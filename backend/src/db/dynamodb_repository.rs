use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use chrono::{DateTime, Utc};
use shared::{DiagnosisResult, Disease, ProfileUpdate, ScanResult, UserProfile};
use std::collections::HashMap;
use uuid::Uuid;

use super::models::User;

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    users_table: String,
    profiles_table: String,
    scans_table: String,
    diagnoses_table: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Item already exists")]
    AlreadyExists,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl DynamoDbRepository {
    pub fn new(
        client: Client,
        users_table: String,
        profiles_table: String,
        scans_table: String,
        diagnoses_table: String,
    ) -> Self {
        Self {
            client,
            users_table,
            profiles_table,
            scans_table,
            diagnoses_table,
        }
    }

    // User operations
    pub async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        log::info!(
            "Creating user in DynamoDB table '{}': {}",
            self.users_table,
            user.email
        );

        match self
            .client
            .put_item()
            .table_name(&self.users_table)
            .set_item(Some(user_to_item(user)))
            .send()
            .await
        {
            Ok(_) => {
                log::info!("✅ Successfully created user in DynamoDB: {}", user.email);
                Ok(())
            }
            Err(e) => {
                log::error!("DynamoDB put_item failed for user {}: {:?}", user.email, e);
                Err(RepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.users_table)
            .key("id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => Ok(Some(parse_user_from_item(&item)?)),
            None => Ok(None),
        }
    }

    pub async fn get_user_by_cognito_sub(
        &self,
        cognito_sub: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let items = self
            .scan_by_attribute(&self.users_table, "cognito_sub", cognito_sub)
            .await?;

        match items.first() {
            Some(item) => Ok(Some(parse_user_from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Users are rewritten whole; the row is small and has a single writer.
    pub async fn update_user(&self, user: &User) -> Result<(), RepositoryError> {
        log::info!("Updating user in DynamoDB: {}", user.email);

        self.client
            .put_item()
            .table_name(&self.users_table)
            .set_item(Some(user_to_item(user)))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB put_item failed for user {}: {:?}", user.email, e);
                let error_msg = if let Some(service_err) = e.as_service_error() {
                    format!("Service error: {:?}", service_err)
                } else {
                    format!("SDK error: {}", e)
                };
                RepositoryError::DynamoDb(error_msg)
            })?;

        Ok(())
    }

    // Profile operations
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.profiles_table)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => Ok(Some(parse_profile_from_item(&item)?)),
            None => Ok(None),
        }
    }

    pub async fn create_profile(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.profiles_table)
            .set_item(Some(profile_to_item(profile)))
            .condition_expression("attribute_not_exists(user_id)")
            .send()
            .await
            .map_err(|e| {
                let exists = e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception());
                if exists {
                    RepositoryError::AlreadyExists
                } else {
                    RepositoryError::DynamoDb(e.to_string())
                }
            })?;

        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        let mut expression = UpdateExpression::default();

        if let Some(full_name) = &update.full_name {
            expression.set("full_name", AttributeValue::S(full_name.clone()));
        }
        if let Some(phone) = &update.phone {
            expression.set("phone", AttributeValue::S(phone.clone()));
        }
        if let Some(date_of_birth) = &update.date_of_birth {
            expression.set("date_of_birth", optional_string(Some(date_of_birth)));
        }
        if let Some(gender) = &update.gender {
            expression.set("gender", AttributeValue::S(gender.clone()));
        }
        if let Some(conditions) = &update.medical_conditions {
            expression.set("medical_conditions", string_list(conditions));
        }
        if let Some(allergies) = &update.allergies {
            expression.set("allergies", string_list(allergies));
        }
        if let Some(name) = &update.emergency_contact_name {
            expression.set("emergency_contact_name", AttributeValue::S(name.clone()));
        }
        if let Some(phone) = &update.emergency_contact_phone {
            expression.set("emergency_contact_phone", AttributeValue::S(phone.clone()));
        }
        expression.set("updated_at", AttributeValue::S(Utc::now().to_rfc3339()));

        log::debug!("Update expression: {}", expression.render());

        let result = self
            .client
            .update_item()
            .table_name(&self.profiles_table)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression(expression.render())
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(Some(expression.values))
            .condition_expression("attribute_exists(user_id)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB update_item failed for profile {}: {:?}", user_id, e);
                RepositoryError::DynamoDb(e.to_string())
            })?;

        let attributes = result.attributes.ok_or(RepositoryError::NotFound)?;
        parse_profile_from_item(&attributes)
    }

    // Result operations
    pub async fn create_scan_result(&self, scan: &ScanResult) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.scans_table)
            .set_item(Some(scan_to_item(scan)))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    pub async fn create_diagnosis_result(
        &self,
        diagnosis: &DiagnosisResult,
    ) -> Result<(), RepositoryError> {
        let item = diagnosis_to_item(diagnosis)?;

        self.client
            .put_item()
            .table_name(&self.diagnoses_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    /// Newest first, at most `limit` rows.
    pub async fn get_user_scan_results(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScanResult>, RepositoryError> {
        let items = self
            .scan_by_attribute(&self.scans_table, "user_id", &user_id.to_string())
            .await?;

        let mut scans = items
            .iter()
            .map(parse_scan_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        scans.truncate(limit);
        Ok(scans)
    }

    /// Newest first, at most `limit` rows.
    pub async fn get_user_diagnosis_results(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DiagnosisResult>, RepositoryError> {
        let items = self
            .scan_by_attribute(&self.diagnoses_table, "user_id", &user_id.to_string())
            .await?;

        let mut diagnoses = items
            .iter()
            .map(parse_diagnosis_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        diagnoses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        diagnoses.truncate(limit);
        Ok(diagnoses)
    }

    async fn scan_by_attribute(
        &self,
        table: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<Item>, RepositoryError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(table)
                .filter_expression("#attr = :value")
                .expression_attribute_names("#attr", attribute)
                .expression_attribute_values(":value", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

            if let Some(page) = result.items {
                items.extend(page);
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// `SET` clauses with every attribute name aliased, so reserved words
/// never need special casing.
#[derive(Default)]
struct UpdateExpression {
    parts: Vec<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    fn set(&mut self, attribute: &str, value: AttributeValue) {
        self.parts.push(format!("#{0} = :{0}", attribute));
        self.names.insert(format!("#{}", attribute), attribute.to_string());
        self.values.insert(format!(":{}", attribute), value);
    }

    fn render(&self) -> String {
        format!("SET {}", self.parts.join(", "))
    }
}

fn optional_string(value: Option<&String>) -> AttributeValue {
    match value {
        Some(s) if !s.is_empty() => AttributeValue::S(s.clone()),
        _ => AttributeValue::Null(true),
    }
}

fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
}

// Item builders
fn user_to_item(user: &User) -> Item {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(user.id.to_string()));

    // Cognito fields
    item.insert(
        "cognito_sub".to_string(),
        AttributeValue::S(user.cognito_sub.clone()),
    );
    if let Some(cognito_access_token) = &user.cognito_access_token {
        item.insert(
            "cognito_access_token".to_string(),
            AttributeValue::S(cognito_access_token.clone()),
        );
    }
    if let Some(cognito_refresh_token) = &user.cognito_refresh_token {
        item.insert(
            "cognito_refresh_token".to_string(),
            AttributeValue::S(cognito_refresh_token.clone()),
        );
    }

    // Common fields
    item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(user.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(user.updated_at.to_rfc3339()),
    );
    if let Some(last_login) = &user.last_login {
        item.insert(
            "last_login".to_string(),
            AttributeValue::S(last_login.to_rfc3339()),
        );
    }
    if let Some(revoked_at) = &user.sessions_revoked_at {
        item.insert(
            "sessions_revoked_at".to_string(),
            AttributeValue::S(revoked_at.to_rfc3339()),
        );
    }
    item.insert("is_active".to_string(), AttributeValue::Bool(user.is_active));
    item
}

fn profile_to_item(profile: &UserProfile) -> Item {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(profile.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(profile.user_id.to_string()),
    );
    item.insert(
        "full_name".to_string(),
        AttributeValue::S(profile.full_name.clone()),
    );
    item.insert("phone".to_string(), AttributeValue::S(profile.phone.clone()));
    item.insert(
        "date_of_birth".to_string(),
        optional_string(profile.date_of_birth.as_ref()),
    );
    item.insert("gender".to_string(), AttributeValue::S(profile.gender.clone()));
    item.insert(
        "medical_conditions".to_string(),
        string_list(&profile.medical_conditions),
    );
    item.insert("allergies".to_string(), string_list(&profile.allergies));
    item.insert(
        "emergency_contact_name".to_string(),
        AttributeValue::S(profile.emergency_contact_name.clone()),
    );
    item.insert(
        "emergency_contact_phone".to_string(),
        AttributeValue::S(profile.emergency_contact_phone.clone()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(profile.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(profile.updated_at.to_rfc3339()),
    );
    item
}

fn scan_to_item(scan: &ScanResult) -> Item {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(scan.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(scan.user_id.to_string()),
    );
    item.insert(
        "image_url".to_string(),
        AttributeValue::S(scan.image_url.clone()),
    );
    item.insert(
        "medicine_name".to_string(),
        AttributeValue::S(scan.medicine_name.clone()),
    );
    item.insert(
        "description".to_string(),
        AttributeValue::S(scan.description.clone()),
    );
    item.insert("uses".to_string(), AttributeValue::S(scan.uses.clone()));
    item.insert(
        "side_effects".to_string(),
        AttributeValue::S(scan.side_effects.clone()),
    );
    item.insert("dosage".to_string(), AttributeValue::S(scan.dosage.clone()));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(scan.created_at.to_rfc3339()),
    );
    item
}

fn diagnosis_to_item(diagnosis: &DiagnosisResult) -> Result<Item, RepositoryError> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(diagnosis.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(diagnosis.user_id.to_string()),
    );
    item.insert(
        "symptoms".to_string(),
        AttributeValue::S(diagnosis.symptoms.clone()),
    );
    item.insert("diet".to_string(), AttributeValue::S(diagnosis.diet.clone()));
    item.insert(
        "location".to_string(),
        AttributeValue::S(diagnosis.location.clone()),
    );
    item.insert(
        "possible_diseases".to_string(),
        AttributeValue::S(serde_json::to_string(&diagnosis.possible_diseases)?),
    );
    item.insert(
        "recommendations".to_string(),
        AttributeValue::S(diagnosis.recommendations.clone()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(diagnosis.created_at.to_rfc3339()),
    );
    Ok(item)
}

// Helper methods for parsing DynamoDB items
fn required_s(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", key)))
}

fn optional_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

fn required_uuid(item: &Item, key: &str) -> Result<Uuid, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", key)))
}

fn optional_datetime(item: &Item, key: &str) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn required_datetime(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    optional_datetime(item, key)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", key)))
}

fn string_list_attr(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_l().ok())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_s().ok())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

fn parse_user_from_item(item: &Item) -> Result<User, RepositoryError> {
    let created_at = required_datetime(item, "created_at")?;

    Ok(User {
        id: required_uuid(item, "id")?,
        cognito_sub: required_s(item, "cognito_sub")?,
        cognito_access_token: optional_s(item, "cognito_access_token"),
        cognito_refresh_token: optional_s(item, "cognito_refresh_token"),
        email: required_s(item, "email")?,
        created_at,
        updated_at: optional_datetime(item, "updated_at").unwrap_or(created_at),
        last_login: optional_datetime(item, "last_login"),
        sessions_revoked_at: optional_datetime(item, "sessions_revoked_at"),
        is_active: *item
            .get("is_active")
            .and_then(|v| v.as_bool().ok())
            .unwrap_or(&true),
    })
}

fn parse_profile_from_item(item: &Item) -> Result<UserProfile, RepositoryError> {
    let created_at = required_datetime(item, "created_at")?;

    Ok(UserProfile {
        id: required_uuid(item, "id")?,
        user_id: required_uuid(item, "user_id")?,
        full_name: optional_s(item, "full_name").unwrap_or_default(),
        phone: optional_s(item, "phone").unwrap_or_default(),
        date_of_birth: optional_s(item, "date_of_birth"),
        gender: optional_s(item, "gender").unwrap_or_default(),
        medical_conditions: string_list_attr(item, "medical_conditions"),
        allergies: string_list_attr(item, "allergies"),
        emergency_contact_name: optional_s(item, "emergency_contact_name").unwrap_or_default(),
        emergency_contact_phone: optional_s(item, "emergency_contact_phone").unwrap_or_default(),
        created_at,
        updated_at: optional_datetime(item, "updated_at").unwrap_or(created_at),
    })
}

fn parse_scan_from_item(item: &Item) -> Result<ScanResult, RepositoryError> {
    Ok(ScanResult {
        id: required_uuid(item, "id")?,
        user_id: required_uuid(item, "user_id")?,
        image_url: optional_s(item, "image_url").unwrap_or_default(),
        medicine_name: required_s(item, "medicine_name")?,
        description: optional_s(item, "description").unwrap_or_default(),
        uses: optional_s(item, "uses").unwrap_or_default(),
        side_effects: optional_s(item, "side_effects").unwrap_or_default(),
        dosage: optional_s(item, "dosage").unwrap_or_default(),
        created_at: required_datetime(item, "created_at")?,
    })
}

fn parse_diagnosis_from_item(item: &Item) -> Result<DiagnosisResult, RepositoryError> {
    let possible_diseases: Vec<Disease> = match optional_s(item, "possible_diseases") {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };

    Ok(DiagnosisResult {
        id: required_uuid(item, "id")?,
        user_id: required_uuid(item, "user_id")?,
        symptoms: optional_s(item, "symptoms").unwrap_or_default(),
        diet: optional_s(item, "diet").unwrap_or_default(),
        location: optional_s(item, "location").unwrap_or_default(),
        possible_diseases,
        recommendations: optional_s(item, "recommendations").unwrap_or_default(),
        created_at: required_datetime(item, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{DiagnosisRequest, DiagnosisResponse};

    #[test]
    fn update_expression_aliases_every_attribute() {
        let mut expression = UpdateExpression::default();
        expression.set("phone", AttributeValue::S("555".into()));
        expression.set("updated_at", AttributeValue::S("now".into()));

        assert_eq!(expression.render(), "SET #phone = :phone, #updated_at = :updated_at");
        assert_eq!(expression.names["#phone"], "phone");
        assert_eq!(expression.values[":phone"], AttributeValue::S("555".into()));
    }

    #[test]
    fn empty_profile_stores_null_birth_date_and_empty_lists() {
        let profile = UserProfile::empty(Uuid::new_v4());
        let item = profile_to_item(&profile);
        assert_eq!(item["date_of_birth"], AttributeValue::Null(true));
        assert_eq!(item["allergies"], AttributeValue::L(vec![]));

        let parsed = parse_profile_from_item(&item).unwrap();
        assert_eq!(parsed.date_of_birth, None);
        assert!(parsed.medical_conditions.is_empty());
        assert_eq!(parsed.user_id, profile.user_id);
    }

    #[test]
    fn diagnosis_diseases_are_stored_as_json() {
        let diagnosis = DiagnosisResult::new(
            Uuid::new_v4(),
            DiagnosisRequest {
                symptoms: "fever".into(),
                diet: "rice".into(),
                location: "Lagos".into(),
            },
            DiagnosisResponse {
                possible_diseases: vec![Disease {
                    name: "Malaria".into(),
                    probability: 80,
                    description: "Parasitic".into(),
                }],
                recommendations: "Test".into(),
            },
        );
        let item = diagnosis_to_item(&diagnosis).unwrap();
        assert!(item["possible_diseases"].as_s().unwrap().contains("Malaria"));

        let parsed = parse_diagnosis_from_item(&item).unwrap();
        assert_eq!(parsed.possible_diseases, diagnosis.possible_diseases);
        assert_eq!(parsed.location, "Lagos");
    }

    #[test]
    fn scan_without_medicine_name_is_invalid() {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(Uuid::new_v4().to_string()));
        item.insert("user_id".to_string(), AttributeValue::S(Uuid::new_v4().to_string()));
        item.insert("created_at".to_string(), AttributeValue::S(Utc::now().to_rfc3339()));

        assert!(matches!(
            parse_scan_from_item(&item),
            Err(RepositoryError::InvalidData(_))
        ));
    }

    #[test]
    fn user_defaults_to_active_without_tokens() {
        let user = User::new("sub-123".into(), "a@example.com".into());
        let mut item = user_to_item(&user);
        item.remove("is_active");

        let parsed = parse_user_from_item(&item).unwrap();
        assert!(parsed.is_active);
        assert_eq!(parsed.cognito_access_token, None);
        assert_eq!(parsed.cognito_sub, "sub-123");
    }

    #[test]
    fn revoked_sessions_survive_storage() {
        let mut user = User::new("sub-123".into(), "a@example.com".into());
        assert!(!user_to_item(&user).contains_key("sessions_revoked_at"));

        user.clear_tokens();
        let parsed = parse_user_from_item(&user_to_item(&user)).unwrap();
        assert_eq!(
            parsed.sessions_revoked_at.map(|t| t.timestamp()),
            user.sessions_revoked_at.map(|t| t.timestamp())
        );
    }
}
