use serde_json::{Map, Value};
use shared::{DiagnosisResponse, Disease, MedicineInfo};

use super::client::GenAiError;
use super::fallback;

/// The substring from the first `{` to the last `}`, if both exist in order.
pub fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn parse_json_object(text: &str) -> Result<Map<String, Value>, GenAiError> {
    let span = json_span(text)
        .ok_or_else(|| GenAiError::Unparseable("No JSON object in generated text".to_string()))?;

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(GenAiError::Unparseable("Generated JSON is not an object".to_string())),
        Err(e) => Err(GenAiError::Unparseable(e.to_string())),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_medicine_info(text: &str, queried_name: &str) -> Result<MedicineInfo, GenAiError> {
    let object = parse_json_object(text)?;

    let field = |key: &str, default: &str| {
        string_field(&object, key).unwrap_or_else(|| {
            log::debug!("Generated medicine info lacks '{}', using default", key);
            default.to_string()
        })
    };

    Ok(MedicineInfo {
        medicine_name: field("medicineName", queried_name),
        description: field("description", fallback::DEFAULT_DESCRIPTION),
        uses: field("uses", fallback::DEFAULT_USES),
        side_effects: field("sideEffects", fallback::DEFAULT_SIDE_EFFECTS),
        dosage: field("dosage", fallback::DEFAULT_DOSAGE),
    })
}

/// Rounds and clamps a model-supplied probability into 0..=100.
/// Accepts numbers and numeric strings such as `"75%"`; anything else is 0.
pub fn normalize_probability(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    match raw {
        Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn parse_disease(object: &Map<String, Value>) -> Disease {
    Disease {
        name: string_field(object, "name").unwrap_or_else(|| fallback::UNKNOWN_CONDITION.to_string()),
        probability: normalize_probability(object.get("probability")),
        description: string_field(object, "description")
            .unwrap_or_else(|| fallback::NO_DESCRIPTION.to_string()),
    }
}

pub fn parse_diagnosis(text: &str) -> Result<DiagnosisResponse, GenAiError> {
    let object = parse_json_object(text)?;

    let possible_diseases: Vec<Disease> = object
        .get("diseases")
        .and_then(Value::as_array)
        .ok_or_else(|| GenAiError::Unparseable("Missing diseases array".to_string()))?
        .iter()
        .filter_map(Value::as_object)
        .map(parse_disease)
        .collect();

    if possible_diseases.is_empty() {
        return Err(GenAiError::Unparseable("Empty diseases array".to_string()));
    }

    let recommendations = string_field(&object, "recommendations")
        .unwrap_or_else(|| fallback::DEFAULT_RECOMMENDATIONS.to_string());

    Ok(DiagnosisResponse {
        possible_diseases,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn span_covers_first_open_to_last_close() {
        let text = "Sure! {\"a\": {\"b\": 1}} hope this helps }";
        assert_eq!(json_span(text), Some("{\"a\": {\"b\": 1}} hope this helps }"));
        assert_eq!(json_span("no braces"), None);
        assert_eq!(json_span("} reversed {"), None);
    }

    #[test]
    fn medicine_info_from_fenced_json() {
        let text = r#"```json
{"medicineName": "Paracetamol", "description": "Analgesic", "uses": "Pain, fever", "sideEffects": "Rare", "dosage": "500mg"}
```"#;
        let info = parse_medicine_info(text, "PARACETAMOL").unwrap();
        assert_eq!(info.medicine_name, "Paracetamol");
        assert_eq!(info.uses, "Pain, fever");
        assert_eq!(info.dosage, "500mg");
    }

    #[test]
    fn missing_medicine_fields_default_individually() {
        let text = r#"{"description": "An antibiotic", "uses": ""}"#;
        let info = parse_medicine_info(text, "Amoxil").unwrap();
        assert_eq!(info.medicine_name, "Amoxil");
        assert_eq!(info.description, "An antibiotic");
        assert_eq!(info.uses, fallback::DEFAULT_USES);
        assert_eq!(info.side_effects, fallback::DEFAULT_SIDE_EFFECTS);
    }

    #[test]
    fn unbalanced_text_is_an_error_not_a_panic() {
        assert!(parse_medicine_info("I cannot help with that.", "X").is_err());
        assert!(parse_medicine_info("{ \"medicineName\": ", "X").is_err());
        assert!(parse_diagnosis("").is_err());
        assert!(parse_diagnosis("{not json}").is_err());
    }

    #[test]
    fn probabilities_are_clamped() {
        assert_eq!(normalize_probability(Some(&json!(-5))), 0);
        assert_eq!(normalize_probability(Some(&json!(150))), 100);
        assert_eq!(normalize_probability(Some(&json!(42.6))), 43);
        assert_eq!(normalize_probability(Some(&json!("75%"))), 75);
        assert_eq!(normalize_probability(Some(&json!("likely"))), 0);
        assert_eq!(normalize_probability(None), 0);
    }

    #[test]
    fn diagnosis_entries_are_normalized() {
        let text = r#"Here you go:
{
  "diseases": [
    {"name": "Malaria", "probability": 150, "description": "Parasitic infection"},
    {"probability": -5},
    "not an object"
  ],
  "recommendations": "Get a blood test."
}"#;
        let response = parse_diagnosis(text).unwrap();
        assert_eq!(response.possible_diseases.len(), 2);
        assert_eq!(response.possible_diseases[0].name, "Malaria");
        assert_eq!(response.possible_diseases[0].probability, 100);
        assert_eq!(response.possible_diseases[1].name, fallback::UNKNOWN_CONDITION);
        assert_eq!(response.possible_diseases[1].probability, 0);
        assert_eq!(response.possible_diseases[1].description, fallback::NO_DESCRIPTION);
        assert_eq!(response.recommendations, "Get a blood test.");
    }

    #[test]
    fn empty_disease_list_is_a_parse_failure() {
        assert!(parse_diagnosis(r#"{"diseases": [], "recommendations": "rest"}"#).is_err());
        assert!(parse_diagnosis(r#"{"recommendations": "rest"}"#).is_err());
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = r#"{"diseases":[{"name":"Flu","probability":60,"description":"Viral"}]}"#;
        assert_eq!(parse_diagnosis(text).unwrap(), parse_diagnosis(text).unwrap());
    }
}
