use shared::DiagnosisRequest;

pub fn medicine_info_prompt(medicine_name: &str) -> String {
    format!(
        r#"You are a pharmaceutical information assistant. Provide information about the medicine "{name}".

Respond ONLY with a JSON object in exactly this format, with no additional text:
{{
  "medicineName": "The standard name of the medicine",
  "description": "A brief description of what the medicine is",
  "uses": "What the medicine is commonly used to treat",
  "sideEffects": "Common side effects",
  "dosage": "Typical adult dosage guidance"
}}

If you do not recognise the medicine, still return the JSON object and advise consulting a healthcare provider in each field.
This information is for educational purposes only and does not replace professional medical advice."#,
        name = medicine_name.trim()
    )
}

pub fn diagnosis_prompt(request: &DiagnosisRequest) -> String {
    format!(
        r#"As a medical AI assistant, analyze the following patient information and provide possible diagnoses:

Symptoms: {symptoms}
Diet: {diet}
Location: {location}

Please provide:
1. A list of 3-5 possible diseases with probability percentages (0-100)
2. Brief descriptions for each disease
3. General health recommendations

Format your response as JSON:
{{
  "diseases": [
    {{
      "name": "Disease Name",
      "probability": 75,
      "description": "Brief description"
    }}
  ],
  "recommendations": "General recommendations text"
}}

Important: This is for informational purposes only and should not replace professional medical advice."#,
        symptoms = request.symptoms,
        diet = request.diet,
        location = request.location
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medicine_prompt_embeds_trimmed_name_and_keys() {
        let prompt = medicine_info_prompt("  Amoxicillin ");
        assert!(prompt.contains("\"Amoxicillin\""));
        for key in ["medicineName", "description", "uses", "sideEffects", "dosage"] {
            assert!(prompt.contains(key), "missing key {key}");
        }
    }

    #[test]
    fn diagnosis_prompt_embeds_all_inputs() {
        let prompt = diagnosis_prompt(&DiagnosisRequest {
            symptoms: "fever and chills".into(),
            diet: "street food".into(),
            location: "Accra".into(),
        });
        assert!(prompt.contains("Symptoms: fever and chills"));
        assert!(prompt.contains("Diet: street food"));
        assert!(prompt.contains("Location: Accra"));
        assert!(prompt.contains("\"diseases\""));
    }
}
