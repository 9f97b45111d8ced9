use std::collections::HashSet;

pub const UNKNOWN_MEDICINE: &str = "Unknown Medicine";

const LINES_SCANNED: usize = 5;

lazy_static::lazy_static! {
    /// Dosage units and package wording that never name a product.
    static ref STOPLIST: HashSet<&'static str> = [
        "mg", "mcg", "µg", "ml", "g", "kg", "iu", "units",
        "tablet", "tablets", "capsule", "capsules", "caplet", "caplets",
        "syrup", "injection", "cream", "gel", "ointment", "drops",
        "oral", "solution", "suspension", "film", "coated",
        "take", "use", "store", "keep", "daily", "dose", "each",
        "contains", "only", "for", "with", "and", "the",
    ]
    .into_iter()
    .collect();
}

/// Stoplisted words, and strengths such as `500mg`, `10ml` or `5%`.
fn is_stopword(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        || STOPLIST.contains(token.to_lowercase().as_str())
}

fn candidate_tokens(text: &str) -> Vec<&str> {
    text.lines()
        .take(LINES_SCANNED)
        .flat_map(str::split_whitespace)
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty() && !is_stopword(token))
        .collect()
}

/// Best-guess product name from OCR text: the first capitalized token
/// longer than 3 characters, else the first token longer than 4, else
/// [`UNKNOWN_MEDICINE`].
pub fn extract_medicine_name(text: &str) -> String {
    let tokens = candidate_tokens(text);

    let capitalized = tokens.iter().find(|token| {
        token.chars().count() > 3 && token.chars().next().is_some_and(char::is_uppercase)
    });
    if let Some(token) = capitalized {
        return token.to_string();
    }

    tokens
        .iter()
        .find(|token| token.chars().count() > 4)
        .map(|token| token.to_string())
        .unwrap_or_else(|| UNKNOWN_MEDICINE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_sentinel() {
        assert_eq!(extract_medicine_name(""), UNKNOWN_MEDICINE);
        assert_eq!(extract_medicine_name("   \n  "), UNKNOWN_MEDICINE);
    }

    #[test]
    fn picks_capitalized_product_name() {
        assert_eq!(extract_medicine_name("PARACETAMOL 500mg Tablets"), "PARACETAMOL");
    }

    #[test]
    fn skips_stoplisted_package_words() {
        assert_eq!(extract_medicine_name("Tablets Oral Ibuprofen 200 mg"), "Ibuprofen");
    }

    #[test]
    fn falls_back_to_first_long_lowercase_word() {
        assert_eq!(extract_medicine_name("take 2 amoxicillin daily"), "amoxicillin");
    }

    #[test]
    fn strips_punctuation_from_tokens() {
        assert_eq!(extract_medicine_name("(Cetirizine) 10 mg"), "Cetirizine");
    }

    #[test]
    fn only_first_lines_are_considered() {
        let text = "10 mg\n5 ml\n2\n1\n3\nLoratadine";
        assert_eq!(extract_medicine_name(text), UNKNOWN_MEDICINE);
    }

    #[test]
    fn strengths_fused_to_units_are_skipped() {
        assert_eq!(extract_medicine_name("500mg tablets\nparacetamol"), "paracetamol");
        assert_eq!(extract_medicine_name("10ml 5% ointment"), UNKNOWN_MEDICINE);
    }

    #[test]
    fn short_tokens_only_yield_sentinel() {
        assert_eq!(extract_medicine_name("Abc 10 mg x"), UNKNOWN_MEDICINE);
    }
}
