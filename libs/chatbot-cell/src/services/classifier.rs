use regex::Regex;

const MEDICAL_KEYWORDS: &[&str] = &[
    "symptom", "disease", "condition", "treatment", "medicine", "diagnosis",
    "health", "medical", "doctor", "hospital", "clinic", "prescription",
    "pain", "fever", "cough", "headache", "allergy", "infection",
    "diabetes", "cancer", "heart", "blood", "pressure", "cholesterol",
    "vaccine", "prevention", "diet", "exercise", "nutrition",
];

/// Routes a chat message to the knowledge catalogs or the general chat API.
///
/// Matching is case-insensitive and substring based, so "headaches" and
/// "painful" both count.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    patterns: Vec<Regex>,
}

impl QueryClassifier {
    pub fn new() -> Self {
        let keywords = format!("(?i)(?:{})", MEDICAL_KEYWORDS.join("|"));
        let health_question = r"(?is)what is.*(?:health|medical)|(?:health|medical).*what is";

        let patterns = [keywords.as_str(), health_question]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self { patterns }
    }

    pub fn is_medical(&self, message: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(message))
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}
