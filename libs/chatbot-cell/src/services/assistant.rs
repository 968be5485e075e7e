use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::EntityId;

use crate::models::{
    KnowledgeResults, CONNECTION_FALLBACK_REPLY, MEDICAL_DISCLAIMER, NO_MEDICAL_INFORMATION_REPLY,
};
use crate::services::classifier::QueryClassifier;
use crate::services::knowledge::{HttpMedicalKnowledge, MedicalKnowledge};
use crate::services::responder::{ChatResponder, HttpChatResponder};

/// Produces the bot side of a conversation. Never fails: every upstream
/// problem turns into a fallback reply.
pub struct ChatAssistant {
    classifier: QueryClassifier,
    knowledge: Arc<dyn MedicalKnowledge>,
    responder: Arc<dyn ChatResponder>,
    disclaimers: Vec<String>,
    medical_sources: Vec<String>,
}

impl ChatAssistant {
    pub fn new(
        config: &AppConfig,
        knowledge: Arc<dyn MedicalKnowledge>,
        responder: Arc<dyn ChatResponder>,
    ) -> Self {
        Self {
            classifier: QueryClassifier::new(),
            knowledge,
            responder,
            disclaimers: config.chatbot_disclaimers.clone(),
            medical_sources: config.medical_sources.clone(),
        }
    }

    /// Wires the HTTP catalog and chat clients from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let knowledge = Arc::new(HttpMedicalKnowledge::new(config)?);
        let responder = Arc::new(HttpChatResponder::new(config)?);
        Ok(Self::new(config, knowledge, responder))
    }

    pub fn disclaimers(&self) -> &[String] {
        &self.disclaimers
    }

    pub fn medical_sources(&self) -> &[String] {
        &self.medical_sources
    }

    pub async fn reply(&self, message: &str, session_id: EntityId) -> String {
        if self.classifier.is_medical(message) {
            debug!("Session {}: routing message to medical catalogs", session_id);
            let results = self.knowledge.search(message).await;
            return format_medical_response(&results, message);
        }

        match self.responder.respond(message, session_id).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Session {}: chat API unavailable: {}", session_id, e);
                CONNECTION_FALLBACK_REPLY.to_string()
            }
        }
    }
}

pub fn format_medical_response(results: &KnowledgeResults, query: &str) -> String {
    if results.is_unavailable() {
        return NO_MEDICAL_INFORMATION_REPLY.to_string();
    }

    let mut response = format!("Here's what I found about \"{}\":\n\n", query);

    if let Some((top, rest)) = results.medline_plus.as_deref().and_then(<[_]>::split_first) {
        let _ = write!(response, "From MedlinePlus: {}\n{}\n\n", top.title, top.summary);

        if !rest.is_empty() {
            response.push_str("Additional information:\n");
            for entry in rest.iter().take(2) {
                let _ = writeln!(response, "- {}", entry.title);
            }
            response.push('\n');
        }
    }

    if let Some(top) = results.health_gov.as_deref().and_then(<[_]>::first) {
        let _ = write!(response, "From Health.gov: {}\n{}\n\n", top.title, top.summary);
    }

    response.push_str(MEDICAL_DISCLAIMER);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KnowledgeEntry;

    fn entry(title: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            title: title.to_string(),
            summary: format!("About {}", title),
            url: format!("https://example.org/{}", title),
        }
    }

    #[test]
    fn lists_at_most_two_extra_medline_titles() {
        let results = KnowledgeResults {
            medline_plus: Some(vec![entry("Flu"), entry("Cold"), entry("Fever"), entry("Cough")]),
            health_gov: Some(vec![entry("Vaccines")]),
        };

        let text = format_medical_response(&results, "flu symptoms");

        assert!(text.starts_with("Here's what I found about \"flu symptoms\":\n\n"));
        assert!(text.contains("From MedlinePlus: Flu\nAbout Flu\n\n"));
        assert!(text.contains("- Cold\n- Fever\n"));
        assert!(!text.contains("- Cough"));
        assert!(text.contains("From Health.gov: Vaccines\nAbout Vaccines"));
        assert!(text.ends_with(MEDICAL_DISCLAIMER));
    }

    #[test]
    fn empty_catalogs_still_carry_disclaimer() {
        let results = KnowledgeResults {
            medline_plus: Some(vec![]),
            health_gov: None,
        };

        let text = format_medical_response(&results, "rash");

        assert!(!text.contains("From MedlinePlus"));
        assert!(text.ends_with(MEDICAL_DISCLAIMER));
    }

    #[test]
    fn both_lookups_failing_gives_apology() {
        let text = format_medical_response(&KnowledgeResults::default(), "rash");
        assert_eq!(text, NO_MEDICAL_INFORMATION_REPLY);
    }
}
