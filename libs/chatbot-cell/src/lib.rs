pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::{chatbot_routes, ChatbotState};
pub use services::assistant::ChatAssistant;
pub use services::knowledge::{HttpMedicalKnowledge, MedicalKnowledge};
pub use services::responder::{ChatResponder, HttpChatResponder};
