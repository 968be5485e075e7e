use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_DISCLAIMERS: &[&str] = &[
    "This assistant provides general health information only and is not a substitute for professional medical advice.",
    "In case of emergency, contact your local emergency number immediately.",
];

const DEFAULT_MEDICAL_SOURCES: &[&str] = &["MedlinePlus", "Health.gov"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_key: String,
    pub upload_dir: PathBuf,
    pub chatbot_api_url: String,
    pub chatbot_api_key: String,
    pub chatbot_timeout_seconds: u64,
    pub chatbot_disclaimers: Vec<String>,
    pub medical_sources: Vec<String>,
    pub medline_api_url: String,
    pub medline_api_key: String,
    pub healthgov_api_url: String,
    pub payment_success_rate: f64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            supabase_service_key: String::new(),
            upload_dir: PathBuf::from("uploads"),
            chatbot_api_url: String::new(),
            chatbot_api_key: String::new(),
            chatbot_timeout_seconds: 10,
            chatbot_disclaimers: DEFAULT_DISCLAIMERS.iter().map(|s| s.to_string()).collect(),
            medical_sources: DEFAULT_MEDICAL_SOURCES.iter().map(|s| s.to_string()).collect(),
            medline_api_url: String::new(),
            medline_api_key: String::new(),
            healthgov_api_url: String::new(),
            payment_success_rate: 0.9,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            supabase_url: required_var("SUPABASE_URL"),
            supabase_anon_key: required_var("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: required_var("SUPABASE_JWT_SECRET"),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
            upload_dir: env::var("FILE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            chatbot_api_url: required_var("CHATBOT_API_URL"),
            chatbot_api_key: required_var("CHATBOT_API_KEY"),
            chatbot_timeout_seconds: parsed_var("CHATBOT_TIMEOUT_SECONDS", defaults.chatbot_timeout_seconds),
            chatbot_disclaimers: list_var("CHATBOT_DISCLAIMERS", '|')
                .unwrap_or(defaults.chatbot_disclaimers),
            medical_sources: list_var("CHATBOT_MEDICAL_SOURCES", '|')
                .unwrap_or(defaults.medical_sources),
            medline_api_url: required_var("MEDLINE_API_URL"),
            medline_api_key: env::var("MEDLINE_API_KEY").unwrap_or_default(),
            healthgov_api_url: required_var("HEALTHGOV_API_URL"),
            payment_success_rate: parsed_var("PAYMENT_SUCCESS_RATE", defaults.payment_success_rate)
                .clamp(0.0, 1.0),
            cors_allowed_origins: list_var("CORS_ALLOWED_ORIGINS", ',').unwrap_or_default(),
        };

        if !config.is_configured() {
            warn!("JWT secret missing - every authenticated endpoint will reject requests");
        }

        if !config.is_database_configured() {
            warn!("Supabase URL or anon key missing - the API cannot reach its database");
        }

        if !config.is_chatbot_configured() {
            warn!("Chatbot API not configured - general chat questions will receive the fallback reply");
        }
        if !config.is_medical_knowledge_configured() {
            warn!("No medical catalog configured - medical questions will receive an apology");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }

    /// Every table, the user directory included, lives in Supabase.
    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_chatbot_configured(&self) -> bool {
        !self.chatbot_api_url.is_empty() && !self.chatbot_api_key.is_empty()
    }

    pub fn is_medical_knowledge_configured(&self) -> bool {
        !self.medline_api_url.is_empty() || !self.healthgov_api_url.is_empty()
    }

    pub fn chatbot_timeout(&self) -> Duration {
        Duration::from_secs(self.chatbot_timeout_seconds.max(1))
    }
}

fn required_var(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn list_var(key: &str, separator: char) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let items: Vec<String> = raw
        .split(separator)
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
