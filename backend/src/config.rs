use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Deployment settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub users_table: String,
    pub profiles_table: String,
    pub scans_table: String,
    pub diagnoses_table: String,
    pub s3_bucket: String,
    pub jwt_secret: String,
    pub cognito_user_pool_id: String,
    pub cognito_client_id: String,
    pub cognito_client_secret: Option<String>,
    pub vision_api_key: String,
    pub ai_studio_api_key: String,
    pub port: String,
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            users_table: required("DYNAMODB_USERS_TABLE")?,
            profiles_table: required("DYNAMODB_PROFILES_TABLE")?,
            scans_table: required("DYNAMODB_SCANS_TABLE")?,
            diagnoses_table: required("DYNAMODB_DIAGNOSES_TABLE")?,
            s3_bucket: required("S3_BUCKET_NAME")?,
            jwt_secret: required("JWT_SECRET")?,
            cognito_user_pool_id: required("COGNITO_USER_POOL_ID")?,
            cognito_client_id: required("COGNITO_CLIENT_ID")?,
            cognito_client_secret: optional("COGNITO_CLIENT_SECRET"),
            vision_api_key: required("GOOGLE_CLOUD_VISION_API_KEY")?,
            ai_studio_api_key: required("GOOGLE_AI_STUDIO_API_KEY")?,
            port: env::var("PORT").unwrap_or_else(|_| "8081".to_string()),
        })
    }

    pub fn cognito_configured(&self) -> bool {
        !self.cognito_user_pool_id.contains("your_cognito")
            && !self.cognito_client_id.contains("your_cognito")
    }
}

/// Vendor endpoint and generation tuning, loaded from `config/ai.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AiConfig {
    pub vision: VisionConfig,
    pub language_model: LanguageModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisionConfig {
    pub base_url: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LanguageModelConfig {
    pub base_url: String,
    pub model: String,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vision.googleapis.com".to_string(),
            max_results: 10,
        }
    }
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

impl AiConfig {
    /// Loads from `AI_CONFIG_PATH`, else `config/ai.yaml` in the working
    /// directory, else the workspace copy. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            log::warn!(
                "AI config not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(&path)?;
        let config = Self::from_yaml(&config_str)?;
        log::info!("Loaded AI config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = env::var("AI_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        let relative = PathBuf::from("config/ai.yaml");
        if relative.exists() {
            return relative;
        }
        Self::bundled_config_path()
    }

    /// The workspace copy, resolved at build time.
    fn bundled_config_path() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../config/ai.yaml"))
    }
}
