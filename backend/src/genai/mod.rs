pub mod ai_studio_service;
pub mod client;
pub mod fallback;
pub mod parser;
pub mod prompt;
