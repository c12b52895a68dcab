use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Number of prior messages loaded as conversational context.
    pub history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")?,
            },
            embedding: EmbeddingConfig {
                api_key: env::var("OPENAI_API_KEY")?,
                api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimensions: env::var("EMBEDDING_DIMENSIONS")
                    .unwrap_or_else(|_| "1536".to_string())
                    .parse()?,
            },
            generation: GenerationConfig {
                api_key: env::var("ANTHROPIC_API_KEY")?,
                api_base: env::var("ANTHROPIC_API_BASE")
                    .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
                model: env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .unwrap_or_else(|_| "4096".to_string())
                    .parse()?,
            },
            chunking: ChunkingConfig {
                chunk_size: env::var("CHUNK_SIZE")
                    .unwrap_or_else(|_| "512".to_string())
                    .parse()?,
                chunk_overlap: env::var("CHUNK_OVERLAP")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
            },
            chat: ChatConfig {
                history_limit: env::var("CHAT_HISTORY_LIMIT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
        })
    }
}
