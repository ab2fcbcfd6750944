pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_EMBEDDINGS_PATH: &str = "app/data/embeddings.npy";
pub const DEFAULT_METADATA_PATH: &str = "app/data/metadata.json";
pub const DEFAULT_TOP_K: usize = 3;

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://127.0.0.1:1234";

pub const DEFAULT_GENERATION_MODEL: &str = "models/gemini-2.5-flash";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 1000;

pub fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
