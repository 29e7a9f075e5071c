use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GOOGLE_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODELS: [&str; 2] = ["gemma-3n-e2b-it", "gemma-3n-e4b-it"];
const DEFAULT_ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com";
const DEFAULT_ASSEMBLYAI_MAX_POLLS: u32 = 200;
const DEFAULT_LANGSMITH_ENDPOINT: &str = "https://api.smith.langchain.com";
const DEFAULT_LANGSMITH_PROJECT: &str = "SmartGist";
const DEFAULT_WIKIPEDIA_LANG: &str = "en";
const DEFAULT_ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Default character window used by the text splitter.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;
/// Default character overlap between adjacent chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// Default number of leading chunks fed to the refine chain.
pub const DEFAULT_MAX_CHUNKS: usize = 5;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for SmartGist.
///
/// Built once at startup and handed to the services that need it; nothing reads the
/// environment after [`Config::from_env`] returns.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Google Generative Language endpoint.
    pub google_api_key: String,
    /// Base URL of the Generative Language API.
    pub google_api_base_url: String,
    /// Models offered to the user; the first entry is the default.
    pub models: Vec<String>,
    /// Optional AssemblyAI key; audio uploads fail without it.
    pub assemblyai_api_key: Option<String>,
    /// Base URL of the AssemblyAI REST API.
    pub assemblyai_base_url: String,
    /// Maximum number of transcript status polls before giving up.
    pub assemblyai_max_polls: u32,
    /// Run tracing settings.
    pub langsmith: LangSmithSettings,
    /// Directory receiving uploaded files.
    pub upload_dir: PathBuf,
    /// Character window for the recursive splitter.
    pub chunk_size: usize,
    /// Character overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// Leading chunks summarized per request; the remainder is dropped.
    pub max_chunks: usize,
    /// Optional timeout applied to every outbound HTTP request.
    pub http_timeout: Option<Duration>,
    /// Endpoints used by the remote loaders.
    pub sources: SourceEndpoints,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Settings for posting pipeline runs to LangSmith.
#[derive(Debug, Clone)]
pub struct LangSmithSettings {
    /// API key; tracing is skipped when absent.
    pub api_key: Option<String>,
    /// Whether tracing was requested.
    pub tracing_enabled: bool,
    /// Project (session) name runs are filed under.
    pub project: String,
    /// Base URL of the LangSmith API.
    pub endpoint: String,
}

impl LangSmithSettings {
    /// True when runs should actually be posted.
    pub fn is_active(&self) -> bool {
        self.tracing_enabled && self.api_key.is_some()
    }
}

impl Default for LangSmithSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            tracing_enabled: false,
            project: DEFAULT_LANGSMITH_PROJECT.to_string(),
            endpoint: DEFAULT_LANGSMITH_ENDPOINT.to_string(),
        }
    }
}

/// Remote endpoints queried by the web-facing loaders.
#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    /// MediaWiki `api.php` URL.
    pub wikipedia_api_url: String,
    /// arXiv Atom query endpoint.
    pub arxiv_api_url: String,
    /// Origin hosting YouTube watch pages and the Innertube API.
    pub youtube_base_url: String,
}

impl SourceEndpoints {
    /// Public endpoints, with Wikipedia pinned to the given language edition.
    pub fn public(wikipedia_lang: &str) -> Self {
        Self {
            wikipedia_api_url: format!("https://{wikipedia_lang}.wikipedia.org/w/api.php"),
            arxiv_api_url: DEFAULT_ARXIV_API_URL.to_string(),
            youtube_base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let models = load_env_optional("SMARTGIST_MODELS")
            .map(|value| parse_models(&value))
            .unwrap_or_else(default_models);
        if models.is_empty() {
            return Err(ConfigError::InvalidValue("SMARTGIST_MODELS".into()));
        }

        let langsmith_api_key = load_env_optional("LANGSMITH_API_KEY");
        let tracing_enabled = match load_env_optional("LANGSMITH_TRACING") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidValue("LANGSMITH_TRACING".into()))?,
            None => langsmith_api_key.is_some(),
        };

        let wikipedia_lang = load_env_optional("WIKIPEDIA_LANG")
            .unwrap_or_else(|| DEFAULT_WIKIPEDIA_LANG.to_string());
        let mut sources = SourceEndpoints::public(&wikipedia_lang);
        if let Some(url) = load_endpoint("WIKIPEDIA_API_URL")? {
            sources.wikipedia_api_url = url;
        }
        if let Some(url) = load_endpoint("ARXIV_API_URL")? {
            sources.arxiv_api_url = url;
        }
        if let Some(url) = load_endpoint("YOUTUBE_BASE_URL")? {
            sources.youtube_base_url = url;
        }

        let max_chunks = match parse_optional("SUMMARY_MAX_CHUNKS")? {
            Some(value) => positive("SUMMARY_MAX_CHUNKS", value)?,
            None => DEFAULT_MAX_CHUNKS,
        };

        Ok(Self {
            google_api_key: load_env("GOOGLE_API_KEY")?,
            google_api_base_url: load_endpoint("GOOGLE_API_BASE_URL")?
                .unwrap_or_else(|| DEFAULT_GOOGLE_API_BASE_URL.to_string()),
            models,
            assemblyai_api_key: load_env_optional("ASSEMBLYAI_API_KEY"),
            assemblyai_base_url: load_endpoint("ASSEMBLYAI_BASE_URL")?
                .unwrap_or_else(|| DEFAULT_ASSEMBLYAI_BASE_URL.to_string()),
            assemblyai_max_polls: parse_optional("ASSEMBLYAI_MAX_POLLS")?
                .unwrap_or(DEFAULT_ASSEMBLYAI_MAX_POLLS),
            langsmith: LangSmithSettings {
                api_key: langsmith_api_key,
                tracing_enabled,
                project: load_env_optional("LANGSMITH_PROJECT")
                    .unwrap_or_else(|| DEFAULT_LANGSMITH_PROJECT.to_string()),
                endpoint: load_endpoint("LANGSMITH_ENDPOINT")?
                    .unwrap_or_else(|| DEFAULT_LANGSMITH_ENDPOINT.to_string()),
            },
            upload_dir: load_env_optional("SMARTGIST_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            chunk_size: parse_optional("TEXT_SPLITTER_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: parse_optional("TEXT_SPLITTER_CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            max_chunks,
            http_timeout: parse_optional::<u64>("HTTP_TIMEOUT_SECS")?.map(Duration::from_secs),
            sources,
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Configuration with public endpoints and default tuning, keyed by the given API key.
    pub fn with_api_key(google_api_key: impl Into<String>) -> Self {
        Self {
            google_api_key: google_api_key.into(),
            google_api_base_url: DEFAULT_GOOGLE_API_BASE_URL.to_string(),
            models: default_models(),
            assemblyai_api_key: None,
            assemblyai_base_url: DEFAULT_ASSEMBLYAI_BASE_URL.to_string(),
            assemblyai_max_polls: DEFAULT_ASSEMBLYAI_MAX_POLLS,
            langsmith: LangSmithSettings::default(),
            upload_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_chunks: DEFAULT_MAX_CHUNKS,
            http_timeout: None,
            sources: SourceEndpoints::public(DEFAULT_WIKIPEDIA_LANG),
            server_port: None,
        }
    }

    /// Model used when the caller does not pick one.
    pub fn default_model(&self) -> &str {
        &self.models[0]
    }

    /// Resolve a requested model against the configured list.
    pub fn resolve_model(&self, requested: Option<&str>) -> Option<&str> {
        match requested.map(str::trim).filter(|value| !value.is_empty()) {
            None => Some(self.default_model()),
            Some(name) => self
                .models
                .iter()
                .find(|model| model.as_str() == name)
                .map(String::as_str),
        }
    }
}

/// Load `.env` (if present) and build the configuration.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        models = ?config.models,
        upload_dir = %config.upload_dir.display(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        max_chunks = config.max_chunks,
        audio_enabled = config.assemblyai_api_key.is_some(),
        langsmith = config.langsmith.is_active(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|model| model.to_string()).collect()
}

fn parse_models(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn positive(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(value)
}

fn load_endpoint(key: &str) -> Result<Option<String>, ConfigError> {
    load_env_optional(key)
        .map(|value| parse_endpoint(key, &value))
        .transpose()
}

/// Accept absolute `http`/`https` URLs only.
fn parse_endpoint(key: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(value.to_string())
        }
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_models_skips_blank_entries() {
        assert_eq!(
            parse_models(" gemma-a , ,gemma-b,"),
            vec!["gemma-a".to_string(), "gemma-b".to_string()]
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn resolve_model_defaults_to_first_entry() {
        let config = Config::with_api_key("key");
        assert_eq!(config.resolve_model(None), Some("gemma-3n-e2b-it"));
        assert_eq!(config.resolve_model(Some("  ")), Some("gemma-3n-e2b-it"));
        assert_eq!(
            config.resolve_model(Some("gemma-3n-e4b-it")),
            Some("gemma-3n-e4b-it")
        );
        assert_eq!(config.resolve_model(Some("gpt-unknown")), None);
    }

    #[test]
    fn langsmith_requires_key_and_flag() {
        let mut settings = LangSmithSettings::default();
        settings.tracing_enabled = true;
        assert!(!settings.is_active());
        settings.api_key = Some("ls-key".into());
        assert!(settings.is_active());
    }

    #[test]
    fn zero_max_chunks_is_rejected() {
        assert!(matches!(
            positive("SUMMARY_MAX_CHUNKS", 0),
            Err(ConfigError::InvalidValue(ref key)) if key == "SUMMARY_MAX_CHUNKS"
        ));
        assert_eq!(positive("SUMMARY_MAX_CHUNKS", 3).expect("valid"), 3);
    }

    #[test]
    fn endpoint_overrides_must_be_http_urls() {
        assert_eq!(
            parse_endpoint("ARXIV_API_URL", " http://127.0.0.1:8080/api/query ").expect("valid"),
            "http://127.0.0.1:8080/api/query"
        );
        for bad in ["export.arxiv.org/api/query", "ftp://example.org", "not a url"] {
            assert!(
                matches!(
                    parse_endpoint("ARXIV_API_URL", bad),
                    Err(ConfigError::InvalidValue(ref key)) if key == "ARXIV_API_URL"
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn public_endpoints_follow_language() {
        let endpoints = SourceEndpoints::public("de");
        assert_eq!(
            endpoints.wikipedia_api_url,
            "https://de.wikipedia.org/w/api.php"
        );
    }
}
