//! Carga y gestión de configuración de la aplicación (caché, repositorio y LLM).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Dónde viven las respuestas cacheadas.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheBackend {
    Redis { url: String },
    Memory,
}

/// Dónde viven los registros de mantenimiento.
#[derive(Clone, Debug, PartialEq)]
pub enum RepositoryBackend {
    Neo4j {
        uri: String,
        user: String,
        password: String,
    },
    Memory,
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub open_browser: bool,

    pub cache_backend: CacheBackend,
    pub cache_ttl: Duration,
    pub cache_op_timeout: Duration,

    pub repository_backend: RepositoryBackend,
    pub seed_sample_data: bool,
    pub seed_file: Option<PathBuf>,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    pub llm_max_tokens: u64,
    pub llm_api_key: Option<String>,
    pub generation_timeout: Duration,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de claves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_addr = var_or("SERVER_ADDR", "127.0.0.1:3322");
        let open_browser = parse_bool("OPEN_BROWSER", &var_or("OPEN_BROWSER", "true"))?;

        let cache_backend = match var_or("CACHE_BACKEND", "redis").to_lowercase().as_str() {
            "redis" => CacheBackend::Redis {
                url: var_or("REDIS_URL", "redis://127.0.0.1:6379/0"),
            },
            "memory" => CacheBackend::Memory,
            other => return Err(anyhow!("CACHE_BACKEND no soportado: {other}")),
        };
        let cache_ttl = Duration::from_secs(parse_u64(
            "CACHE_TTL_SECONDS",
            &var_or("CACHE_TTL_SECONDS", "3600"),
        )?);
        let cache_op_timeout = Duration::from_millis(parse_u64(
            "CACHE_OP_TIMEOUT_MS",
            &var_or("CACHE_OP_TIMEOUT_MS", "500"),
        )?);

        let repository_backend = match var_or("REPOSITORY_BACKEND", "neo4j").to_lowercase().as_str() {
            "neo4j" => RepositoryBackend::Neo4j {
                uri: lookup("NEO4J_URI").ok_or_else(|| anyhow!("Falta NEO4J_URI en el entorno"))?,
                user: lookup("NEO4J_USER").ok_or_else(|| anyhow!("Falta NEO4J_USER en el entorno"))?,
                password: lookup("NEO4J_PASSWORD")
                    .ok_or_else(|| anyhow!("Falta NEO4J_PASSWORD en el entorno"))?,
            },
            "memory" => RepositoryBackend::Memory,
            other => return Err(anyhow!("REPOSITORY_BACKEND no soportado: {other}")),
        };
        let seed_sample_data = parse_bool("SEED_SAMPLE_DATA", &var_or("SEED_SAMPLE_DATA", "true"))?;
        let seed_file = lookup("SEED_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let llm_provider = LlmProvider::from_str(&var_or("LLM_PROVIDER", "openai"))?;
        let llm_chat_model = var_or("LLM_CHAT_MODEL", "gpt-4o-mini");
        let llm_max_tokens = parse_u64("LLM_MAX_TOKENS", &var_or("LLM_MAX_TOKENS", "50"))?;
        let llm_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let generation_timeout = Duration::from_secs(parse_u64(
            "GENERATION_TIMEOUT_SECS",
            &var_or("GENERATION_TIMEOUT_SECS", "30"),
        )?);

        Ok(Self {
            server_addr,
            open_browser,
            cache_backend,
            cache_ttl,
            cache_op_timeout,
            repository_backend,
            seed_sample_data,
            seed_file,
            llm_provider,
            llm_chat_model,
            llm_max_tokens,
            llm_api_key,
            generation_timeout,
        })
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} debe ser un entero positivo, se recibió '{raw}'"))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{key} debe ser un booleano, se recibió '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_memory_repository() {
        let cfg = config_from(&[("REPOSITORY_BACKEND", "memory")]).unwrap();

        assert_eq!(cfg.server_addr, "127.0.0.1:3322");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.cache_op_timeout, Duration::from_millis(500));
        assert_eq!(
            cfg.cache_backend,
            CacheBackend::Redis {
                url: "redis://127.0.0.1:6379/0".to_string()
            }
        );
        assert_eq!(cfg.repository_backend, RepositoryBackend::Memory);
        assert!(cfg.seed_sample_data);
        assert!(cfg.seed_file.is_none());
        assert_eq!(cfg.llm_provider, LlmProvider::OpenAI);
        assert_eq!(cfg.llm_max_tokens, 50);
        assert!(cfg.llm_api_key.is_none());
        assert_eq!(cfg.generation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn neo4j_backend_requires_credentials() {
        let err = config_from(&[("NEO4J_URI", "bolt://localhost:7687")]).unwrap_err();
        assert!(err.to_string().contains("NEO4J_USER"));

        let cfg = config_from(&[
            ("NEO4J_URI", "bolt://localhost:7687"),
            ("NEO4J_USER", "neo4j"),
            ("NEO4J_PASSWORD", "secret"),
        ])
        .unwrap();
        assert!(matches!(cfg.repository_backend, RepositoryBackend::Neo4j { .. }));
    }

    #[test]
    fn ttl_is_configurable() {
        let cfg = config_from(&[
            ("REPOSITORY_BACKEND", "memory"),
            ("CACHE_BACKEND", "memory"),
            ("CACHE_TTL_SECONDS", "60"),
        ])
        .unwrap();
        assert_eq!(cfg.cache_backend, CacheBackend::Memory);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg = config_from(&[("REPOSITORY_BACKEND", "memory"), ("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(cfg.llm_api_key.is_none());

        let cfg = config_from(&[("REPOSITORY_BACKEND", "memory"), ("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[("REPOSITORY_BACKEND", "memory"), ("CACHE_TTL_SECONDS", "una hora")]).is_err());
        assert!(config_from(&[("REPOSITORY_BACKEND", "postgres")]).is_err());
        assert!(config_from(&[("REPOSITORY_BACKEND", "memory"), ("OPEN_BROWSER", "quizá")]).is_err());
        assert!(config_from(&[("REPOSITORY_BACKEND", "memory"), ("LLM_PROVIDER", "gpt2")]).is_err());
    }
}
