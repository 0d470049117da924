//! Abstracción sobre Rig para generar texto con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use async_trait::async_trait;
use rig::completion::Prompt;

use crate::config::{AppConfig, LlmProvider};
use crate::error::{PipelineError, PipelineResult};

/// Función de completado opaca: `prompt -> texto`, sin streaming ni reintentos.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> PipelineResult<String>;
}

/// Gestor de LLMs para completado de texto.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    pub max_tokens: u64,
    pub api_key: Option<String>,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            max_tokens: cfg.llm_max_tokens,
            api_key: cfg.llm_api_key.clone(),
        }
    }

    async fn generate_with_openai(&self, prompt: &str) -> PipelineResult<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        const SYSTEM_PROMPT: &str = r#"
You are a maintenance support assistant.
The user message contains a problem description, related maintenance records and ends with "Suggested Solution:".
Continue with a short, practical solution.
"#;

        // Sin clave no se construye el cliente: `Client::from_env` haría panic.
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PipelineError::GenerationFailed("Falta OPENAI_API_KEY en el entorno".to_string())
        })?;
        let client = openai::Client::new(api_key);

        // Modelo de chat por defecto si no se ha configurado otro
        let model_name = if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        };

        let agent = client
            .agent(model_name)
            .preamble(SYSTEM_PROMPT)
            .max_tokens(self.max_tokens)
            .build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| PipelineError::GenerationFailed(e.to_string()))
    }
}

#[async_trait]
impl Generator for LlmManager {
    async fn generate(&self, prompt: &str) -> PipelineResult<String> {
        match self.provider {
            LlmProvider::OpenAI => self.generate_with_openai(prompt).await,
            ref other => Err(PipelineError::GenerationFailed(format!(
                "Proveedor LLM {:?} aún no implementado para completado",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unimplemented_provider_fails_generation_only() {
        let llm = LlmManager {
            provider: LlmProvider::Ollama,
            chat_model: "llama3".to_string(),
            max_tokens: 50,
            api_key: Some("sk-test".to_string()),
        };
        let err = llm.generate("my pipe\nNo relevant records found.\nSuggested Solution:").await;
        assert!(matches!(err, Err(PipelineError::GenerationFailed(_))));
    }

    #[tokio::test]
    async fn missing_api_key_fails_generation_instead_of_panicking() {
        let llm = LlmManager {
            provider: LlmProvider::OpenAI,
            chat_model: "gpt-4o-mini".to_string(),
            max_tokens: 50,
            api_key: None,
        };
        let err = llm.generate("strange noise at night\nNo relevant records found.\nSuggested Solution:").await;
        assert!(matches!(err, Err(PipelineError::GenerationFailed(msg)) if msg.contains("OPENAI_API_KEY")));
    }
}
