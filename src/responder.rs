//! Pipeline de resolución de consultas de mantenimiento.
//!
//! Orden estricto:
//!   1. Caché: si hay entrada, se devuelve tal cual (sin clasificar ni generar).
//!   2. Clasificador: si alguna categoría coincide, se devuelve su solución
//!      predefinida y se cachea igual que una respuesta generada.
//!   3. RAG: registros relacionados como contexto, prompt al generador y
//!      la respuesta se cachea.
//!
//! Caché y repositorio degradan (fallo de caché / contexto vacío); sólo un
//! fallo del generador aborta la petición, y en ese caso no se cachea nada.
//! Dos peticiones simultáneas de la misma consulta no cacheada pueden llamar
//! ambas al generador.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::{
    cache::ResponseCache,
    classifier::Classifier,
    error::{PipelineError, PipelineResult},
    llm::Generator,
    models::MaintenanceRecord,
    repository::RecordRepository,
};

pub const NO_RECORDS_CONTEXT: &str = "No relevant records found.";

/// Une los registros en el contexto del prompt.
pub fn build_context(records: &[MaintenanceRecord]) -> String {
    if records.is_empty() {
        return NO_RECORDS_CONTEXT.to_string();
    }
    records
        .iter()
        .map(MaintenanceRecord::as_context)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!("{query}\n{context}\nSuggested Solution:")
}

pub struct Responder {
    cache: Arc<dyn ResponseCache>,
    classifier: Classifier,
    repository: Arc<dyn RecordRepository>,
    generator: Arc<dyn Generator>,
    cache_ttl: Duration,
    generation_timeout: Duration,
}

impl Responder {
    pub fn new(
        cache: Arc<dyn ResponseCache>,
        classifier: Classifier,
        repository: Arc<dyn RecordRepository>,
        generator: Arc<dyn Generator>,
        cache_ttl: Duration,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            classifier,
            repository,
            generator,
            cache_ttl,
            generation_timeout,
        }
    }

    pub fn cache(&self) -> &dyn ResponseCache {
        self.cache.as_ref()
    }

    pub fn repository(&self) -> &dyn RecordRepository {
        self.repository.as_ref()
    }

    /// Resuelve una consulta. La clave de caché es `query` sin normalizar.
    pub async fn resolve(&self, query: &str) -> PipelineResult<String> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        match self.cache.get(query).await {
            Ok(Some(cached)) => {
                debug!("Respuesta servida desde caché");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("{e}; se continúa como fallo de caché"),
        }

        let response = match self.classifier.best_match(query) {
            Some(category) => {
                info!("Consulta clasificada como '{}'", category.name());
                category.canned_solution().to_string()
            }
            None => self.retrieve_and_generate(query).await?,
        };

        self.store(query, &response).await;
        Ok(response)
    }

    async fn retrieve_and_generate(&self, query: &str) -> PipelineResult<String> {
        let records = match self.repository.find_by_issue_type(query).await {
            Ok(records) => records,
            Err(e) => {
                warn!("{e}; se genera con contexto vacío");
                Vec::new()
            }
        };
        debug!("{} registros relevantes encontrados", records.len());

        let prompt = build_prompt(query, &build_context(&records));
        match timeout(self.generation_timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                error!("{e}");
                Err(match e {
                    PipelineError::GenerationFailed(_) => e,
                    other => PipelineError::GenerationFailed(other.to_string()),
                })
            }
            Err(_) => {
                let e = PipelineError::GenerationFailed(format!(
                    "sin respuesta tras {}s",
                    self.generation_timeout.as_secs()
                ));
                error!("{e}");
                Err(e)
            }
        }
    }

    /// Escritura best-effort: un fallo sólo se registra.
    async fn store(&self, query: &str, response: &str) {
        if let Err(e) = self.cache.put(query, response, self.cache_ttl).await {
            warn!("{e}; la respuesta no se ha cacheado");
        }
    }
}
