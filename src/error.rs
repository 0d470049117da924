//! Errores del pipeline de resolución. Todos tienen alcance de petición:
//! ninguno detiene el proceso.

use thiserror::Error;

/// Mensaje genérico que ve el usuario cuando la generación falla.
pub const GENERATION_FAILURE_MESSAGE: &str = "unable to generate a response";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// La consulta está vacía o sólo contiene espacios.
    #[error("la consulta no puede estar vacía")]
    EmptyQuery,

    /// El servicio de caché no responde. Se degrada a fallo de caché.
    #[error("caché no disponible: {0}")]
    CacheUnavailable(String),

    /// El repositorio de registros no responde. Se degrada a contexto vacío.
    #[error("repositorio no disponible: {0}")]
    RepositoryUnavailable(String),

    /// El generador falló o agotó su tiempo. Aborta sólo esta petición.
    #[error("fallo en la generación: {0}")]
    GenerationFailed(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
