// Módulos de la aplicación
mod api;
mod app_state;
mod cache;
mod classifier;
mod config;
mod error;
mod llm;
mod models;
mod neo4j_client;
mod repository;
mod responder;
mod seed;

use crate::app_state::AppState;
use crate::cache::{InMemoryCache, RedisCache, ResponseCache};
use crate::config::{AppConfig, CacheBackend, LlmProvider, RepositoryBackend};
use crate::repository::{InMemoryRecordRepository, Neo4jRecordRepository, RecordRepository};
use anyhow::{Context, Result};
use axum::Router;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Redis si responde; si no, caché en memoria con la misma semántica de TTL.
async fn build_cache(cfg: &AppConfig) -> Arc<dyn ResponseCache> {
    match &cfg.cache_backend {
        CacheBackend::Redis { url } => match RedisCache::connect(url, cfg.cache_op_timeout).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!("Redis no disponible ({e}); se usa la caché en memoria.");
                Arc::new(InMemoryCache::new())
            }
        },
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
    }
}

async fn build_repository(cfg: &AppConfig) -> Result<Arc<dyn RecordRepository>> {
    match &cfg.repository_backend {
        RepositoryBackend::Neo4j { uri, user, password } => {
            let graph = neo4j_client::connect(uri, user, password)
                .await
                .context("Error conectando a Neo4j")?;
            neo4j_client::ensure_schema(&graph)
                .await
                .context("Error asegurando el esquema de Neo4j")?;
            Ok(Arc::new(Neo4jRecordRepository::new(Arc::new(graph))))
        }
        RepositoryBackend::Memory => Ok(Arc::new(InMemoryRecordRepository::new())),
    }
}

async fn seed_repository(cfg: &AppConfig, repository: &dyn RecordRepository) -> Result<()> {
    let mut records = Vec::new();
    if cfg.seed_sample_data {
        records.push(seed::sample_record());
    }
    if let Some(path) = &cfg.seed_file {
        records.extend(seed::load_seed_file(path)?);
    }
    if records.is_empty() {
        return Ok(());
    }
    let inserted = seed::seed_records(repository, records).await?;
    info!("Carga inicial completada: {inserted} registros nuevos.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Conectar colaboradores: caché, repositorio y generador
    let cache = build_cache(&cfg).await;
    let repository = build_repository(&cfg).await?;
    seed_repository(&cfg, repository.as_ref()).await?;

    if cfg.llm_provider != LlmProvider::OpenAI {
        warn!(
            "Proveedor LLM {:?} aún no implementado: las consultas sin categoría fallarán.",
            cfg.llm_provider
        );
    }
    if cfg.llm_provider == LlmProvider::OpenAI && cfg.llm_api_key.is_none() {
        warn!("Falta OPENAI_API_KEY: las consultas sin categoría fallarán.");
    }
    let generator = Arc::new(llm::LlmManager::from_config(&cfg));

    let responder = responder::Responder::new(
        cache,
        classifier::Classifier::new(),
        repository,
        generator,
        cfg.cache_ttl,
        cfg.generation_timeout,
    );

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 4. Crear estado compartido de la aplicación
    let app_state = AppState {
        responder: Arc::new(responder),
        shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    // 5. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {}", cfg.server_addr))?;
    let server_url = format!("http://{}", cfg.server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if cfg.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
