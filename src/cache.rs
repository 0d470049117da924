//! Caché de respuestas con expiración por entrada.
//!
//! La clave es la consulta tal cual llega (sin normalizar): "Pipe leak" y
//! "pipe leak" son entradas distintas.
//!
//! Implementaciones:
//!   - `RedisCache`: servicio externo, con `SET ... EX` y un tiempo máximo por operación.
//!   - `InMemoryCache`: mapa en proceso, para desarrollo local, tests y como
//!     respaldo si Redis no está disponible al arrancar.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use tokio::time::{timeout, Instant};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Nombre del backend, para logs y health check.
    fn backend(&self) -> &'static str;

    /// Devuelve la respuesta cacheada si existe y no ha expirado.
    async fn get(&self, key: &str) -> PipelineResult<Option<String>>;

    /// Sobrescribe la entrada y reinicia su expiración.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PipelineResult<()>;
}

// ---------------------------------------------------------------------
// REDIS
// ---------------------------------------------------------------------

pub struct RedisCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    /// Abre la conexión (con reconexión automática) y comprueba que responde.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        info!("Conectando a Redis en {url}...");
        let client = Client::open(url)?;
        let mut conn = timeout(op_timeout * 4, ConnectionManager::new(client)).await??;
        timeout(op_timeout, redis::cmd("PING").query_async::<_, String>(&mut conn)).await??;
        info!("Conexión a Redis OK");
        Ok(Self { conn, op_timeout })
    }
}

fn unavailable(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::CacheUnavailable(err.to_string())
}

#[async_trait]
impl ResponseCache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> PipelineResult<Option<String>> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("GET").arg(key).to_owned();
        timeout(self.op_timeout, cmd.query_async::<_, Option<String>>(&mut conn))
            .await
            .map_err(|_| unavailable("tiempo de espera agotado en GET"))?
            .map_err(unavailable)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PipelineResult<()> {
        let mut conn = self.conn.clone();
        // Redis rechaza EX 0; una entrada con TTL nulo simplemente no se guarda.
        let seconds = ttl.as_secs();
        if seconds == 0 {
            return Ok(());
        }
        let cmd = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .to_owned();
        timeout(self.op_timeout, cmd.query_async::<_, ()>(&mut conn))
            .await
            .map_err(|_| unavailable("tiempo de espera agotado en SET"))?
            .map_err(unavailable)
    }
}

// ---------------------------------------------------------------------
// EN MEMORIA
// ---------------------------------------------------------------------

struct CacheEntry {
    value: String,
    /// `None` si el TTL no cabe en un `Instant`: la entrada no expira.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Caché en proceso. Última escritura gana por clave.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> PipelineResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(unavailable)?;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expirada: se purga para no acumular entradas muertas.
        let mut entries = self.entries.write().map_err(unavailable)?;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PipelineResult<()> {
        let mut entries = self.entries.write().map_err(unavailable)?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }
}
