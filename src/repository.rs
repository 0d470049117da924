//! Repositorio de registros de mantenimiento.
//!
//! Única consulta: `find_by_issue_type`, coincidencia por subcadena sin
//! distinguir mayúsculas sobre `issue_type`. Una subcadena vacía devuelve
//! todos los registros (como `ILIKE '%%'`), en todas las implementaciones.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use neo4rs::{query, Graph, Row};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{MaintenanceRecord, NewMaintenanceRecord};

#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Nombre del backend, para logs y health check.
    fn backend(&self) -> &'static str;

    /// Registros cuyo `issue_type` contiene `substring`, ordenados por id.
    async fn find_by_issue_type(&self, substring: &str) -> PipelineResult<Vec<MaintenanceRecord>>;

    /// Inserta un registro nuevo y le asigna un id único creciente.
    async fn insert(&self, record: NewMaintenanceRecord) -> PipelineResult<MaintenanceRecord>;
}

fn unavailable(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::RepositoryUnavailable(err.to_string())
}

// ---------------------------------------------------------------------
// NEO4J
// ---------------------------------------------------------------------

/// Registros como nodos (:MaintenanceRecord); los ids salen de un nodo
/// (:Sequence {name: 'maintenance_record'}).
pub struct Neo4jRecordRepository {
    graph: Arc<Graph>,
}

impl Neo4jRecordRepository {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

fn record_from_row(row: &Row) -> PipelineResult<MaintenanceRecord> {
    let field = |name: &str| {
        row.get::<String>(name)
            .ok_or_else(|| unavailable(format!("Falta campo '{name}' en resultado de Neo4j")))
    };
    Ok(MaintenanceRecord {
        id: row
            .get::<i64>("id")
            .ok_or_else(|| unavailable("Falta campo 'id' en resultado de Neo4j"))?,
        issue_type: field("issue_type")?,
        troubleshooting_steps: field("troubleshooting_steps")?,
        solution: field("solution")?,
        logs: field("logs")?,
    })
}

#[async_trait]
impl RecordRepository for Neo4jRecordRepository {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    async fn find_by_issue_type(&self, substring: &str) -> PipelineResult<Vec<MaintenanceRecord>> {
        let cypher = if substring.is_empty() {
            "MATCH (r:MaintenanceRecord)
             RETURN r.id AS id, r.issue_type AS issue_type,
                    r.troubleshooting_steps AS troubleshooting_steps,
                    r.solution AS solution, r.logs AS logs
             ORDER BY id"
        } else {
            "MATCH (r:MaintenanceRecord)
             WHERE toLower(r.issue_type) CONTAINS toLower($needle)
             RETURN r.id AS id, r.issue_type AS issue_type,
                    r.troubleshooting_steps AS troubleshooting_steps,
                    r.solution AS solution, r.logs AS logs
             ORDER BY id"
        };

        let mut cursor = self
            .graph
            .execute(query(cypher).param("needle", substring))
            .await
            .map_err(unavailable)?;

        let mut records = Vec::new();
        while let Some(row) = cursor.next().await.map_err(unavailable)? {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }

    async fn insert(&self, record: NewMaintenanceRecord) -> PipelineResult<MaintenanceRecord> {
        let mut cursor = self
            .graph
            .execute(
                query(
                    "MERGE (s:Sequence {name: 'maintenance_record'})
                     ON CREATE SET s.value = 0
                     SET s.value = s.value + 1
                     WITH s
                     CREATE (r:MaintenanceRecord {
                         id: s.value,
                         issue_type: $issue_type,
                         troubleshooting_steps: $troubleshooting_steps,
                         solution: $solution,
                         logs: $logs
                     })
                     RETURN r.id AS id",
                )
                .param("issue_type", record.issue_type.clone())
                .param("troubleshooting_steps", record.troubleshooting_steps.clone())
                .param("solution", record.solution.clone())
                .param("logs", record.logs.clone()),
            )
            .await
            .map_err(unavailable)?;

        let row = cursor
            .next()
            .await
            .map_err(unavailable)?
            .ok_or_else(|| unavailable("La inserción no devolvió ningún id"))?;
        let id: i64 = row
            .get("id")
            .ok_or_else(|| unavailable("Falta campo 'id' en resultado de Neo4j"))?;
        Ok(record.into_record(id))
    }
}

// ---------------------------------------------------------------------
// EN MEMORIA
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: RwLock<Vec<MaintenanceRecord>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_by_issue_type(&self, substring: &str) -> PipelineResult<Vec<MaintenanceRecord>> {
        let records = self.records.read().map_err(unavailable)?;
        if substring.is_empty() {
            return Ok(records.clone());
        }
        let needle = substring.to_lowercase();
        Ok(records
            .iter()
            .filter(|r| r.issue_type.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: NewMaintenanceRecord) -> PipelineResult<MaintenanceRecord> {
        let mut records = self.records.write().map_err(unavailable)?;
        let id = records.last().map_or(1, |r| r.id + 1);
        let stored = record.into_record(id);
        records.push(stored.clone());
        Ok(stored)
    }
}
