//! Modelos de dominio (registros de mantenimiento).

use serde::Deserialize;

/// Registro de mantenimiento ya persistido.
/// Inmutable una vez creado; el `id` lo asigna el repositorio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceRecord {
    pub id: i64,
    pub issue_type: String,
    pub troubleshooting_steps: String,
    pub solution: String,
    pub logs: String,
}

impl MaintenanceRecord {
    /// Forma en la que el registro entra en el contexto del prompt.
    pub fn as_context(&self) -> String {
        format!("Issue: {}, Solution: {}", self.issue_type, self.solution)
    }
}

/// Datos de un registro pendiente de insertar (sin `id`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMaintenanceRecord {
    pub issue_type: String,
    pub troubleshooting_steps: String,
    pub solution: String,
    pub logs: String,
}

impl NewMaintenanceRecord {
    pub fn into_record(self, id: i64) -> MaintenanceRecord {
        MaintenanceRecord {
            id,
            issue_type: self.issue_type,
            troubleshooting_steps: self.troubleshooting_steps,
            solution: self.solution,
            logs: self.logs,
        }
    }
}
