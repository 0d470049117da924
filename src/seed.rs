//! Carga inicial de registros de mantenimiento.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::NewMaintenanceRecord;
use crate::repository::RecordRepository;

pub fn sample_record() -> NewMaintenanceRecord {
    NewMaintenanceRecord {
        issue_type: "Leaking pipe".to_string(),
        troubleshooting_steps: "Check seals".to_string(),
        solution: "Replace seal".to_string(),
        logs: "Pipe was leaking due to worn seal.".to_string(),
    }
}

/// Inserta los registros cuyo `issue_type` aún no exista (sin distinguir
/// mayúsculas). Devuelve cuántos se han insertado.
pub async fn seed_records(
    repository: &dyn RecordRepository,
    records: Vec<NewMaintenanceRecord>,
) -> Result<usize> {
    let mut inserted = 0;
    for record in records {
        let existing = repository.find_by_issue_type(&record.issue_type).await?;
        let wanted = record.issue_type.to_lowercase();
        let already_there = existing
            .iter()
            .any(|r| r.issue_type.to_lowercase() == wanted);
        if already_there {
            continue;
        }
        let stored = repository.insert(record).await?;
        info!("Registro {} ('{}') insertado.", stored.id, stored.issue_type);
        inserted += 1;
    }
    Ok(inserted)
}

/// Lee un array JSON de registros desde disco.
pub fn load_seed_file(path: &Path) -> Result<Vec<NewMaintenanceRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("No se pudo leer el fichero de semillas {}", path.display()))?;
    let records = serde_json::from_str(&raw)
        .with_context(|| format!("Fichero de semillas inválido: {}", path.display()))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRecordRepository;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = InMemoryRecordRepository::new();

        assert_eq!(seed_records(&repo, vec![sample_record()]).await.unwrap(), 1);
        assert_eq!(seed_records(&repo, vec![sample_record()]).await.unwrap(), 0);

        let all = repo.find_by_issue_type("").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[0].solution, "Replace seal");
    }

    #[tokio::test]
    async fn issue_type_containing_another_is_still_seeded() {
        let repo = InMemoryRecordRepository::new();
        seed_records(&repo, vec![sample_record()]).await.unwrap();

        let mut longer = sample_record();
        longer.issue_type = "Leaking pipe under sink".to_string();
        let mut shorter = sample_record();
        shorter.issue_type = "pipe".to_string();

        assert_eq!(seed_records(&repo, vec![longer, shorter]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn non_ascii_issue_types_are_not_duplicated() {
        let repo = InMemoryRecordRepository::new();
        let mut record = sample_record();
        record.issue_type = "Fuga en tubería".to_string();
        seed_records(&repo, vec![record.clone()]).await.unwrap();

        record.issue_type = "FUGA EN TUBERÍA".to_string();
        assert_eq!(seed_records(&repo, vec![record]).await.unwrap(), 0);
        assert_eq!(repo.find_by_issue_type("").await.unwrap().len(), 1);
    }

    #[test]
    fn seed_file_parses_json_array() {
        let path = std::env::temp_dir().join(format!("seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"issue_type":"Tripped breaker","troubleshooting_steps":"Inspect panel","solution":"Reset breaker","logs":""}]"#,
        )
        .unwrap();

        let records = load_seed_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].solution, "Reset breaker");
        assert!(load_seed_file(Path::new("/definitely/not/here.json")).is_err());
    }
}
