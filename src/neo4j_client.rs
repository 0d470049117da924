use anyhow::Result;
use neo4rs::{query, Graph};
use tracing::info;
use url::Url;

pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Graph> {
    let url = Url::parse(uri)?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    let addr = format!("{host}:{port}");

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, user, password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// Crea los constraints de los registros de mantenimiento:
/// :MaintenanceRecord(id) único y el contador de ids.
pub async fn ensure_schema(graph: &Graph) -> Result<()> {
    let statements = [
        "CREATE CONSTRAINT maintenance_record_id IF NOT EXISTS
         FOR (r:MaintenanceRecord)
         REQUIRE r.id IS UNIQUE",
        "CREATE CONSTRAINT sequence_name IF NOT EXISTS
         FOR (s:Sequence)
         REQUIRE s.name IS UNIQUE",
    ];

    for stmt in statements {
        graph.run(query(stmt)).await?;
    }

    info!("Esquema de Neo4j asegurado (constraints de registros creados).");
    Ok(())
}
