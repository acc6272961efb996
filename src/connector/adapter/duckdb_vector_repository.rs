use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use duckdb::{params, Connection};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::VectorRepository;
use crate::domain::{is_zero_vector, Document, DomainError, SearchResult};

/// DuckDB-backed document store with cosine similarity search.
///
/// Uses an HNSW index from the `vss` extension when it can be loaded and
/// falls back to an exact scan otherwise; results are the same either way.
pub struct DuckdbVectorRepository {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl DuckdbVectorRepository {
    pub fn new(path: &Path, dimensions: usize) -> Result<Self, DomainError> {
        let conn = Connection::open(path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::create_schema(&conn, dimensions)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        })
    }

    pub fn in_memory(dimensions: usize) -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::create_schema(&conn, dimensions)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        })
    }

    fn create_schema(conn: &Connection, dimensions: usize) -> Result<(), DomainError> {
        if dimensions == 0 {
            return Err(DomainError::invalid_input("Embedding dimension must be positive"));
        }

        // Loaded before touching the table: a persisted HNSW index needs vss to open
        let vss_loaded = match conn.execute_batch("INSTALL vss; LOAD vss;") {
            Ok(()) => true,
            Err(e) => {
                warn!("vss extension unavailable, falling back to exact search: {}", e);
                false
            }
        };

        debug!("Initializing DuckDB documents table (FLOAT[{}])", dimensions);
        let create_table = format!(
            "\
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                title TEXT,
                url TEXT,
                metadata TEXT NOT NULL,
                source TEXT NOT NULL,
                timestamp BIGINT NOT NULL,
                embedding FLOAT[{}] NOT NULL
            );

            CREATE INDEX IF NOT EXISTS documents_source_idx ON documents (source);
            ",
            dimensions
        );
        conn.execute_batch(&create_table).map_err(|e| {
            DomainError::storage(format!("Failed to initialize DuckDB tables: {}", e))
        })?;

        // An existing table keeps the dimension it was created with
        if let Some(stored) = Self::stored_dimensions(conn)? {
            if stored != dimensions {
                return Err(DomainError::dimension_mismatch(dimensions, stored));
            }
        }

        if vss_loaded {
            if let Err(e) = Self::create_hnsw_index(conn) {
                warn!("HNSW index unavailable, falling back to exact search: {}", e);
            }
        }

        Ok(())
    }

    /// Dimension of the existing `embedding` column, parsed from its `FLOAT[N]` type.
    fn stored_dimensions(conn: &Connection) -> Result<Option<usize>, DomainError> {
        let data_type: String = conn
            .query_row(
                "SELECT data_type FROM information_schema.columns \
                 WHERE table_name = 'documents' AND column_name = 'embedding' LIMIT 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| DomainError::storage(format!("Failed to read embedding column type: {}", e)))?;

        let parsed = data_type
            .rsplit_once('[')
            .and_then(|(_, rest)| rest.strip_suffix(']'))
            .and_then(|n| n.trim().parse::<usize>().ok());
        if parsed.is_none() {
            warn!("Unrecognized embedding column type {}, skipping dimension check", data_type);
        }
        Ok(parsed)
    }

    fn create_hnsw_index(conn: &Connection) -> Result<(), duckdb::Error> {
        conn.execute_batch("SET hnsw_enable_experimental_persistence = true;")?;
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS documents_embedding_hnsw_idx \
             ON documents USING HNSW (embedding) WITH (metric = 'cosine');",
        )?;
        debug!("HNSW cosine index ready");
        Ok(())
    }

    fn vector_to_array_literal(&self, vector: &[f32]) -> Result<String, DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::dimension_mismatch(self.dimensions, vector.len()));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::invalid_input("Embedding contains non-finite values"));
        }

        let mut s = String::with_capacity(vector.len() * 10);
        s.push('[');
        for (i, v) in vector.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            s.push_str(&v.to_string());
        }
        s.push(']');
        s.push_str(&format!("::FLOAT[{}]", self.dimensions));
        Ok(s)
    }

    fn row_to_document(row: &duckdb::Row<'_>) -> Result<Document, DomainError> {
        let read = |e: duckdb::Error, column: &str| {
            DomainError::storage(format!("Failed to read {}: {}", column, e))
        };

        let metadata_json: String = row.get(4).map_err(|e| read(e, "metadata"))?;
        let metadata: Map<String, Value> = serde_json::from_str(&metadata_json)
            .map_err(|e| DomainError::storage(format!("Corrupt metadata: {}", e)))?;
        let micros: i64 = row.get(6).map_err(|e| read(e, "timestamp"))?;
        let timestamp = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| DomainError::storage(format!("Timestamp out of range: {}", micros)))?;

        // Built field by field so stored content is never re-truncated
        Ok(Document {
            id: row.get(0).map_err(|e| read(e, "id"))?,
            content: row.get(1).map_err(|e| read(e, "content"))?,
            title: row.get(2).map_err(|e| read(e, "title"))?,
            url: row.get(3).map_err(|e| read(e, "url"))?,
            metadata,
            source: row.get(5).map_err(|e| read(e, "source"))?,
            timestamp,
        })
    }
}

#[async_trait]
impl VectorRepository for DuckdbVectorRepository {
    async fn initialize(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        Self::create_schema(&conn, self.dimensions)
    }

    async fn store(&self, documents: &[Document], vectors: &[Vec<f32>]) -> Result<(), DomainError> {
        if documents.len() != vectors.len() {
            return Err(DomainError::storage(format!(
                "Document and vector count mismatch: {} documents, {} vectors",
                documents.len(),
                vectors.len()
            )));
        }
        if documents.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        // Dropping the transaction on any early return rolls the whole batch back
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        for (document, vector) in documents.iter().zip(vectors) {
            let array_lit = self.vector_to_array_literal(vector)?;
            let metadata = serde_json::to_string(document.metadata())
                .map_err(|e| DomainError::storage(format!("Failed to encode metadata: {}", e)))?;

            // Delete then insert: DuckDB refuses in-place updates of indexed columns
            tx.execute("DELETE FROM documents WHERE id = ?", params![document.id()])
                .map_err(|e| {
                    DomainError::storage(format!("Failed to replace document {}: {}", document.id(), e))
                })?;

            // The array literal is inlined because FLOAT[N] cannot be bound as a parameter
            let sql = format!(
                "INSERT INTO documents (id, content, title, url, metadata, source, timestamp, embedding) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, {})",
                array_lit
            );
            tx.execute(
                &sql,
                params![
                    document.id(),
                    document.content(),
                    document.title(),
                    document.url(),
                    metadata,
                    document.source(),
                    document.timestamp().timestamp_micros(),
                ],
            )
            .map_err(|e| {
                DomainError::storage(format!("Failed to insert document {}: {}", document.id(), e))
            })?;
        }

        tx.commit()
            .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))?;

        debug!("Stored {} documents in DuckDB", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let array_lit = self.vector_to_array_literal(query_vector)?;
        if limit == 0 {
            return Err(DomainError::invalid_input("Search limit must be positive"));
        }
        if is_zero_vector(query_vector) {
            return Err(DomainError::invalid_input("Query vector has zero magnitude"));
        }

        let sql = format!(
            "SELECT id, content, title, url, metadata, source, timestamp, \
                array_cosine_distance(embedding, {array_lit}) AS distance \
             FROM documents \
             ORDER BY distance ASC, id ASC \
             LIMIT ?",
            array_lit = array_lit
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare search: {}", e)))?;
        let mut rows = stmt
            .query(params![limit as i64])
            .map_err(|e| DomainError::storage(format!("Failed to run search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?
        {
            let distance: f32 = row
                .get(7)
                .map_err(|e| DomainError::storage(format!("Failed to read distance: {}", e)))?;
            let document = Self::row_to_document(row)?;
            results.push(SearchResult::new(document, 1.0 - distance));
        }
        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute("DELETE FROM documents WHERE source = ?", params![source])
            .map_err(|e| DomainError::storage(format!("Failed to delete source {}: {}", source, e)))?;
        debug!("Deleted {} documents from source {}", deleted, source);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute("DELETE FROM documents", [])
            .map_err(|e| DomainError::storage(format!("Failed to delete documents: {}", e)))?;
        debug!("Deleted all {} documents", deleted);
        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| DomainError::storage(format!("Failed to count documents: {}", e)))?;
        Ok(count as u64)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
