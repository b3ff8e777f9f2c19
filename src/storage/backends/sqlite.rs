//! SQLite storage backend implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use super::super::config::StorageConfig;
use super::super::error::{StorageError, StorageResult};
use super::super::traits::{HealthStatus, ProcessStore};
use crate::model::{Priority, Process, SubStep};

/// SQLite process store. Each write runs inside one transaction; sub-step
/// rows cascade from their owning process row via foreign keys.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if missing) the database file and bootstrap the schema
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        info!(
            "Initializing SQLite backend at {}",
            config.database_path.display()
        );

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::connection(format!("Failed to open database: {e}")))?;

        let backend = Self { pool };
        backend.initialize_schema().await?;
        Ok(backend)
    }

    /// Create tables and indexes if they do not exist
    async fn initialize_schema(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                titulo TEXT NOT NULL,
                descricao TEXT,
                prioridade TEXT NOT NULL,
                data_inicio TEXT NOT NULL,
                data_termino TEXT NOT NULL,
                concluido INTEGER NOT NULL DEFAULT 0,
                criado_em TEXT NOT NULL,
                atualizado_em TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sub_passo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                processo_id INTEGER NOT NULL REFERENCES processo(id) ON DELETE CASCADE,
                descricao TEXT NOT NULL,
                concluido INTEGER NOT NULL DEFAULT 0,
                ordem_exibicao INTEGER NOT NULL DEFAULT 0,
                criado_em TEXT NOT NULL,
                atualizado_em TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sub_passo_processo ON sub_passo(processo_id)",
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    fn process_from_row(row: &SqliteRow) -> StorageResult<Process> {
        let label: String = row.try_get("prioridade")?;
        let priority = Priority::from_str(&label)
            .map_err(|_| StorageError::serialization(format!("unknown stored priority: {label}")))?;

        Ok(Process {
            id: Some(row.try_get("id")?),
            title: row.try_get("titulo")?,
            description: row.try_get("descricao")?,
            priority,
            start_date: row.try_get::<NaiveDateTime, _>("data_inicio")?,
            end_date: row.try_get::<NaiveDateTime, _>("data_termino")?,
            completed: row.try_get("concluido")?,
            sub_steps: Vec::new(),
            created_at: Some(row.try_get::<DateTime<Utc>, _>("criado_em")?),
            updated_at: Some(row.try_get::<DateTime<Utc>, _>("atualizado_em")?),
        })
    }

    fn sub_step_from_row(row: &SqliteRow) -> StorageResult<SubStep> {
        Ok(SubStep {
            id: Some(row.try_get("id")?),
            description: row.try_get("descricao")?,
            completed: row.try_get("concluido")?,
            display_order: row.try_get("ordem_exibicao")?,
            process_id: Some(row.try_get("processo_id")?),
            created_at: Some(row.try_get::<DateTime<Utc>, _>("criado_em")?),
            updated_at: Some(row.try_get::<DateTime<Utc>, _>("atualizado_em")?),
        })
    }

    async fn load_sub_steps(&self, process_id: i64) -> StorageResult<Vec<SubStep>> {
        let rows = sqlx::query(
            "SELECT id, processo_id, descricao, concluido, ordem_exibicao, criado_em, atualizado_em \
             FROM sub_passo WHERE processo_id = ? ORDER BY ordem_exibicao, id",
        )
        .bind(process_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::sub_step_from_row).collect()
    }

    /// Run a process query and attach each result's sub-steps
    async fn fetch_processes<'q>(
        &self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> StorageResult<Vec<Process>> {
        let rows = query.fetch_all(&self.pool).await?;
        let mut processes = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut process = Self::process_from_row(row)?;
            if let Some(id) = process.id {
                process.sub_steps = self.load_sub_steps(id).await?;
            }
            processes.push(process);
        }
        Ok(processes)
    }
}

const SELECT_PROCESS: &str = "SELECT id, titulo, descricao, prioridade, data_inicio, \
                              data_termino, concluido, criado_em, atualizado_em FROM processo";

#[async_trait]
impl ProcessStore for SqliteBackend {
    async fn save(&self, process: Process) -> StorageResult<Process> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let id = match process.id {
            None => {
                let result = sqlx::query(
                    "INSERT INTO processo (titulo, descricao, prioridade, data_inicio, \
                     data_termino, concluido, criado_em, atualizado_em) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&process.title)
                .bind(&process.description)
                .bind(process.priority.as_str())
                .bind(process.start_date)
                .bind(process.end_date)
                .bind(process.completed)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                result.last_insert_rowid()
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE processo SET titulo = ?, descricao = ?, prioridade = ?, \
                     data_inicio = ?, data_termino = ?, concluido = ?, atualizado_em = ? \
                     WHERE id = ?",
                )
                .bind(&process.title)
                .bind(&process.description)
                .bind(process.priority.as_str())
                .bind(process.start_date)
                .bind(process.end_date)
                .bind(process.completed)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StorageError::not_found(format!("Processo {id}")));
                }
                id
            }
        };

        // Wholesale replacement of the owned collection. Creation timestamps
        // of reused sub-step ids survive the replacement.
        let previous: Vec<(i64, DateTime<Utc>)> =
            sqlx::query("SELECT id, criado_em FROM sub_passo WHERE processo_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .map(|row| {
                    Ok((
                        row.try_get::<i64, _>("id")?,
                        row.try_get::<DateTime<Utc>, _>("criado_em")?,
                    ))
                })
                .collect::<StorageResult<_>>()?;

        sqlx::query("DELETE FROM sub_passo WHERE processo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for sub_step in &process.sub_steps {
            let created_at = sub_step
                .id
                .and_then(|sid| previous.iter().find(|(pid, _)| *pid == sid))
                .map(|(_, created)| *created)
                .unwrap_or(now);

            sqlx::query(
                "INSERT INTO sub_passo (id, processo_id, descricao, concluido, \
                 ordem_exibicao, criado_em, atualizado_em) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(sub_step.id)
            .bind(id)
            .bind(&sub_step.description)
            .bind(sub_step.completed)
            .bind(sub_step.display_order)
            .bind(created_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("Processo {id}")))
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Process>> {
        let row = sqlx::query(&format!("{SELECT_PROCESS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut process = Self::process_from_row(&row)?;
                process.sub_steps = self.load_sub_steps(id).await?;
                Ok(Some(process))
            }
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> StorageResult<Vec<Process>> {
        let sql = format!("{SELECT_PROCESS} ORDER BY id");
        self.fetch_processes(sqlx::query(&sql)).await
    }

    async fn exists_by_id(&self, id: i64) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM processo WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn delete_by_id(&self, id: i64) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        // Explicit cascade; foreign keys are also ON DELETE CASCADE but the
        // delete must not depend on the pragma being active.
        sqlx::query("DELETE FROM sub_passo WHERE processo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM processo WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Process>> {
        let sql = format!(
            "{SELECT_PROCESS} WHERE LOWER(titulo) LIKE '%' || LOWER(?) || '%' ORDER BY id"
        );
        self.fetch_processes(sqlx::query(&sql).bind(title.to_string()))
            .await
    }

    async fn search_by_term(&self, term: &str) -> StorageResult<Vec<Process>> {
        let sql = format!(
            "{SELECT_PROCESS} WHERE LOWER(titulo) LIKE '%' || LOWER(?1) || '%' \
             OR LOWER(COALESCE(descricao, '')) LIKE '%' || LOWER(?1) || '%' ORDER BY id"
        );
        self.fetch_processes(sqlx::query(&sql).bind(term.to_string()))
            .await
    }

    async fn find_by_priority(&self, priority: Priority) -> StorageResult<Vec<Process>> {
        let sql = format!("{SELECT_PROCESS} WHERE prioridade = ? ORDER BY id");
        self.fetch_processes(sqlx::query(&sql).bind(priority.as_str()))
            .await
    }

    async fn find_by_completed(&self, completed: bool) -> StorageResult<Vec<Process>> {
        let sql = format!("{SELECT_PROCESS} WHERE concluido = ? ORDER BY id");
        self.fetch_processes(sqlx::query(&sql).bind(completed)).await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                backend_type: "sqlite".to_string(),
                error: None,
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                backend_type: "sqlite".to_string(),
                error: Some(e.to_string()),
            }),
        }
    }
}
