//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `stepwise-core` using sqlx with split
//! read/write pools. Workflow definitions are stored as JSON blobs. Runs and
//! step records track execution state for querying and auditing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use stepwise_core::repository::workflow::WorkflowRepository;
use stepwise_types::error::RepositoryError;
use stepwise_types::workflow::{
    RunStatus, StepLogEntry, StepRecord, StepStatus, WorkflowDefinition, WorkflowRun,
};
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct RunRow {
    id: String,
    workflow_id: String,
    status: String,
    trigger_input: Option<String>,
    log: String,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl RunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            status: row.try_get("status")?,
            trigger_input: row.try_get("trigger_input")?,
            log: row.try_get("log")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_run(self) -> Result<WorkflowRun, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let status: RunStatus = status_from_str(&self.status)?;

        let trigger = self
            .trigger_input
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid trigger JSON: {e}")))
            })
            .transpose()?;

        let log: Vec<StepLogEntry> = serde_json::from_str(&self.log)
            .map_err(|e| RepositoryError::Query(format!("invalid step log JSON: {e}")))?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(WorkflowRun {
            id,
            workflow_id: self.workflow_id,
            status,
            trigger,
            log,
            error: self.error,
            started_at,
            completed_at,
        })
    }
}

struct StepRow {
    id: String,
    run_id: String,
    action_id: String,
    action_type: String,
    status: String,
    input: String,
    output: Option<String>,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl StepRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            action_id: row.try_get("action_id")?,
            action_type: row.try_get("action_type")?,
            status: row.try_get("status")?,
            input: row.try_get("input")?,
            output: row.try_get("output")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_record(self) -> Result<StepRecord, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let run_id = parse_uuid(&self.run_id)?;
        let status: StepStatus = status_from_str(&self.status)?;

        let input = serde_json::from_str(&self.input)
            .map_err(|e| RepositoryError::Query(format!("invalid step input: {e}")))?;

        let output = self
            .output
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid step output: {e}")))
            })
            .transpose()?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(StepRecord {
            id,
            run_id,
            action_id: self.action_id,
            action_type: self.action_type,
            status,
            input,
            output,
            error: self.error,
            started_at,
            completed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Serialize a status enum to its snake_case wire string.
fn status_to_str<S: Serialize>(status: &S) -> Result<String, RepositoryError> {
    serde_json::to_value(status)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RepositoryError::Query("status did not serialize to a string".to_string()))
}

/// Parse a status enum from its snake_case wire string.
fn status_from_str<S: DeserializeOwned>(s: &str) -> Result<S, RepositoryError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| RepositoryError::Query(format!("invalid status: {s}")))
}

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn save_definition(&self, def: &WorkflowDefinition) -> Result<(), RepositoryError> {
        let definition_json = serde_json::to_string(def)
            .map_err(|e| RepositoryError::Query(format!("serialize definition: {e}")))?;
        let now = format_datetime(&Utc::now());

        sqlx::query(
            r#"INSERT INTO workflows (id, name, definition, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 definition = excluded.definition,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&def.id)
        .bind(&def.name)
        .bind(&definition_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_definition(&self, id: &str) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            let definition: String = row
                .try_get("definition")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            serde_json::from_str(&definition)
                .map_err(|e| RepositoryError::Query(format!("invalid workflow definition JSON: {e}")))
        })
        .transpose()
    }

    async fn list_definitions(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let rows = sqlx::query("SELECT definition FROM workflows ORDER BY name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut defs = Vec::with_capacity(rows.len());
        for row in &rows {
            let definition: String = row
                .try_get("definition")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            defs.push(serde_json::from_str(&definition).map_err(|e| {
                RepositoryError::Query(format!("invalid workflow definition JSON: {e}"))
            })?);
        }
        Ok(defs)
    }

    async fn delete_definition(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_run(&self, run: &WorkflowRun) -> Result<(), RepositoryError> {
        let status = status_to_str(&run.status)?;

        let trigger = run
            .trigger
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let log = serde_json::to_string(&run.log)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO workflow_runs
               (id, workflow_id, status, trigger_input, log, error, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(&run.workflow_id)
        .bind(&status)
        .bind(&trigger)
        .bind(&log)
        .bind(&run.error)
        .bind(format_datetime(&run.started_at))
        .bind(run.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_run(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        log: &[StepLogEntry],
        error: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let status = status_to_str(&status)?;
        let log = serde_json::to_string(log)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE workflow_runs SET status = ?, log = ?, error = ?, completed_at = ? WHERE id = ?",
        )
        .bind(&status)
        .bind(&log)
        .bind(error)
        .bind(format_datetime(&completed_at))
        .bind(run_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> Result<Option<WorkflowRun>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflow_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = RunRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_run()?))
            }
            None => Ok(None),
        }
    }

    async fn list_runs(
        &self,
        workflow_id: &str,
        limit: u32,
    ) -> Result<Vec<WorkflowRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_runs WHERE workflow_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = RunRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            runs.push(r.into_run()?);
        }
        Ok(runs)
    }

    async fn create_step(&self, record: &StepRecord) -> Result<(), RepositoryError> {
        let status = status_to_str(&record.status)?;

        let input = serde_json::to_string(&record.input)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let output = record
            .output
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO workflow_steps
               (id, run_id, action_id, action_type, status, input, output, error,
                started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.run_id.to_string())
        .bind(&record.action_id)
        .bind(&record.action_type)
        .bind(&status)
        .bind(&input)
        .bind(&output)
        .bind(&record.error)
        .bind(format_datetime(&record.started_at))
        .bind(record.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_step(
        &self,
        step_id: &Uuid,
        status: StepStatus,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let status = status_to_str(&status)?;

        let output = output
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE workflow_steps SET status = ?, output = ?, error = ?, completed_at = ? WHERE id = ?",
        )
        .bind(&status)
        .bind(&output)
        .bind(error)
        .bind(format_datetime(&Utc::now()))
        .bind(step_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_steps(&self, run_id: &Uuid) -> Result<Vec<StepRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_steps WHERE run_id = ? ORDER BY started_at ASC, id ASC",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = StepRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            records.push(r.into_record()?);
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_types::workflow::ActionDefinition;

    async fn test_repo() -> (tempfile::TempDir, SqliteWorkflowRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(&dir.path().join("test.db")).await.unwrap();
        (dir, SqliteWorkflowRepository::new(pool))
    }

    fn sample_definition(id: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            id: id.to_string(),
            name: format!("Workflow {id}"),
            description: None,
            actions: vec![ActionDefinition {
                id: "fetch".to_string(),
                action_type: "http_request".to_string(),
                config: json!({ "url": "https://example.com" }),
                output_key: Some("response".to_string()),
            }],
        }
    }

    fn sample_run(workflow_id: &str) -> WorkflowRun {
        WorkflowRun {
            id: Uuid::now_v7(),
            workflow_id: workflow_id.to_string(),
            status: RunStatus::Running,
            trigger: Some(json!({ "source": "test" })),
            log: vec![],
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_definition_save_get_roundtrip() {
        let (_dir, repo) = test_repo().await;
        let def = sample_definition("wf-a");

        repo.save_definition(&def).await.unwrap();
        let loaded = repo.get_definition("wf-a").await.unwrap().unwrap();

        assert_eq!(loaded.name, "Workflow wf-a");
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(loaded.actions[0].output_key.as_deref(), Some("response"));
    }

    #[tokio::test]
    async fn test_definition_upsert_replaces() {
        let (_dir, repo) = test_repo().await;
        let mut def = sample_definition("wf-a");
        repo.save_definition(&def).await.unwrap();

        def.name = "Renamed".to_string();
        repo.save_definition(&def).await.unwrap();

        let loaded = repo.get_definition("wf-a").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert_eq!(repo.list_definitions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_definition_list_ordered_by_name() {
        let (_dir, repo) = test_repo().await;
        let mut b = sample_definition("wf-b");
        b.name = "Beta".to_string();
        let mut a = sample_definition("wf-a");
        a.name = "Alpha".to_string();

        repo.save_definition(&b).await.unwrap();
        repo.save_definition(&a).await.unwrap();

        let names: Vec<String> = repo
            .list_definitions()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_definition_delete() {
        let (_dir, repo) = test_repo().await;
        repo.save_definition(&sample_definition("wf-a")).await.unwrap();

        assert!(repo.delete_definition("wf-a").await.unwrap());
        assert!(!repo.delete_definition("wf-a").await.unwrap());
        assert!(repo.get_definition("wf-a").await.unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_run_create_and_get() {
        let (_dir, repo) = test_repo().await;
        let run = sample_run("wf-a");

        repo.create_run(&run).await.unwrap();
        let loaded = repo.get_run(&run.id).await.unwrap().unwrap();

        assert_eq!(loaded.workflow_id, "wf-a");
        assert_eq!(loaded.status, RunStatus::Running);
        assert_eq!(loaded.trigger, Some(json!({ "source": "test" })));
        assert!(loaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_run_terminal_update() {
        let (_dir, repo) = test_repo().await;
        let run = sample_run("wf-a");
        repo.create_run(&run).await.unwrap();

        let log = vec![
            StepLogEntry::completed("fetch", json!({ "status": 200 })),
            StepLogEntry::failed("notify", "boom"),
        ];
        repo.update_run(&run.id, RunStatus::Failed, &log, Some("boom"), Utc::now())
            .await
            .unwrap();

        let loaded = repo.get_run(&run.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
        assert_eq!(loaded.log, log);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_run_is_not_found() {
        let (_dir, repo) = test_repo().await;
        let err = repo
            .update_run(&Uuid::now_v7(), RunStatus::Completed, &[], None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_runs_most_recent_first_with_limit() {
        let (_dir, repo) = test_repo().await;

        let mut ids = Vec::new();
        for i in 0..3i64 {
            let mut run = sample_run("wf-a");
            run.started_at = Utc::now() + chrono::Duration::seconds(i);
            ids.push(run.id);
            repo.create_run(&run).await.unwrap();
        }
        repo.create_run(&sample_run("wf-other")).await.unwrap();

        let runs = repo.list_runs("wf-a", 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, ids[2], "most recent run first");
        assert_eq!(runs[1].id, ids[1]);
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_step_create_update_list() {
        let (_dir, repo) = test_repo().await;
        let run = sample_run("wf-a");
        repo.create_run(&run).await.unwrap();

        let mut first = StepRecord {
            id: Uuid::now_v7(),
            run_id: run.id,
            action_id: "fetch".to_string(),
            action_type: "http_request".to_string(),
            status: StepStatus::Running,
            input: json!({ "url": "https://example.com/{{trigger.path}}" }),
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        repo.create_step(&first).await.unwrap();

        let second = StepRecord {
            id: Uuid::now_v7(),
            run_id: run.id,
            action_id: "notify".to_string(),
            action_type: "log".to_string(),
            status: StepStatus::Running,
            input: json!({ "message": "done" }),
            output: None,
            error: None,
            started_at: Utc::now() + chrono::Duration::milliseconds(5),
            completed_at: None,
        };
        repo.create_step(&second).await.unwrap();

        repo.update_step(
            &first.id,
            StepStatus::Completed,
            Some(&json!({ "status": 200 })),
            None,
        )
        .await
        .unwrap();
        first.status = StepStatus::Completed;

        let steps = repo.list_steps(&run.id).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].action_id, "fetch");
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[0].output, Some(json!({ "status": 200 })));
        assert!(steps[0].completed_at.is_some());
        // Raw input survives untouched.
        assert_eq!(
            steps[0].input,
            json!({ "url": "https://example.com/{{trigger.path}}" })
        );
        assert_eq!(steps[1].action_id, "notify");
        assert_eq!(steps[1].status, StepStatus::Running);
    }

    #[tokio::test]
    async fn test_step_failure_records_error() {
        let (_dir, repo) = test_repo().await;
        let run = sample_run("wf-a");
        repo.create_run(&run).await.unwrap();

        let step = StepRecord {
            id: Uuid::now_v7(),
            run_id: run.id,
            action_id: "fetch".to_string(),
            action_type: "http_request".to_string(),
            status: StepStatus::Running,
            input: json!({}),
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        repo.create_step(&step).await.unwrap();
        repo.update_step(&step.id, StepStatus::Failed, None, Some("connection refused"))
            .await
            .unwrap();

        let steps = repo.list_steps(&run.id).await.unwrap();
        assert_eq!(steps[0].status, StepStatus::Failed);
        assert_eq!(steps[0].error.as_deref(), Some("connection refused"));
        assert!(steps[0].output.is_none());
    }

    #[tokio::test]
    async fn test_deleting_run_cascades_to_steps() {
        let (_dir, repo) = test_repo().await;
        let run = sample_run("wf-a");
        repo.create_run(&run).await.unwrap();

        let step = StepRecord {
            id: Uuid::now_v7(),
            run_id: run.id,
            action_id: "fetch".to_string(),
            action_type: "echo".to_string(),
            status: StepStatus::Running,
            input: json!({}),
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        repo.create_step(&step).await.unwrap();

        sqlx::query("DELETE FROM workflow_runs WHERE id = ?")
            .bind(run.id.to_string())
            .execute(&repo.pool.writer)
            .await
            .unwrap();

        let steps = repo.list_steps(&run.id).await.unwrap();
        assert!(steps.is_empty(), "FK cascade should remove steps");
    }
}
