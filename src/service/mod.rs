//! Orchestration between validation, domain entities, and the store.
//!
//! Every mutation recomputes the parent's derived completion flag before it
//! is persisted; clients never write `concluido` directly.

use std::sync::Arc;
use tracing::debug;

use crate::dto::{ProcessDto, ProcessRequest};
use crate::error::{Error, Result};
use crate::model::{Process, SubStep};
use crate::storage::{HealthStatus, ProcessStore};
use crate::validation::{validate, ValidatedSubStep};

pub struct ProcessService {
    store: Arc<dyn ProcessStore>,
}

impl ProcessService {
    pub fn new(store: Arc<dyn ProcessStore>) -> Self {
        Self { store }
    }

    /// Create a process with its sub-steps. The top-level completion flag is
    /// recomputed from the sub-step collection, so a fully-completed
    /// checklist at creation time yields a completed process.
    pub async fn create(&self, payload: ProcessRequest) -> Result<ProcessDto> {
        let validated = validate(&payload)?;
        debug!("Creating process: {}", validated.title);

        let mut process = Process {
            id: None,
            title: validated.title,
            description: validated.description,
            priority: validated.priority,
            start_date: validated.start_date,
            end_date: validated.end_date,
            completed: false,
            sub_steps: Vec::new(),
            created_at: None,
            updated_at: None,
        };
        for entry in validated.sub_steps {
            // Ids in a create payload are ignored; every sub-step is new
            process.add_sub_step(new_sub_step(&entry, false));
        }
        process.refresh_completion();

        let saved = self.store.save(process).await?;
        Ok(saved.into())
    }

    /// Every process, each with its sub-steps
    pub async fn list_all(&self) -> Result<Vec<ProcessDto>> {
        let processes = self.store.find_all().await?;
        Ok(processes.into_iter().map(ProcessDto::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<ProcessDto> {
        let process = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Processo não encontrado com ID: {id}")))?;
        Ok(process.into())
    }

    /// Overwrite scalar fields and replace the sub-step collection
    /// wholesale: entries carrying an id keep it, the rest are new rows, and
    /// stored rows absent from the payload are removed.
    pub async fn update(&self, id: i64, payload: ProcessRequest) -> Result<ProcessDto> {
        let mut process = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Processo não encontrado com ID: {id}")))?;

        let validated = validate(&payload)?;
        debug!("Updating process {id}: {}", validated.title);

        process.title = validated.title;
        process.description = validated.description;
        process.priority = validated.priority;
        process.start_date = validated.start_date;
        process.end_date = validated.end_date;

        process.sub_steps.clear();
        for entry in validated.sub_steps {
            process.add_sub_step(new_sub_step(&entry, true));
        }
        process.refresh_completion();

        let saved = self.store.save(process).await?;
        Ok(saved.into())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.exists_by_id(id).await? {
            return Err(Error::not_found(format!(
                "Processo não encontrado com ID: {id}"
            )));
        }
        debug!("Deleting process {id}");
        self.store.delete_by_id(id).await?;
        Ok(())
    }

    /// Case-insensitive substring search on the title
    pub async fn search_by_title(&self, title: &str) -> Result<Vec<ProcessDto>> {
        let processes = self.store.find_by_title(title).await?;
        Ok(processes.into_iter().map(ProcessDto::from).collect())
    }

    /// Case-insensitive substring search across title and description
    pub async fn search_by_term(&self, term: &str) -> Result<Vec<ProcessDto>> {
        let processes = self.store.search_by_term(term).await?;
        Ok(processes.into_iter().map(ProcessDto::from).collect())
    }

    /// Exact match on a priority parsed from its text label
    pub async fn filter_by_priority(&self, label: &str) -> Result<Vec<ProcessDto>> {
        let priority = label.parse()?;
        let processes = self.store.find_by_priority(priority).await?;
        Ok(processes.into_iter().map(ProcessDto::from).collect())
    }

    /// Exact match on the derived completion flag
    pub async fn filter_by_completed(&self, completed: bool) -> Result<Vec<ProcessDto>> {
        let processes = self.store.find_by_completed(completed).await?;
        Ok(processes.into_iter().map(ProcessDto::from).collect())
    }

    /// Set one sub-step's completion flag and recompute the parent's.
    /// The sub-step must belong to the given process.
    pub async fn set_sub_step_completion(
        &self,
        process_id: i64,
        sub_step_id: i64,
        completed: bool,
    ) -> Result<ProcessDto> {
        let mut process = self
            .store
            .find_by_id(process_id)
            .await?
            .ok_or_else(|| Error::not_found("Processo não encontrado"))?;

        let sub_step = process
            .sub_steps
            .iter_mut()
            .find(|s| s.id == Some(sub_step_id))
            .ok_or_else(|| Error::not_found("Sub-passo não encontrado"))?;
        sub_step.completed = completed;

        process.refresh_completion();
        debug!(
            "Toggled sub-step {sub_step_id} of process {process_id} to {completed}"
        );

        let saved = self.store.save(process).await?;
        Ok(saved.into())
    }

    /// Probe the backing store
    pub async fn health(&self) -> Result<HealthStatus> {
        Ok(self.store.health_check().await?)
    }
}

fn new_sub_step(entry: &ValidatedSubStep, keep_id: bool) -> SubStep {
    let mut sub_step = SubStep::new(entry.description.clone(), entry.completed, entry.display_order);
    if keep_id {
        sub_step.id = entry.id;
    }
    sub_step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::SubStepRequest;
    use crate::storage::MemoryBackend;

    fn service() -> ProcessService {
        ProcessService::new(Arc::new(MemoryBackend::new()))
    }

    fn onboarding_payload() -> ProcessRequest {
        ProcessRequest {
            title: Some("Onboarding".to_string()),
            description: None,
            priority: Some("ALTA".to_string()),
            start_date: Some("2024-01-01T00:00:00".parse().unwrap()),
            end_date: Some("2024-01-31T00:00:00".parse().unwrap()),
            sub_steps: vec![SubStepRequest {
                id: None,
                description: Some("Assinar contrato".to_string()),
                completed: false,
                display_order: 1,
            }],
            completed: None,
        }
    }

    #[tokio::test]
    async fn create_returns_incomplete_process_for_pending_checklist() {
        let service = service();
        let created = service.create(onboarding_payload()).await.unwrap();

        assert!(created.id.is_some());
        assert!(!created.completed);
        assert_eq!(created.sub_steps.len(), 1);
    }

    #[tokio::test]
    async fn create_with_fully_completed_checklist_is_complete() {
        let service = service();
        let mut payload = onboarding_payload();
        payload.sub_steps[0].completed = true;

        let created = service.create(payload).await.unwrap();
        assert!(created.completed);
    }

    #[tokio::test]
    async fn inbound_concluido_is_ignored() {
        let service = service();
        let mut payload = onboarding_payload();
        payload.completed = Some(true);

        let created = service.create(payload).await.unwrap();
        assert!(!created.completed, "derived flag must win over the payload");
    }

    #[tokio::test]
    async fn toggling_the_last_pending_sub_step_completes_the_process() {
        let service = service();
        let created = service.create(onboarding_payload()).await.unwrap();
        let process_id = created.id.unwrap();
        let sub_step_id = created.sub_steps[0].id.unwrap();

        let updated = service
            .set_sub_step_completion(process_id, sub_step_id, true)
            .await
            .unwrap();
        assert!(updated.completed);
        assert!(updated.sub_steps[0].completed);

        let reverted = service
            .set_sub_step_completion(process_id, sub_step_id, false)
            .await
            .unwrap();
        assert!(!reverted.completed);
    }

    #[tokio::test]
    async fn toggle_rejects_foreign_sub_step_ids() {
        let service = service();
        let first = service.create(onboarding_payload()).await.unwrap();
        let second = service.create(onboarding_payload()).await.unwrap();

        let foreign_sub_step = second.sub_steps[0].id.unwrap();
        let err = service
            .set_sub_step_completion(first.id.unwrap(), foreign_sub_step, true)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Sub-passo não encontrado");
    }

    #[tokio::test]
    async fn update_replaces_sub_steps_wholesale() {
        let service = service();
        let created = service.create(onboarding_payload()).await.unwrap();
        let id = created.id.unwrap();

        let mut payload = onboarding_payload();
        payload.sub_steps = vec![];
        let updated = service.update(id, payload).await.unwrap();

        assert!(updated.sub_steps.is_empty());
        assert!(!updated.completed);

        let fetched = service.get(id).await.unwrap();
        assert!(fetched.sub_steps.is_empty());
    }

    #[tokio::test]
    async fn failed_update_leaves_the_record_unchanged() {
        let service = service();
        let created = service.create(onboarding_payload()).await.unwrap();
        let id = created.id.unwrap();

        let mut bad = onboarding_payload();
        bad.start_date = Some("2024-03-01T00:00:00".parse().unwrap());
        bad.end_date = Some("2024-01-01T00:00:00".parse().unwrap());
        let err = service.update(id, bad).await.unwrap_err();
        assert!(err.is_validation());

        let fetched = service.get(id).await.unwrap();
        assert_eq!(fetched.sub_steps.len(), 1);
        assert_eq!(
            fetched.start_date,
            "2024-01-01T00:00:00".parse().unwrap()
        );
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let err = service().get(99).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("99"));
    }

    #[tokio::test]
    async fn delete_cascades_and_rejects_unknown_ids() {
        let service = service();
        let created = service.create(onboarding_payload()).await.unwrap();
        let id = created.id.unwrap();

        service.delete(id).await.unwrap();
        assert!(service.get(id).await.unwrap_err().is_not_found());
        assert!(service.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn filter_by_priority_parses_labels() {
        let service = service();
        service.create(onboarding_payload()).await.unwrap();

        let found = service.filter_by_priority("alta").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(service.filter_by_priority("media").await.unwrap().is_empty());

        let err = service.filter_by_priority("URGENTE").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn filter_by_completed_tracks_the_derived_flag() {
        let service = service();
        let mut done = onboarding_payload();
        done.title = Some("Concluído".to_string());
        done.sub_steps[0].completed = true;
        service.create(done).await.unwrap();
        service.create(onboarding_payload()).await.unwrap();

        let completed = service.filter_by_completed(true).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "Concluído");

        let pending = service.filter_by_completed(false).await.unwrap();
        assert_eq!(pending.len(), 1);
    }
}
