//! In-memory storage backend for testing

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::super::error::StorageResult;
use super::super::traits::{HealthStatus, ProcessStore};
use crate::model::{Priority, Process};

/// In-memory process store. Mirrors the transactional semantics of the
/// SQLite backend: one write guard per mutation, wholesale sub-step
/// replacement on update, cascade on delete.
pub struct MemoryBackend {
    processes: Arc<RwLock<HashMap<i64, Process>>>,
    next_process_id: AtomicI64,
    next_sub_step_id: AtomicI64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(RwLock::new(HashMap::new())),
            next_process_id: AtomicI64::new(1),
            next_sub_step_id: AtomicI64::new(1),
        }
    }

    fn sort_collection(processes: &mut [Process]) {
        processes.sort_by_key(|p| p.id);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessStore for MemoryBackend {
    async fn save(&self, mut process: Process) -> StorageResult<Process> {
        let mut processes = self.processes.write().await;
        let now = Utc::now();

        let previous = match process.id {
            Some(id) => processes.get(&id).cloned(),
            None => None,
        };

        let id = match process.id {
            Some(id) => id,
            None => self.next_process_id.fetch_add(1, Ordering::SeqCst),
        };
        process.id = Some(id);
        process.created_at = previous
            .as_ref()
            .and_then(|p| p.created_at)
            .or(Some(now));
        process.updated_at = Some(now);

        // Wholesale replacement: the incoming collection is the collection.
        // Reused sub-step ids keep their original creation timestamp.
        let previous_steps: HashMap<i64, _> = previous
            .map(|p| {
                p.sub_steps
                    .into_iter()
                    .filter_map(|s| s.id.map(|sid| (sid, s)))
                    .collect()
            })
            .unwrap_or_default();

        for sub_step in &mut process.sub_steps {
            let sub_id = match sub_step.id {
                Some(sid) => sid,
                None => self.next_sub_step_id.fetch_add(1, Ordering::SeqCst),
            };
            sub_step.id = Some(sub_id);
            sub_step.process_id = Some(id);
            sub_step.created_at = previous_steps
                .get(&sub_id)
                .and_then(|s| s.created_at)
                .or(Some(now));
            sub_step.updated_at = Some(now);
        }
        process
            .sub_steps
            .sort_by(|a, b| (a.display_order, a.id).cmp(&(b.display_order, b.id)));

        processes.insert(id, process.clone());
        Ok(process)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Process>> {
        Ok(self.processes.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> StorageResult<Vec<Process>> {
        let mut all: Vec<Process> = self.processes.read().await.values().cloned().collect();
        Self::sort_collection(&mut all);
        Ok(all)
    }

    async fn exists_by_id(&self, id: i64) -> StorageResult<bool> {
        Ok(self.processes.read().await.contains_key(&id))
    }

    async fn delete_by_id(&self, id: i64) -> StorageResult<()> {
        // Sub-steps live inside the owning process entry, so removing the
        // entry is the cascade.
        self.processes.write().await.remove(&id);
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Process>> {
        let needle = title.to_lowercase();
        let mut matches: Vec<Process> = self
            .processes
            .read()
            .await
            .values()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Self::sort_collection(&mut matches);
        Ok(matches)
    }

    async fn search_by_term(&self, term: &str) -> StorageResult<Vec<Process>> {
        let needle = term.to_lowercase();
        let mut matches: Vec<Process> = self
            .processes
            .read()
            .await
            .values()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Self::sort_collection(&mut matches);
        Ok(matches)
    }

    async fn find_by_priority(&self, priority: Priority) -> StorageResult<Vec<Process>> {
        let mut matches: Vec<Process> = self
            .processes
            .read()
            .await
            .values()
            .filter(|p| p.priority == priority)
            .cloned()
            .collect();
        Self::sort_collection(&mut matches);
        Ok(matches)
    }

    async fn find_by_completed(&self, completed: bool) -> StorageResult<Vec<Process>> {
        let mut matches: Vec<Process> = self
            .processes
            .read()
            .await
            .values()
            .filter(|p| p.completed == completed)
            .cloned()
            .collect();
        Self::sort_collection(&mut matches);
        Ok(matches)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: "memory".to_string(),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubStep;

    fn sample_process(title: &str) -> Process {
        Process {
            id: None,
            title: title.to_string(),
            description: Some("relatório mensal".to_string()),
            priority: Priority::Media,
            start_date: "2024-01-01T00:00:00".parse().unwrap(),
            end_date: "2024-01-31T00:00:00".parse().unwrap(),
            completed: false,
            sub_steps: vec![
                SubStep::new("segundo".to_string(), false, 2),
                SubStep::new("primeiro".to_string(), false, 1),
            ],
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn save_assigns_ids_and_timestamps() {
        let store = MemoryBackend::new();
        let saved = store.save(sample_process("Onboarding")).await.unwrap();

        assert_eq!(saved.id, Some(1));
        assert!(saved.created_at.is_some());
        assert!(saved.updated_at.is_some());
        assert!(saved.sub_steps.iter().all(|s| s.id.is_some()));
        assert!(saved.sub_steps.iter().all(|s| s.process_id == Some(1)));
    }

    #[tokio::test]
    async fn sub_steps_are_ordered_by_display_order() {
        let store = MemoryBackend::new();
        let saved = store.save(sample_process("Onboarding")).await.unwrap();
        assert_eq!(saved.sub_steps[0].description, "primeiro");
        assert_eq!(saved.sub_steps[1].description, "segundo");
    }

    #[tokio::test]
    async fn update_replaces_sub_steps_wholesale() {
        let store = MemoryBackend::new();
        let mut saved = store.save(sample_process("Onboarding")).await.unwrap();

        saved.sub_steps = vec![SubStep::new("único".to_string(), true, 0)];
        let updated = store.save(saved).await.unwrap();

        assert_eq!(updated.sub_steps.len(), 1);
        assert_eq!(updated.sub_steps[0].description, "único");

        let reloaded = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(reloaded.sub_steps.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_the_process_and_its_steps() {
        let store = MemoryBackend::new();
        store.save(sample_process("Onboarding")).await.unwrap();

        store.delete_by_id(1).await.unwrap();
        assert!(store.find_by_id(1).await.unwrap().is_none());
        assert!(!store.exists_by_id(1).await.unwrap());
    }

    #[tokio::test]
    async fn title_search_is_case_insensitive() {
        let store = MemoryBackend::new();
        store.save(sample_process("Relatório Anual")).await.unwrap();

        for needle in ["relatório", "ANUAL", "rela"] {
            let found = store.find_by_title(needle).await.unwrap();
            assert_eq!(found.len(), 1, "needle {needle:?} should match");
        }
        assert!(store.find_by_title("inexistente").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn term_search_covers_title_and_description() {
        let store = MemoryBackend::new();
        store.save(sample_process("Relatório Anual")).await.unwrap();

        // "mensal" only appears in the description
        let found = store.search_by_term("MENSAL").await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
