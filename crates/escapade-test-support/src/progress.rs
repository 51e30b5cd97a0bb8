//! Test progress stores: `ProgressRepository` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use escapade_core::error::EngineError;
use escapade_core::model::PlayerProgress;
use escapade_core::repository::ProgressRepository;
use uuid::Uuid;

/// A progress store held in memory that enforces the same constraints as
/// the database: one project per phone number, versioned saves and
/// idempotent item grants.
#[derive(Debug, Default)]
pub struct InMemoryProgressRepository {
    records: Mutex<Vec<PlayerProgress>>,
    injected_conflicts: AtomicU32,
    saves: AtomicUsize,
}

impl InMemoryProgressRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    #[must_use]
    pub fn with_progress(records: Vec<PlayerProgress>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make the next `count` saves fail with a concurrency conflict, as if
    /// another delivery had written first.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Returns a snapshot of every stored record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<PlayerProgress> {
        self.records.lock().unwrap().clone()
    }

    /// Returns the stored record for (phone, project), if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, phone_number: &str, project_id: Uuid) -> Option<PlayerProgress> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.phone_number == phone_number && p.project_id == project_id)
            .cloned()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn find(
        &self,
        phone_number: &str,
        project_id: Uuid,
    ) -> Result<Option<PlayerProgress>, EngineError> {
        Ok(self.get(phone_number, project_id))
    }

    async fn find_active(&self, phone_number: &str) -> Result<Option<PlayerProgress>, EngineError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.phone_number == phone_number)
            .max_by_key(|p| p.last_interaction_at)
            .cloned())
    }

    async fn create(&self, progress: &PlayerProgress) -> Result<(), EngineError> {
        let mut records = self.records.lock().unwrap();
        let held = records
            .iter()
            .filter(|p| p.phone_number == progress.phone_number)
            .map(|p| p.project_id)
            .max_by_key(|project_id| *project_id == progress.project_id);
        match held {
            Some(project_id) if project_id == progress.project_id => {
                Err(EngineError::ProgressAlreadyExists {
                    phone_number: progress.phone_number.clone(),
                    project_id,
                })
            }
            Some(active_project_id) => Err(EngineError::SessionConflict {
                phone_number: progress.phone_number.clone(),
                active_project_id,
                requested_project_id: progress.project_id,
            }),
            None => {
                records.push(progress.clone());
                Ok(())
            }
        }
    }

    async fn save(&self, progress: &PlayerProgress) -> Result<i64, EngineError> {
        let mut records = self.records.lock().unwrap();
        let Some(stored) = records.iter_mut().find(|p| p.id == progress.id) else {
            return Err(EngineError::ConcurrencyConflict {
                progress_id: progress.id,
                expected: progress.version,
                actual: -1,
            });
        };

        let injected = self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || stored.version != progress.version {
            return Err(EngineError::ConcurrencyConflict {
                progress_id: progress.id,
                expected: progress.version,
                actual: stored.version,
            });
        }

        let mut collected = stored.collected_items.clone();
        for item in &progress.collected_items {
            if !collected.iter().any(|c| c.item_id == item.item_id) {
                collected.push(item.clone());
            }
        }
        *stored = PlayerProgress {
            collected_items: collected,
            version: progress.version + 1,
            ..progress.clone()
        };
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(stored.version)
    }

    async fn delete(&self, progress_id: Uuid) -> Result<(), EngineError> {
        self.records.lock().unwrap().retain(|p| p.id != progress_id);
        Ok(())
    }

    async fn attach_item(
        &self,
        progress_id: Uuid,
        item_id: Uuid,
        collected_at: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|p| p.id == progress_id)
            .ok_or_else(|| EngineError::Infrastructure(format!("no progress {progress_id}")))?;
        Ok(stored.collect_item(item_id, collected_at))
    }
}

/// An in-memory store that yields to the runtime before every call, so two
/// turns driven with `tokio::join!` interleave their reads and writes.
#[derive(Debug, Default)]
pub struct InterleavingProgressRepository {
    inner: InMemoryProgressRepository,
}

impl InterleavingProgressRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for assertions.
    #[must_use]
    pub fn inner(&self) -> &InMemoryProgressRepository {
        &self.inner
    }
}

#[async_trait]
impl ProgressRepository for InterleavingProgressRepository {
    async fn find(
        &self,
        phone_number: &str,
        project_id: Uuid,
    ) -> Result<Option<PlayerProgress>, EngineError> {
        tokio::task::yield_now().await;
        self.inner.find(phone_number, project_id).await
    }

    async fn find_active(&self, phone_number: &str) -> Result<Option<PlayerProgress>, EngineError> {
        tokio::task::yield_now().await;
        self.inner.find_active(phone_number).await
    }

    async fn create(&self, progress: &PlayerProgress) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        self.inner.create(progress).await
    }

    async fn save(&self, progress: &PlayerProgress) -> Result<i64, EngineError> {
        tokio::task::yield_now().await;
        self.inner.save(progress).await
    }

    async fn delete(&self, progress_id: Uuid) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        self.inner.delete(progress_id).await
    }

    async fn attach_item(
        &self,
        progress_id: Uuid,
        item_id: Uuid,
        collected_at: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        tokio::task::yield_now().await;
        self.inner.attach_item(progress_id, item_id, collected_at).await
    }
}

/// A progress store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingProgressRepository;

fn refused() -> EngineError {
    EngineError::Infrastructure("connection refused".into())
}

#[async_trait]
impl ProgressRepository for FailingProgressRepository {
    async fn find(
        &self,
        _phone_number: &str,
        _project_id: Uuid,
    ) -> Result<Option<PlayerProgress>, EngineError> {
        Err(refused())
    }

    async fn find_active(&self, _phone_number: &str) -> Result<Option<PlayerProgress>, EngineError> {
        Err(refused())
    }

    async fn create(&self, _progress: &PlayerProgress) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn save(&self, _progress: &PlayerProgress) -> Result<i64, EngineError> {
        Err(refused())
    }

    async fn delete(&self, _progress_id: Uuid) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn attach_item(
        &self,
        _progress_id: Uuid,
        _item_id: Uuid,
        _collected_at: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        Err(refused())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn progress(phone_number: &str, project_id: Uuid) -> PlayerProgress {
        PlayerProgress {
            id: Uuid::new_v4(),
            phone_number: phone_number.to_owned(),
            project_id,
            current_scene_id: Uuid::new_v4(),
            attempts_remaining: 3,
            collected_items: Vec::new(),
            last_interaction_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_create_refuses_a_second_project_for_one_phone() {
        // Arrange
        let repo = InMemoryProgressRepository::new();
        let (demo, crypt) = (Uuid::new_v4(), Uuid::new_v4());
        repo.create(&progress("whatsapp:+1", demo)).await.unwrap();

        // Act
        let other = repo.create(&progress("whatsapp:+1", crypt)).await;
        let same = repo.create(&progress("whatsapp:+1", demo)).await;
        let stranger = repo.create(&progress("whatsapp:+2", crypt)).await;

        // Assert
        assert!(matches!(
            other,
            Err(EngineError::SessionConflict { active_project_id, requested_project_id, .. })
                if active_project_id == demo && requested_project_id == crypt
        ));
        assert!(matches!(same, Err(EngineError::ProgressAlreadyExists { .. })));
        assert!(stranger.is_ok());
        assert_eq!(repo.records().len(), 2);
    }
}
