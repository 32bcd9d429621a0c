use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use entity::vacancy;
use sea_orm::DbErr;
use tokio::sync::RwLock;

use crate::{DbError, DbResult, VacancyStore};

/// In-process store for tests and local runs. Counts every call so callers
/// can assert which requests reached persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    vacancies: RwLock<BTreeMap<i64, vacancy::Model>>,
    grants: RwLock<HashMap<(String, String), Vec<String>>>,
    permission_calls: AtomicUsize,
    data_calls: AtomicUsize,
    unavailable: AtomicBool,
    data_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, login: &str, password: &str, methods: &[&str]) -> Self {
        self.grants.get_mut().insert(
            (login.to_string(), password.to_string()),
            methods.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_vacancy(mut self, vacancy: vacancy::Model) -> Self {
        self.vacancies.get_mut().insert(vacancy.id, vacancy);
        self
    }

    /// Make every subsequent call fail as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only vacancy reads and writes; permission lookups keep working.
    pub fn set_data_unavailable(&self, unavailable: bool) {
        self.data_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    /// Calls to anything other than `permissions`.
    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> DbResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Database(DbErr::Custom("store unavailable".into())));
        }
        Ok(())
    }

    fn touch(&self) -> DbResult<()> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        if self.data_unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Database(DbErr::Custom("vacancy table unavailable".into())));
        }
        self.check_available()
    }
}

#[async_trait]
impl VacancyStore for MemoryStore {
    async fn permissions(&self, login: &str, password: &str) -> DbResult<Vec<String>> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let grants = self.grants.read().await;
        Ok(grants
            .get(&(login.to_string(), password.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list(&self) -> DbResult<Vec<vacancy::Model>> {
        self.touch()?;
        let mut rows: Vec<_> = self.vacancies.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get(&self, id: i64) -> DbResult<vacancy::Model> {
        self.touch()?;
        self.vacancies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn upsert(&self, vacancy: vacancy::Model) -> DbResult<()> {
        self.touch()?;
        self.vacancies.write().await.insert(vacancy.id, vacancy);
        Ok(())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        self.touch()?;
        self.vacancies.write().await.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        self.check_available()
    }
}
