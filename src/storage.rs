/// Хранилище очищенных записей

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::CleanedAppRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredApp {
    pub id: i64,
    #[serde(flatten)]
    pub record: CleanedAppRecord,
}

/// Слой хранения принимает только типизированные записи
pub trait AppStore {
    /// Возвращает число сохранённых записей
    fn insert_many(&mut self, records: &[CleanedAppRecord]) -> Result<usize, PipelineError>;
    fn len(&self) -> usize;
    fn all(&self) -> Vec<StoredApp>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Таблица apps в памяти с последовательными id
#[derive(Debug)]
pub struct MemoryStore {
    apps: Vec<StoredApp>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            apps: Vec::new(),
            next_id: 1,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore for MemoryStore {
    fn insert_many(&mut self, records: &[CleanedAppRecord]) -> Result<usize, PipelineError> {
        for record in records {
            self.apps.push(StoredApp {
                id: self.next_id,
                record: record.clone(),
            });
            self.next_id += 1;
        }
        tracing::info!("Saved {} apps ({} total)", records.len(), self.apps.len());
        Ok(records.len())
    }

    fn len(&self) -> usize {
        self.apps.len()
    }

    fn all(&self) -> Vec<StoredApp> {
        self.apps.clone()
    }
}
