use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::document::{self, ExportDocument, Passthrough};
use crate::error::{LoadError, NoOpError, NotFoundError, ValidationError};
use crate::source::DocumentSource;
use crate::task::{Statistics, Task, TaskId};

/// The authoritative in-memory task list and its id counter.
///
/// Every mutation takes `&mut self`, so a store shared across threads must be
/// wrapped in a single lock covering all operations.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    counter: TaskId,
    passthrough: Passthrough,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches and decodes a document, replacing the whole list on success.
    ///
    /// On failure the store is reset to empty with a zero counter and the
    /// error is returned for the caller to log or report.
    #[tracing::instrument(skip(self, source), fields(location = %source.describe()))]
    pub async fn load<S: DocumentSource>(&mut self, source: &S) -> Result<usize, LoadError> {
        match source.fetch().await {
            Ok(raw) => self.load_str(&raw),
            Err(err) => {
                self.reset_after_failed_load(&err);
                Err(err)
            }
        }
    }

    /// Decodes already-fetched text with the same replace-or-reset semantics
    /// as [`TaskStore::load`].
    #[tracing::instrument(skip(self, raw))]
    pub fn load_str(&mut self, raw: &str) -> Result<usize, LoadError> {
        let decoded = match document::decode_document(raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.reset_after_failed_load(&err);
                return Err(err);
            }
        };

        self.counter = decoded.tasks.iter().map(|task| task.id).max().unwrap_or(0);
        self.tasks = decoded.tasks;
        self.passthrough = decoded.passthrough;

        info!(
            loaded = self.tasks.len(),
            skipped = decoded.skipped.len(),
            counter = self.counter,
            passthrough = !self.passthrough.is_empty(),
            "loaded tasks"
        );
        Ok(self.tasks.len())
    }

    fn reset_after_failed_load(&mut self, err: &LoadError) {
        debug!(error = %err, "resetting store after failed load");
        self.tasks.clear();
        self.counter = 0;
        self.passthrough = Passthrough::default();
    }

    pub fn add(&mut self, text: &str) -> Result<Task, ValidationError> {
        self.add_at(text, Utc::now())
    }

    #[tracing::instrument(skip(self, text, now))]
    pub fn add_at(&mut self, text: &str, now: DateTime<Utc>) -> Result<Task, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("rejected blank task text");
            return Err(ValidationError::Empty);
        }

        let id = self.counter + 1;
        let task = Task::new_pending(id, text.to_string(), now);
        self.counter = id;
        self.tasks.push(task.clone());

        debug!(id, total = self.tasks.len(), "task added");
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_completion(&mut self, id: TaskId) -> Result<(), NotFoundError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(NotFoundError { id })?;
        task.completed = !task.completed;
        debug!(id, completed = task.completed, "toggled task");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: TaskId) -> Result<(), NotFoundError> {
        let idx = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(NotFoundError { id })?;
        self.tasks.remove(idx);
        debug!(id, total = self.tasks.len(), "deleted task");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> Result<usize, NoOpError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();
        if removed == 0 {
            return Err(NoOpError);
        }
        info!(removed, remaining = self.tasks.len(), "cleared completed tasks");
        Ok(removed)
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_tasks(&self.tasks)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    pub fn export(&self) -> ExportDocument {
        self.export_at(Utc::now())
    }

    pub fn export_at(&self, now: DateTime<Utc>) -> ExportDocument {
        ExportDocument::new(&self.tasks, now)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The highest id issued (or restored) so far.
    pub fn counter(&self) -> TaskId {
        self.counter
    }

    pub fn passthrough(&self) -> &Passthrough {
        &self.passthrough
    }
}
