use tracing::{debug, info, warn};

use crate::confirm::{Committed, Confirmations};
use crate::error::ValidationError;
use crate::source::DocumentSource;
use crate::store::TaskStore;
use crate::task::{Statistics, TaskId};
use crate::view::{self, ViewModel};

pub const EMPTY_TEXT_NOTICE: &str = "Please enter a task!";
pub const NOTHING_TO_CLEAR_NOTICE: &str = "No completed tasks to clear!";

/// The prompt and notice surfaces a front end provides.
pub trait Ui {
    fn confirm(&mut self, message: &str) -> bool;

    fn notify(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refresh {
    pub view: ViewModel,
    pub stats: Statistics,
}

#[derive(Debug, Default)]
pub struct Controller {
    store: TaskStore,
    confirmations: Confirmations,
}

impl Controller {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            confirmations: Confirmations::new(),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn refresh(&self) -> Refresh {
        Refresh {
            view: view::project(self.store.tasks()),
            stats: self.store.statistics(),
        }
    }

    /// Initial load. A failure has already reset the store to empty, so the
    /// result is logged and the refresh reflects whatever the store now holds.
    pub async fn load<S: DocumentSource>(&mut self, source: &S) -> Refresh {
        match self.store.load(source).await {
            Ok(count) => info!(count, "Loaded {count} tasks from {}", source.describe()),
            Err(err) => warn!(error = %err, "Starting with empty task list"),
        }
        self.refresh()
    }

    pub fn add_task(&mut self, text: &str, ui: &mut impl Ui) -> Refresh {
        match self.store.add(text) {
            Ok(task) => debug!(id = task.id, "added task"),
            Err(ValidationError::Empty) => ui.notify(EMPTY_TEXT_NOTICE),
        }
        self.refresh()
    }

    pub fn toggle_task(&mut self, id: TaskId, ui: &mut impl Ui) -> Refresh {
        if let Err(err) = self.store.toggle_completion(id) {
            debug!(error = %err, "toggle ignored");
            ui.notify(&format!("Task {id} not found."));
        }
        self.refresh()
    }

    pub fn delete_task(&mut self, id: TaskId, ui: &mut impl Ui) -> Refresh {
        let pending = match self.confirmations.request_delete(&self.store, id) {
            Ok(pending) => pending,
            Err(err) => {
                debug!(error = %err, "delete ignored");
                ui.notify(&format!("Task {id} not found."));
                return self.refresh();
            }
        };

        self.resolve(pending.token, &pending.message, ui);
        self.refresh()
    }

    pub fn clear_completed(&mut self, ui: &mut impl Ui) -> Refresh {
        let pending = match self.confirmations.request_clear_completed(&self.store) {
            Ok(pending) => pending,
            Err(_) => {
                ui.notify(NOTHING_TO_CLEAR_NOTICE);
                return self.refresh();
            }
        };

        self.resolve(pending.token, &pending.message, ui);
        self.refresh()
    }

    fn resolve(&mut self, token: uuid::Uuid, message: &str, ui: &mut impl Ui) {
        if !ui.confirm(message) {
            self.confirmations.cancel(token);
            debug!(
                outstanding = self.confirmations.outstanding(),
                "confirmation declined"
            );
            return;
        }

        match self.confirmations.confirm(token, &mut self.store) {
            Ok(Committed::Deleted(id)) => debug!(id, "delete committed"),
            Ok(Committed::Cleared(count)) => debug!(count, "clear committed"),
            Err(err) => {
                warn!(error = %err, "confirmed action could not be applied");
                ui.notify(&err.to_string());
            }
        }
    }
}
