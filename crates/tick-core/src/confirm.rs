use std::collections::HashMap;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{ConfirmError, NoOpError, NotFoundError};
use crate::store::TaskStore;
use crate::task::TaskId;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this task?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Delete(TaskId),
    ClearCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub token: Uuid,
    pub action: PendingAction,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Committed {
    Deleted(TaskId),
    Cleared(usize),
}

/// Destructive actions waiting on a yes/no answer. A token commits at most
/// once; the store is re-checked at commit time.
#[derive(Debug, Default)]
pub struct Confirmations {
    pending: HashMap<Uuid, PendingAction>,
}

impl Confirmations {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, store))]
    pub fn request_delete(
        &mut self,
        store: &TaskStore,
        id: TaskId,
    ) -> Result<PendingConfirmation, NotFoundError> {
        if store.get(id).is_none() {
            return Err(NotFoundError { id });
        }
        Ok(self.register(PendingAction::Delete(id), DELETE_PROMPT.to_string()))
    }

    #[instrument(skip(self, store))]
    pub fn request_clear_completed(
        &mut self,
        store: &TaskStore,
    ) -> Result<PendingConfirmation, NoOpError> {
        let count = store.completed_count();
        if count == 0 {
            return Err(NoOpError);
        }
        Ok(self.register(
            PendingAction::ClearCompleted,
            format!("Are you sure you want to delete {count} completed task(s)?"),
        ))
    }

    #[instrument(skip(self, store))]
    pub fn confirm(
        &mut self,
        token: Uuid,
        store: &mut TaskStore,
    ) -> Result<Committed, ConfirmError> {
        let action = self
            .pending
            .remove(&token)
            .ok_or(ConfirmError::UnknownToken(token))?;
        debug!(?action, "committing confirmed action");

        match action {
            PendingAction::Delete(id) => {
                store.delete(id)?;
                Ok(Committed::Deleted(id))
            }
            PendingAction::ClearCompleted => Ok(Committed::Cleared(store.clear_completed()?)),
        }
    }

    pub fn cancel(&mut self, token: Uuid) -> bool {
        let removed = self.pending.remove(&token).is_some();
        debug!(%token, removed, "cancelled confirmation");
        removed
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    fn register(&mut self, action: PendingAction, message: String) -> PendingConfirmation {
        let token = Uuid::new_v4();
        self.pending.insert(token, action);
        PendingConfirmation {
            token,
            action,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Committed, Confirmations, DELETE_PROMPT, PendingAction};
    use crate::error::{ConfirmError, NoOpError, NotFoundError};
    use crate::store::TaskStore;

    #[test]
    fn delete_commits_only_after_confirm() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        let mut confirmations = Confirmations::new();

        let pending = confirmations.request_delete(&store, 1).expect("request");
        assert_eq!(pending.action, PendingAction::Delete(1));
        assert_eq!(pending.message, DELETE_PROMPT);
        assert_eq!(store.len(), 1);

        assert_eq!(
            confirmations.confirm(pending.token, &mut store),
            Ok(Committed::Deleted(1))
        );
        assert!(store.is_empty());
        assert_eq!(
            confirmations.confirm(pending.token, &mut store),
            Err(ConfirmError::UnknownToken(pending.token))
        );
    }

    #[test]
    fn cancelled_token_cannot_commit() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        let mut confirmations = Confirmations::new();

        let pending = confirmations.request_delete(&store, 1).expect("request");
        assert!(confirmations.cancel(pending.token));
        assert!(!confirmations.cancel(pending.token));
        assert!(confirmations.confirm(pending.token, &mut store).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(confirmations.outstanding(), 0);
    }

    #[test]
    fn requests_validate_against_store() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        let mut confirmations = Confirmations::new();

        assert_eq!(
            confirmations.request_delete(&store, 5),
            Err(NotFoundError { id: 5 })
        );
        assert_eq!(
            confirmations.request_clear_completed(&store),
            Err(NoOpError)
        );
        assert_eq!(confirmations.outstanding(), 0);
    }

    #[test]
    fn clear_message_counts_completed_tasks() {
        let mut store = TaskStore::new();
        for text in ["a", "b", "c"] {
            store.add(text).expect("add");
        }
        store.toggle_completion(1).expect("toggle");
        store.toggle_completion(3).expect("toggle");
        let mut confirmations = Confirmations::new();

        let pending = confirmations
            .request_clear_completed(&store)
            .expect("request");
        assert_eq!(
            pending.message,
            "Are you sure you want to delete 2 completed task(s)?"
        );
        assert_eq!(
            confirmations.confirm(pending.token, &mut store),
            Ok(Committed::Cleared(2))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stale_delete_reports_not_found() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        let mut confirmations = Confirmations::new();

        let pending = confirmations.request_delete(&store, 1).expect("request");
        store.delete(1).expect("delete");
        assert_eq!(
            confirmations.confirm(pending.token, &mut store),
            Err(ConfirmError::NotFound(NotFoundError { id: 1 }))
        );
    }
}
