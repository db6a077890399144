use serde::Serialize;

use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
}

/// Display-ready snapshot of the task list. Always rebuilt with [`project`],
/// never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub rows: Vec<RowView>,
    pub is_empty: bool,
}

impl ViewModel {
    pub fn can_clear_completed(&self) -> bool {
        self.rows.iter().any(|row| row.completed)
    }
}

pub fn project(tasks: &[Task]) -> ViewModel {
    let rows: Vec<RowView> = tasks
        .iter()
        .map(|task| RowView {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
        })
        .collect();

    ViewModel {
        is_empty: rows.is_empty(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::project;
    use crate::store::TaskStore;

    #[test]
    fn empty_store_projects_placeholder() {
        let view = project(TaskStore::new().tasks());
        assert!(view.is_empty);
        assert!(view.rows.is_empty());
        assert!(!view.can_clear_completed());
    }

    #[test]
    fn rows_follow_store_order() {
        let mut store = TaskStore::new();
        store.add("first").expect("add");
        store.add("second").expect("add");
        store.add("third").expect("add");
        store.toggle_completion(2).expect("toggle");
        store.delete(1).expect("delete");

        let view = project(store.tasks());
        assert!(!view.is_empty);
        let rows: Vec<(u64, &str, bool)> = view
            .rows
            .iter()
            .map(|row| (row.id, row.text.as_str(), row.completed))
            .collect();
        assert_eq!(rows, vec![(2, "second", true), (3, "third", false)]);
        assert!(view.can_clear_completed());
    }

    #[test]
    fn projection_is_repeatable() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        assert_eq!(project(store.tasks()), project(store.tasks()));
    }
}
