pub mod error;
pub mod model;
pub mod query;
pub mod storage;
pub mod store;
pub mod weather;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Recurrence, Task, TaskLevel};

    #[test]
    fn task_has_required_fields() {
        let task = Task {
            id: "task-1".to_string(),
            name: "demo".to_string(),
            description: String::new(),
            level: TaskLevel::Normal,
            recurrence: Recurrence::Once,
            tags: Vec::new(),
            created_at: "2025-12-20T00:00:00Z".to_string(),
            completed: false,
            completed_at: None,
            last_completed_at: None,
        };

        assert_eq!(task.id, "task-1");
        assert_eq!(task.name, "demo");
        assert_eq!(task.level.reward(), 25);
        assert_eq!(task.recurrence.label(), "One-time");
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.last_completed_at, None);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing name");
        assert_eq!(err.code(), "invalid_input");
    }
}
