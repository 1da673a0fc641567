use crate::error::AppError;
use crate::models::{Task, TaskStatus, UserRole};

use super::{Repository, Scope};

/// Tasks an account sees: employers list what they own, everyone else what is
/// assigned to them.
pub fn list_scope(role: UserRole, user_id: &str) -> Scope {
    match role {
        UserRole::Admin => Scope::unscoped(),
        UserRole::Employer | UserRole::Freelancer => Scope::by("ownerId", user_id),
        UserRole::Employee | UserRole::Client => Scope::by("assigneeId", user_id),
    }
}

/// Move a task to `status` on behalf of `caller_id`. Only the assignee may do
/// so; anyone else gets `Forbidden` and nothing is written.
pub async fn change_status(
    repo: &Repository<Task>,
    caller_id: &str,
    task_id: &str,
    status: TaskStatus,
) -> Result<Task, AppError> {
    let mut task = repo
        .get(task_id)
        .await
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    if task.assignee_id != caller_id {
        return Err(AppError::Forbidden(
            "Only the assignee can change the status of this task".to_string(),
        ));
    }

    repo.set_status(task_id, &status).await?;
    task.status = status;
    Ok(task)
}
