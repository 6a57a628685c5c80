use actix_web::{web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::task::{
    CreateTaskRequest, Task, TaskFilter, TaskListQuery, TaskListResponse, TaskStatus, TaskView,
    UpdateTaskStatusRequest,
};
use crate::services::data_source::{HrDataSource, StatusUpdate};
use crate::services::task_status;
use crate::utils::auth::{AdminUser, AuthUser};
use crate::utils::errors::ServiceError;

/// Filters, groups and counts an already-fetched task list.
pub fn build_task_list(
    tasks: &[Task],
    active: TaskFilter,
    requested: TaskFilter,
    now: DateTime<Utc>,
) -> TaskListResponse {
    let (filter, selected) = task_status::select(tasks, active, requested, now);
    TaskListResponse {
        filter,
        tasks: selected
            .iter()
            .map(|task| task_status::derive_view(task, now))
            .collect(),
        grouped: task_status::group_by_status(tasks),
        stats: task_status::compute_stats(tasks, now),
    }
}

fn list_from_query(tasks: &[Task], query: &TaskListQuery) -> TaskListResponse {
    let active = query.active.unwrap_or_default();
    match query.filter {
        Some(requested) => build_task_list(tasks, active, requested, Utc::now()),
        // No new selection: the active criterion stays in effect.
        None => build_task_list(tasks, TaskFilter::All, active, Utc::now()),
    }
}

/// Get the caller's tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<TaskListResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_my_tasks(
    user: AuthUser,
    db: web::Data<Database>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks - {}", user.id);

    let tasks = db.fetch_tasks(user.id).await.map_err(|e| {
        log::error!("Database error fetching tasks: {:#}", e);
        ServiceError::DatabaseError("Failed to fetch tasks".to_string())
    })?;

    let response = list_from_query(&tasks, &query);
    log::info!("Retrieved {} tasks ({} shown)", tasks.len(), response.tasks.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tasks retrieved successfully", response)))
}

/// Change a task's status
#[utoipa::path(
    put,
    path = "/api/tasks/{id}/status",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Task status updated", body = ApiResponse<TaskView>),
        (status = 403, description = "Task belongs to someone else", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_task_status(
    user: AuthUser,
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    update_req: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PUT /api/tasks/{}/status -> {}", task_id, update_req.status);

    let task = change_status(db.get_ref(), &user, task_id, update_req.status).await?;

    log::info!("Task {} moved to {}", task_id, update_req.status);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Task updated successfully",
        task_status::derive_view(&task, Utc::now()),
    )))
}

/// Admins may move any task; everyone else only tasks assigned to them.
pub(crate) async fn change_status<S: HrDataSource>(
    source: &S,
    user: &AuthUser,
    task_id: Uuid,
    status: TaskStatus,
) -> Result<Task, ServiceError> {
    let not_found = || ServiceError::NotFound("Task not found".to_string());

    if user.is_admin() {
        return source.update_task_status(task_id, status).await?.ok_or_else(not_found);
    }

    match source.update_own_task_status(task_id, status, user.id).await? {
        StatusUpdate::Updated(task) => Ok(task),
        StatusUpdate::NotAssignee => Err(ServiceError::Forbidden(
            "Task is assigned to another employee".to_string(),
        )),
        StatusUpdate::NotFound => Err(not_found()),
    }
}

/// Create and assign a task
#[utoipa::path(
    post,
    path = "/api/admin/tasks",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created successfully", body = ApiResponse<TaskView>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_task(
    AdminUser(admin): AdminUser,
    db: web::Data<Database>,
    task_req: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/admin/tasks - Creating task: {}", task_req.title);

    task_req.validate()?;

    let assignee_exists = sqlx::query("SELECT 1 FROM profiles WHERE id = $1")
        .bind(task_req.assigned_to)
        .fetch_optional(&db.pool)
        .await?
        .is_some();
    if !assignee_exists {
        return Err(ServiceError::ValidationError("Assignee not found".to_string()));
    }

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (title, description, assigned_to, status, due_date)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, title, description, assigned_to, status, due_date, created_at, updated_at",
    )
    .bind(task_req.title.trim())
    .bind(&task_req.description)
    .bind(task_req.assigned_to)
    .bind(TaskStatus::Pending.as_str())
    .bind(task_req.due_date)
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error creating task: {}", e);
        ServiceError::DatabaseError("Failed to create task".to_string())
    })?;

    log::info!("Task {} created by {} for {}", task.id, admin.email, task.assigned_to);
    Ok(HttpResponse::Created().json(ApiResponse::success(
        "Task created successfully",
        task_status::derive_view(&task, Utc::now()),
    )))
}

/// Get every task
#[utoipa::path(
    get,
    path = "/api/admin/tasks",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<TaskListResponse>),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_all_tasks(
    _admin: AdminUser,
    db: web::Data<Database>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/admin/tasks");

    let tasks = fetch_all_tasks(&db).await?;
    let response = list_from_query(&tasks, &query);

    log::info!("Retrieved {} tasks", tasks.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tasks retrieved successfully", response)))
}

pub(crate) async fn fetch_all_tasks(db: &Database) -> Result<Vec<Task>, ServiceError> {
    sqlx::query_as::<_, Task>(
        "SELECT id, title, description, assigned_to, status, due_date, created_at, updated_at
         FROM tasks ORDER BY due_date ASC NULLS LAST, created_at ASC",
    )
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching tasks: {}", e);
        ServiceError::DatabaseError("Failed to fetch tasks".to_string())
    })
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/tasks", web::get().to(get_my_tasks))
        .route("/api/tasks/{id}/status", web::put().to(update_task_status))
        .service(
            web::resource("/api/admin/tasks")
                .route(web::post().to(create_task))
                .route(web::get().to(get_all_tasks))
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use crate::services::data_source::memory::MemorySource;
    use chrono::Duration;

    fn task(status: &str, due_in_days: Option<i64>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: format!("{} task", status),
            description: None,
            assigned_to: Uuid::nil(),
            status: status.to_string(),
            due_date: due_in_days.map(|d| now + Duration::days(d)),
            created_at: now,
            updated_at: now,
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            task("pending", Some(-1)),
            task("pending", Some(3)),
            task("in_progress", None),
            task("completed", Some(-2)),
        ]
    }

    #[test]
    fn selecting_a_filter_narrows_the_list_but_not_the_stats() {
        let response = build_task_list(&tasks(), TaskFilter::All, TaskFilter::Pending, Utc::now());

        assert_eq!(response.filter, TaskFilter::Pending);
        assert_eq!(response.tasks.len(), 2);
        assert_eq!(response.stats.total, 4);
        assert_eq!(response.stats.overdue, 1);
        assert_eq!(response.grouped.completed.len(), 1);
    }

    #[test]
    fn repeating_the_active_filter_shows_everything() {
        let query = TaskListQuery {
            filter: Some(TaskFilter::Pending),
            active: Some(TaskFilter::Pending),
        };
        let response = list_from_query(&tasks(), &query);

        assert_eq!(response.filter, TaskFilter::All);
        assert_eq!(response.tasks.len(), 4);
    }

    #[test]
    fn active_filter_persists_without_new_selection() {
        let query = TaskListQuery {
            filter: None,
            active: Some(TaskFilter::Overdue),
        };
        let response = list_from_query(&tasks(), &query);

        assert_eq!(response.filter, TaskFilter::Overdue);
        assert_eq!(response.tasks.len(), 1);
        assert!(response.tasks[0].is_overdue);
    }

    fn user(id: Uuid, role: Role) -> AuthUser {
        AuthUser {
            id,
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn only_the_assignee_or_an_admin_changes_status() {
        let owner = Uuid::new_v4();
        let mut owned = task("pending", None);
        owned.assigned_to = owner;
        let task_id = owned.id;
        let source = MemorySource::default();
        source.tasks.lock().unwrap().push(owned);

        let outsider = user(Uuid::new_v4(), Role::Employee);
        let refused = change_status(&source, &outsider, task_id, TaskStatus::Completed).await;
        assert!(matches!(refused, Err(ServiceError::Forbidden(_))));
        assert_eq!(source.tasks.lock().unwrap()[0].status, "pending");

        let updated = change_status(&source, &user(owner, Role::Employee), task_id, TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(updated.status, "in_progress");

        let admin = user(Uuid::new_v4(), Role::Admin);
        let updated = change_status(&source, &admin, task_id, TaskStatus::Completed).await.unwrap();
        assert_eq!(updated.status, "completed");
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let source = MemorySource::default();
        for role in [Role::Employee, Role::Admin] {
            let result = change_status(&source, &user(Uuid::new_v4(), role), Uuid::new_v4(), TaskStatus::Completed).await;
            assert!(matches!(result, Err(ServiceError::NotFound(_))));
        }
    }
}
