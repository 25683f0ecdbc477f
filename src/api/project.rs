use std::collections::BTreeMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::project::{Project, Task},
    store::AppStore,
    sync::{SyncList, SyncService},
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[schema(example = "Cedar")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Active")]
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[schema(example = "Code Review")]
    pub name: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    Ok(())
}

/// List projects
#[utoipa::path(
    get,
    path = "/api/projects",
    responses((status = 200, description = "Projects", body = [Project])),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn list_projects(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(store.projects.all()))
}

/// Create project
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProject,
    responses((status = 200, description = "Created project", body = Project)),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateProject>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    require_name(&req.name)?;

    let project = store.projects.insert_with(|id| Project {
        id,
        name: req.name,
        active: true,
        description: req.description,
        status: req.status.or_else(|| Some("Active".to_string())),
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: Utc::now(),
        extra: req.extra,
    });

    audit::record(
        &store,
        &auth,
        "create",
        "project",
        Some(project.id),
        format!("Created project {}", project.name),
    );
    sync.push(SyncList::Projects, &project);
    Ok(HttpResponse::Ok().json(project))
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses((status = 200, description = "Tasks", body = [Task])),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(store.tasks.all()))
}

/// Create task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTask,
    responses((status = 200, description = "Created task", body = Task)),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateTask>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    require_name(&req.name)?;

    let task = store.tasks.insert_with(|id| Task {
        id,
        name: req.name,
        description: req.description,
        assigned_to: req.assigned_to,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
        created_at: Utc::now(),
        extra: req.extra,
    });

    audit::record(
        &store,
        &auth,
        "create",
        "task",
        Some(task.id),
        format!("Created task {}", task.name),
    );
    sync.push(SyncList::Tasks, &task);
    Ok(HttpResponse::Ok().json(task))
}
