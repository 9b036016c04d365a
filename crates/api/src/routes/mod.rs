pub mod auth;
pub mod contracts;
pub mod documents;
pub mod expenses;
pub mod health;
pub mod knowledge;
pub mod logs;
pub mod projects;
pub mod tasks;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                  login (public)
/// /auth/me                                     current profile
/// /auth/change-password                        change own password
/// /auth/logout                                 logout
///
/// /users                                       list, create (admin, dept_manager)
/// /users/{id}                                  get, update, delete
/// /users/{id}/reset-password                   reset to the configured password
/// /roles                                       role catalogue
///
/// /projects                                    list, create
/// /projects/statistics                         counts by status and phase
/// /projects/{id}                               get (with phases), update, delete
/// /projects/{id}/phases                        list, add custom phase
/// /projects/{id}/phases/{phase_id}             change status, delete
/// /projects/{id}/members                       list, add
/// /projects/{id}/members/{member_id}           remove
///
/// /tasks                                       list, create
/// /tasks/batch                                 create many in one project
/// /tasks/my                                    tasks assigned to the caller
/// /tasks/statistics                            counts by status
/// /tasks/{id}                                  get, update, delete
/// /tasks/{id}/status                           assignee status change
/// /tasks/{id}/review                           approve or reject
///
/// /documents                                   list
/// /documents/upload                            upload (multipart)
/// /documents/{id}                              get, update, delete
/// /documents/{id}/download                     stream the file
/// /documents/{id}/archive                      archive
///
/// /contracts                                   list, create
/// /contracts/{id}                              get, update, delete
/// /contracts/{id}/upload                       attach or replace the file
///
/// /knowledge                                   list
/// /knowledge/hot                               most viewed
/// /knowledge/upload                            upload (multipart)
/// /knowledge/categories                        list, create
/// /knowledge/categories/{id}                   update, delete
/// /knowledge/{id}                              get, update, delete
/// /knowledge/{id}/download                     stream the file
/// /knowledge/{id}/versions                     history, upload new version
///
/// /expenses                                    list, create
/// /expenses/import                             spreadsheet import
/// /expenses/statistics                         totals per type
/// /expenses/comparison                         budget vs actual per project
/// /expenses/{id}                               get, update, delete
/// /expenses/{id}/vouchers                      upload, download, delete (?index=)
///
/// /logs                                        list (admin, dept_manager)
/// /logs/actions                                action vocabulary
/// /logs/modules                                module vocabulary
/// /logs/statistics                             dashboard counts
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/roles", users::roles_router())
        .nest("/projects", projects::router())
        .nest("/tasks", tasks::router())
        .nest("/documents", documents::router())
        .nest("/contracts", contracts::router())
        .nest("/knowledge", knowledge::router())
        .nest("/expenses", expenses::router())
        .nest("/logs", logs::router())
}
