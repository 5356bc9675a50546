//! API route definitions

use super::handlers::{attachments::*, auth::*, people::*, projects::*, tickets::*};
use super::ApiState;
use axum::{
    routing::{get, post},
    Router,
};

/// Create token and sign-in routes
pub fn create_auth_routes() -> Router<ApiState> {
    Router::new()
        .route("/auth", post(refresh_token))
        .route("/auth/sign-in", post(password_sign_in))
        .route("/auth/sign-in/google", post(google_sign_in))
}

/// Create project, list, folder and sprint routes
pub fn create_project_routes() -> Router<ApiState> {
    Router::new()
        .route("/jokes", get(random_joke))
        .route("/projectIcons", get(project_icons))
        .route("/project", post(create_project))
        .route("/project/list", get(list_projects))
        .route(
            "/project/:id",
            get(get_project)
                .put(update_project)
                .patch(update_project)
                .delete(delete_project),
        )
        .route("/project/:id/logo", post(upload_project_logo))
        .route("/list", get(list_lists).post(create_list))
        .route(
            "/list/:id",
            get(get_list).put(update_list).patch(update_list).delete(delete_list),
        )
        .route("/sprint", get(list_sprints).post(create_sprints))
        .route(
            "/sprint/:id",
            get(get_sprint)
                .put(update_sprint)
                .patch(update_sprint)
                .delete(delete_sprint),
        )
        .route("/folder", get(list_folders).post(create_folder))
        .route(
            "/folder/:id",
            get(get_folder)
                .put(update_folder)
                .patch(update_folder)
                .delete(delete_folder),
        )
}

/// Create role, employee and team member routes
pub fn create_people_routes() -> Router<ApiState> {
    Router::new()
        .route("/role", get(list_roles).post(create_role))
        .route(
            "/role/:id",
            get(get_role).put(update_role).patch(update_role).delete(delete_role),
        )
        .route("/employee", get(list_employees).post(create_employee))
        .route(
            "/employee/:id",
            get(get_employee)
                .put(update_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
        .route("/team-member", post(team_members))
}

/// Create ticket, allocation and attachment routes
pub fn create_ticket_routes() -> Router<ApiState> {
    Router::new()
        .route("/priority", get(list_priorities))
        .route("/ticketStatus", get(list_ticket_statuses))
        .route("/ticket", get(list_tickets).post(create_or_board))
        .route(
            "/ticket/:id",
            get(get_ticket)
                .put(update_ticket)
                .patch(update_ticket)
                .delete(delete_ticket),
        )
        .route(
            "/ticket/:id/attachment",
            get(list_ticket_attachments).post(upload_ticket_attachments),
        )
        .route(
            "/ticket/:id/attachment/:attachment_id",
            get(get_ticket_attachment).delete(delete_ticket_attachment),
        )
        .route("/ticket-allocation", get(list_allocations).post(create_allocation))
        .route(
            "/ticket-allocation/:id",
            get(get_allocation)
                .put(update_allocation)
                .patch(update_allocation)
                .delete(delete_allocation),
        )
        .route(
            "/ticket-allocation/:id/attachment",
            get(list_allocation_attachments).post(upload_allocation_attachments),
        )
        .route(
            "/ticket-allocation/:id/attachment/:attachment_id",
            get(get_allocation_attachment).delete(delete_allocation_attachment),
        )
}
