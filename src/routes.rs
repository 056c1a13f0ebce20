//! Route table and router assembly.
//!
//! Everything under `/api` sits behind two middleware layers: JWT
//! verification first, then tenant resolution, which loads the caller's
//! permission set and inserts a [`RequestContext`] extension for handlers.
//!
//! [`RequestContext`]: crate::middleware::RequestContext

use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers::{
    announcements, auth, books, classes, examinations, expenses, health, hostels, invoices, leave,
    messages, roles, staff, students,
};
use crate::middleware::{jwt_auth_middleware, tenant_context_middleware};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(student_routes())
        .merge(staff_routes())
        .merge(class_routes())
        .merge(examination_routes())
        .merge(invoice_routes())
        .merge(expense_routes())
        .merge(message_routes())
        .merge(announcement_routes())
        .merge(leave_routes())
        .merge(book_routes())
        .merge(hostel_routes())
        .merge(role_routes())
        // Layers run outermost-first, so the JWT check comes before tenant
        // resolution.
        .layer(from_fn_with_state(
            state.clone(),
            tenant_context_middleware,
        ))
        .layer(from_fn(jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        // Global middleware
        .layer(cors_layer(crate::config::config()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/refresh", post(auth::refresh))
}

fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(students::list).post(students::create))
        .route(
            "/api/students/:id",
            get(students::get)
                .patch(students::update)
                .delete(students::remove),
        )
}

fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/api/staff", get(staff::list).post(staff::create))
        .route(
            "/api/staff/:id",
            get(staff::get).patch(staff::update).delete(staff::remove),
        )
}

fn class_routes() -> Router<AppState> {
    Router::new()
        .route("/api/classes", get(classes::list).post(classes::create))
        .route(
            "/api/classes/:id",
            get(classes::get)
                .patch(classes::update)
                .delete(classes::remove),
        )
}

fn examination_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/examinations",
            get(examinations::list).post(examinations::create),
        )
        .route(
            "/api/examinations/:id",
            get(examinations::get)
                .patch(examinations::update)
                .delete(examinations::remove),
        )
}

fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/api/invoices/:id",
            get(invoices::get)
                .patch(invoices::update)
                .delete(invoices::remove),
        )
}

fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/api/expenses/:id",
            get(expenses::get)
                .patch(expenses::update)
                .delete(expenses::remove),
        )
}

fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(messages::list).post(messages::create))
        .route("/api/messages/bulk", post(messages::bulk))
        .route(
            "/api/messages/:id",
            get(messages::get).delete(messages::remove),
        )
        .route("/api/messages/:id/read", post(messages::mark_read))
}

fn announcement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/announcements",
            get(announcements::list).post(announcements::create),
        )
        .route(
            "/api/announcements/:id",
            get(announcements::get)
                .patch(announcements::update)
                .delete(announcements::remove),
        )
        .route(
            "/api/announcements/:id/publish",
            post(announcements::publish),
        )
        .route("/api/announcements/:id/archive", post(announcements::archive))
}

fn leave_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leave", get(leave::list).post(leave::create))
        .route(
            "/api/leave/:id",
            get(leave::get).patch(leave::update).delete(leave::remove),
        )
}

fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/api/books", get(books::list).post(books::create))
        .route(
            "/api/books/:id",
            get(books::get).patch(books::update).delete(books::remove),
        )
}

fn hostel_routes() -> Router<AppState> {
    Router::new()
        .route("/api/hostels", get(hostels::list).post(hostels::create))
        .route(
            "/api/hostels/:id",
            get(hostels::get)
                .patch(hostels::update)
                .delete(hostels::remove),
        )
}

fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/api/roles", get(roles::list).post(roles::create))
        .route(
            "/api/roles/:id",
            get(roles::get).patch(roles::update).delete(roles::remove),
        )
        .route("/api/roles/:id/assign", post(roles::assign))
        .route(
            "/api/roles/:id/assign/:user_id",
            delete(roles::unassign),
        )
        .route("/api/permissions", get(roles::catalog))
}
