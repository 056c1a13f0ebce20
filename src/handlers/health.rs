use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::database;
use crate::state::AppState;

/// GET / - Service banner with the route map.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant school management API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "POST /auth/login (public)",
                "auth": "/api/auth/whoami, /api/auth/refresh (authenticated)",
                "permissions": "/api/permissions (roles:read)",
                "roles": "/api/roles (roles:*)",
                "students": "/api/students (students:*)",
                "staff": "/api/staff (staff:*)",
                "classes": "/api/classes (classes:*)",
                "examinations": "/api/examinations (examinations:*)",
                "invoices": "/api/invoices (invoices:*)",
                "expenses": "/api/expenses (expenses:*)",
                "messages": "/api/messages (messages:*)",
                "announcements": "/api/announcements (announcements:*)",
                "leave": "/api/leave (leave:*)",
                "books": "/api/books (books:*)",
                "hostels": "/api/hostels (hostels:*)",
            }
        }
    }))
}

/// GET /health - Liveness probe with a database ping.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match database::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Database unavailable",
                    "error": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
