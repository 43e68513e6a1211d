use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use phonebook_api::{NewPhone, Phone, PhoneId};

use super::AppState;

fn reply(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

// ═══════════════════════════════════════════════════════════════
//  GET /
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_welcome() -> &'static str {
    "welcome"
}

// ═══════════════════════════════════════════════════════════════
//  GET /phone?page=&pageSize=
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct PageParams {
    page: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhonePage {
    pub total_data: u64,
    pub page_now: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    pub total_pages: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<String>,
    pub phone_numbers: Vec<Phone>,
}

/// Parse a positive page parameter, falling back to `default` when absent.
fn positive(raw: Option<&str>, default: u64) -> Option<u64> {
    match raw {
        None => Some(default),
        Some(s) => s.trim().parse::<u64>().ok().filter(|n| *n >= 1),
    }
}

fn page_link(page: u64, size: u64) -> String {
    format!("/phone?page={page}&pageSize={size}")
}

pub(crate) async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let Some(page) = positive(params.page.as_deref(), 1) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid page number");
    };
    let Some(size) = positive(params.page_size.as_deref(), 10) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid page size");
    };

    let total = match state.store.count().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "count failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve phone numbers");
        }
    };
    let offset = (page - 1).saturating_mul(size);
    let phones = match state.store.list(offset, size).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, page, size, "list failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve phone numbers");
        }
    };

    let total_pages = total.div_ceil(size);
    Json(PhonePage {
        total_data: total,
        page_now: page,
        next_page: (page < total_pages).then(|| page_link(page + 1, size)),
        total_pages,
        prev_page: (page > 1).then(|| page_link(page - 1, size)),
        phone_numbers: phones,
    })
    .into_response()
}

// ═══════════════════════════════════════════════════════════════
//  POST /phone, PUT /phone/{id}, DELETE /phone/{id}
// ═══════════════════════════════════════════════════════════════

fn parse_id(raw: &str) -> Option<PhoneId> {
    raw.parse().ok()
}

/// Hand a changed record to the hub. The write already committed, so a
/// full queue only costs listeners this one update.
fn announce(state: &AppState, phone: Phone) {
    let id = phone.id;
    if let Err(e) = state.hub.publish(phone) {
        tracing::warn!(id, error = %e, "record update not broadcast");
    }
}

pub(crate) async fn handle_create(
    State(state): State<AppState>,
    body: Result<Json<NewPhone>, JsonRejection>,
) -> Response {
    let Ok(Json(phone)) = body else {
        return reply(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    match state.store.create(phone).await {
        Ok(created) => {
            tracing::debug!(id = created.id, "phone created");
            announce(&state, created);
            reply(StatusCode::OK, "Phone number added successfully")
        }
        Err(e) => {
            tracing::error!(error = %e, "create failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add phone number")
        }
    }
}

pub(crate) async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NewPhone>, JsonRejection>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid phone id");
    };
    let Ok(Json(phone)) = body else {
        return reply(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    match state.store.update(id, phone).await {
        Ok(Some(updated)) => {
            announce(&state, updated);
            reply(StatusCode::OK, "Phone number updated successfully")
        }
        Ok(None) => reply(StatusCode::NOT_FOUND, "Phone number not found"),
        Err(e) => {
            tracing::error!(id, error = %e, "update failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update phone number")
        }
    }
}

pub(crate) async fn handle_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid phone id");
    };

    match state.store.delete(id).await {
        Ok(true) => reply(StatusCode::OK, "Phone number deleted successfully"),
        Ok(false) => reply(StatusCode::NOT_FOUND, "Phone number not found"),
        Err(e) => {
            tracing::error!(id, error = %e, "delete failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete phone number")
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  GET /generate?numToGenerate=
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct GenerateParams {
    #[serde(rename = "numToGenerate")]
    num_to_generate: Option<String>,
}

/// Missing, unparsable or non-positive counts fall back to the default.
fn requested_count(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

pub(crate) async fn handle_generate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Response {
    let count = requested_count(
        params.num_to_generate.as_deref(),
        state.generator.config().default_count,
    );

    match state.generator.generate_and_persist(count).await {
        Ok(report) => reply(
            StatusCode::OK,
            format!("{} phone numbers added successfully", report.persisted),
        ),
        Err(e) if e.is_rejected_input() => reply(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(count, error = %e, "generate failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add phone numbers")
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  GET /migrate
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_migrate(State(state): State<AppState>) -> Response {
    match state.store.migrate().await {
        Ok(()) => reply(StatusCode::OK, "Database migration successful"),
        Err(e) => {
            tracing::error!(error = %e, "migration failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to migrate database")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_and_reject() {
        assert_eq!(positive(None, 10), Some(10));
        assert_eq!(positive(Some("3"), 1), Some(3));
        assert_eq!(positive(Some("0"), 1), None);
        assert_eq!(positive(Some("-2"), 1), None);
        assert_eq!(positive(Some("abc"), 1), None);
    }

    #[test]
    fn generate_count_falls_back_to_default() {
        assert_eq!(requested_count(None, 200), 200);
        assert_eq!(requested_count(Some(""), 200), 200);
        assert_eq!(requested_count(Some("x"), 200), 200);
        assert_eq!(requested_count(Some("-5"), 200), 200);
        assert_eq!(requested_count(Some("0"), 200), 200);
        assert_eq!(requested_count(Some("25"), 200), 25);
    }
}
