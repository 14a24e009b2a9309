//! Login flow pages
//!
//! `GET /mockWebPage?sessionId=..` renders the phone number picker,
//! `POST /login` binds the chosen number to the session. The number is not
//! checked against the dataset here; the auth gate rejects unknown numbers
//! when a tool is called.

pub mod assets;

use crate::api::ApiState;
use crate::Result;
use askama::Template;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    session_id: String,
    allowed_numbers: Vec<String>,
}

#[derive(Template)]
#[template(path = "login_successful.html")]
struct LoginSuccessTemplate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPageParams {
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    session_id: Option<String>,
    phone_number: Option<String>,
}

impl LoginForm {
    /// Body fields win; the query string fills in whatever the body lacks.
    fn merge(self, fallback: LoginForm) -> LoginForm {
        LoginForm {
            session_id: non_empty(self.session_id).or(non_empty(fallback.session_id)),
            phone_number: non_empty(self.phone_number).or(non_empty(fallback.phone_number)),
        }
    }
}

/// Empty form values count as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn login_page(
    State(state): State<ApiState>,
    Query(params): Query<LoginPageParams>,
) -> Result<Response> {
    let Some(session_id) = non_empty(params.session_id) else {
        return Ok((StatusCode::BAD_REQUEST, "sessionId is required").into_response());
    };

    let allowed_numbers = state.dataset.allowed_identities().await?;
    let page = LoginTemplate {
        session_id,
        allowed_numbers,
    }
    .render()?;

    Ok(Html(page).into_response())
}

pub async fn login_submit(
    State(state): State<ApiState>,
    query: std::result::Result<Query<LoginForm>, QueryRejection>,
    body: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Response> {
    // A body that is missing, empty or not form-encoded just contributes no fields.
    let body = body.map(|Form(form)| form).unwrap_or_default();
    let query = query.map(|Query(form)| form).unwrap_or_default();
    let form = body.merge(query);

    let (Some(session_id), Some(phone_number)) =
        (non_empty(form.session_id), non_empty(form.phone_number))
    else {
        return Ok((
            StatusCode::BAD_REQUEST,
            "sessionId and phoneNumber are required",
        )
            .into_response());
    };

    state.sessions.bind(&session_id, &phone_number).await?;
    info!(session_id = %session_id, phone_number = %phone_number, "session bound to identity");

    let page = LoginSuccessTemplate.render()?;
    Ok(Html(page).into_response())
}
