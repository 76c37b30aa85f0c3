use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use noterag_service::{
	AnswerResponse, CreateNoteRequest, CreateNoteResponse, DeleteNoteResponse, Error as ServiceError,
	NoteView, SearchItem,
};

use crate::{auth::DirectoryError, state::AppState};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/register", post(register))
		.route("/api/login", post(login))
		.route("/api/notes", get(list_notes).post(create_note))
		.route("/api/notes/{id}", get(get_note).delete(delete_note))
		.route("/api/search", get(search))
		.route("/api/query", post(query))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
	email: String,
	password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
	access_token: String,
	token_type: &'static str,
}
impl TokenResponse {
	fn bearer(access_token: String) -> Self {
		Self { access_token, token_type: "bearer" }
	}
}

async fn register(
	State(state): State<AppState>,
	Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
	let token = state.directory.register(&payload.email, &payload.password)?;

	Ok(Json(TokenResponse::bearer(token)))
}

async fn login(
	State(state): State<AppState>,
	Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
	let token = state
		.directory
		.login(&payload.email, &payload.password)
		.ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid email or password."))?;

	Ok(Json(TokenResponse::bearer(token)))
}

async fn create_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<CreateNoteRequest>,
) -> Result<Json<CreateNoteResponse>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.create_note(&user_id, payload).await?;

	Ok(Json(response))
}

async fn list_notes(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<NoteView>>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.list_notes(&user_id).await?;

	Ok(Json(response))
}

async fn get_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<NoteView>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.get_note(&user_id, &id).await?;

	Ok(Json(response))
}

async fn delete_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<DeleteNoteResponse>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.delete_note(&user_id, &id).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
	query: String,
	limit: Option<u32>,
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchItem>>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.search(&user_id, &params.query, params.limit).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
	question: String,
	top_k: Option<u32>,
}

async fn query(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let user_id = authenticate(&state, &headers)?;
	let response = state.service.answer(&user_id, &payload.question, payload.top_k).await?;

	Ok(Json(response))
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
	let unauthorized =
		|| json_error(StatusCode::UNAUTHORIZED, "unauthorized", "A valid bearer token is required.");
	let header = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.ok_or_else(unauthorized)?;
	let token = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?;

	state.directory.verify(token).ok_or_else(unauthorized)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::NoteNotFound { note_id } => json_error(
				StatusCode::NOT_FOUND,
				"not_found",
				format!("Note {note_id} was not found."),
			),
			ServiceError::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message),
			ServiceError::Index(err) =>
				json_error(StatusCode::BAD_GATEWAY, "vector_backend_error", err.to_string()),
			ServiceError::Storage(err) =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", err.to_string()),
		}
	}
}
impl From<DirectoryError> for ApiError {
	fn from(err: DirectoryError) -> Self {
		match err {
			DirectoryError::EmailTaken =>
				json_error(StatusCode::CONFLICT, "email_taken", err.to_string()),
			DirectoryError::InvalidCredentials(message) =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
