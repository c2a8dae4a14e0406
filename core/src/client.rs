//! HTTP request builder and response parser for the school API.
//!
//! # Design
//! `EscolaClient` holds the `base_url` and the bearer token, nothing else.
//! Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The host executes the round-trip in between, keeping the client
//! deterministic and free of I/O.
//!
//! The token goes on every request except login. A 401 while a token is
//! held means the session is gone and surfaces as `SessionExpired`; a 401
//! without one (bad credentials) is an ordinary HTTP error.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::filter::AlunoFilter;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Aluno, AlunoId, AlunoPayload, Credentials, LoginResponse, MatriculaConfirmada,
    MatriculaRequest, Mensagem, NovaTurma, Turma, Usuario,
};

#[derive(Debug, Clone)]
pub struct EscolaClient {
    base_url: String,
    token: Option<String>,
}

impl EscolaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let mut req = self.json_request(HttpMethod::Post, "/auth/login", credentials)?;
        req.headers.retain(|(key, _)| key != "authorization");
        Ok(req)
    }

    pub fn build_me(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/auth/me".to_string())
    }

    /// Login is anonymous, so a 401 here is bad credentials even when a
    /// stale token is still around.
    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        check_status(&response, false)?;
        decode(&response)
    }

    pub fn parse_me(&self, response: HttpResponse) -> Result<Usuario, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Alunos
    // -----------------------------------------------------------------------

    pub fn build_list_alunos(&self, filter: &AlunoFilter) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/alunos{}", filter.query_string()))
    }

    pub fn build_create_aluno(&self, payload: &AlunoPayload) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/alunos", payload)
    }

    pub fn build_update_aluno(
        &self,
        id: AlunoId,
        payload: &AlunoPayload,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/alunos/{id}"), payload)
    }

    pub fn build_delete_aluno(&self, id: AlunoId) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/alunos/{id}"))
    }

    pub fn parse_list_alunos(&self, response: HttpResponse) -> Result<Vec<Aluno>, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    pub fn parse_create_aluno(&self, response: HttpResponse) -> Result<Aluno, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    pub fn parse_update_aluno(&self, response: HttpResponse) -> Result<Aluno, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    /// Deletes answer with a `{"message": ...}` body; an empty body is fine too.
    pub fn parse_delete_aluno(&self, response: HttpResponse) -> Result<Option<Mensagem>, ApiError> {
        self.check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        decode(&response).map(Some)
    }

    // -----------------------------------------------------------------------
    // Turmas and matrículas
    // -----------------------------------------------------------------------

    pub fn build_list_turmas(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/turmas".to_string())
    }

    pub fn build_create_turma(&self, turma: &NovaTurma) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/turmas", turma)
    }

    pub fn build_create_matricula(
        &self,
        matricula: &MatriculaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/matriculas", matricula)
    }

    pub fn parse_list_turmas(&self, response: HttpResponse) -> Result<Vec<Turma>, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    pub fn parse_create_turma(&self, response: HttpResponse) -> Result<Turma, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    pub fn parse_create_matricula(
        &self,
        response: HttpResponse,
    ) -> Result<MatriculaConfirmada, ApiError> {
        self.check_status(&response)?;
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, route: String) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url: format!("{}{route}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        route: &str,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, route.to_string());
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    fn check_status(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response, self.token.is_some())
    }
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, token_held: bool) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 401 && token_held {
        return Err(ApiError::SessionExpired);
    }
    let message =
        error_detail(&response.body).unwrap_or_else(|| format!("Erro {}", response.status));
    if response.status == 404 {
        return Err(ApiError::NotFound(message));
    }
    Err(ApiError::Http {
        status: response.status,
        message,
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"detail": "..."}` and the validation shape
/// `{"detail": [{"msg": "..."}, ...]}`.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
