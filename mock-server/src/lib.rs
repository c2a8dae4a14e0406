//! In-memory stand-in for the school backend.
//!
//! Implements the REST contract the client core talks to: token login,
//! alunos CRUD with search filters, turmas with live occupancy, and
//! enrollment with a capacity check. State lives in a single `Database`
//! behind `Arc<RwLock<_>>` and is lost on exit.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

pub mod seed;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ativo,
    #[default]
    Inativo,
}

#[derive(Clone, Debug)]
pub struct AlunoRecord {
    pub id: i64,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub email: Option<String>,
    pub status: Status,
    pub turma_id: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct TurmaRecord {
    pub id: i64,
    pub nome: String,
    pub capacidade: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub nome_completo: String,
    pub ativo: bool,
}

#[derive(Clone, Debug)]
struct Account {
    usuario: Usuario,
    senha: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlunoOut {
    pub id: i64,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub email: Option<String>,
    pub status: Status,
    pub turma_id: Option<i64>,
    pub idade: i32,
    pub turma_nome: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurmaOut {
    pub id: i64,
    pub nome: String,
    pub capacidade: u32,
    pub ocupacao: u32,
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub senha: String,
}

#[derive(Deserialize)]
pub struct CreateAluno {
    pub nome: String,
    pub data_nascimento: NaiveDate,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub turma_id: Option<i64>,
}

/// Partial update. For `email` and `turma_id`, an explicit `null` clears the
/// field while a missing key leaves it alone.
#[derive(Deserialize, Default)]
pub struct UpdateAluno {
    pub nome: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub turma_id: Option<Option<i64>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct CreateTurma {
    pub nome: String,
    pub capacidade: u32,
}

#[derive(Deserialize)]
pub struct Matricula {
    pub aluno_id: i64,
    pub turma_id: i64,
}

#[derive(Deserialize, Default)]
pub struct AlunoQuery {
    pub search: Option<String>,
    pub turma_id: Option<i64>,
    pub status: Option<Status>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rendered as `{"detail": ...}` like the real backend.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: serde_json::Value,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: serde_json::Value::String(detail.into()),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Credenciais inválidas")
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} não encontrado"))
    }

    /// Field-level failure in the list shape: `[{"loc": [...], "msg": ...}]`.
    fn invalid(field: &str, msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{ "loc": ["body", field], "msg": msg.into() }]),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "detail": self.detail }))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Database {
    alunos: BTreeMap<i64, AlunoRecord>,
    turmas: BTreeMap<i64, TurmaRecord>,
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    next_aluno: i64,
    next_turma: i64,
}

pub type Db = Arc<RwLock<Database>>;

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Empty school with the default administrator account.
    pub fn new() -> Self {
        Self {
            alunos: BTreeMap::new(),
            turmas: BTreeMap::new(),
            accounts: vec![Account {
                usuario: Usuario {
                    id: 1,
                    username: DEFAULT_USERNAME.to_string(),
                    email: Some("admin@escola.com".to_string()),
                    nome_completo: "Administrador do Sistema".to_string(),
                    ativo: true,
                },
                senha: DEFAULT_PASSWORD.to_string(),
            }],
            tokens: HashMap::new(),
            next_aluno: 1,
            next_turma: 1,
        }
    }

    pub fn insert_turma(&mut self, nome: &str, capacidade: u32) -> i64 {
        let id = self.next_turma;
        self.next_turma += 1;
        self.turmas.insert(
            id,
            TurmaRecord {
                id,
                nome: nome.to_string(),
                capacidade,
            },
        );
        id
    }

    pub fn insert_aluno(&mut self, mut aluno: AlunoRecord) -> i64 {
        aluno.id = self.next_aluno;
        self.next_aluno += 1;
        let id = aluno.id;
        self.alunos.insert(id, aluno);
        id
    }

    /// Active students assigned to the class.
    pub fn ocupacao(&self, turma_id: i64) -> u32 {
        let count = self
            .alunos
            .values()
            .filter(|a| a.turma_id == Some(turma_id) && a.status == Status::Ativo)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn user_for_token(&self, token: &str) -> Option<&Usuario> {
        let id = self.tokens.get(token)?;
        self.accounts
            .iter()
            .map(|a| &a.usuario)
            .find(|u| u.id == *id && u.ativo)
    }

    fn aluno_out(&self, aluno: &AlunoRecord, today: NaiveDate) -> AlunoOut {
        AlunoOut {
            id: aluno.id,
            nome: aluno.nome.clone(),
            data_nascimento: aluno.data_nascimento,
            email: aluno.email.clone(),
            status: aluno.status,
            turma_id: aluno.turma_id,
            idade: age_on(aluno.data_nascimento, today),
            turma_nome: aluno
                .turma_id
                .and_then(|id| self.turmas.get(&id))
                .map(|t| t.nome.clone()),
        }
    }

    fn turma_out(&self, turma: &TurmaRecord) -> TurmaOut {
        TurmaOut {
            id: turma.id,
            nome: turma.nome.clone(),
            capacidade: turma.capacidade,
            ocupacao: self.ocupacao(turma.id),
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.alunos
            .values()
            .any(|a| Some(a.id) != except && a.email.as_deref() == Some(email))
    }

    /// Rejects a write that would seat `aluno` as an active member of a full
    /// class. A student already counted in that class keeps its seat.
    fn check_seat(&self, turma_id: i64, aluno: Option<i64>) -> ApiResult<()> {
        let turma = self
            .turmas
            .get(&turma_id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Turma não encontrada"))?;
        let seated = aluno
            .and_then(|id| self.alunos.get(&id))
            .is_some_and(|a| a.turma_id == Some(turma_id) && a.status == Status::Ativo);
        if !seated && self.ocupacao(turma_id) >= turma.capacidade {
            warn!(turma = turma_id, "turma full");
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!(
                    "Turma '{}' já atingiu capacidade máxima ({} alunos)",
                    turma.nome, turma.capacidade
                ),
            ));
        }
        Ok(())
    }

    fn require_turma(&self, turma_id: Option<i64>) -> ApiResult<()> {
        match turma_id {
            Some(id) if !self.turmas.contains_key(&id) => Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "Turma não encontrada",
            )),
            _ => Ok(()),
        }
    }
}

fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_nome(nome: &str) -> ApiResult<()> {
    let len = nome.trim().chars().count();
    if !(3..=80).contains(&len) {
        return Err(ApiError::invalid(
            "nome",
            "Nome deve ter entre 3 e 80 caracteres",
        ));
    }
    Ok(())
}

fn check_nascimento(date: NaiveDate) -> ApiResult<()> {
    if age_on(date, today()) < 5 {
        return Err(ApiError::invalid(
            "data_nascimento",
            "Aluno deve ter pelo menos 5 anos de idade",
        ));
    }
    Ok(())
}

fn check_email(email: Option<&str>) -> ApiResult<()> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(address) if !address.validate_email() => {
            Err(ApiError::invalid("email", "Formato de email inválido"))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Router over an empty school.
pub fn app() -> Router {
    router(Arc::new(RwLock::new(Database::new())))
}

/// Router over the demo data set.
pub fn seeded_app() -> Router {
    router(Arc::new(RwLock::new(seed::demo())))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/alunos", get(list_alunos).post(create_aluno))
        .route("/alunos/{id}", put(update_aluno).delete(delete_aluno))
        .route("/turmas", get(list_turmas).post(create_turma))
        .route("/matriculas", post(create_matricula))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, db: Database) -> Result<(), std::io::Error> {
    axum::serve(listener, router(Arc::new(RwLock::new(db)))).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authorize(db: &Db, headers: &HeaderMap) -> ApiResult<Usuario> {
    let token = bearer(headers).ok_or_else(ApiError::unauthorized)?;
    db.read()
        .await
        .user_for_token(token)
        .cloned()
        .ok_or_else(|| {
            warn!("rejected unknown token");
            ApiError::unauthorized()
        })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> ApiResult<Json<serde_json::Value>> {
    let mut db = db.write().await;
    let usuario = db
        .accounts
        .iter()
        .find(|a| a.usuario.username == input.username && a.senha == input.senha)
        .map(|a| a.usuario.clone())
        .ok_or_else(|| {
            warn!(username = %input.username, "bad credentials");
            ApiError::new(StatusCode::UNAUTHORIZED, "Usuário ou senha incorretos")
        })?;
    if !usuario.ativo {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Usuário inativo"));
    }
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone(), usuario.id);
    info!(username = %usuario.username, "login");
    Ok(Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "usuario": usuario,
    })))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Usuario>> {
    authorize(&db, &headers).await.map(Json)
}

// ---------------------------------------------------------------------------
// Alunos
// ---------------------------------------------------------------------------

async fn list_alunos(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<AlunoQuery>,
) -> ApiResult<Json<Vec<AlunoOut>>> {
    authorize(&db, &headers).await?;
    let db = db.read().await;
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let today = today();
    let alunos: Vec<AlunoOut> = db
        .alunos
        .values()
        .filter(|a| needle.as_ref().map_or(true, |n| a.nome.to_lowercase().contains(n)))
        .filter(|a| query.turma_id.map_or(true, |id| a.turma_id == Some(id)))
        .filter(|a| query.status.map_or(true, |s| a.status == s))
        .map(|a| db.aluno_out(a, today))
        .collect();
    debug!(rows = alunos.len(), "list alunos");
    Ok(Json(alunos))
}

async fn create_aluno(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateAluno>,
) -> ApiResult<(StatusCode, Json<AlunoOut>)> {
    authorize(&db, &headers).await?;
    check_nome(&input.nome)?;
    check_nascimento(input.data_nascimento)?;
    check_email(input.email.as_deref())?;

    let mut db = db.write().await;
    let email = input.email.filter(|e| !e.trim().is_empty());
    if let Some(email) = &email {
        if db.email_taken(email, None) {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "Email já cadastrado"));
        }
    }
    db.require_turma(input.turma_id)?;
    if let (Status::Ativo, Some(turma_id)) = (input.status, input.turma_id) {
        db.check_seat(turma_id, None)?;
    }

    let id = db.insert_aluno(AlunoRecord {
        id: 0,
        nome: input.nome.trim().to_string(),
        data_nascimento: input.data_nascimento,
        email,
        status: input.status,
        turma_id: input.turma_id,
    });
    info!(id, "aluno created");
    let out = db.aluno_out(&db.alunos[&id], today());
    Ok((StatusCode::CREATED, Json(out)))
}

async fn update_aluno(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateAluno>,
) -> ApiResult<Json<AlunoOut>> {
    authorize(&db, &headers).await?;
    if let Some(nome) = &input.nome {
        check_nome(nome)?;
    }
    if let Some(date) = input.data_nascimento {
        check_nascimento(date)?;
    }
    if let Some(email) = &input.email {
        check_email(email.as_deref())?;
    }

    let mut db = db.write().await;
    if !db.alunos.contains_key(&id) {
        return Err(ApiError::not_found("Aluno"));
    }
    if let Some(Some(email)) = &input.email {
        if db.email_taken(email, Some(id)) {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "Email já cadastrado"));
        }
    }
    if let Some(turma_id) = input.turma_id {
        db.require_turma(turma_id)?;
    }
    let current = &db.alunos[&id];
    let status = input.status.unwrap_or(current.status);
    let turma_id = input.turma_id.unwrap_or(current.turma_id);
    if let (Status::Ativo, Some(turma_id)) = (status, turma_id) {
        db.check_seat(turma_id, Some(id))?;
    }

    let aluno = db
        .alunos
        .get_mut(&id)
        .ok_or_else(|| ApiError::not_found("Aluno"))?;
    if let Some(nome) = input.nome {
        aluno.nome = nome.trim().to_string();
    }
    if let Some(date) = input.data_nascimento {
        aluno.data_nascimento = date;
    }
    if let Some(email) = input.email {
        aluno.email = email.filter(|e| !e.trim().is_empty());
    }
    if let Some(status) = input.status {
        aluno.status = status;
    }
    if let Some(turma_id) = input.turma_id {
        aluno.turma_id = turma_id;
    }
    let updated = aluno.clone();
    info!(id, "aluno updated");
    Ok(Json(db.aluno_out(&updated, today())))
}

async fn delete_aluno(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&db, &headers).await?;
    let mut db = db.write().await;
    db.alunos
        .remove(&id)
        .ok_or_else(|| ApiError::not_found("Aluno"))?;
    info!(id, "aluno deleted");
    Ok(Json(json!({ "message": "Aluno excluído com sucesso" })))
}

// ---------------------------------------------------------------------------
// Turmas and matrículas
// ---------------------------------------------------------------------------

async fn list_turmas(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<TurmaOut>>> {
    authorize(&db, &headers).await?;
    let db = db.read().await;
    Ok(Json(db.turmas.values().map(|t| db.turma_out(t)).collect()))
}

async fn create_turma(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTurma>,
) -> ApiResult<(StatusCode, Json<TurmaOut>)> {
    authorize(&db, &headers).await?;
    let nome = input.nome.trim().to_string();
    if nome.is_empty() || nome.chars().count() > 100 {
        return Err(ApiError::invalid("nome", "Nome da turma deve ter entre 1 e 100 caracteres"));
    }
    if !(1..=50).contains(&input.capacidade) {
        return Err(ApiError::invalid("capacidade", "Capacidade deve estar entre 1 e 50"));
    }

    let mut db = db.write().await;
    if db.turmas.values().any(|t| t.nome == nome) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Turma com este nome já existe",
        ));
    }
    let id = db.insert_turma(&nome, input.capacidade);
    info!(id, nome = %nome, "turma created");
    let out = db.turma_out(&db.turmas[&id]);
    Ok((StatusCode::CREATED, Json(out)))
}

async fn create_matricula(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Matricula>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&db, &headers).await?;
    let mut db = db.write().await;
    let aluno_nome = db
        .alunos
        .get(&input.aluno_id)
        .map(|a| a.nome.clone())
        .ok_or_else(|| ApiError::not_found("Aluno"))?;
    let turma = db
        .turmas
        .get(&input.turma_id)
        .cloned()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Turma não encontrada"))?;
    db.check_seat(turma.id, Some(input.aluno_id))?;

    let aluno = db
        .alunos
        .get_mut(&input.aluno_id)
        .ok_or_else(|| ApiError::not_found("Aluno"))?;
    aluno.turma_id = Some(turma.id);
    aluno.status = Status::Ativo;
    info!(aluno = input.aluno_id, turma = turma.id, "matrícula");
    Ok(Json(json!({
        "message": format!("Aluno '{}' matriculado na turma '{}' com sucesso", aluno_nome, turma.nome),
        "aluno_id": input.aluno_id,
        "turma_id": turma.id,
        "novo_status": Status::Ativo,
    })))
}
