//! Error types for the school API client and the panel built on top of it.
//!
//! # Design
//! `ApiError` covers everything that can go wrong between building a
//! request and decoding its response. `SessionExpired` is split out because
//! the panel reacts to it by resetting the session instead of showing an
//! error. `ActionError` is what panel operations return: API failures plus
//! the rejections that never reach the network.

use thiserror::Error;

use crate::types::AlunoId;
use crate::validate::FormErrors;

/// Errors returned by `EscolaClient` parse methods and by transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The exchange never completed (connection refused, DNS, reset...).
    #[error("falha de rede: {0}")]
    Transport(String),

    /// The server answered 401 while a token was held.
    #[error("sessão expirada")]
    SessionExpired,

    /// The server answered 404.
    #[error("{0}")]
    NotFound(String),

    /// Any other non-2xx status. `message` is the body's `detail` when
    /// present, `Erro <status>` otherwise.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("resposta inválida: {0}")]
    Deserialization(String),

    #[error("falha ao serializar requisição: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::SessionExpired => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by `Panel` operations.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("formulário inválido: {0}")]
    Invalid(FormErrors),

    #[error("turma '{nome}' já atingiu capacidade máxima ({capacidade} alunos)")]
    TurmaFull { nome: String, capacidade: u32 },

    #[error("aluno '{nome}' já está matriculado em uma turma")]
    AlreadyEnrolled { nome: String },

    #[error("aluno {0} não encontrado")]
    UnknownAluno(AlunoId),

    #[error("usuário não autenticado")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ActionError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ActionError::Api(ApiError::SessionExpired))
    }
}

/// Failures of the local key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures while rendering an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("csv writer: {0}")]
    Flush(String),
}
