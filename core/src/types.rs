//! Domain DTOs for the school API.
//!
//! # Design
//! Field names follow the wire format (`nome`, `data_nascimento`, ...) so
//! serde needs no renames. These types are defined independently from the
//! mock-server's; the integration tests catch schema drift between the two.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::age_on;
use crate::error::ActionError;

pub type AlunoId = i64;
pub type TurmaId = i64;

/// Enrollment status of a student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlunoStatus {
    #[serde(rename = "ativo")]
    Active,
    #[default]
    #[serde(rename = "inativo")]
    Inactive,
}

impl AlunoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlunoStatus::Active => "ativo",
            AlunoStatus::Inactive => "inativo",
        }
    }
}

impl fmt::Display for AlunoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlunoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ativo" | "active" => Ok(AlunoStatus::Active),
            "inativo" | "inactive" => Ok(AlunoStatus::Inactive),
            other => Err(format!("status desconhecido: {other}")),
        }
    }
}

/// A student as returned by `GET /alunos`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Aluno {
    pub id: AlunoId,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    #[serde(default)]
    pub email: Option<String>,
    pub status: AlunoStatus,
    #[serde(default)]
    pub turma_id: Option<TurmaId>,
    /// Age computed by the server, when it sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idade: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turma_nome: Option<String>,
}

impl Aluno {
    /// Active and assigned to a class.
    pub fn is_enrolled(&self) -> bool {
        self.status == AlunoStatus::Active && self.turma_id.is_some()
    }

    /// Server-provided age, falling back to the birth date.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        self.idade
            .unwrap_or_else(|| age_on(self.data_nascimento, today))
    }
}

/// Request payload for `POST /alunos` and `PUT /alunos/{id}`.
///
/// Only produced by `AlunoForm::validate`, so it always satisfies the
/// client-side rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlunoPayload {
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub email: Option<String>,
    pub status: AlunoStatus,
    pub turma_id: Option<TurmaId>,
}

/// A class as returned by `GET /turmas`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turma {
    pub id: TurmaId,
    pub nome: String,
    pub capacidade: u32,
    #[serde(default)]
    pub ocupacao: u32,
}

impl Turma {
    pub fn vagas(&self) -> u32 {
        self.capacidade.saturating_sub(self.ocupacao)
    }

    pub fn is_full(&self) -> bool {
        self.ocupacao >= self.capacidade
    }

    pub fn ocupacao_percent(&self) -> f64 {
        if self.capacidade == 0 {
            return 0.0;
        }
        f64::from(self.ocupacao) / f64::from(self.capacidade) * 100.0
    }
}

/// Request payload for `POST /turmas`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NovaTurma {
    pub nome: String,
    pub capacidade: u32,
}

/// Request payload for `POST /matriculas`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatriculaRequest {
    pub aluno_id: AlunoId,
    pub turma_id: TurmaId,
}

/// Response body of a successful `POST /matriculas`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatriculaConfirmada {
    pub message: String,
    pub aluno_id: AlunoId,
    pub turma_id: TurmaId,
    pub novo_status: AlunoStatus,
}

/// Generic `{"message": ...}` body, returned by deletes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mensagem {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub senha: String,
}

/// Profile of the logged-in operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usuario {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub nome_completo: String,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub usuario: Usuario,
}

/// Rejects an enrollment the server would refuse anyway: the student is
/// already actively assigned, or the class has no room left.
pub fn check_matricula(aluno: &Aluno, turma: &Turma) -> Result<(), ActionError> {
    if aluno.is_enrolled() {
        return Err(ActionError::AlreadyEnrolled {
            nome: aluno.nome.clone(),
        });
    }
    if turma.is_full() {
        return Err(ActionError::TurmaFull {
            nome: turma.nome.clone(),
            capacidade: turma.capacidade,
        });
    }
    Ok(())
}
