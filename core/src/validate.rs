//! Client-side validation of the aluno form.
//!
//! Every rule is evaluated so the form can show all problems at once; a
//! payload is only produced when nothing failed.

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use validator::{ValidateEmail, ValidateLength, ValidationError, ValidationErrors};

use crate::dates::age_on;
use crate::types::{Aluno, AlunoPayload, AlunoStatus, NovaTurma, TurmaId};

pub const NOME_MIN: u64 = 3;
pub const NOME_MAX: u64 = 80;
pub const IDADE_MINIMA: i32 = 5;

/// Raw form input, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlunoForm {
    pub nome: String,
    /// `YYYY-MM-DD`, possibly blank.
    pub data_nascimento: String,
    pub email: String,
    pub status: AlunoStatus,
    pub turma_id: Option<TurmaId>,
}

impl AlunoForm {
    /// Prefill for editing an existing record.
    pub fn from_aluno(aluno: &Aluno) -> Self {
        Self {
            nome: aluno.nome.clone(),
            data_nascimento: aluno.data_nascimento.format("%Y-%m-%d").to_string(),
            email: aluno.email.clone().unwrap_or_default(),
            status: aluno.status,
            turma_id: aluno.turma_id,
        }
    }

    /// Check every field against the rules as of `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<AlunoPayload, FormErrors> {
        let mut errors = ValidationErrors::new();

        let nome = self.nome.trim().to_string();
        if nome.is_empty() {
            errors.add("nome", rule("required", "Nome é obrigatório"));
        } else if !nome.validate_length(Some(NOME_MIN), None, None) {
            errors.add("nome", rule("length", "Nome deve ter pelo menos 3 caracteres"));
        } else if !nome.validate_length(None, Some(NOME_MAX), None) {
            errors.add("nome", rule("length", "Nome deve ter no máximo 80 caracteres"));
        } else if nome.chars().any(char::is_control) {
            errors.add("nome", rule("printable", "Nome contém caracteres inválidos"));
        }

        let raw_date = self.data_nascimento.trim();
        let data_nascimento = if raw_date.is_empty() {
            errors.add(
                "data_nascimento",
                rule("required", "Data de nascimento é obrigatória"),
            );
            None
        } else {
            match NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") {
                Ok(date) if age_on(date, today) >= IDADE_MINIMA => Some(date),
                Ok(_) => {
                    errors.add(
                        "data_nascimento",
                        rule("min_age", "Aluno deve ter pelo menos 5 anos de idade"),
                    );
                    None
                }
                Err(_) => {
                    errors.add(
                        "data_nascimento",
                        rule("date", "Data de nascimento inválida"),
                    );
                    None
                }
            }
        };

        let email = Some(self.email.trim().to_string()).filter(|e| !e.is_empty());
        if let Some(address) = &email {
            if !address.validate_email() {
                errors.add("email", rule("email", "Formato de email inválido"));
            }
        }

        match data_nascimento {
            Some(data_nascimento) if errors.is_empty() => Ok(AlunoPayload {
                nome,
                data_nascimento,
                email,
                status: self.status,
                turma_id: self.turma_id,
            }),
            _ => Err(FormErrors(errors)),
        }
    }
}

/// Trimmed name must be non-empty and capacity positive.
pub fn validate_turma(turma: &NovaTurma) -> Result<NovaTurma, FormErrors> {
    let mut errors = ValidationErrors::new();
    let nome = turma.nome.trim().to_string();
    if nome.is_empty() {
        errors.add("nome", rule("required", "Nome da turma é obrigatório"));
    }
    if turma.capacidade == 0 {
        errors.add("capacidade", rule("range", "Capacidade deve ser maior que zero"));
    }
    if errors.is_empty() {
        Ok(NovaTurma {
            nome,
            capacidade: turma.capacidade,
        })
    } else {
        Err(FormErrors(errors))
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Per-field validation failures.
#[derive(Debug, Clone)]
pub struct FormErrors(ValidationErrors);

impl FormErrors {
    /// First message recorded for `field`.
    pub fn message(&self, field: &str) -> Option<String> {
        self.0
            .field_errors()
            .get(field)
            .and_then(|errors| errors.first())
            .and_then(|error| error.message.as_ref())
            .map(|message| message.to_string())
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.field_errors().contains_key(field)
    }

    /// `(field, message)` pairs sorted by field name.
    pub fn messages(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .0
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} inválido"));
                    (field.to_string(), message)
                })
            })
            .collect();
        out.sort();
        out
    }

    pub fn inner(&self) -> &ValidationErrors {
        &self.0
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .messages()
            .into_iter()
            .map(|(_, message)| message)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}
