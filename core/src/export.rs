//! CSV and JSON exports of the in-memory alunos list. No server round trip.

use crate::dates::format_br;
use crate::error::ExportError;
use crate::types::{Aluno, AlunoStatus, Turma};

pub const CSV_HEADER: [&str; 5] = ["Nome", "Data de Nascimento", "Email", "Status", "Turma"];

/// One row per aluno. The class column prefers the name sent by the server
/// and falls back to the cached turma list.
pub fn alunos_csv(alunos: &[Aluno], turmas: &[Turma]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for aluno in alunos {
        let turma = aluno
            .turma_nome
            .clone()
            .or_else(|| {
                aluno
                    .turma_id
                    .and_then(|id| turmas.iter().find(|t| t.id == id))
                    .map(|t| t.nome.clone())
            })
            .unwrap_or_default();
        let status = match aluno.status {
            AlunoStatus::Active => "Ativo",
            AlunoStatus::Inactive => "Inativo",
        };
        writer.write_record([
            aluno.nome.as_str(),
            format_br(aluno.data_nascimento).as_str(),
            aluno.email.as_deref().unwrap_or(""),
            status,
            turma.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn alunos_json(alunos: &[Aluno]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(alunos)?)
}
