//! Terminal tables and notice printing.

use chrono::NaiveDate;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use escola_core::dates::format_br;
use escola_core::{Aluno, AlunoStats, AlunoStatus, Notice, NoticeLevel, Turma, Usuario};

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    table
}

fn status_cell(status: AlunoStatus) -> Cell {
    match status {
        AlunoStatus::Active => Cell::new("Ativo").fg(Color::Green),
        AlunoStatus::Inactive => Cell::new("Inativo").fg(Color::DarkGrey),
    }
}

/// Class column: the server-sent name, else a lookup, else a dash.
fn turma_label(aluno: &Aluno, turmas: &[Turma]) -> String {
    aluno
        .turma_nome
        .clone()
        .or_else(|| {
            aluno
                .turma_id
                .and_then(|id| turmas.iter().find(|t| t.id == id))
                .map(|t| t.nome.clone())
        })
        .unwrap_or_else(|| "-".to_string())
}

pub fn alunos_table(alunos: &[Aluno], turmas: &[Turma], today: NaiveDate) -> Table {
    let mut table = new_table(&["ID", "Nome", "Nascimento", "Idade", "Email", "Status", "Turma"]);
    for aluno in alunos {
        table.add_row(vec![
            Cell::new(aluno.id).set_alignment(CellAlignment::Right),
            Cell::new(&aluno.nome),
            Cell::new(format_br(aluno.data_nascimento)),
            Cell::new(aluno.age_on(today)).set_alignment(CellAlignment::Right),
            Cell::new(aluno.email.as_deref().unwrap_or("-")),
            status_cell(aluno.status),
            Cell::new(turma_label(aluno, turmas)),
        ]);
    }
    table
}

pub fn turmas_table(turmas: &[Turma]) -> Table {
    let mut table = new_table(&["ID", "Nome", "Ocupação", "Vagas", "%"]);
    for turma in turmas {
        let vagas = if turma.is_full() {
            Cell::new("lotada").fg(Color::Red)
        } else {
            Cell::new(turma.vagas())
        };
        table.add_row(vec![
            Cell::new(turma.id).set_alignment(CellAlignment::Right),
            Cell::new(&turma.nome),
            Cell::new(format!("{}/{}", turma.ocupacao, turma.capacidade)),
            vagas.set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}%", turma.ocupacao_percent()))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn stats_line(stats: AlunoStats, turmas: usize) -> String {
    format!(
        "Total: {} | Ativos: {} | Turmas: {turmas}",
        stats.total, stats.ativos
    )
}

pub fn usuario_line(usuario: &Usuario) -> String {
    match &usuario.email {
        Some(email) => format!("{} ({}) <{email}>", usuario.nome_completo, usuario.username),
        None => format!("{} ({})", usuario.nome_completo, usuario.username),
    }
}

/// Success and info to stdout, errors to stderr. Returns whether any error
/// was printed.
pub fn print_notices(notices: &[Notice]) -> bool {
    let mut had_error = false;
    for notice in notices {
        match notice.level {
            NoticeLevel::Success => println!("✔ {}", notice.message),
            NoticeLevel::Info => println!("ℹ {}", notice.message),
            NoticeLevel::Error => {
                had_error = true;
                eprintln!("✖ {}", notice.message);
            }
        }
    }
    had_error
}
