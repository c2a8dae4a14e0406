//! Demo data set: five classes and a couple dozen students.

use chrono::NaiveDate;

use crate::{AlunoRecord, Database, Status};

const TURMAS: [(&str, u32); 5] = [
    ("1º Ano A - Manhã", 25),
    ("1º Ano B - Tarde", 25),
    ("2º Ano A - Manhã", 30),
    ("3º Ano A - Manhã", 20),
    ("3º Ano B - Tarde", 20),
];

type Row = (&'static str, (i32, u32, u32), &'static str, Status, Option<i64>);

const ALUNOS: [Row; 28] = [
    ("Ana Silva Santos", (2017, 3, 15), "ana.silva", Status::Ativo, Some(1)),
    ("Bruno Oliveira Costa", (2017, 7, 22), "bruno.oliveira", Status::Ativo, Some(1)),
    ("Carla Mendes Lima", (2017, 1, 8), "carla.mendes", Status::Ativo, Some(1)),
    ("Diego Ferreira Rocha", (2017, 9, 12), "diego.ferreira", Status::Ativo, Some(1)),
    ("Eduarda Alves Pereira", (2017, 5, 30), "eduarda.alves", Status::Ativo, Some(1)),
    ("Felipe Santos Barbosa", (2017, 4, 18), "felipe.santos", Status::Ativo, Some(2)),
    ("Gabriela Costa Martins", (2017, 11, 25), "gabriela.costa", Status::Ativo, Some(2)),
    ("Henrique Lima Souza", (2017, 2, 14), "henrique.lima", Status::Ativo, Some(2)),
    ("Isabela Rocha Fernandes", (2017, 8, 7), "isabela.rocha", Status::Ativo, Some(2)),
    ("João Pedro Silva", (2017, 6, 19), "joao.pedro", Status::Ativo, Some(2)),
    ("Laura Oliveira Santos", (2016, 3, 10), "laura.oliveira", Status::Ativo, Some(3)),
    ("Mateus Costa Alves", (2016, 7, 28), "mateus.costa", Status::Ativo, Some(3)),
    ("Natália Lima Pereira", (2016, 1, 16), "natalia.lima", Status::Ativo, Some(3)),
    ("Otávio Mendes Rocha", (2016, 9, 3), "otavio.mendes", Status::Ativo, Some(3)),
    ("Priscila Santos Costa", (2016, 5, 21), "priscila.santos", Status::Ativo, Some(3)),
    ("Rafael Alves Lima", (2016, 12, 5), "rafael.alves", Status::Ativo, Some(3)),
    ("Sofia Ferreira Barbosa", (2015, 4, 12), "sofia.ferreira", Status::Ativo, Some(4)),
    ("Thiago Costa Martins", (2015, 8, 27), "thiago.costa", Status::Ativo, Some(4)),
    ("Vitória Lima Souza", (2015, 2, 9), "vitoria.lima", Status::Ativo, Some(4)),
    ("Wagner Rocha Silva", (2015, 10, 15), "wagner.rocha", Status::Ativo, Some(4)),
    ("Yasmin Santos Pereira", (2015, 6, 23), "yasmin.santos", Status::Ativo, Some(4)),
    ("Arthur Oliveira Costa", (2015, 3, 18), "arthur.oliveira", Status::Ativo, Some(5)),
    ("Beatriz Mendes Lima", (2015, 7, 11), "beatriz.mendes", Status::Ativo, Some(5)),
    ("Carlos Alves Rocha", (2015, 11, 4), "carlos.alves", Status::Ativo, Some(5)),
    ("Daniela Santos Barbosa", (2015, 5, 29), "daniela.santos", Status::Ativo, Some(5)),
    ("Eduardo Costa Martins", (2015, 9, 17), "eduardo.costa", Status::Inativo, Some(5)),
    ("Fernanda Lima Souza", (2016, 4, 6), "fernanda.lima", Status::Inativo, None),
    ("Gustavo Rocha Silva", (2017, 10, 13), "gustavo.rocha", Status::Inativo, None),
];

/// A database pre-populated with the demo classes and students.
pub fn demo() -> Database {
    let mut db = Database::new();
    for (nome, capacidade) in TURMAS {
        db.insert_turma(nome, capacidade);
    }
    for (nome, (y, m, d), user, status, turma_id) in ALUNOS {
        let Some(data_nascimento) = NaiveDate::from_ymd_opt(y, m, d) else {
            continue;
        };
        db.insert_aluno(AlunoRecord {
            id: 0,
            nome: nome.to_string(),
            data_nascimento,
            email: Some(format!("{user}@email.com")),
            status,
            turma_id,
        });
    }
    db
}
