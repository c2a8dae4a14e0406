//! Filter criteria and client-side ordering for the alunos list.
//!
//! # Design
//! Filtering is the server's job: `AlunoFilter` only knows how to render
//! itself as query parameters. Ordering is the client's job, because the
//! server's order is unspecified; `sort_alunos` is applied to whatever list
//! is in memory and never triggers a fetch.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::types::{Aluno, AlunoStatus, TurmaId};

/// Criteria sent with `GET /alunos`. Empty criteria are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlunoFilter {
    pub search: Option<String>,
    pub turma_id: Option<TurmaId>,
    pub status: Option<AlunoStatus>,
}

impl AlunoFilter {
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none() && self.turma_id.is_none() && self.status.is_none()
    }

    /// Trimmed search token, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// `?search=..&turma_id=..&status=..`, or an empty string.
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(term) = self.search_term() {
            params.push(format!("search={}", urlencoding::encode(term)));
        }
        if let Some(turma_id) = self.turma_id {
            params.push(format!("turma_id={turma_id}"));
        }
        if let Some(status) = self.status {
            params.push(format!("status={}", status.as_str()));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Ordering applied to the in-memory list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    AgeAsc,
    AgeDesc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "nome",
            SortKey::NameDesc => "nome-desc",
            SortKey::AgeAsc => "idade",
            SortKey::AgeDesc => "idade-desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nome" => Ok(SortKey::NameAsc),
            "nome-desc" => Ok(SortKey::NameDesc),
            "idade" => Ok(SortKey::AgeAsc),
            "idade-desc" => Ok(SortKey::AgeDesc),
            other => Err(format!("ordenação desconhecida: {other}")),
        }
    }
}

/// Stable in-place sort. Ties keep the order the server sent.
pub fn sort_alunos(alunos: &mut [Aluno], key: SortKey, today: NaiveDate) {
    match key {
        SortKey::NameAsc => alunos.sort_by(|a, b| collate(&a.nome, &b.nome)),
        SortKey::NameDesc => alunos.sort_by(|a, b| collate(&b.nome, &a.nome)),
        SortKey::AgeAsc => alunos.sort_by_key(|a| a.age_on(today)),
        SortKey::AgeDesc => alunos.sort_by(|a, b| b.age_on(today).cmp(&a.age_on(today))),
    }
}

/// Locale-style name comparison: letters first compared without case or
/// accents, then with accents, then with case (lowercase first).
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(base_letter)
            .collect::<Vec<_>>()
    };
    primary(a)
        .cmp(&primary(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn base_letter(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aluno(id: i64, nome: &str, nascimento: (i32, u32, u32)) -> Aluno {
        Aluno {
            id,
            nome: nome.to_string(),
            data_nascimento: NaiveDate::from_ymd_opt(nascimento.0, nascimento.1, nascimento.2)
                .unwrap(),
            email: None,
            status: AlunoStatus::Active,
            turma_id: None,
            idade: None,
            turma_nome: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
    }

    fn names(alunos: &[Aluno]) -> Vec<&str> {
        alunos.iter().map(|a| a.nome.as_str()).collect()
    }

    #[test]
    fn empty_filter_has_no_query() {
        assert_eq!(AlunoFilter::default().query_string(), "");
        assert!(AlunoFilter::default().is_empty());
    }

    #[test]
    fn blank_search_is_omitted() {
        let filter = AlunoFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.query_string(), "");
        assert!(filter.is_empty());
    }

    #[test]
    fn all_criteria_are_encoded() {
        let filter = AlunoFilter {
            search: Some(" João Pedro ".to_string()),
            turma_id: Some(3),
            status: Some(AlunoStatus::Inactive),
        };
        assert_eq!(
            filter.query_string(),
            "?search=Jo%C3%A3o%20Pedro&turma_id=3&status=inativo"
        );
    }

    #[test]
    fn sort_key_round_trips_its_name() {
        for key in [SortKey::NameAsc, SortKey::NameDesc, SortKey::AgeAsc, SortKey::AgeDesc] {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert_eq!(SortKey::default(), SortKey::NameAsc);
    }

    #[test]
    fn names_ignore_case_and_accents() {
        let mut alunos = vec![
            aluno(1, "Érica", (2015, 1, 1)),
            aluno(2, "bruno", (2015, 1, 1)),
            aluno(3, "Ana", (2015, 1, 1)),
            aluno(4, "Eduardo", (2015, 1, 1)),
        ];
        sort_alunos(&mut alunos, SortKey::NameAsc, today());
        assert_eq!(names(&alunos), vec!["Ana", "bruno", "Eduardo", "Érica"]);

        sort_alunos(&mut alunos, SortKey::NameDesc, today());
        assert_eq!(names(&alunos), vec!["Érica", "Eduardo", "bruno", "Ana"]);
    }

    #[test]
    fn accent_and_case_break_ties() {
        assert_eq!(collate("e", "é"), Ordering::Less);
        assert_eq!(collate("ana", "Ana"), Ordering::Less);
        assert_eq!(collate("Ana", "Ana"), Ordering::Equal);
    }

    #[test]
    fn age_sort_uses_birthday_rule() {
        let mut alunos = vec![
            aluno(1, "Mais velho", (2010, 1, 1)),
            aluno(2, "Quase cinco", (2019, 6, 15)),
            aluno(3, "Seis", (2018, 1, 1)),
        ];
        sort_alunos(&mut alunos, SortKey::AgeAsc, today());
        assert_eq!(names(&alunos), vec!["Quase cinco", "Seis", "Mais velho"]);

        sort_alunos(&mut alunos, SortKey::AgeDesc, today());
        assert_eq!(names(&alunos), vec!["Mais velho", "Seis", "Quase cinco"]);
    }

    #[test]
    fn server_age_wins_over_birth_date() {
        let mut older = aluno(1, "Informado", (2019, 1, 1));
        older.idade = Some(40);
        let mut alunos = vec![older, aluno(2, "Calculado", (2010, 1, 1))];
        sort_alunos(&mut alunos, SortKey::AgeDesc, today());
        assert_eq!(names(&alunos), vec!["Informado", "Calculado"]);
    }

    #[test]
    fn equal_ages_keep_server_order() {
        let mut alunos = vec![
            aluno(1, "Zeca", (2015, 2, 1)),
            aluno(2, "Ana", (2015, 3, 1)),
        ];
        sort_alunos(&mut alunos, SortKey::AgeAsc, today());
        assert_eq!(names(&alunos), vec!["Zeca", "Ana"]);
    }
}
