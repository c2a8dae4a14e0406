//! State container for the alunos list.
//!
//! # Design
//! `AlunosView` owns the in-memory list, the filter and sort criteria and
//! the fetch bookkeeping. It performs no I/O: `Panel` asks it to start a
//! fetch, runs the request, and hands the result back. Every mutation goes
//! through a named transition so the whole cycle is testable without a UI.
//!
//! Fetches are numbered when issued. A result is applied only if it
//! belongs to the most recently issued fetch, so a slow response for an
//! old filter can never overwrite a newer one.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::filter::{sort_alunos, AlunoFilter, SortKey};
use crate::types::{Aluno, AlunoId, AlunoStatus, TurmaId};

/// What the list area is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    /// The last loaded list is rendered.
    #[default]
    Idle,
    /// A fetch is in flight; content hidden, spinner shown.
    Loading,
    /// The last fetch failed; content hidden.
    Error,
    /// The last fetch succeeded with no rows; placeholder shown.
    Empty,
}

/// Handle for an issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued after this one; the result was dropped.
    Stale,
}

/// Counters shown next to the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlunoStats {
    pub total: usize,
    pub ativos: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AlunosView {
    alunos: Vec<Aluno>,
    filter: AlunoFilter,
    sort: SortKey,
    state: ViewState,
    issued: u64,
    loaded_once: bool,
}

impl AlunosView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn filter(&self) -> &AlunoFilter {
        &self.filter
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    /// Rows to render. Only `Idle` shows rows.
    pub fn rows(&self) -> &[Aluno] {
        match self.state {
            ViewState::Idle => &self.alunos,
            _ => &[],
        }
    }

    /// Last successfully loaded list, whatever is being displayed. Stays
    /// available after a failed fetch.
    pub fn last_loaded(&self) -> &[Aluno] {
        &self.alunos
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    pub fn find(&self, id: AlunoId) -> Option<&Aluno> {
        self.alunos.iter().find(|a| a.id == id)
    }

    pub fn stats(&self) -> AlunoStats {
        AlunoStats {
            total: self.alunos.len(),
            ativos: self
                .alunos
                .iter()
                .filter(|a| a.status == AlunoStatus::Active)
                .count(),
        }
    }

    /// Students that may be offered for enrollment: inactive ones and ones
    /// without a class.
    pub fn enrollment_candidates(&self) -> Vec<&Aluno> {
        self.alunos
            .iter()
            .filter(|a| a.status == AlunoStatus::Inactive || a.turma_id.is_none())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Criteria transitions. Each returns whether the filter changed.
    // -----------------------------------------------------------------------

    pub fn set_search(&mut self, text: &str) -> bool {
        let term = Some(text.trim().to_string()).filter(|t| !t.is_empty());
        self.replace_filter(AlunoFilter {
            search: term,
            ..self.filter.clone()
        })
    }

    pub fn set_turma_filter(&mut self, turma_id: Option<TurmaId>) -> bool {
        self.replace_filter(AlunoFilter {
            turma_id,
            ..self.filter.clone()
        })
    }

    pub fn set_status_filter(&mut self, status: Option<AlunoStatus>) -> bool {
        self.replace_filter(AlunoFilter {
            status,
            ..self.filter.clone()
        })
    }

    pub fn clear_filters(&mut self) -> bool {
        self.replace_filter(AlunoFilter::default())
    }

    /// Replace all criteria at once.
    pub fn set_filter(&mut self, filter: AlunoFilter) -> bool {
        self.replace_filter(filter)
    }

    fn replace_filter(&mut self, filter: AlunoFilter) -> bool {
        let changed = filter != self.filter;
        self.filter = filter;
        changed
    }

    /// Re-order the list in memory. Never fetches.
    pub fn set_sort(&mut self, key: SortKey, today: NaiveDate) {
        self.sort = key;
        sort_alunos(&mut self.alunos, key, today);
    }

    // -----------------------------------------------------------------------
    // Fetch lifecycle
    // -----------------------------------------------------------------------

    /// Enter `Loading` and number a new fetch for the current filter.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.state = ViewState::Loading;
        debug!(seq = self.issued, query = %self.filter.query_string(), "alunos fetch issued");
        FetchTicket(self.issued)
    }

    /// Apply a fetch result if it is the latest one issued.
    ///
    /// Success replaces the whole list (no merge) and re-sorts it. Failure
    /// switches to `Error` and keeps the previous list internally.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Aluno>, &ApiError>,
        today: NaiveDate,
    ) -> FetchOutcome {
        if ticket.0 != self.issued {
            warn!(seq = ticket.0, latest = self.issued, "discarding stale alunos response");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(mut alunos) => {
                sort_alunos(&mut alunos, self.sort, today);
                self.state = if alunos.is_empty() {
                    ViewState::Empty
                } else {
                    ViewState::Idle
                };
                debug!(seq = ticket.0, rows = alunos.len(), "alunos fetch applied");
                self.alunos = alunos;
                self.loaded_once = true;
            }
            Err(err) => {
                warn!(seq = ticket.0, error = %err, "alunos fetch failed");
                self.state = ViewState::Error;
            }
        }
        FetchOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn aluno(id: AlunoId, nome: &str, status: AlunoStatus, turma_id: Option<TurmaId>) -> Aluno {
        Aluno {
            id,
            nome: nome.to_string(),
            data_nascimento: NaiveDate::from_ymd_opt(2015, 1, id as u32).unwrap(),
            email: None,
            status,
            turma_id,
            idade: None,
            turma_nome: None,
        }
    }

    fn loaded(alunos: Vec<Aluno>) -> AlunosView {
        let mut view = AlunosView::new();
        let ticket = view.begin_fetch();
        view.complete_fetch(ticket, Ok(alunos), today());
        view
    }

    #[test]
    fn fetch_replaces_and_sorts() {
        let view = loaded(vec![
            aluno(1, "Carla", AlunoStatus::Active, Some(1)),
            aluno(2, "Ana", AlunoStatus::Inactive, None),
        ]);
        assert_eq!(view.state(), ViewState::Idle);
        let names: Vec<&str> = view.rows().iter().map(|a| a.nome.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Carla"]);
    }

    #[test]
    fn loading_hides_rows() {
        let mut view = loaded(vec![aluno(1, "Ana", AlunoStatus::Active, None)]);
        view.begin_fetch();
        assert_eq!(view.state(), ViewState::Loading);
        assert!(view.rows().is_empty());
        assert_eq!(view.last_loaded().len(), 1);
    }

    #[test]
    fn empty_result_enters_empty_state() {
        let view = loaded(Vec::new());
        assert_eq!(view.state(), ViewState::Empty);
        assert!(view.has_loaded());
    }

    #[test]
    fn failure_keeps_previous_list_internally() {
        let mut view = loaded(vec![aluno(1, "Ana", AlunoStatus::Active, None)]);
        let ticket = view.begin_fetch();
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(view.complete_fetch(ticket, Err(&err), today()), FetchOutcome::Applied);
        assert_eq!(view.state(), ViewState::Error);
        assert!(view.rows().is_empty());
        assert_eq!(view.last_loaded()[0].nome, "Ana");
    }

    #[test]
    fn late_response_for_older_filter_is_dropped() {
        let mut view = AlunosView::new();
        view.set_status_filter(Some(AlunoStatus::Active));
        let first = view.begin_fetch();
        view.set_status_filter(Some(AlunoStatus::Inactive));
        let second = view.begin_fetch();

        let inativos = vec![aluno(2, "Bia", AlunoStatus::Inactive, None)];
        let ativos = vec![aluno(1, "Ana", AlunoStatus::Active, Some(1))];
        assert_eq!(view.complete_fetch(second, Ok(inativos), today()), FetchOutcome::Applied);
        assert_eq!(view.complete_fetch(first, Ok(ativos), today()), FetchOutcome::Stale);

        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].nome, "Bia");
        assert_eq!(view.filter().status, Some(AlunoStatus::Inactive));
    }

    #[test]
    fn sort_change_reorders_in_place() {
        let mut view = loaded(vec![
            aluno(1, "Ana", AlunoStatus::Active, None),
            aluno(2, "Bruno", AlunoStatus::Active, None),
        ]);
        view.set_sort(SortKey::NameDesc, today());
        assert_eq!(view.rows()[0].nome, "Bruno");
        assert_eq!(view.state(), ViewState::Idle);
    }

    #[test]
    fn new_fetch_keeps_active_sort() {
        let mut view = AlunosView::new();
        view.set_sort(SortKey::NameDesc, today());
        let ticket = view.begin_fetch();
        view.complete_fetch(
            ticket,
            Ok(vec![
                aluno(1, "Ana", AlunoStatus::Active, None),
                aluno(2, "Bruno", AlunoStatus::Active, None),
            ]),
            today(),
        );
        assert_eq!(view.rows()[0].nome, "Bruno");
    }

    #[test]
    fn filter_transitions_report_changes() {
        let mut view = AlunosView::new();
        assert!(view.set_turma_filter(Some(3)));
        assert!(!view.set_turma_filter(Some(3)));
        assert!(view.set_search("  ana "));
        assert_eq!(view.filter().search.as_deref(), Some("ana"));
        assert!(view.clear_filters());
        assert!(view.filter().is_empty());
    }

    #[test]
    fn candidates_exclude_actively_enrolled() {
        let view = loaded(vec![
            aluno(1, "Ana", AlunoStatus::Active, Some(1)),
            aluno(2, "Bia", AlunoStatus::Inactive, Some(1)),
            aluno(3, "Caio", AlunoStatus::Active, None),
            aluno(4, "Duda", AlunoStatus::Inactive, None),
        ]);
        let ids: Vec<AlunoId> = view.enrollment_candidates().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn stats_count_active_students() {
        let view = loaded(vec![
            aluno(1, "Ana", AlunoStatus::Active, Some(1)),
            aluno(2, "Bia", AlunoStatus::Inactive, None),
        ]);
        assert_eq!(view.stats(), AlunoStats { total: 2, ativos: 1 });
    }
}
