//! The admin panel controller.
//!
//! # Design
//! `Panel` owns everything the UI would otherwise keep in globals: the
//! session, the alunos view, the cached turmas, the search debouncer and
//! the notice queue. Hosts bind their events to its methods once; each
//! method builds a request with `EscolaClient`, runs it through the
//! `Transport`, and updates state.
//!
//! Every successful mutation re-fetches the full list (`after_mutation`);
//! nothing is patched in place. Failed mutations leave the list alone.
//! Failures are turned into error notices here, except session expiry,
//! which silently returns the panel to the login screen.

use std::time::Instant;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::client::EscolaClient;
use crate::debounce::SearchDebouncer;
use crate::error::{ActionError, ApiError, ExportError};
use crate::export;
use crate::filter::{AlunoFilter, SortKey};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::store::{LocalStore, Session, Theme};
use crate::types::{
    check_matricula, Aluno, AlunoId, AlunoPayload, AlunoStatus, Credentials,
    MatriculaConfirmada, MatriculaRequest, NovaTurma, Turma, TurmaId, Usuario,
};
use crate::validate::{validate_turma, AlunoForm};
use crate::view::{AlunosView, FetchOutcome, FetchTicket};

/// Which top-level screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Whether a successful mutation triggers the list reload by itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReloadPolicy {
    #[default]
    AfterEveryMutation,
    /// The host calls `reload_alunos` when it sees fit.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(AlunoId),
}

/// A list fetch that has been issued but not completed yet.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub ticket: FetchTicket,
    pub request: HttpRequest,
}

pub struct Panel<T: Transport, S: LocalStore> {
    client: EscolaClient,
    transport: T,
    store: S,
    session: Option<Session>,
    screen: Screen,
    alunos: AlunosView,
    turmas: Vec<Turma>,
    search: SearchDebouncer,
    notices: Vec<Notice>,
    theme: Theme,
    reload: ReloadPolicy,
    fixed_today: Option<NaiveDate>,
}

impl<T: Transport, S: LocalStore> Panel<T, S> {
    /// Picks up a persisted session, if any. The token is trusted until the
    /// server says otherwise; see `restore_session`.
    pub fn new(mut client: EscolaClient, transport: T, store: S) -> Self {
        let session = Session::load(&store);
        client.set_token(session.as_ref().map(|s| s.token.clone()));
        let screen = if session.is_some() {
            Screen::Main
        } else {
            Screen::Login
        };
        let theme = Theme::load(&store);
        Self {
            client,
            transport,
            store,
            session,
            screen,
            alunos: AlunosView::new(),
            turmas: Vec::new(),
            search: SearchDebouncer::default(),
            notices: Vec::new(),
            theme,
            reload: ReloadPolicy::default(),
            fixed_today: None,
        }
    }

    /// Pin the date used for ages and validation.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn set_reload_policy(&mut self, policy: ReloadPolicy) {
        self.reload = policy;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn usuario(&self) -> Option<&Usuario> {
        self.session.as_ref().and_then(|s| s.usuario.as_ref())
    }

    pub fn alunos(&self) -> &AlunosView {
        &self.alunos
    }

    pub fn turmas(&self) -> &[Turma] {
        &self.turmas
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn client(&self) -> &EscolaClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn search_pending(&self) -> bool {
        self.search.is_pending()
    }

    pub fn enrollment_candidates(&self) -> Vec<&Aluno> {
        self.alunos.enrollment_candidates()
    }

    pub fn today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(|| Local::now().date_naive())
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn login(&mut self, username: &str, senha: &str) -> Result<Usuario, ActionError> {
        let credentials = Credentials {
            username: username.to_string(),
            senha: senha.to_string(),
        };
        let result = self
            .client
            .build_login(&credentials)
            .and_then(|req| self.exchange(req))
            .and_then(|resp| self.client.parse_login(resp));
        let login = match result {
            Ok(login) => login,
            Err(err) => {
                warn!(username, error = %err, "login failed");
                self.notify(NoticeLevel::Error, format!("Erro no login: {err}"));
                return Err(err.into());
            }
        };

        let session = Session {
            token: login.access_token,
            usuario: Some(login.usuario.clone()),
        };
        session.save(&mut self.store)?;
        self.client.set_token(Some(session.token.clone()));
        self.session = Some(session);
        self.screen = Screen::Main;
        info!(username = %login.usuario.username, "logged in");
        self.notify(NoticeLevel::Success, "Login realizado com sucesso!");
        Ok(login.usuario)
    }

    /// Confirm a persisted token with `/auth/me` and refresh the profile.
    /// Any failure ends the session.
    pub fn restore_session(&mut self) -> Result<Option<Usuario>, ActionError> {
        if self.session.is_none() {
            return Ok(None);
        }
        let req = self.client.build_me();
        let result = self
            .exchange(req)
            .and_then(|resp| self.client.parse_me(resp));
        match result {
            Ok(usuario) => {
                if let Some(session) = &mut self.session {
                    session.usuario = Some(usuario.clone());
                    session.save(&mut self.store)?;
                }
                self.screen = Screen::Main;
                Ok(Some(usuario))
            }
            Err(ApiError::SessionExpired) => {
                self.expire_session();
                Err(ApiError::SessionExpired.into())
            }
            Err(err) => {
                warn!(error = %err, "profile lookup failed, logging out");
                self.end_session();
                self.notify(NoticeLevel::Error, format!("Erro ao obter perfil: {err}"));
                Err(err.into())
            }
        }
    }

    pub fn logout(&mut self) -> Result<(), ActionError> {
        Session::clear(&mut self.store)?;
        self.end_session();
        self.notify(NoticeLevel::Info, "Logout realizado com sucesso!");
        Ok(())
    }

    /// 401 with a token: drop the session without an error notice.
    fn expire_session(&mut self) {
        info!("session expired, returning to login");
        self.end_session();
    }

    fn end_session(&mut self) {
        if let Err(err) = Session::clear(&mut self.store) {
            warn!(error = %err, "could not clear persisted session");
        }
        self.session = None;
        self.client.set_token(None);
        self.screen = Screen::Login;
        self.search.cancel();
    }

    fn require_session(&self) -> Result<(), ActionError> {
        if self.session.is_some() {
            Ok(())
        } else {
            Err(ActionError::NotAuthenticated)
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load turmas and alunos, as done right after login.
    pub fn open(&mut self) -> Result<(), ActionError> {
        let turmas = self.reload_turmas();
        let alunos = self.reload_alunos();
        turmas.and(alunos)
    }

    /// Fetch the list for the current filter and replace it.
    pub fn reload_alunos(&mut self) -> Result<(), ActionError> {
        let pending = self.begin_alunos_fetch()?;
        let response = self.exchange(pending.request);
        self.complete_alunos_fetch(pending.ticket, response)
            .map(|_| ())
    }

    /// First half of a fetch, for hosts that keep several in flight.
    pub fn begin_alunos_fetch(&mut self) -> Result<PendingFetch, ActionError> {
        self.require_session()?;
        let ticket = self.alunos.begin_fetch();
        let request = self.client.build_list_alunos(self.alunos.filter());
        Ok(PendingFetch { ticket, request })
    }

    /// Second half of a fetch. Results of superseded fetches are dropped.
    pub fn complete_alunos_fetch(
        &mut self,
        ticket: FetchTicket,
        response: Result<HttpResponse, ApiError>,
    ) -> Result<FetchOutcome, ActionError> {
        let today = self.today();
        match response.and_then(|resp| self.client.parse_list_alunos(resp)) {
            Ok(list) => Ok(self.alunos.complete_fetch(ticket, Ok(list), today)),
            Err(err) => {
                let outcome = self.alunos.complete_fetch(ticket, Err(&err), today);
                if outcome == FetchOutcome::Stale && !matches!(err, ApiError::SessionExpired) {
                    return Ok(outcome);
                }
                Err(self.fail("carregar alunos", err.into()))
            }
        }
    }

    pub fn reload_turmas(&mut self) -> Result<(), ActionError> {
        self.require_session()?;
        let req = self.client.build_list_turmas();
        let result = self
            .exchange(req)
            .and_then(|resp| self.client.parse_list_turmas(resp));
        match result {
            Ok(turmas) => {
                debug!(count = turmas.len(), "turmas loaded");
                self.turmas = turmas;
                Ok(())
            }
            Err(err) => Err(self.fail("carregar turmas", err.into())),
        }
    }

    // -----------------------------------------------------------------------
    // Search, filters and sort
    // -----------------------------------------------------------------------

    /// A keystroke in the search box. The fetch waits for `poll_search`.
    pub fn type_search(&mut self, text: &str, now: Instant) {
        self.search.keystroke(text, now);
    }

    /// Fire the debounced search once its quiet period is over. Returns
    /// whether a fetch ran.
    pub fn poll_search(&mut self, now: Instant) -> Result<bool, ActionError> {
        match self.search.poll(now) {
            Some(text) => {
                self.alunos.set_search(&text);
                self.reload_alunos().map(|_| true)
            }
            None => Ok(false),
        }
    }

    /// Enter or the search button: skip the debounce.
    pub fn submit_search(&mut self, text: &str) -> Result<(), ActionError> {
        self.search.cancel();
        self.alunos.set_search(text);
        self.reload_alunos()
    }

    pub fn filter_by_turma(&mut self, turma_id: Option<TurmaId>) -> Result<(), ActionError> {
        self.alunos.set_turma_filter(turma_id);
        self.reload_alunos()
    }

    pub fn filter_by_status(&mut self, status: Option<AlunoStatus>) -> Result<(), ActionError> {
        self.alunos.set_status_filter(status);
        self.reload_alunos()
    }

    /// Set every criterion and fetch once.
    pub fn apply_filter(&mut self, filter: AlunoFilter) -> Result<(), ActionError> {
        self.search.cancel();
        self.alunos.set_filter(filter);
        self.reload_alunos()
    }

    pub fn clear_filters(&mut self) -> Result<(), ActionError> {
        self.search.cancel();
        self.alunos.clear_filters();
        self.reload_alunos()
    }

    /// Client-side only; no fetch.
    pub fn sort_by(&mut self, key: SortKey) {
        let today = self.today();
        self.alunos.set_sort(key, today);
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Prefilled form for editing a loaded aluno.
    pub fn edit_form(&mut self, id: AlunoId) -> Result<AlunoForm, ActionError> {
        match self.alunos.find(id) {
            Some(aluno) => Ok(AlunoForm::from_aluno(aluno)),
            None => {
                self.notify(NoticeLevel::Error, "Aluno não encontrado");
                Err(ActionError::UnknownAluno(id))
            }
        }
    }

    /// Validate and submit the aluno form. Validation failures never reach
    /// the network and produce no notice; the caller shows them per field.
    pub fn save_aluno(&mut self, form: &AlunoForm, mode: FormMode) -> Result<Aluno, ActionError> {
        let payload = form.validate(self.today()).map_err(ActionError::Invalid)?;
        self.require_session()?;

        let (context, done) = match mode {
            FormMode::Create => ("criar aluno", "Aluno criado com sucesso!"),
            FormMode::Edit(_) => ("atualizar aluno", "Aluno atualizado com sucesso!"),
        };
        if let Err(err) = self.check_seat(&payload, mode) {
            return Err(self.fail(context, err));
        }
        let result = match mode {
            FormMode::Create => self
                .client
                .build_create_aluno(&payload)
                .and_then(|req| self.exchange(req))
                .and_then(|resp| self.client.parse_create_aluno(resp)),
            FormMode::Edit(id) => self
                .client
                .build_update_aluno(id, &payload)
                .and_then(|req| self.exchange(req))
                .and_then(|resp| self.client.parse_update_aluno(resp)),
        };
        match result {
            Ok(aluno) => {
                info!(id = aluno.id, context, "aluno saved");
                self.notify(NoticeLevel::Success, done);
                self.after_mutation();
                Ok(aluno)
            }
            Err(err) => Err(self.fail(context, err.into())),
        }
    }

    /// An active student assigned to a cached class needs a free seat there,
    /// unless it already holds one.
    fn check_seat(&self, payload: &AlunoPayload, mode: FormMode) -> Result<(), ActionError> {
        let Some(turma_id) = payload.turma_id else {
            return Ok(());
        };
        if payload.status != AlunoStatus::Active {
            return Ok(());
        }
        let Some(turma) = self.turmas.iter().find(|t| t.id == turma_id) else {
            return Ok(());
        };
        let seated = match mode {
            FormMode::Edit(id) => self
                .alunos
                .find(id)
                .is_some_and(|a| a.turma_id == Some(turma_id) && a.status == AlunoStatus::Active),
            FormMode::Create => false,
        };
        if !seated && turma.is_full() {
            return Err(ActionError::TurmaFull {
                nome: turma.nome.clone(),
                capacidade: turma.capacidade,
            });
        }
        Ok(())
    }

    pub fn delete_aluno(&mut self, id: AlunoId) -> Result<(), ActionError> {
        self.require_session()?;
        let req = self.client.build_delete_aluno(id);
        let result = self
            .exchange(req)
            .and_then(|resp| self.client.parse_delete_aluno(resp));
        match result {
            Ok(_) => {
                info!(id, "aluno deleted");
                self.notify(NoticeLevel::Success, "Aluno excluído com sucesso!");
                self.after_mutation();
                Ok(())
            }
            Err(err) => Err(self.fail("excluir aluno", err.into())),
        }
    }

    pub fn create_turma(&mut self, turma: &NovaTurma) -> Result<Turma, ActionError> {
        let turma = validate_turma(turma).map_err(ActionError::Invalid)?;
        self.require_session()?;
        let result = self
            .client
            .build_create_turma(&turma)
            .and_then(|req| self.exchange(req))
            .and_then(|resp| self.client.parse_create_turma(resp));
        match result {
            Ok(created) => {
                info!(id = created.id, nome = %created.nome, "turma created");
                self.notify(NoticeLevel::Success, "Turma criada com sucesso!");
                if self.reload == ReloadPolicy::AfterEveryMutation {
                    let _ = self.reload_turmas();
                }
                Ok(created)
            }
            Err(err) => Err(self.fail("criar turma", err.into())),
        }
    }

    /// Enroll a student. What is known locally is checked first; the server
    /// has the final word.
    pub fn matricular(
        &mut self,
        aluno_id: AlunoId,
        turma_id: TurmaId,
    ) -> Result<MatriculaConfirmada, ActionError> {
        self.require_session()?;
        let aluno = self.alunos.find(aluno_id);
        let turma = self.turmas.iter().find(|t| t.id == turma_id);
        if let (Some(aluno), Some(turma)) = (aluno, turma) {
            if let Err(err) = check_matricula(aluno, turma) {
                return Err(self.fail("matricular aluno", err));
            }
        } else if let Some(turma) = turma.filter(|t| t.is_full()) {
            let err = ActionError::TurmaFull {
                nome: turma.nome.clone(),
                capacidade: turma.capacidade,
            };
            return Err(self.fail("matricular aluno", err));
        }

        let request = MatriculaRequest { aluno_id, turma_id };
        let result = self
            .client
            .build_create_matricula(&request)
            .and_then(|req| self.exchange(req))
            .and_then(|resp| self.client.parse_create_matricula(resp));
        match result {
            Ok(confirmed) => {
                info!(aluno_id, turma_id, "matrícula confirmed");
                self.notify(NoticeLevel::Success, "Aluno matriculado com sucesso!");
                self.after_mutation();
                if self.reload == ReloadPolicy::AfterEveryMutation {
                    let _ = self.reload_turmas();
                }
                Ok(confirmed)
            }
            Err(err) => Err(self.fail("matricular aluno", err.into())),
        }
    }

    /// The re-fetch that follows every successful aluno mutation. Its own
    /// failure is reported through the view state and a notice.
    pub fn after_mutation(&mut self) {
        if self.reload == ReloadPolicy::Manual {
            return;
        }
        if let Err(err) = self.reload_alunos() {
            debug!(error = %err, "reload after mutation failed");
        }
    }

    // -----------------------------------------------------------------------
    // Local state
    // -----------------------------------------------------------------------

    pub fn toggle_theme(&mut self) -> Result<Theme, ActionError> {
        self.set_theme(self.theme.toggled())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Theme, ActionError> {
        theme.save(&mut self.store)?;
        self.theme = theme;
        Ok(theme)
    }

    pub fn export_csv(&self) -> Result<String, ExportError> {
        export::alunos_csv(self.alunos.last_loaded(), &self.turmas)
    }

    pub fn export_json(&self) -> Result<String, ExportError> {
        export::alunos_json(self.alunos.last_loaded())
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn exchange(&mut self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "response");
        Ok(response)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    /// Report a failed action. Session expiry resets the panel instead.
    fn fail(&mut self, context: &str, err: ActionError) -> ActionError {
        if err.is_session_expired() {
            self.expire_session();
        } else {
            warn!(context, error = %err, "action failed");
            self.notify(NoticeLevel::Error, format!("Erro ao {context}: {err}"));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::HttpMethod;
    use crate::store::{MemoryStore, TOKEN_KEY};

    type Handler = Box<dyn FnMut(&HttpRequest) -> Result<HttpResponse, ApiError>>;

    /// Records every request and answers through a closure.
    struct Stub {
        requests: Vec<HttpRequest>,
        handler: Handler,
    }

    impl Stub {
        fn new(handler: impl FnMut(&HttpRequest) -> Result<HttpResponse, ApiError> + 'static) -> Self {
            Self {
                requests: Vec::new(),
                handler: Box::new(handler),
            }
        }

        fn count(&self, method: HttpMethod, path_prefix: &str) -> usize {
            self.requests
                .iter()
                .filter(|r| r.method == method && path(r).starts_with(path_prefix))
                .count()
        }
    }

    impl Transport for Stub {
        fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let response = (self.handler)(&request);
            self.requests.push(request);
            response
        }
    }

    fn path(request: &HttpRequest) -> &str {
        request.url.trim_start_matches("http://api.test")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    const ALUNOS: &str = r#"[
        {"id":1,"nome":"Bruno Costa","data_nascimento":"2016-07-02","status":"ativo","turma_id":1},
        {"id":2,"nome":"Ana Silva","data_nascimento":"2017-03-15","status":"inativo","turma_id":null}
    ]"#;
    const TURMAS: &str = r#"[
        {"id":1,"nome":"1º Ano A","capacidade":30,"ocupacao":29},
        {"id":2,"nome":"2º Ano B","capacidade":2,"ocupacao":2}
    ]"#;

    /// A well-behaved server with two alunos and two turmas.
    fn happy(request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let p = path(request);
        let response = match (request.method, p) {
            (HttpMethod::Post, "/auth/login") => HttpResponse::new(
                200,
                r#"{"access_token":"tok-1","token_type":"bearer","usuario":{"id":1,"username":"admin","nome_completo":"Administrador"}}"#,
            ),
            (HttpMethod::Get, "/auth/me") => HttpResponse::new(
                200,
                r#"{"id":1,"username":"admin","nome_completo":"Administrador","email":"admin@escola.com"}"#,
            ),
            (HttpMethod::Get, p) if p.starts_with("/alunos") => HttpResponse::new(200, ALUNOS),
            (HttpMethod::Get, "/turmas") => HttpResponse::new(200, TURMAS),
            (HttpMethod::Post, "/alunos") | (HttpMethod::Put, _) => HttpResponse::new(
                200,
                r#"{"id":3,"nome":"Carla Mendes","data_nascimento":"2017-01-08","status":"inativo"}"#,
            ),
            (HttpMethod::Delete, _) => HttpResponse::new(200, r#"{"message":"ok"}"#),
            (HttpMethod::Post, "/turmas") => {
                HttpResponse::new(201, r#"{"id":3,"nome":"3º Ano","capacidade":20,"ocupacao":0}"#)
            }
            (HttpMethod::Post, "/matriculas") => HttpResponse::new(
                201,
                r#"{"message":"Aluno matriculado com sucesso","aluno_id":2,"turma_id":1,"novo_status":"ativo"}"#,
            ),
            _ => HttpResponse::new(404, r#"{"detail":"Not Found"}"#),
        };
        Ok(response)
    }

    fn logged_in_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        Session {
            token: "tok-1".to_string(),
            usuario: None,
        }
        .save(&mut store)
        .unwrap();
        store
    }

    fn panel(stub: Stub) -> Panel<Stub, MemoryStore> {
        let mut panel = Panel::new(EscolaClient::new("http://api.test"), stub, logged_in_store())
            .with_today(today());
        panel.open().unwrap();
        panel.drain_notices();
        panel.transport_mut().requests.clear();
        panel
    }

    fn form() -> AlunoForm {
        AlunoForm {
            nome: "Carla Mendes".to_string(),
            data_nascimento: "2017-01-08".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn starts_on_login_screen_without_token() {
        let panel = Panel::new(
            EscolaClient::new("http://api.test"),
            Stub::new(happy),
            MemoryStore::new(),
        );
        assert_eq!(panel.screen(), Screen::Login);
        assert!(panel.client().token().is_none());
    }

    #[test]
    fn persisted_token_resumes_main_screen() {
        let panel = Panel::new(
            EscolaClient::new("http://api.test"),
            Stub::new(happy),
            logged_in_store(),
        );
        assert_eq!(panel.screen(), Screen::Main);
        assert_eq!(panel.client().token(), Some("tok-1"));
    }

    #[test]
    fn login_persists_session() {
        let mut panel = Panel::new(
            EscolaClient::new("http://api.test"),
            Stub::new(happy),
            MemoryStore::new(),
        );
        let usuario = panel.login("admin", "admin123").unwrap();
        assert_eq!(usuario.username, "admin");
        assert_eq!(panel.screen(), Screen::Main);
        assert_eq!(panel.store().get(TOKEN_KEY).as_deref(), Some("tok-1"));
        assert_eq!(panel.notices()[0].message, "Login realizado com sucesso!");
    }

    #[test]
    fn failed_login_shows_server_message() {
        let stub = Stub::new(|_| {
            Ok(HttpResponse::new(401, r#"{"detail":"Usuário ou senha incorretos"}"#))
        });
        let mut panel = Panel::new(EscolaClient::new("http://api.test"), stub, MemoryStore::new());
        assert!(panel.login("admin", "errada").is_err());
        assert_eq!(panel.screen(), Screen::Login);
        assert_eq!(
            panel.notices()[0].message,
            "Erro no login: Usuário ou senha incorretos"
        );
    }

    #[test]
    fn restore_refreshes_profile() {
        let mut panel = Panel::new(
            EscolaClient::new("http://api.test"),
            Stub::new(happy),
            logged_in_store(),
        );
        let usuario = panel.restore_session().unwrap().unwrap();
        assert_eq!(usuario.email.as_deref(), Some("admin@escola.com"));
        assert_eq!(panel.usuario().map(|u| u.nome_completo.as_str()), Some("Administrador"));
    }

    #[test]
    fn open_loads_turmas_and_sorted_alunos() {
        let panel = panel(Stub::new(happy));
        assert_eq!(panel.turmas().len(), 2);
        let names: Vec<&str> = panel.alunos().rows().iter().map(|a| a.nome.as_str()).collect();
        assert_eq!(names, vec!["Ana Silva", "Bruno Costa"]);
    }

    #[test]
    fn successful_mutation_reloads_exactly_once() {
        let mut panel = panel(Stub::new(happy));
        panel.save_aluno(&form(), FormMode::Create).unwrap();
        assert_eq!(panel.transport().count(HttpMethod::Post, "/alunos"), 1);
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 1);
        assert_eq!(panel.notices()[0].message, "Aluno criado com sucesso!");

        panel.transport_mut().requests.clear();
        panel.delete_aluno(1).unwrap();
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 1);
    }

    #[test]
    fn failed_mutation_does_not_reload() {
        let stub = Stub::new(|request| {
            if request.method == HttpMethod::Put {
                return Ok(HttpResponse::new(400, r#"{"detail":"Email já cadastrado"}"#));
            }
            happy(request)
        });
        let mut panel = panel(stub);
        let err = panel.save_aluno(&form(), FormMode::Edit(1)).unwrap_err();
        assert_eq!(err.to_string(), "Email já cadastrado");
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 0);
        assert_eq!(
            panel.notices()[0].message,
            "Erro ao atualizar aluno: Email já cadastrado"
        );
        assert_eq!(panel.alunos().rows().len(), 2);
    }

    #[test]
    fn invalid_form_never_reaches_the_network() {
        let mut panel = panel(Stub::new(happy));
        let bad = AlunoForm {
            nome: "Jo".to_string(),
            ..form()
        };
        let err = panel.save_aluno(&bad, FormMode::Create).unwrap_err();
        assert!(matches!(err, ActionError::Invalid(ref e) if e.has("nome")));
        assert!(panel.transport().requests.is_empty());
        assert!(panel.notices().is_empty());
    }

    #[test]
    fn unauthorized_returns_to_login_and_clears_store() {
        let stub = Stub::new(|request| {
            if request.method == HttpMethod::Delete {
                return Ok(HttpResponse::new(401, r#"{"detail":"Token inválido"}"#));
            }
            happy(request)
        });
        let mut panel = panel(stub);
        let err = panel.delete_aluno(1).unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(panel.screen(), Screen::Login);
        assert!(panel.store().get(TOKEN_KEY).is_none());
        assert!(panel.client().token().is_none());
        assert!(panel.notices().is_empty());
        assert!(matches!(panel.reload_alunos(), Err(ActionError::NotAuthenticated)));
    }

    #[test]
    fn debounced_typing_fetches_once_with_final_text() {
        let mut panel = panel(Stub::new(happy));
        let t0 = Instant::now();
        panel.type_search("a", t0);
        panel.type_search("an", t0 + Duration::from_millis(100));
        panel.type_search("ana", t0 + Duration::from_millis(200));
        assert!(!panel.poll_search(t0 + Duration::from_millis(450)).unwrap());
        assert!(panel.poll_search(t0 + Duration::from_millis(500)).unwrap());
        assert!(!panel.poll_search(t0 + Duration::from_millis(900)).unwrap());

        let requests = &panel.transport().requests;
        assert_eq!(requests.len(), 1);
        assert_eq!(path(&requests[0]), "/alunos?search=ana");
    }

    #[test]
    fn pause_between_keystrokes_fetches_twice() {
        let mut panel = panel(Stub::new(happy));
        let t0 = Instant::now();
        panel.type_search("a", t0);
        assert!(panel.poll_search(t0 + Duration::from_millis(300)).unwrap());
        panel.type_search("ana", t0 + Duration::from_millis(400));
        assert!(!panel.poll_search(t0 + Duration::from_millis(600)).unwrap());
        assert!(panel.poll_search(t0 + Duration::from_millis(700)).unwrap());
        let paths: Vec<&str> = panel.transport().requests.iter().map(path).collect();
        assert_eq!(paths, ["/alunos?search=a", "/alunos?search=ana"]);
    }

    #[test]
    fn submit_skips_pending_debounce() {
        let mut panel = panel(Stub::new(happy));
        let t0 = Instant::now();
        panel.type_search("ana", t0);
        panel.submit_search("ana").unwrap();
        assert!(!panel.search_pending());
        assert!(!panel.poll_search(t0 + Duration::from_secs(1)).unwrap());
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 1);
    }

    #[test]
    fn repeated_filter_gives_same_list() {
        let mut panel = panel(Stub::new(happy));
        panel.filter_by_turma(Some(1)).unwrap();
        let first = panel.alunos().rows().to_vec();
        panel.filter_by_turma(Some(1)).unwrap();
        assert_eq!(panel.alunos().rows(), first.as_slice());
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos?turma_id=1"), 2);
    }

    #[test]
    fn combined_filter_fetches_once() {
        let mut panel = panel(Stub::new(happy));
        panel
            .apply_filter(AlunoFilter {
                search: Some("ana".to_string()),
                turma_id: Some(1),
                status: Some(AlunoStatus::Active),
            })
            .unwrap();
        let requests = &panel.transport().requests;
        assert_eq!(requests.len(), 1);
        assert_eq!(path(&requests[0]), "/alunos?search=ana&turma_id=1&status=ativo");
    }

    #[test]
    fn sort_does_not_fetch() {
        let mut panel = panel(Stub::new(happy));
        panel.sort_by(SortKey::NameDesc);
        assert!(panel.transport().requests.is_empty());
        assert_eq!(panel.alunos().rows()[0].nome, "Bruno Costa");
    }

    #[test]
    fn stale_list_response_is_ignored() {
        let mut panel = panel(Stub::new(happy));
        panel.alunos.set_status_filter(Some(AlunoStatus::Active));
        let first = panel.begin_alunos_fetch().unwrap();
        panel.alunos.set_status_filter(Some(AlunoStatus::Inactive));
        let second = panel.begin_alunos_fetch().unwrap();

        let inativos = r#"[{"id":2,"nome":"Ana Silva","data_nascimento":"2017-03-15","status":"inativo"}]"#;
        let ativos = r#"[{"id":1,"nome":"Bruno Costa","data_nascimento":"2016-07-02","status":"ativo","turma_id":1}]"#;
        let applied = panel
            .complete_alunos_fetch(second.ticket, Ok(HttpResponse::new(200, inativos)))
            .unwrap();
        let stale = panel
            .complete_alunos_fetch(first.ticket, Ok(HttpResponse::new(200, ativos)))
            .unwrap();
        assert_eq!(applied, FetchOutcome::Applied);
        assert_eq!(stale, FetchOutcome::Stale);
        assert_eq!(panel.alunos().rows().len(), 1);
        assert_eq!(panel.alunos().rows()[0].status, AlunoStatus::Inactive);
    }

    #[test]
    fn stale_failure_is_silent() {
        let mut panel = panel(Stub::new(happy));
        let first = panel.begin_alunos_fetch().unwrap();
        let second = panel.begin_alunos_fetch().unwrap();
        panel
            .complete_alunos_fetch(second.ticket, Ok(HttpResponse::new(200, ALUNOS)))
            .unwrap();
        let outcome = panel
            .complete_alunos_fetch(first.ticket, Err(ApiError::Transport("timeout".to_string())))
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
        assert!(panel.notices().is_empty());
        assert_eq!(panel.alunos().rows().len(), 2);
    }

    #[test]
    fn full_turma_is_rejected_before_posting() {
        let mut panel = panel(Stub::new(happy));
        let err = panel.matricular(2, 2).unwrap_err();
        assert!(matches!(err, ActionError::TurmaFull { capacidade: 2, .. }));
        assert_eq!(panel.transport().count(HttpMethod::Post, "/matriculas"), 0);
    }

    #[test]
    fn last_seat_can_be_taken() {
        let mut panel = panel(Stub::new(happy));
        let confirmed = panel.matricular(2, 1).unwrap();
        assert_eq!(confirmed.novo_status, AlunoStatus::Active);
        assert_eq!(panel.transport().count(HttpMethod::Post, "/matriculas"), 1);
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 1);
        assert_eq!(panel.transport().count(HttpMethod::Get, "/turmas"), 1);
    }

    #[test]
    fn active_aluno_needs_a_free_seat() {
        let mut panel = panel(Stub::new(happy));
        let full = AlunoForm {
            status: AlunoStatus::Active,
            turma_id: Some(2),
            ..form()
        };
        let err = panel.save_aluno(&full, FormMode::Create).unwrap_err();
        assert!(matches!(err, ActionError::TurmaFull { capacidade: 2, .. }));
        assert_eq!(panel.transport().count(HttpMethod::Post, "/alunos"), 0);

        // Inactive students do not take a seat.
        let waiting = AlunoForm {
            status: AlunoStatus::Inactive,
            ..full
        };
        panel.save_aluno(&waiting, FormMode::Create).unwrap();
        assert_eq!(panel.transport().count(HttpMethod::Post, "/alunos"), 1);
    }

    #[test]
    fn seated_aluno_keeps_its_seat_on_edit() {
        let mut panel = panel(Stub::new(|request: &HttpRequest| {
            let turmas = r#"[{"id":1,"nome":"1º Ano A","capacidade":1,"ocupacao":1}]"#;
            Ok(match path(request) {
                "/turmas" => HttpResponse::new(200, turmas),
                _ => happy(request)?,
            })
        }));
        let mut edit = panel.edit_form(1).unwrap();
        edit.nome = "Bruno Costa Lima".to_string();
        panel.save_aluno(&edit, FormMode::Edit(1)).unwrap();
        assert_eq!(panel.transport().count(HttpMethod::Put, "/alunos/1"), 1);

        let mut moved = panel.edit_form(2).unwrap();
        moved.status = AlunoStatus::Active;
        moved.turma_id = Some(1);
        let err = panel.save_aluno(&moved, FormMode::Edit(2)).unwrap_err();
        assert!(matches!(err, ActionError::TurmaFull { .. }));
        assert_eq!(panel.transport().count(HttpMethod::Put, "/alunos/2"), 0);
    }

    #[test]
    fn enrolled_student_cannot_be_enrolled_again() {
        let mut panel = panel(Stub::new(happy));
        let err = panel.matricular(1, 1).unwrap_err();
        assert!(matches!(err, ActionError::AlreadyEnrolled { .. }));
    }

    #[test]
    fn turma_creation_refreshes_turmas() {
        let mut panel = panel(Stub::new(happy));
        let turma = panel
            .create_turma(&NovaTurma {
                nome: "3º Ano".to_string(),
                capacidade: 20,
            })
            .unwrap();
        assert_eq!(turma.id, 3);
        assert_eq!(panel.transport().count(HttpMethod::Get, "/turmas"), 1);
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 0);
    }

    #[test]
    fn edit_form_is_prefilled() {
        let mut panel = panel(Stub::new(happy));
        let form = panel.edit_form(1).unwrap();
        assert_eq!(form.nome, "Bruno Costa");
        assert_eq!(form.data_nascimento, "2016-07-02");
        assert!(matches!(panel.edit_form(99), Err(ActionError::UnknownAluno(99))));
    }

    #[test]
    fn manual_reload_policy_skips_refetch() {
        let mut panel = panel(Stub::new(happy));
        panel.set_reload_policy(ReloadPolicy::Manual);
        panel.delete_aluno(1).unwrap();
        assert_eq!(panel.transport().count(HttpMethod::Get, "/alunos"), 0);
    }

    #[test]
    fn theme_toggle_persists() {
        let mut panel = panel(Stub::new(happy));
        assert_eq!(panel.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(Theme::load(panel.store()), Theme::Dark);
    }

    #[test]
    fn logout_clears_everything() {
        let mut panel = panel(Stub::new(happy));
        panel.logout().unwrap();
        assert_eq!(panel.screen(), Screen::Login);
        assert!(panel.session().is_none());
        assert!(panel.store().get(TOKEN_KEY).is_none());
    }
}
