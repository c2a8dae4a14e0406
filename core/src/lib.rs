//! Client core for the school administration panel.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host executes the
//! round-trip through a `Transport`, making the core deterministic and
//! testable.
//!
//! # Design
//! - `EscolaClient` holds only the base URL and the bearer token. Each
//!   endpoint is split into `build_*` and `parse_*`.
//! - `AlunosView` owns the list, the filter, the sort key and the fetch
//!   sequence numbers; responses to superseded fetches are dropped.
//! - `Panel` ties the client, a transport, a `LocalStore` and the view
//!   together and exposes one method per operator action.
//! - DTOs are defined independently from the mock-server crate; the
//!   integration tests catch schema drift.

pub mod client;
pub mod dates;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod http;
pub mod panel;
pub mod store;
pub mod types;
pub mod validate;
pub mod view;

pub use client::EscolaClient;
pub use debounce::{SearchDebouncer, SEARCH_QUIET_PERIOD};
pub use error::{ActionError, ApiError, ExportError, StoreError};
pub use filter::{AlunoFilter, SortKey};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use panel::{FormMode, Notice, NoticeLevel, Panel, PendingFetch, ReloadPolicy, Screen};
pub use store::{LocalStore, MemoryStore, Session, Theme};
pub use types::{
    Aluno, AlunoId, AlunoPayload, AlunoStatus, Credentials, LoginResponse, MatriculaConfirmada,
    MatriculaRequest, Mensagem, NovaTurma, Turma, TurmaId, Usuario,
};
pub use validate::{validate_turma, AlunoForm, FormErrors};
pub use view::{AlunoStats, AlunosView, FetchOutcome, FetchTicket, ViewState};
