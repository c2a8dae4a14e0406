//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use escola_core::{AlunoStatus, SortKey, TurmaId};

#[derive(Parser)]
#[command(
    name = "escola",
    version,
    about = "Administração escolar: alunos, turmas e matrículas",
    long_about = "Terminal client for the school administration API.\n\n\
                  Log in once; the session is kept in a local store until \
                  logout or until the server rejects the token."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the API.
    #[arg(
        long = "api-url",
        env = "ESCOLA_API_URL",
        default_value = "http://localhost:8001",
        global = true
    )]
    pub api_url: String,

    /// Local store file (default: platform data dir).
    #[arg(long = "store", env = "ESCOLA_STORE", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and keep the session.
    Login(LoginArgs),

    /// Drop the stored session.
    Logout,

    /// Show the logged-in user, confirming the token with the server.
    Whoami,

    /// Manage students.
    #[command(subcommand)]
    Alunos(AlunosCommand),

    /// Manage classes.
    #[command(subcommand)]
    Turmas(TurmasCommand),

    /// Enroll a student in a class.
    Matricular {
        /// Student id.
        aluno: i64,
        /// Class id.
        turma: TurmaId,
    },

    /// List students that can be enrolled (inactive or without a class).
    Candidatos,

    /// Export the filtered student list.
    Export(ExportArgs),

    /// Show or change the theme flag.
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeArg>,
    },
}

#[derive(Args)]
pub struct LoginArgs {
    /// Username (prompted if omitted).
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password (prompted securely if omitted).
    #[arg(short, long, env = "ESCOLA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum AlunosCommand {
    /// List students matching the filters.
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Sort order applied to the result.
        #[arg(long, value_enum, default_value = "nome")]
        sort: SortArg,

        /// Output format.
        #[arg(long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Create a student.
    Add(AlunoArgs),

    /// Update a student. Omitted fields keep their current value.
    Edit {
        id: i64,
        #[command(flatten)]
        fields: AlunoFields,
    },

    /// Delete a student.
    Rm {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct AlunoArgs {
    #[arg(long)]
    pub nome: String,

    /// Birth date, YYYY-MM-DD.
    #[arg(long)]
    pub nascimento: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long, value_enum, default_value = "inativo")]
    pub status: StatusArg,

    #[arg(long)]
    pub turma: Option<TurmaId>,
}

#[derive(Args)]
pub struct AlunoFields {
    #[arg(long)]
    pub nome: Option<String>,

    /// Birth date, YYYY-MM-DD.
    #[arg(long)]
    pub nascimento: Option<String>,

    /// New email; pass an empty string to clear it.
    #[arg(long)]
    pub email: Option<String>,

    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// New class id.
    #[arg(long, conflicts_with = "sem_turma")]
    pub turma: Option<TurmaId>,

    /// Remove the student from its class.
    #[arg(long)]
    pub sem_turma: bool,
}

#[derive(Subcommand)]
pub enum TurmasCommand {
    /// List classes with occupancy.
    List,

    /// Create a class.
    Add {
        #[arg(long)]
        nome: String,
        #[arg(long)]
        capacidade: u32,
    },
}

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Name fragment.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Class id.
    #[arg(long)]
    pub turma: Option<TurmaId>,

    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Write to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Ativo,
    Inativo,
}

impl From<StatusArg> for AlunoStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Ativo => AlunoStatus::Active,
            StatusArg::Inativo => AlunoStatus::Inactive,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortArg {
    Nome,
    NomeDesc,
    Idade,
    IdadeDesc,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Nome => SortKey::NameAsc,
            SortArg::NomeDesc => SortKey::NameDesc,
            SortArg::Idade => SortKey::AgeAsc,
            SortArg::IdadeDesc => SortKey::AgeDesc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ListFormat {
    Table,
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_parses_filters_and_sort() {
        let cli = Cli::try_parse_from([
            "escola", "alunos", "list", "--search", "ana", "--turma", "2", "--status", "ativo",
            "--sort", "idade-desc",
        ])
        .unwrap();
        match cli.command {
            Command::Alunos(AlunosCommand::List { filter, sort, .. }) => {
                assert_eq!(filter.search.as_deref(), Some("ana"));
                assert_eq!(filter.turma, Some(2));
                assert!(matches!(filter.status, Some(StatusArg::Ativo)));
                assert_eq!(SortKey::from(sort), SortKey::AgeDesc);
            }
            _ => panic!("expected alunos list"),
        }
    }

    #[test]
    fn turma_and_sem_turma_conflict() {
        let result = Cli::try_parse_from(["escola", "alunos", "edit", "3", "--turma", "1", "--sem-turma"]);
        assert!(result.is_err());
    }
}
