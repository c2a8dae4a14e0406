//! Command handlers. Each one drives the panel the way the UI would.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input, Password};
use escola_cli::store::{self, FileStore};
use escola_cli::transport::UreqTransport;
use escola_core::{
    ActionError, AlunoFilter, AlunoForm, EscolaClient, FormMode, NovaTurma, Panel, Screen,
    Theme, ViewState,
};

use crate::cli::{
    AlunoArgs, AlunoFields, AlunosCommand, Cli, Command, ExportArgs, ExportFormat, FilterArgs,
    ListFormat, LoginArgs, ThemeArg, TurmasCommand,
};
use crate::render;

pub type CliPanel = Panel<UreqTransport, FileStore>;

pub fn open_panel(cli: &Cli) -> Result<CliPanel> {
    let path = match &cli.store {
        Some(path) => path.clone(),
        None => store::default_path()
            .context("could not determine a data directory; pass --store")?,
    };
    let store = FileStore::open(&path)
        .with_context(|| format!("could not open store at {}", path.display()))?;
    Ok(Panel::new(
        EscolaClient::new(&cli.api_url),
        UreqTransport::default(),
        store,
    ))
}

pub fn run(cli: &Cli, panel: &mut CliPanel) -> Result<()> {
    match &cli.command {
        Command::Login(args) => login(panel, args),
        Command::Logout => Ok(panel.logout()?),
        Command::Whoami => whoami(panel),
        Command::Alunos(cmd) => {
            require_login(panel)?;
            alunos(panel, cmd)
        }
        Command::Turmas(cmd) => {
            require_login(panel)?;
            turmas(panel, cmd)
        }
        Command::Matricular { aluno, turma } => {
            require_login(panel)?;
            panel.open()?;
            let confirmed = panel.matricular(*aluno, *turma)?;
            println!("{}", confirmed.message);
            Ok(())
        }
        Command::Candidatos => {
            require_login(panel)?;
            panel.open()?;
            let candidatos: Vec<_> = panel
                .enrollment_candidates()
                .into_iter()
                .cloned()
                .collect();
            if candidatos.is_empty() {
                println!("Nenhum aluno disponível para matrícula");
            } else {
                let table = render::alunos_table(&candidatos, panel.turmas(), panel.today());
                println!("{table}");
            }
            Ok(())
        }
        Command::Export(args) => {
            require_login(panel)?;
            export(panel, args)
        }
        Command::Theme { mode } => theme(panel, *mode),
    }
}

fn require_login(panel: &CliPanel) -> Result<()> {
    if panel.screen() == Screen::Login {
        bail!("não autenticado; execute `escola login`");
    }
    Ok(())
}

fn login(panel: &mut CliPanel, args: &LoginArgs) -> Result<()> {
    let username = match &args.username {
        Some(username) => username.clone(),
        None => Input::new()
            .with_prompt("Usuário")
            .interact_text()
            .context("failed to read username")?,
    };
    let senha = match &args.password {
        Some(password) => password.clone(),
        None => Password::new()
            .with_prompt("Senha")
            .interact()
            .context("failed to read password")?,
    };
    let usuario = panel.login(&username, &senha)?;
    println!("Bem-vindo, {}", usuario.nome_completo);
    Ok(())
}

fn whoami(panel: &mut CliPanel) -> Result<()> {
    match panel.restore_session()? {
        Some(usuario) => println!("{}", render::usuario_line(&usuario)),
        None => println!("não autenticado"),
    }
    Ok(())
}

fn to_filter(args: &FilterArgs) -> AlunoFilter {
    AlunoFilter {
        search: args.search.clone(),
        turma_id: args.turma,
        status: args.status.map(Into::into),
    }
}

fn load_alunos(panel: &mut CliPanel, filter: &FilterArgs) -> Result<()> {
    panel.reload_turmas()?;
    panel.apply_filter(to_filter(filter))?;
    Ok(())
}

fn alunos(panel: &mut CliPanel, cmd: &AlunosCommand) -> Result<()> {
    match cmd {
        AlunosCommand::List {
            filter,
            sort,
            format,
        } => {
            load_alunos(panel, filter)?;
            panel.sort_by((*sort).into());
            match format {
                ListFormat::Table => {
                    if panel.alunos().state() == ViewState::Empty {
                        println!("Nenhum aluno encontrado");
                    } else {
                        let table = render::alunos_table(
                            panel.alunos().rows(),
                            panel.turmas(),
                            panel.today(),
                        );
                        println!("{table}");
                    }
                    let stats = panel.alunos().stats();
                    println!("{}", render::stats_line(stats, panel.turmas().len()));
                }
                ListFormat::Csv => print!("{}", panel.export_csv()?),
                ListFormat::Json => println!("{}", panel.export_json()?),
            }
            Ok(())
        }
        AlunosCommand::Add(args) => {
            let form = new_form(args);
            save(panel, &form, FormMode::Create)
        }
        AlunosCommand::Edit { id, fields } => {
            panel.reload_alunos()?;
            let mut form = panel.edit_form(*id)?;
            apply_fields(&mut form, fields);
            save(panel, &form, FormMode::Edit(*id))
        }
        AlunosCommand::Rm { id, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Excluir o aluno {id}?"))
                    .default(false)
                    .interact()
                    .context("failed to read confirmation")?;
                if !confirmed {
                    return Ok(());
                }
            }
            Ok(panel.delete_aluno(*id)?)
        }
    }
}

fn new_form(args: &AlunoArgs) -> AlunoForm {
    AlunoForm {
        nome: args.nome.clone(),
        data_nascimento: args.nascimento.clone(),
        email: args.email.clone().unwrap_or_default(),
        status: args.status.into(),
        turma_id: args.turma,
    }
}

fn apply_fields(form: &mut AlunoForm, fields: &AlunoFields) {
    if let Some(nome) = &fields.nome {
        form.nome = nome.clone();
    }
    if let Some(nascimento) = &fields.nascimento {
        form.data_nascimento = nascimento.clone();
    }
    if let Some(email) = &fields.email {
        form.email = email.clone();
    }
    if let Some(status) = fields.status {
        form.status = status.into();
    }
    if fields.sem_turma {
        form.turma_id = None;
    } else if let Some(turma) = fields.turma {
        form.turma_id = Some(turma);
    }
}

fn save(panel: &mut CliPanel, form: &AlunoForm, mode: FormMode) -> Result<()> {
    match panel.save_aluno(form, mode) {
        Ok(_) => Ok(()),
        Err(ActionError::Invalid(errors)) => {
            for (field, message) in errors.messages() {
                eprintln!("  {field}: {message}");
            }
            bail!("formulário inválido")
        }
        Err(err) => Err(err.into()),
    }
}

fn turmas(panel: &mut CliPanel, cmd: &TurmasCommand) -> Result<()> {
    match cmd {
        TurmasCommand::List => {
            panel.reload_turmas()?;
            if panel.turmas().is_empty() {
                println!("Nenhuma turma cadastrada");
            } else {
                println!("{}", render::turmas_table(panel.turmas()));
            }
            Ok(())
        }
        TurmasCommand::Add { nome, capacidade } => {
            let turma = NovaTurma {
                nome: nome.clone(),
                capacidade: *capacidade,
            };
            match panel.create_turma(&turma) {
                Ok(created) => {
                    println!("Turma {} criada (id {})", created.nome, created.id);
                    Ok(())
                }
                Err(ActionError::Invalid(errors)) => {
                    for (field, message) in errors.messages() {
                        eprintln!("  {field}: {message}");
                    }
                    bail!("formulário inválido")
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

fn export(panel: &mut CliPanel, args: &ExportArgs) -> Result<()> {
    load_alunos(panel, &args.filter)?;
    let content = match args.format {
        ExportFormat::Csv => panel.export_csv()?,
        ExportFormat::Json => panel.export_json()?,
    };
    match &args.output {
        Some(path) => {
            write_export(path, &content)?;
            println!(
                "{} alunos exportados para {}",
                panel.alunos().last_loaded().len(),
                path.display()
            );
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn write_export(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("could not write {}", path.display()))
}

fn theme(panel: &mut CliPanel, mode: Option<ThemeArg>) -> Result<()> {
    let theme = match mode {
        None => panel.theme(),
        Some(ThemeArg::Toggle) => panel.toggle_theme()?,
        Some(ThemeArg::Light) => panel.set_theme(Theme::Light)?,
        Some(ThemeArg::Dark) => panel.set_theme(Theme::Dark)?,
    };
    println!("{}", theme.as_str());
    Ok(())
}
