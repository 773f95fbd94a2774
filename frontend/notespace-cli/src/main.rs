mod cli;

use std::path::PathBuf;
use std::str::FromStr;

use notespace_core::budget::{TokenStats, TokenUsage};
use notespace_core::{Language, Notespace, ToolContext};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

fn main() {
    if let Err(error) = run() {
        eprintln!("notespace failed: {error}");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> notespace_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_language(app: &Notespace, raw: Option<&str>) -> notespace_core::Result<Language> {
    match raw {
        Some(value) => Language::from_str(value),
        None => Ok(app.config().editor.primary_language),
    }
}

fn run() -> notespace_core::Result<()> {
    let args = cli::Cli::parse_args();
    let config_path = PathBuf::from(&args.config);
    let config = notespace_core::config::load(Some(&config_path))?;
    notespace_core::logging::init_tracing(&config.logging.level);

    if let cli::Command::ValidateConfig = args.command {
        notespace_core::config::validate_config(&config)?;
        println!("Config is valid.");
        return Ok(());
    }

    let app = Notespace::new(config)?;
    let runtime = tokio::runtime::Runtime::new().map_err(|err| {
        notespace_core::Error::Config(format!("failed to create tokio runtime: {err}"))
    })?;

    match args.command {
        cli::Command::ValidateConfig => Ok(()),
        cli::Command::Tool {
            name,
            args,
            space,
            actor,
        } => {
            let tool_args: serde_json::Value = serde_json::from_str(&args).map_err(|err| {
                notespace_core::Error::Validation(format!("--args is not valid JSON: {err}"))
            })?;
            let context = ToolContext::new(space, actor);
            let result = runtime.block_on(app.dispatcher().execute(&context, &name, tool_args));
            print_json(&result)?;
            if !result.success {
                std::process::exit(2);
            }
            Ok(())
        }
        cli::Command::Tools => print_json(&app.dispatcher().definitions()),
        cli::Command::Tree { space, language } => {
            let language = parse_language(&app, language.as_deref())?;
            let tree = runtime.block_on(app.store().build_tree(space, language))?;
            print_json(&tree)
        }
        cli::Command::Summary { space } => {
            print_json(&runtime.block_on(app.store().summary(space))?)
        }
        cli::Command::History {
            space,
            file_id,
            language,
            limit,
        } => {
            let language = parse_language(&app, language.as_deref())?;
            let history =
                runtime.block_on(app.editor().history(space, file_id, language, limit))?;
            print_json(&history)
        }
        cli::Command::Trash { space, command } => handle_trash_command(&app, &runtime, space, command),
        cli::Command::Budget {
            model,
            prompt_tokens,
            completion_tokens,
        } => {
            let budget = app.budget();
            let mut session = budget.create_session(&model);
            let status = budget.update(
                &mut session,
                TokenUsage::new(prompt_tokens, completion_tokens),
            );
            let warning = status
                .needs_finish
                .then(|| budget.warning_text(&status));
            print_json(&json!({
                "session": session,
                "status": status,
                "warning": warning,
                "stats": TokenStats::aggregate(std::slice::from_ref(&session)),
            }))
        }
    }
}

fn handle_trash_command(
    app: &Notespace,
    runtime: &tokio::runtime::Runtime,
    space: Uuid,
    command: cli::TrashCommand,
) -> notespace_core::Result<()> {
    let store = app.store();
    match command {
        cli::TrashCommand::List => print_json(&runtime.block_on(store.list_trash(space))?),
        cli::TrashCommand::Empty => {
            let purged = runtime.block_on(store.empty_trash(space))?;
            print_json(&json!({ "purged": purged }))
        }
        cli::TrashCommand::Restore { file_id } => {
            print_json(&runtime.block_on(store.restore_file(space, file_id))?)
        }
        cli::TrashCommand::Purge { file_id } => {
            print_json(&runtime.block_on(store.purge_file(space, file_id))?)
        }
        cli::TrashCommand::PurgeFolder { path } => {
            print_json(&runtime.block_on(store.purge_folder(space, &path))?)
        }
    }
}
