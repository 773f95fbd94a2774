use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "notespace", about = "Agent note space CLI")]
pub struct Cli {
    #[arg(long, default_value = "notespace.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load and validate the configuration file.
    ValidateConfig,
    /// Invoke one agent tool and print its envelope.
    Tool {
        name: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        #[arg(long, env = "NOTESPACE_SPACE")]
        space: Uuid,
        #[arg(long, default_value = "operator")]
        actor: String,
    },
    /// Print the function-calling definitions of every tool.
    Tools,
    /// Print a space as a nested tree.
    Tree {
        #[arg(long, env = "NOTESPACE_SPACE")]
        space: Uuid,
        /// Defaults to the configured primary language.
        #[arg(long)]
        language: Option<String>,
    },
    /// Print folder and file counts plus the most recently updated files.
    Summary {
        #[arg(long, env = "NOTESPACE_SPACE")]
        space: Uuid,
    },
    /// Print the edit history of one file variant, newest first.
    History {
        #[arg(long, env = "NOTESPACE_SPACE")]
        space: Uuid,
        #[arg(long)]
        file_id: Uuid,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Trash {
        #[arg(long, env = "NOTESPACE_SPACE")]
        space: Uuid,
        #[command(subcommand)]
        command: TrashCommand,
    },
    /// Forecast the token budget for one model response.
    Budget {
        #[arg(long)]
        model: String,
        #[arg(long)]
        prompt_tokens: u64,
        #[arg(long, default_value_t = 0)]
        completion_tokens: u64,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TrashCommand {
    List,
    /// Permanently delete every trashed file.
    Empty,
    Restore { file_id: Uuid },
    /// Permanently delete one trashed file.
    Purge { file_id: Uuid },
    /// Delete an empty folder.
    PurgeFolder { path: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_invocation() {
        let space = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "notespace",
            "tool",
            "add_folder",
            "--args",
            r#"{"path":"/docs"}"#,
            "--space",
            &space.to_string(),
        ])
        .expect("parse");

        assert_eq!(cli.config, "notespace.toml");
        match cli.command {
            Command::Tool {
                name,
                args,
                space: parsed,
                actor,
            } => {
                assert_eq!(name, "add_folder");
                assert_eq!(args, r#"{"path":"/docs"}"#);
                assert_eq!(parsed, space);
                assert_eq!(actor, "operator");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_trash_subcommand() {
        let space = Uuid::new_v4();
        let file_id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "notespace",
            "--config",
            "custom.toml",
            "trash",
            "--space",
            &space.to_string(),
            "restore",
            &file_id.to_string(),
        ])
        .expect("parse");

        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(
            cli.command,
            Command::Trash {
                command: TrashCommand::Restore { file_id: parsed },
                ..
            } if parsed == file_id
        ));
    }

    #[test]
    fn parses_summary_subcommand() {
        let space = Uuid::new_v4();
        let cli = Cli::try_parse_from(["notespace", "summary", "--space", &space.to_string()])
            .expect("parse");
        assert!(matches!(cli.command, Command::Summary { space: parsed } if parsed == space));
    }
}
