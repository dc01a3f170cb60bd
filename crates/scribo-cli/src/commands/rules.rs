use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use scribo_analyze::Tracked;

use crate::output::{format_rule_list, Summary};
use crate::workspace::Workspace;

#[derive(Subcommand, Debug, Clone)]
pub enum RulesAction {
    /// List the current rules
    List,

    /// Write the rules as markdown
    Export {
        /// Output file (default stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the rules with those in a markdown file
    Import {
        file: PathBuf,
    },

    /// Restore the built-in defaults
    Reset,
}

pub fn run<R: Tracked + Summary>(workspace: &Workspace, action: RulesAction) -> Result<()> {
    let mut session = workspace.open_session();

    match action {
        RulesAction::List => println!("{}", format_rule_list(session.rules::<R>())),
        RulesAction::Export { output } => {
            let markdown = session.export::<R>();
            match output {
                Some(path) => fs::write(&path, markdown)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{markdown}"),
            }
        }
        RulesAction::Import { file } => {
            let markdown = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let count = session.import::<R>(&markdown);
            if count == 0 {
                eprintln!("warning: no {} found in {}", R::KIND, file.display());
            }
            println!("Imported {count} {} from {}", R::KIND, file.display());
        }
        RulesAction::Reset => {
            let count = session.reset_rules::<R>();
            println!("Restored {count} default {}", R::KIND);
        }
    }
    Ok(())
}
