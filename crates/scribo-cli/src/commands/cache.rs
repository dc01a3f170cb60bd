use anyhow::Result;
use clap::Subcommand;

use scribo_core::RuleKind;

use super::analyze::parse_kind;
use crate::workspace::Workspace;

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Remove cached analysis results
    Clear {
        /// Only clear results of this kind
        #[arg(long, value_parser = parse_kind)]
        kind: Option<RuleKind>,
    },
}

pub fn run(workspace: &Workspace, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Clear { kind } => {
            let cache = workspace.cache();
            let kinds = match kind {
                Some(kind) => vec![kind],
                None => RuleKind::ALL.to_vec(),
            };
            for kind in kinds {
                cache.clear(kind);
                println!("Cleared cached {kind} results");
            }
        }
    }
    Ok(())
}
