use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use scribo_analyze::{Session, Tracked};
use scribo_core::{ChecklistItem, Guideline, RuleKind};

use crate::output::{self, KindReport, Report};
use crate::workspace::Workspace;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Markdown file to analyze
    pub file: PathBuf,

    /// Only run one kind of analysis
    #[arg(long, value_parser = parse_kind)]
    pub only: Option<RuleKind>,

    /// Use cached results only, never call the analyzer
    #[arg(long)]
    pub cached: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

pub fn parse_kind(s: &str) -> Result<RuleKind, String> {
    RuleKind::ALL
        .into_iter()
        .find(|k| k.as_str() == s)
        .ok_or_else(|| format!("expected one of: guidelines, checklist (got '{s}')"))
}

pub async fn run(workspace: &Workspace, args: AnalyzeArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    if text.trim().is_empty() {
        bail!("{} is empty, nothing to analyze", args.file.display());
    }

    let mut session = workspace.open_session();
    session.set_document(text);

    let wants = |kind: RuleKind| args.only.map_or(true, |only| only == kind);

    if args.cached {
        let mut found = false;
        if wants(RuleKind::Guidelines) {
            found |= session.recall_cached::<Guideline>();
        }
        if wants(RuleKind::Checklist) {
            found |= session.recall_cached::<ChecklistItem>();
        }
        if !found {
            bail!("no cached analysis for {}", args.file.display());
        }
    } else {
        match args.only {
            Some(RuleKind::Guidelines) => session.analyze::<Guideline>().await,
            Some(RuleKind::Checklist) => session.analyze::<ChecklistItem>().await,
            None => session.analyze_all().await,
        }
    }

    let report = Report::new(
        args.file.display().to_string(),
        session.document().to_string(),
        wants(RuleKind::Guidelines).then(|| section::<Guideline>(&session)),
        wants(RuleKind::Checklist).then(|| section::<ChecklistItem>(&session)),
    );

    let rendered = match args.format {
        Format::Text => output::format_text_report(&report),
        Format::Json => output::format_json_report(&report)?,
    };
    println!("{rendered}");

    let failures: Vec<String> = [
        report.guidelines.as_ref().and_then(|s| s.error.clone()),
        report.checklist.as_ref().and_then(|s| s.error.clone()),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !failures.is_empty() {
        bail!(failures.join("; "));
    }
    Ok(())
}

/// A kind's part of the report. The result is the one cached for the analyzed
/// text, so a failed or skipped run never shows an older document's result.
fn section<R: Tracked>(session: &Session) -> KindReport<R> {
    let state = session.analysis::<R>();
    let result = match &state.error {
        Some(_) => None,
        None => session.cache().load::<R>(session.document()),
    };
    KindReport {
        rules: session.rules::<R>().to_vec(),
        result,
        error: state.error.clone(),
    }
}
