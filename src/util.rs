use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::matrix::folder_components;

pub fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// The first `depth` folders of a vault-relative path, joined with `/`.
pub fn folder_label(path: &str, depth: usize) -> String {
    let components = folder_components(path);
    components[..depth.min(components.len())].join("/")
}

/// Runs `command` (program followed by arguments) with `path` appended.
pub fn open_document(command: &str, path: &Path) -> Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts.next().context("open_command is empty")?;

    Command::new(program)
        .args(parts)
        .arg(path)
        .spawn()
        .with_context(|| format!("failed to launch `{program}` for {}", path.display()))?;
    Ok(())
}
