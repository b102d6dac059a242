//! `tippytap toc` command implementation.

use std::path::PathBuf;

use clap::Args;
use tippytap_model::{TocEntry, outline};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the toc command.
#[derive(Args)]
pub(crate) struct TocArgs {
    /// Path to the markdown file.
    file: PathBuf,

    /// Print the entries as JSON.
    #[arg(long)]
    json: bool,
}

impl TocArgs {
    /// Execute the toc command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let markdown = std::fs::read_to_string(&self.file)?;
        let toc = outline(&tippytap_mermaid::decode(&markdown));
        if self.json {
            output.print(&format!("{}\n", serde_json::to_string_pretty(&toc)?))?;
            return Ok(());
        }
        if toc.is_empty() {
            output.info("No headings");
            return Ok(());
        }

        output.print(&format!("{}\n", format_toc(&toc)))?;
        Ok(())
    }
}

/// Nested Markdown list of links to the headings.
fn format_toc(toc: &[TocEntry]) -> String {
    let top = toc.iter().map(|entry| entry.level).min().unwrap_or(1);
    toc.iter()
        .map(|entry| {
            let indent = "  ".repeat(usize::from(entry.level - top));
            format!("{indent}- [{}](#{})", entry.title, entry.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_toc() {
        let toc = outline(&tippytap_mermaid::decode("## Intro\n\n### Setup\n\n## Setup"));
        assert_eq!(
            format_toc(&toc),
            "- [Intro](#intro)\n  - [Setup](#setup)\n- [Setup](#setup-1)"
        );
    }

    #[test]
    fn test_toc_json() {
        let toc = outline(&tippytap_mermaid::decode("# Title\n\n## Next step"));
        assert_eq!(
            serde_json::to_value(&toc).unwrap(),
            serde_json::json!([
                {"level": 1, "title": "Title", "id": "title"},
                {"level": 2, "title": "Next step", "id": "next-step"},
            ])
        );
    }
}
