//! `tippytap fmt` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tippytap_config::Config;
use tippytap_markdown::encode;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the fmt command.
#[derive(Args)]
pub(crate) struct FmtArgs {
    /// Path to the markdown file.
    file: PathBuf,

    /// Exit with an error if the file is not in canonical form.
    #[arg(long)]
    check: bool,

    /// Rewrite the file in canonical form.
    #[arg(long, conflicts_with = "check")]
    write: bool,
}

impl FmtArgs {
    /// Execute the fmt command.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        Config::load(config_path, None)?;

        let markdown = std::fs::read_to_string(&self.file)?;
        let formatted = canonical(&markdown);

        if self.check {
            if formatted != markdown {
                return Err(CliError::Validation(format!(
                    "{} is not formatted",
                    self.file.display()
                )));
            }
            output.success(&format!("{} is formatted", self.file.display()));
        } else if self.write {
            if formatted == markdown {
                output.info(&format!("{} unchanged", self.file.display()));
            } else {
                std::fs::write(&self.file, &formatted)?;
                output.success(&format!("Formatted {}", self.file.display()));
            }
        } else {
            output.print(&formatted)?;
        }
        Ok(())
    }
}

/// Canonical form of a Markdown file: decoded, re-encoded and ended with a
/// newline unless empty.
pub(crate) fn canonical(markdown: &str) -> String {
    let mut text = encode(&tippytap_mermaid::decode(markdown));
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_normalizes_markup() {
        assert_eq!(
            canonical("Title\n=====\n\n* a\n* b\n\n__bold__"),
            "# Title\n\n- a\n- b\n\n**bold**\n"
        );
    }

    #[test]
    fn test_canonical_is_stable() {
        let once = canonical("# T\n\n```mermaid\nA-->B\n```\n\n1. x\n2. y");
        assert_eq!(canonical(&once), once);
    }

    #[test]
    fn test_canonical_empty() {
        assert_eq!(canonical(""), "");
        assert_eq!(canonical("   \n"), "");
    }
}
