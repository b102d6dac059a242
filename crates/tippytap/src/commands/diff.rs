//! `tippytap diff` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tippytap_config::Config;
use tippytap_sync::diff_words_with_budget;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diff command.
#[derive(Args)]
pub(crate) struct DiffArgs {
    /// The original markdown file.
    old: PathBuf,

    /// The changed markdown file.
    new: PathBuf,
}

impl DiffArgs {
    /// Execute the diff command.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        let old = std::fs::read_to_string(&self.old)?;
        let new = std::fs::read_to_string(&self.new)?;

        if old == new {
            output.info("No changes");
            return Ok(());
        }
        let spans = diff_words_with_budget(&old, &new, config.diff.max_lcs_cells);
        output.print_diff(&spans)?;
        Ok(())
    }
}
