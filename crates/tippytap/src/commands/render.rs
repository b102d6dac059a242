//! `tippytap render` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tippytap_config::{CliSettings, Config};
use tippytap_mermaid::{KrokiRenderer, render_document_html, render_source_html};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Path to the markdown file.
    file: PathBuf,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, env = "TIPPYTAP_KROKI_URL")]
    kroki_url: Option<String>,

    /// Print the decoded document tree as JSON instead of HTML.
    #[arg(long)]
    tree: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// Diagrams are rendered to SVG when a Kroki URL is configured and left
    /// as `<pre class="mermaid">` source blocks otherwise.
    pub(crate) async fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            kroki_url: self.kroki_url,
            ..Default::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;

        let markdown = std::fs::read_to_string(&self.file)?;
        let doc = tippytap_mermaid::decode(&markdown);
        if self.tree {
            output.print(&format!("{}\n", serde_json::to_string_pretty(&doc)?))?;
            return Ok(());
        }

        let html = match &config.diagrams.kroki_url {
            Some(url) => {
                tracing::info!(kroki_url = %url, "Rendering diagrams");
                let renderer = KrokiRenderer::new(url.as_str(), config.diagrams.timeout());
                render_document_html(&doc, &renderer).await
            }
            None => render_source_html(&doc),
        };

        output.print(&html)?;
        Ok(())
    }
}
