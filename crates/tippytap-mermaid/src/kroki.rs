//! Mermaid rendering through a Kroki server.
//!
//! Each render is an HTTP POST of the diagram source to
//! `{server}/mermaid/svg`. The blocking HTTP call runs on tokio's blocking
//! pool so renders can be awaited from the session loop.

use std::future::Future;
use std::time::Duration;

use ureq::Agent;

use crate::renderer::{DiagramRenderer, RenderError, RenderedDiagram};

/// Diagram renderer backed by a Kroki server.
#[derive(Clone)]
pub struct KrokiRenderer {
    agent: Agent,
    server_url: String,
}

impl KrokiRenderer {
    /// Create a renderer for the server at `server_url` with a per-request
    /// timeout.
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            agent: create_agent(timeout),
            server_url,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Endpoint for Mermaid SVG rendering.
    pub fn endpoint(&self) -> String {
        format!("{}/mermaid/svg", self.server_url)
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn render(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<RenderedDiagram, RenderError>> + Send {
        let agent = self.agent.clone();
        let url = self.endpoint();
        let source = source.to_owned();

        async move {
            tokio::task::spawn_blocking(move || send_diagram_request(&agent, &url, &source))
                .await
                .map_err(|e| RenderError::Task(e.to_string()))?
        }
    }
}

/// Create HTTP agent with the specified timeout.
///
/// HTTP error statuses are returned as responses so the error body (Kroki's
/// description of what is wrong with the diagram) can be read.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn send_diagram_request(
    agent: &Agent,
    url: &str,
    source: &str,
) -> Result<RenderedDiagram, RenderError> {
    let response = agent
        .post(url)
        .header("Content-Type", "text/plain")
        .send(source.as_bytes())
        .map_err(|e| RenderError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        // 4xx: the server understood the request and rejected the diagram.
        return Err(if status < 500 {
            RenderError::Diagram(error_body.trim().to_owned())
        } else {
            RenderError::Http(format!("HTTP {status}: {error_body}"))
        });
    }

    let svg = body
        .read_to_string()
        .map_err(|e| RenderError::Io(e.to_string()))?;
    Ok(RenderedDiagram { svg })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let renderer = KrokiRenderer::new("https://kroki.io/", Duration::from_secs(5));
        assert_eq!(renderer.server_url(), "https://kroki.io");
        assert_eq!(renderer.endpoint(), "https://kroki.io/mermaid/svg");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let renderer = KrokiRenderer::new("http://127.0.0.1:9", Duration::from_secs(2));
        let result = renderer.render("graph TD; A-->B").await;

        assert!(matches!(result, Err(RenderError::Http(_))), "{result:?}");
    }
}
