//! Development server.
//!
//! Serves the application over HTTP with no cross-request state: every
//! request for the root path triggers a full rebuild from source, trading
//! latency for always-fresh output. Build failures render as an HTML error
//! page instead of crashing the server.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::build;
use crate::io::compiler::ElmCompiler;
use crate::templates;
use crate::tree::{BuildFlags, Format, ServeFlags};

/// One computed HTTP response.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Bind and serve forever.
pub fn run(compiler: &impl ElmCompiler, root: &Path, flags: &ServeFlags) -> Result<()> {
    let addr = format!("{}:{}", flags.hostname, flags.port);
    let server = tiny_http::Server::http(&addr).map_err(|err| anyhow!("bind {addr}: {err}"))?;
    info!(addr, module = %flags.module_name, "development server listening");

    for request in server.incoming_requests() {
        let reply = handle_request(compiler, root, flags, request.url());
        debug!(url = request.url(), status = reply.status, "handled request");

        let mut response =
            tiny_http::Response::from_data(reply.body).with_status_code(reply.status);
        for (name, value) in &reply.headers {
            match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                Ok(header) => response.add_header(header),
                Err(()) => warn!(name, "skipping invalid header"),
            }
        }
        if let Err(err) = request.respond(response) {
            warn!(err = %err, "failed to send response");
        }
    }
    Ok(())
}

/// Compute the response for one request path.
///
/// Root path: rebuild, then serve the configured document or the generated
/// one; a failing build renders the diagnostic page. Any other path is a
/// filesystem read relative to the project root; a failed read is a 404,
/// never an escalated error.
pub fn handle_request(
    compiler: &impl ElmCompiler,
    root: &Path,
    flags: &ServeFlags,
    url: &str,
) -> Reply {
    if url != "/" {
        return static_reply(root, flags, url.trim_start_matches('/'));
    }

    let build_flags = BuildFlags {
        module_name: flags.module_name.clone(),
        output_path: Some(flags.output_path.clone()),
        format: Format::Iife,
        mode: flags.mode,
    };
    if let Err(err) = build::run(compiler, root, &build_flags) {
        return error_reply(flags, &format!("{err:#}"));
    }

    match &flags.document_path {
        Some(document) => static_reply(root, flags, document),
        None => match templates::render_document(&flags.module_name, &flags.output_path) {
            Ok(html) => html_reply(flags, 200, html),
            Err(err) => error_reply(flags, &format!("{err:#}")),
        },
    }
}

fn static_reply(root: &Path, flags: &ServeFlags, relative: &str) -> Reply {
    match fs::read(root.join(relative)) {
        Ok(body) => {
            let mut headers = base_headers(flags);
            if let Some(content_type) = content_type_for(flags, relative) {
                headers.push(("content-type".to_string(), content_type.to_string()));
            }
            Reply {
                status: 200,
                headers,
                body,
            }
        }
        Err(err) => {
            debug!(path = relative, err = %err, "static read failed");
            Reply {
                status: 404,
                headers: base_headers(flags),
                body: format!("not found: /{relative}").into_bytes(),
            }
        }
    }
}

/// First configured extension that suffixes the path wins; paths without a
/// match get no content-type override.
fn content_type_for<'a>(flags: &'a ServeFlags, path: &str) -> Option<&'a str> {
    flags
        .content_types
        .iter()
        .find(|(extension, _)| path.ends_with(&format!(".{extension}")))
        .map(|(_, content_type)| content_type.as_str())
}

fn base_headers(flags: &ServeFlags) -> Vec<(String, String)> {
    flags
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn html_reply(flags: &ServeFlags, status: u16, html: String) -> Reply {
    let mut headers = base_headers(flags);
    headers.push(("content-type".to_string(), "text/html".to_string()));
    Reply {
        status,
        headers,
        body: html.into_bytes(),
    }
}

/// Render the diagnostic page: escaped verbatim text with URL-looking
/// substrings turned into clickable links.
fn error_reply(flags: &ServeFlags, diagnostic: &str) -> Reply {
    let linked = linkify(&html_escape(diagnostic));
    let html = templates::render_error_page(&linked).unwrap_or(linked);
    html_reply(flags, 400, html)
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[A-Za-z0-9./_%#?=+-]+").unwrap());

fn linkify(escaped: &str) -> String {
    URL_RE
        .replace_all(
            escaped,
            r#"<a style="color:white;" target="blank" href="$0">$0</a>"#,
        )
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompiler, TestProject, serve_flags};

    const COMPILED: &str = "(function(scope){scope.Elm={Main:{}};}(this));";

    fn project_with_main() -> TestProject {
        let project = TestProject::new(&["src"]).expect("project");
        project
            .write_module("src/Main.elm", "module Main exposing (main)")
            .expect("write module");
        project
    }

    fn body_text(reply: &Reply) -> String {
        String::from_utf8_lossy(&reply.body).into_owned()
    }

    #[test]
    fn root_request_rebuilds_and_serves_generated_document() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/");

        assert_eq!(reply.status, 200);
        let body = body_text(&reply);
        assert!(body.contains("<title>elmdev | Main</title>"));
        assert!(body.contains(r#"<script src="build/main.js"></script>"#));
        // The rebuild persisted a fresh artifact.
        let artifact =
            fs::read_to_string(project.root().join("build/main.js")).expect("artifact");
        assert_eq!(artifact, COMPILED);
        assert_eq!(compiler.calls(), 1);
    }

    #[test]
    fn every_root_request_triggers_its_own_rebuild() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);
        compiler.push_success(COMPILED);
        let flags = serve_flags("Main");

        handle_request(&compiler, project.root(), &flags, "/");
        handle_request(&compiler, project.root(), &flags, "/");
        assert_eq!(compiler.calls(), 2);
    }

    #[test]
    fn build_failure_renders_escaped_diagnostic() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_failure("I expected <function> but found nothing");
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/");

        assert_eq!(reply.status, 400);
        let body = body_text(&reply);
        assert!(body.contains("I expected &lt;function&gt; but found nothing"));
        assert!(
            reply
                .headers
                .contains(&("content-type".to_string(), "text/html".to_string()))
        );
    }

    #[test]
    fn build_failure_links_documentation_urls() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        compiler.push_failure("Hint: see https://elm-lang.org/0.19.1/imports for details");
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/");
        let body = body_text(&reply);
        assert!(body.contains(
            r#"<a style="color:white;" target="blank" href="https://elm-lang.org/0.19.1/imports">"#
        ));
    }

    #[test]
    fn root_with_document_path_serves_the_configured_document() {
        let project = project_with_main();
        project
            .write_module("index.html", "<html>custom</html>")
            .expect("write document");
        let compiler = ScriptedCompiler::new();
        compiler.push_success(COMPILED);
        let mut flags = serve_flags("Main");
        flags.document_path = Some("index.html".to_string());

        let reply = handle_request(&compiler, project.root(), &flags, "/");
        assert_eq!(reply.status, 200);
        assert_eq!(body_text(&reply), "<html>custom</html>");
    }

    #[test]
    fn static_asset_gets_configured_content_type() {
        let project = project_with_main();
        project
            .write_module("assets/app.css", "body {}")
            .expect("write asset");
        let compiler = ScriptedCompiler::new();
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/assets/app.css");

        assert_eq!(reply.status, 200);
        assert!(
            reply
                .headers
                .contains(&("content-type".to_string(), "text/css".to_string()))
        );
        // Non-root requests never rebuild.
        assert_eq!(compiler.calls(), 0);
    }

    #[test]
    fn unmatched_extension_gets_no_content_type_override() {
        let project = project_with_main();
        project
            .write_module("data.bin", "xyz")
            .expect("write asset");
        let compiler = ScriptedCompiler::new();
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/data.bin");
        assert_eq!(reply.status, 200);
        assert!(
            !reply
                .headers
                .iter()
                .any(|(name, _)| name == "content-type")
        );
    }

    #[test]
    fn missing_file_is_a_404_not_an_error() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        let flags = serve_flags("Main");

        let reply = handle_request(&compiler, project.root(), &flags, "/no/such/file.js");
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn configured_headers_attach_to_every_reply() {
        let project = project_with_main();
        let compiler = ScriptedCompiler::new();
        let mut flags = serve_flags("Main");
        flags
            .headers
            .insert("cache-control".to_string(), "no-store".to_string());

        let reply = handle_request(&compiler, project.root(), &flags, "/missing");
        assert!(
            reply
                .headers
                .contains(&("cache-control".to_string(), "no-store".to_string()))
        );
    }

    #[test]
    fn escape_handles_all_markup_characters() {
        assert_eq!(
            html_escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }
}
