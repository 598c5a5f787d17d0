//! Per-language connection factory
//!
//! Turns the discovered languages into connection descriptors, one socket
//! per language with a language server. Sockets are returned while their
//! handshake is still in flight.

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error::ConnectionError;
use crate::infra::client::{ClientLoader, LanguageClient};
use crate::infra::socket::{LspSocket, SocketFactory};
use crate::models::language::{LanguageDescriptor, ModePattern};

/// Multiplexed language-server endpoint, one path per language
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
    prefix: Vec<String>,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, path_prefix: &str) -> Result<Self, ConnectionError> {
        let raw = format!("ws://{}:{}", host, port);
        let base = Url::parse(&raw).map_err(|e| ConnectionError::InvalidEndpoint(format!("{raw}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ConnectionError::InvalidEndpoint(raw));
        }
        let prefix = path_prefix
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { base, prefix })
    }

    pub fn port(&self) -> Option<u16> {
        self.base.port_or_known_default()
    }

    /// Socket URL for a language. The default port (80) is left out of the
    /// rendered URL, which still connects to the same port.
    pub fn url_for(&self, language_id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear();
            segments.extend(&self.prefix);
            segments.push(language_id);
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Socket,
}

/// Everything the editor needs to talk to one language server
#[derive(Debug)]
pub struct ConnectionDescriptor {
    pub loader: ClientLoader,
    pub mode_pattern: ModePattern,
    pub transport: TransportKind,
    pub socket: Arc<LspSocket>,
}

impl ConnectionDescriptor {
    pub fn language(&self) -> &str {
        self.socket.language()
    }

    /// Client over this descriptor's socket, built on first call
    pub fn client(&self) -> Result<Arc<LanguageClient>, ConnectionError> {
        self.loader.load(&self.socket)
    }
}

/// A connection that would be opened, without opening it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedConnection {
    pub language: String,
    pub mode_pattern: ModePattern,
    pub url: Url,
}

/// Languages without a language server are skipped; order is preserved
pub fn plan_connections(languages: &[LanguageDescriptor], endpoint: &Endpoint) -> Vec<PlannedConnection> {
    languages
        .iter()
        .filter(|language| {
            if !language.has_lsp() {
                tracing::debug!("Skipping {}: no language server configured", language.id);
            }
            language.has_lsp()
        })
        .map(|language| PlannedConnection {
            language: language.id.clone(),
            mode_pattern: language.mode_pattern(),
            url: endpoint.url_for(&language.id),
        })
        .collect()
}

/// Open one socket per planned connection
///
/// Never waits for a handshake. A socket that fails to connect only
/// affects its own language.
pub fn build_descriptors(
    languages: &[LanguageDescriptor],
    endpoint: &Endpoint,
    sockets: &dyn SocketFactory,
) -> Vec<ConnectionDescriptor> {
    plan_connections(languages, endpoint)
        .into_iter()
        .map(|planned| {
            let socket = sockets.open(&planned.language, planned.url);
            ConnectionDescriptor {
                loader: ClientLoader::new(),
                mode_pattern: planned.mode_pattern,
                transport: TransportKind::Socket,
                socket: Arc::new(socket),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::socket::SocketState;
    use crate::testing::RecordingSocketFactory;

    fn local(port: u16) -> Endpoint {
        Endpoint::new("127.0.0.1", port, "/lsp").unwrap()
    }

    fn languages() -> Vec<LanguageDescriptor> {
        vec![
            LanguageDescriptor::new("python")
                .with_lsp(["pylsp"])
                .with_aliases(["py"]),
            LanguageDescriptor::new("json"),
            LanguageDescriptor::new("cpp")
                .with_lsp(["clangd"])
                .with_aliases(["c", "cc"]),
        ]
    }

    #[test]
    fn test_url_for_language() {
        let endpoint = local(5173);
        assert_eq!(endpoint.url_for("cpp").as_str(), "ws://127.0.0.1:5173/lsp/cpp");
    }

    #[test]
    fn test_default_port_is_implied() {
        let endpoint = local(80);
        let url = endpoint.url_for("cpp");
        assert_eq!(url.as_str(), "ws://127.0.0.1/lsp/cpp");
        assert_eq!(url.port_or_known_default(), Some(80));
        assert_eq!(endpoint.port(), Some(80));
    }

    #[test]
    fn test_custom_endpoint_prefix() {
        let endpoint = Endpoint::new("localhost", 8080, "/editor/lsp/").unwrap();
        assert_eq!(
            endpoint.url_for("python").as_str(),
            "ws://localhost:8080/editor/lsp/python"
        );
        assert_eq!(endpoint.port(), Some(8080));
    }

    #[test]
    fn test_invalid_endpoint_host() {
        assert!(matches!(
            Endpoint::new("bad host", 80, "/lsp"),
            Err(ConnectionError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_languages_without_server_are_skipped() {
        let langs = languages();
        let plan = plan_connections(&langs, &local(9000));
        let expected = langs.iter().filter(|l| l.has_lsp()).count();
        assert_eq!(plan.len(), expected);
        assert_eq!(plan[0].language, "python");
        assert_eq!(plan[1].language, "cpp");
        assert_eq!(plan[1].mode_pattern.as_str(), "c|cc|cpp");
    }

    #[tokio::test]
    async fn test_python_and_json_scenario() {
        let langs = vec![
            LanguageDescriptor::new("python")
                .with_lsp(["pylsp"])
                .with_aliases(["py"]),
            LanguageDescriptor::new("json"),
        ];
        let factory = RecordingSocketFactory::new();

        let descriptors = build_descriptors(&langs, &local(9000), &factory);

        assert_eq!(descriptors.len(), 1);
        let python = &descriptors[0];
        assert_eq!(python.language(), "python");
        assert_eq!(python.mode_pattern.as_str(), "py|python");
        assert_eq!(python.transport, TransportKind::Socket);
        assert_eq!(python.socket.url().as_str(), "ws://127.0.0.1:9000/lsp/python");
        assert!(!python.loader.is_loaded());

        let opened = factory.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "python");
    }

    #[tokio::test]
    async fn test_failed_socket_does_not_affect_others() {
        let factory = RecordingSocketFactory::new().failing("python");
        let descriptors = build_descriptors(&languages(), &local(9000), &factory);

        assert_eq!(descriptors.len(), 2);
        assert!(matches!(descriptors[0].socket.state(), SocketState::Failed(_)));
        assert_eq!(descriptors[1].socket.state(), SocketState::Open);
    }

    #[tokio::test]
    async fn test_each_language_gets_its_own_socket() {
        let factory = RecordingSocketFactory::new();
        let descriptors = build_descriptors(&languages(), &local(9000), &factory);
        assert!(!Arc::ptr_eq(&descriptors[0].socket, &descriptors[1].socket));
        assert_ne!(descriptors[0].socket.url(), descriptors[1].socket.url());
    }

    #[test]
    fn test_transport_tag() {
        assert_eq!(serde_json::to_value(TransportKind::Socket).unwrap(), "socket");
    }
}
