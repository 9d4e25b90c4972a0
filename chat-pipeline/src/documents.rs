use std::time::Duration;

use common::error::AppError;
use tracing::debug;

pub static CITATION_FALLBACK_CONTACT: &str =
    "Si ces documents ne répondent pas à votre question, contactez le support informatique.";

/// Client for the document-hosting collaborator that serves source files by
/// name. The host is optional: every probe uses a short timeout and a
/// negative or failed probe simply suppresses citations.
pub struct DocumentHostClient {
    http: reqwest::Client,
    base_url: String,
}

impl DocumentHostClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn is_healthy(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Document host {} not reachable: {e}", self.base_url);
                false
            }
        }
    }

    pub async fn document_exists(&self, name: &str) -> bool {
        match self.http.get(self.document_url(name)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn document_url(&self, name: &str) -> String {
        format!("{}/documents/{name}", self.base_url)
    }

    /// Build the citation sentence for the given source files, or `None`
    /// when the host is down or none of the files is actually served.
    pub async fn citation_part(&self, names: &[String]) -> Option<String> {
        if names.is_empty() || !self.is_healthy().await {
            return None;
        }

        let mut links = Vec::new();
        for name in names {
            if self.document_exists(name).await {
                links.push(self.document_url(name));
            }
        }

        if links.is_empty() {
            return None;
        }

        Some(format!(
            "Vous pouvez consulter ces documents pour plus de détails : {}. {}",
            links.join(", "),
            CITATION_FALLBACK_CONTACT
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Router};

    async fn spawn_document_host() -> String {
        let app = Router::new()
            .route("/", get(|| async { "document host" }))
            .route(
                "/documents/{name}",
                get(|Path(name): Path<String>| async move {
                    if name == "guide.txt" {
                        (StatusCode::OK, "contenu")
                    } else {
                        (StatusCode::NOT_FOUND, "absent")
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_citation_lists_only_served_documents() {
        let base_url = spawn_document_host().await;
        let client = DocumentHostClient::new(&base_url).expect("client should build");

        assert!(client.is_healthy().await);

        let citation = client
            .citation_part(&["guide.txt".to_string(), "fantome.txt".to_string()])
            .await
            .expect("citation should be produced");

        assert!(citation.contains(&format!("{base_url}/documents/guide.txt")));
        assert!(!citation.contains("fantome.txt"));
        assert!(citation.contains(CITATION_FALLBACK_CONTACT));
    }

    #[tokio::test]
    async fn test_citation_omitted_when_no_document_served() {
        let base_url = spawn_document_host().await;
        let client = DocumentHostClient::new(&base_url).expect("client should build");

        let citation = client.citation_part(&["fantome.txt".to_string()]).await;
        assert!(citation.is_none());
    }

    #[tokio::test]
    async fn test_citation_omitted_when_host_down() {
        // Bind then drop a listener so the port is very likely closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind probe listener");
        let addr = listener.local_addr().expect("listener address");
        drop(listener);

        let client =
            DocumentHostClient::new(&format!("http://{addr}")).expect("client should build");

        assert!(!client.is_healthy().await);
        let citation = client.citation_part(&["guide.txt".to_string()]).await;
        assert!(citation.is_none());
    }

    #[tokio::test]
    async fn test_citation_omitted_for_empty_file_list() {
        let base_url = spawn_document_host().await;
        let client = DocumentHostClient::new(&base_url).expect("client should build");

        assert!(client.citation_part(&[]).await.is_none());
    }

    #[test]
    fn test_document_url_normalizes_trailing_slash() {
        let client =
            DocumentHostClient::new("http://localhost:8077/").expect("client should build");
        assert_eq!(
            client.document_url("guide.txt"),
            "http://localhost:8077/documents/guide.txt"
        );
    }
}
