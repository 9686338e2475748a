use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::data_models::ContextBundle;
use crate::error::{Failure, Service};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    messages: [SearchMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SearchMessage<'a> {
    content: &'a str,
    role: &'static str,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    message: SearchResponseMessage,
    #[serde(default)]
    titles: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the generative search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, base_url: &str, folder_id: &str, api_key: String) -> Self {
        let endpoint = format!(
            "{}/search/xml/generative?folderid={}",
            base_url.trim_end_matches('/'),
            folder_id
        );
        Self {
            http,
            endpoint,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn search(&self, query: &str) -> Result<ContextBundle, Failure> {
        let body = SearchRequest {
            messages: [SearchMessage {
                content: query,
                role: "user",
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                log::error!("search request failed: {source:#}");
                Failure::Network {
                    service: Service::Search,
                    source,
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            log::error!("search service responded with {status}");
            return Err(Failure::UpstreamStatus {
                service: Service::Search,
                status: status.as_u16(),
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|source| {
            log::error!("could not read search response: {source:#}");
            if source.is_decode() {
                Failure::MalformedResponse {
                    service: Service::Search,
                    source,
                }
            } else {
                Failure::Network {
                    service: Service::Search,
                    source,
                }
            }
        })?;

        let content = match parsed.message.content {
            Some(content) if !content.is_empty() => content,
            _ => {
                log::warn!("search returned empty content");
                return Err(Failure::EmptyContent);
            }
        };

        log::info!(
            "search returned {} chars of content, {} links",
            content.len(),
            parsed.links.len()
        );

        Ok(ContextBundle {
            content,
            titles: parsed.titles,
            links: parsed.links,
        })
    }
}

#[test]
fn test_endpoint_includes_folder() {
    let client = SearchClient::new(reqwest::Client::new(), "https://ya.ru/", "b1gfolder", "k".into());
    assert_eq!(
        client.endpoint(),
        "https://ya.ru/search/xml/generative?folderid=b1gfolder"
    );
}

#[test]
fn test_search_request_shape() {
    let body = SearchRequest {
        messages: [SearchMessage {
            content: "Когда основан ИТМО?",
            role: "user",
        }],
    };
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        serde_json::json!({"messages": [{"content": "Когда основан ИТМО?", "role": "user"}]})
    );
}

#[test]
fn test_search_response_defaults() {
    let parsed: SearchResponse =
        serde_json::from_str(r#"{"message": {"content": "text"}}"#).unwrap();
    assert_eq!(parsed.message.content.as_deref(), Some("text"));
    assert!(parsed.titles.is_empty());
    assert!(parsed.links.is_empty());

    let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
    assert!(parsed.message.content.is_none());

    let parsed: SearchResponse =
        serde_json::from_str(r#"{"message": {"content": null}, "links": ["https://itmo.ru"]}"#)
            .unwrap();
    assert!(parsed.message.content.is_none());
    assert_eq!(parsed.links, vec!["https://itmo.ru"]);
}
