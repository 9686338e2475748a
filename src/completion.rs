use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::data_models::ContextBundle;
use crate::error::{Failure, Service};

pub const TEMPERATURE: f32 = 0.3;
pub const MAX_TOKENS: u32 = 1000;

const SYSTEM_INSTRUCTION: &str =
    "ТЫ ОТВЕЧАЕШЬ НА ВОПРОСЫ СВЯЗАННЫЕ С ПРЕДОСТАВЛЕНИЕ ИНФОРМАЦИИ О УНИВЕРСИТЕТЕ ИТМО.";

const USER_INSTRUCTION: &str = "### ИНСТРУКЦИЯ ###\n\
Предоставьте подробную информацию об Университете ИТМО, ответьте на вопрос на русском языке и дайте полный ответ с обоснованием.\n\
Если даны варианты ответов, выберите правильный и объясните причину. Если вариантов нет, дайте ТОЛЬКО развернутый ответ с обоснованием. Не в коем случае не пиши слово ответ.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<PromptMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PromptMessage {
    pub role: &'static str,
    pub text: String,
}

#[derive(Debug, Deserialize, Default)]
struct CompletionResponse {
    #[serde(default)]
    result: CompletionResult,
}

#[derive(Debug, Deserialize, Default)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize, Default)]
struct Alternative {
    #[serde(default)]
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize, Default)]
struct AlternativeMessage {
    #[serde(default)]
    text: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> String {
        self.result
            .alternatives
            .into_iter()
            .next()
            .and_then(|alt| alt.message.text)
            .unwrap_or_default()
    }
}

/// Builds the system + user messages grounding `question` in `context`.
pub fn build_prompt(question: &str, context: &ContextBundle) -> Vec<PromptMessage> {
    vec![
        PromptMessage {
            role: "system",
            text: SYSTEM_INSTRUCTION.to_string(),
        },
        PromptMessage {
            role: "user",
            text: format!(
                "{USER_INSTRUCTION}\nИНФОРМАЦИЯ: {}\nВОПРОС: {question}",
                context.render()
            ),
        },
    ]
}

/// Client for the foundation model completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model_uri: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        folder_id: &str,
        model: &str,
        api_key: String,
    ) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/foundationModels/v1/completion",
                base_url.trim_end_matches('/')
            ),
            model_uri: format!("gpt://{folder_id}/{model}/latest"),
            api_key,
        }
    }

    pub fn model_uri(&self) -> &str {
        &self.model_uri
    }

    pub async fn complete(&self, question: &str, context: &ContextBundle) -> Result<String, Failure> {
        let body = CompletionRequest {
            model_uri: self.model_uri.clone(),
            completion_options: CompletionOptions {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            },
            messages: build_prompt(question, context),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                log::error!("completion request failed: {source:#}");
                Failure::Network {
                    service: Service::Completion,
                    source,
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            log::error!("completion service responded with {status}");
            return Err(Failure::UpstreamStatus {
                service: Service::Completion,
                status: status.as_u16(),
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|source| {
            log::error!("could not read completion response: {source:#}");
            if source.is_decode() {
                Failure::MalformedResponse {
                    service: Service::Completion,
                    source,
                }
            } else {
                Failure::Network {
                    service: Service::Completion,
                    source,
                }
            }
        })?;

        let text = parsed.into_text();
        if text.is_empty() {
            log::warn!("completion returned no text");
            return Err(Failure::EmptyCompletion);
        }
        Ok(text)
    }
}

#[test]
fn test_build_prompt() {
    let context = ContextBundle {
        content: "Основан в 1900 году".into(),
        titles: vec!["История".into()],
        links: vec!["https://itmo.ru/history".into()],
    };
    let messages = build_prompt("Когда основан ИТМО?", &context);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[0].text, SYSTEM_INSTRUCTION);
    assert_eq!(messages[1].role, "user");

    let user = &messages[1].text;
    assert!(user.starts_with("### ИНСТРУКЦИЯ ###"));
    assert!(user.contains(
        "ИНФОРМАЦИЯ: Content:\nОснован в 1900 году\n\nTitles:\nИстория\n\nLinks:\nhttps://itmo.ru/history"
    ));
    assert!(user.ends_with("ВОПРОС: Когда основан ИТМО?"));
}

#[test]
fn test_request_shape() {
    let client = CompletionClient::new(
        reqwest::Client::new(),
        "https://llm.api.cloud.yandex.net",
        "b1gfolder",
        "yandexgpt",
        "k".into(),
    );
    assert_eq!(client.model_uri(), "gpt://b1gfolder/yandexgpt/latest");

    let body = CompletionRequest {
        model_uri: client.model_uri().to_string(),
        completion_options: CompletionOptions {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        },
        messages: vec![],
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["modelUri"], "gpt://b1gfolder/yandexgpt/latest");
    assert_eq!(json["completionOptions"]["maxTokens"], 1000);
    assert!((json["completionOptions"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
}

#[test]
fn test_response_text_extraction() {
    let parsed: CompletionResponse = serde_json::from_str(
        r#"{"result": {"alternatives": [{"message": {"role": "assistant", "text": "2) Кронверкский"}}]}}"#,
    )
    .unwrap();
    assert_eq!(parsed.into_text(), "2) Кронверкский");

    let parsed: CompletionResponse =
        serde_json::from_str(r#"{"result": {"alternatives": []}}"#).unwrap();
    assert_eq!(parsed.into_text(), "");

    let parsed: CompletionResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(parsed.into_text(), "");

    let parsed: CompletionResponse =
        serde_json::from_str(r#"{"result": {"alternatives": [{"message": {"text": null}}]}}"#)
            .unwrap();
    assert_eq!(parsed.into_text(), "");
}
