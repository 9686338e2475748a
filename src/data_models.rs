use serde::{Deserialize, Serialize};

/// Passages, titles and links returned by the generative search service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    pub content: String,
    pub titles: Vec<String>,
    pub links: Vec<String>,
}

impl ContextBundle {
    /// Renders the bundle the way it is embedded into the completion prompt.
    pub fn render(&self) -> String {
        format!(
            "Content:\n{}\n\nTitles:\n{}\n\nLinks:\n{}",
            self.content,
            self.titles.join("\n"),
            self.links.join("\n")
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResultPayload {
    pub id: i64,
    pub answer: Option<i64>,
    pub reasoning: String,
    pub sources: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// What a pipeline run reports to the caller with a 200 status.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Answered(ResultPayload),
    Failed(ErrorPayload),
}

#[test]
fn test_render_context_bundle() {
    let bundle = ContextBundle {
        content: "ITMO is a university".into(),
        titles: vec!["About".into(), "History".into()],
        links: vec!["https://itmo.ru".into()],
    };
    assert_eq!(
        bundle.render(),
        "Content:\nITMO is a university\n\nTitles:\nAbout\nHistory\n\nLinks:\nhttps://itmo.ru"
    );
}

#[test]
fn test_error_payload_omits_missing_status() {
    let payload = ErrorPayload {
        error: "GPT не дал ответа".into(),
        status: None,
    };
    let json = serde_json::to_value(PipelineOutcome::Failed(payload)).unwrap();
    assert_eq!(json, serde_json::json!({"error": "GPT не дал ответа"}));
}

#[test]
fn test_result_payload_serializes_null_answer() {
    let payload = ResultPayload {
        id: 3,
        answer: None,
        reasoning: "r".into(),
        sources: vec![],
    };
    let json = serde_json::to_value(PipelineOutcome::Answered(payload)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"id": 3, "answer": null, "reasoning": "r", "sources": []})
    );
}
