use crate::data_models::ResultPayload;

pub const ATTRIBUTION: &str = "\nСделано в YandexGPT.";
pub const MAX_SOURCES: usize = 3;

pub fn assemble(
    id: i64,
    answer: Option<i64>,
    completion_text: &str,
    links: &[String],
) -> ResultPayload {
    ResultPayload {
        id,
        answer,
        reasoning: format!("{completion_text}{ATTRIBUTION}"),
        sources: links.iter().take(MAX_SOURCES).cloned().collect(),
    }
}

#[test]
fn test_assemble_truncates_sources_in_order() {
    let links: Vec<String> = (1..=5).map(|i| format!("https://itmo.ru/{i}")).collect();
    let payload = assemble(1, Some(2), "because", &links);

    assert_eq!(payload.id, 1);
    assert_eq!(payload.answer, Some(2));
    assert_eq!(payload.reasoning, "because\nСделано в YandexGPT.");
    assert_eq!(
        payload.sources,
        vec!["https://itmo.ru/1", "https://itmo.ru/2", "https://itmo.ru/3"]
    );
}

#[test]
fn test_assemble_keeps_short_source_lists() {
    let links = vec!["https://itmo.ru".to_string()];
    let payload = assemble(9, None, "", &links);
    assert_eq!(payload.sources, links);
    assert_eq!(payload.reasoning, ATTRIBUTION);

    let payload = assemble(9, None, "text", &[]);
    assert!(payload.sources.is_empty());
}
