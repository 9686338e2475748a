use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub in_flight: usize,
    pub queued: usize,
}

/// Accepts `5`, `5.0` and `"5"` as the same id; fractional numbers, other
/// strings, booleans and null are rejected.
fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => {
            if let Some(id) = n.as_i64() {
                return Ok(id);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(D::Error::custom(format!("id must be an integer, got {n}"))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("id must be an integer, got {s:?}"))),
        other => Err(D::Error::custom(format!("id must be an integer, got {other}"))),
    }
}

#[test]
fn test_lenient_id_accepts_integer_values() {
    for body in [
        r#"{"id": 5, "query": "q"}"#,
        r#"{"id": 5.0, "query": "q"}"#,
        r#"{"id": "5", "query": "q"}"#,
        r#"{"id": " 5 ", "query": "q"}"#,
    ] {
        let request: AnswerRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.id, 5, "body: {body}");
    }

    let request: AnswerRequest = serde_json::from_str(r#"{"id": "-12", "query": "q"}"#).unwrap();
    assert_eq!(request.id, -12);
}

#[test]
fn test_lenient_id_rejects_non_integers() {
    for body in [
        r#"{"id": 1.5, "query": "q"}"#,
        r#"{"id": "one", "query": "q"}"#,
        r#"{"id": "1.5", "query": "q"}"#,
        r#"{"id": null, "query": "q"}"#,
        r#"{"id": true, "query": "q"}"#,
        r#"{"id": [1], "query": "q"}"#,
        r#"{"id": 1e300, "query": "q"}"#,
    ] {
        let err = serde_json::from_str::<AnswerRequest>(body).unwrap_err();
        assert!(err.to_string().contains("id must be an integer"), "body: {body}: {err}");
    }
}
