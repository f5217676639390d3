//! Response and stream-chunk parsing.
//!
//! Three providers, three payload shapes, one normalized result. Missing or
//! malformed fields degrade to empty output rather than failing: a response
//! we cannot fully read is still a response, and a single bad stream line
//! must never kill an otherwise healthy stream.

use serde_json::Value;

use crate::types::{GenerationResponse, Provider, Usage};

/// Outcome of parsing one raw stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    /// Incremental text.
    Delta(String),
    /// Terminal signal; no further lines should be processed.
    Done,
}

/// Extract the normalized response from a complete (non-streaming) body.
pub(crate) fn parse_response(
    provider: Provider,
    body: &Value,
    fallback_model: &str,
) -> GenerationResponse {
    let text = match provider {
        Provider::OpenAi | Provider::Custom => body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        Provider::Anthropic => anthropic_text(&body["content"]),
        Provider::Local => body["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    };

    let model = body["model"]
        .as_str()
        .unwrap_or(fallback_model)
        .to_string();

    GenerationResponse {
        text,
        model,
        usage: parse_usage(provider, body),
    }
}

/// Concatenate the text blocks of an Anthropic content array.
fn anthropic_text(content: &Value) -> String {
    let Some(blocks) = content.as_array() else {
        return String::new();
    };
    blocks
        .iter()
        .filter(|b| b["type"].as_str() == Some("text"))
        .filter_map(|b| b["text"].as_str())
        .collect()
}

fn parse_usage(provider: Provider, body: &Value) -> Option<Usage> {
    let (prompt, completion) = match provider {
        Provider::OpenAi | Provider::Custom => (
            body["usage"]["prompt_tokens"].as_u64(),
            body["usage"]["completion_tokens"].as_u64(),
        ),
        Provider::Anthropic => (
            body["usage"]["input_tokens"].as_u64(),
            body["usage"]["output_tokens"].as_u64(),
        ),
        Provider::Local => (
            body["prompt_eval_count"].as_u64(),
            body["eval_count"].as_u64(),
        ),
    };
    match (prompt, completion) {
        (Some(p), Some(c)) => Some(Usage {
            prompt_tokens: p as u32,
            completion_tokens: c as u32,
        }),
        _ => None,
    }
}

/// Parse one raw line of a chunked stream.
///
/// Returns `None` for anything that is not a usable data line: blank lines,
/// SSE comments and `event:` framing, unrelated JSON shapes, and lines that
/// fail to parse at all.
pub(crate) fn parse_stream_line(provider: Provider, line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match provider {
        Provider::OpenAi | Provider::Custom => {
            let data = line.strip_prefix("data:")?.trim();
            if data == "[DONE]" {
                return Some(StreamEvent::Done);
            }
            let value: Value = serde_json::from_str(data).ok()?;
            let delta = value["choices"][0]["delta"]["content"].as_str()?;
            non_empty_delta(delta)
        }
        Provider::Anthropic => {
            let data = line.strip_prefix("data:")?.trim();
            let value: Value = serde_json::from_str(data).ok()?;
            match value["type"].as_str()? {
                "message_stop" => Some(StreamEvent::Done),
                "content_block_delta" => {
                    let delta = value["delta"]["text"].as_str()?;
                    non_empty_delta(delta)
                }
                // message_start, ping, content_block_start, ...
                _ => None,
            }
        }
        Provider::Local => {
            let value: Value = serde_json::from_str(line).ok()?;
            if value["done"].as_bool() == Some(true) {
                return Some(StreamEvent::Done);
            }
            let delta = value["message"]["content"].as_str()?;
            non_empty_delta(delta)
        }
    }
}

fn non_empty_delta(delta: &str) -> Option<StreamEvent> {
    if delta.is_empty() {
        None
    } else {
        Some(StreamEvent::Delta(delta.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_response_shape() {
        let body = json!({
            "model": "gpt-4o-mini",
            "choices": [{ "message": { "content": "Hello there" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 },
        });
        let resp = parse_response(Provider::OpenAi, &body, "fallback");
        assert_eq!(resp.text, "Hello there");
        assert_eq!(resp.model, "gpt-4o-mini");
        assert_eq!(
            resp.usage,
            Some(Usage { prompt_tokens: 12, completion_tokens: 3 })
        );
    }

    #[test]
    fn anthropic_response_concatenates_text_blocks() {
        let body = json!({
            "model": "claude-3-5-haiku-latest",
            "content": [
                { "type": "text", "text": "Hello" },
                { "type": "tool_use", "id": "t1" },
                { "type": "text", "text": " world" },
            ],
            "usage": { "input_tokens": 9, "output_tokens": 2 },
        });
        let resp = parse_response(Provider::Anthropic, &body, "fallback");
        assert_eq!(resp.text, "Hello world");
        assert_eq!(
            resp.usage,
            Some(Usage { prompt_tokens: 9, completion_tokens: 2 })
        );
    }

    #[test]
    fn local_response_shape() {
        let body = json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": "Hi" },
            "prompt_eval_count": 5,
            "eval_count": 1,
        });
        let resp = parse_response(Provider::Local, &body, "fallback");
        assert_eq!(resp.text, "Hi");
        assert_eq!(
            resp.usage,
            Some(Usage { prompt_tokens: 5, completion_tokens: 1 })
        );
    }

    #[test]
    fn missing_fields_degrade_to_empty() {
        let resp = parse_response(Provider::OpenAi, &json!({}), "fallback");
        assert_eq!(resp.text, "");
        assert_eq!(resp.model, "fallback");
        assert!(resp.usage.is_none());

        let resp = parse_response(Provider::Anthropic, &json!({"content": "not-an-array"}), "m");
        assert_eq!(resp.text, "");
    }

    #[test]
    fn usage_requires_both_counts() {
        let body = json!({ "usage": { "prompt_tokens": 12 } });
        assert!(parse_response(Provider::OpenAi, &body, "m").usage.is_none());
    }

    #[test]
    fn openai_stream_delta_and_sentinel() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(
            parse_stream_line(Provider::OpenAi, line),
            Some(StreamEvent::Delta("Hi".to_string()))
        );
        assert_eq!(
            parse_stream_line(Provider::OpenAi, "data: [DONE]"),
            Some(StreamEvent::Done)
        );
    }

    #[test]
    fn openai_stream_skips_non_data_and_unrelated_json() {
        assert_eq!(parse_stream_line(Provider::OpenAi, ""), None);
        assert_eq!(parse_stream_line(Provider::OpenAi, ": keep-alive"), None);
        // Valid JSON, wrong shape: skipped, not an error.
        assert_eq!(
            parse_stream_line(Provider::OpenAi, r#"data: {"unrelated":true}"#),
            None
        );
        assert_eq!(parse_stream_line(Provider::OpenAi, "data: {broken"), None);
    }

    #[test]
    fn anthropic_stream_events() {
        let delta = r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Hey"}}"#;
        assert_eq!(
            parse_stream_line(Provider::Anthropic, delta),
            Some(StreamEvent::Delta("Hey".to_string()))
        );
        assert_eq!(
            parse_stream_line(Provider::Anthropic, r#"data: {"type":"message_stop"}"#),
            Some(StreamEvent::Done)
        );
        assert_eq!(
            parse_stream_line(Provider::Anthropic, "event: content_block_delta"),
            None
        );
        assert_eq!(
            parse_stream_line(Provider::Anthropic, r#"data: {"type":"ping"}"#),
            None
        );
    }

    #[test]
    fn local_stream_ndjson() {
        let line = r#"{"message":{"content":"to"},"done":false}"#;
        assert_eq!(
            parse_stream_line(Provider::Local, line),
            Some(StreamEvent::Delta("to".to_string()))
        );
        assert_eq!(
            parse_stream_line(Provider::Local, r#"{"message":{"content":""},"done":true}"#),
            Some(StreamEvent::Done)
        );
        assert_eq!(parse_stream_line(Provider::Local, "not json"), None);
    }
}
