//! Reconstruction of streamed chat completions.
//!
//! A streamed response is a series of `data: <json>` lines, each carrying a
//! `chat.completion.chunk` with an incremental `delta`. For the recorded
//! history we want what a non-streaming call would have returned, so
//! [`reconstruct_stream`] stitches the delta contents together and rewrites
//! the last chunk into a `chat.completion` with a materialized `message`.
//!
//! Chunks are held as ordered maps of raw JSON values. Only `object` and the
//! first choice are re-encoded; every other field is emitted with the exact
//! text the backend sent.
//!
//! Reconstruction is best-effort: malformed chunks are skipped, and if
//! nothing parses the raw body is returned untouched.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use serde_json::value::{RawValue, to_raw_value};
use tracing::debug;

use crate::telemetry;

/// Prefix of an SSE data line.
pub const DATA_PREFIX: &str = "data: ";

/// Data payload marking the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Object kind of a non-streaming chat completion.
pub const COMPLETION_OBJECT: &str = "chat.completion";

const DEFAULT_FINISH_REASON: &str = "stop";

/// JSON object with its members in source order, values kept verbatim.
type RawObject = IndexMap<String, Box<RawValue>>;

/// Whether `body` looks like an SSE stream.
pub fn is_event_stream(body: &str) -> bool {
    body.contains(DATA_PREFIX)
}

#[derive(Serialize)]
struct AssistantMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Content fragment of the first choice's delta, if it is a string.
fn delta_content(chunk: &RawObject) -> Option<String> {
    let choices: Value = serde_json::from_str(chunk.get("choices")?.get()).ok()?;
    choices
        .pointer("/0/delta/content")?
        .as_str()
        .map(str::to_string)
}

/// Turn the last chunk into a complete response carrying `content`.
fn finalize(mut chunk: RawObject, content: &str) -> serde_json::Result<RawObject> {
    if let Some(choices) = chunk.get_mut("choices")
        && let Some(completed) = complete_first_choice(choices, content)?
    {
        *choices = completed;
    }
    chunk.insert("object".to_string(), to_raw_value(COMPLETION_OBJECT)?);
    Ok(chunk)
}

/// Rewrite the first choice of `choices` so its `delta` becomes a full
/// `message`. Returns `None` when there is no first choice object to rewrite.
fn complete_first_choice(
    choices: &RawValue,
    content: &str,
) -> serde_json::Result<Option<Box<RawValue>>> {
    let Ok(mut items) = serde_json::from_str::<Vec<Box<RawValue>>>(choices.get()) else {
        return Ok(None);
    };
    let Some(first) = items.first_mut() else {
        return Ok(None);
    };
    let Ok(choice) = serde_json::from_str::<RawObject>(first.get()) else {
        return Ok(None);
    };

    let mut message = Some(to_raw_value(&AssistantMessage {
        role: "assistant",
        content,
    })?);
    let mut completed = RawObject::with_capacity(choice.len() + 1);
    for (key, value) in choice {
        match key.as_str() {
            // the message takes the place of the delta
            "delta" | "message" => {
                if let Some(message) = message.take() {
                    completed.insert("message".to_string(), message);
                }
            }
            _ => {
                completed.insert(key, value);
            }
        }
    }
    if let Some(message) = message {
        completed.insert("message".to_string(), message);
    }

    let has_finish_reason = completed
        .get("finish_reason")
        .is_some_and(|reason| reason.get().trim() != "null");
    if !has_finish_reason {
        completed.insert(
            "finish_reason".to_string(),
            to_raw_value(DEFAULT_FINISH_REASON)?,
        );
    }

    *first = to_raw_value(&completed)?;
    Ok(Some(to_raw_value(&items)?))
}

/// Collapse an SSE chat-completion stream into a single completion.
///
/// Every `data: ` line whose payload is a JSON object counts as a parsed
/// chunk. String content fragments from the first choice's delta are
/// concatenated in arrival order; the last parsed chunk supplies every other
/// field, byte for byte. Its first choice gets an `assistant` message and,
/// when `finish_reason` is missing or `null`, a finish reason of `"stop"`.
/// An explicit `null` is replaced rather than kept, unlike a check on key
/// presence alone.
///
/// Returns `body` unchanged when no chunk parses or the result cannot be
/// serialized.
pub fn reconstruct_stream(body: &str) -> String {
    let mut content = String::new();
    let mut last_chunk: Option<RawObject> = None;
    let mut skipped = 0usize;

    for line in body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        if data == DONE_SENTINEL {
            break;
        }

        let chunk: RawObject = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        if let Some(fragment) = delta_content(&chunk) {
            content.push_str(&fragment);
        }
        last_chunk = Some(chunk);
    }

    if skipped > 0 {
        debug!(skipped, "skipped unparseable stream chunks");
    }

    let Some(chunk) = last_chunk else {
        metrics::counter!(telemetry::STREAM_RECONSTRUCTIONS_TOTAL, "outcome" => "passthrough")
            .increment(1);
        return body.to_string();
    };

    match finalize(chunk, &content).and_then(|chunk| serde_json::to_string(&chunk)) {
        Ok(json) => {
            metrics::counter!(telemetry::STREAM_RECONSTRUCTIONS_TOTAL, "outcome" => "reconstructed")
                .increment(1);
            json
        }
        Err(e) => {
            debug!(error = %e, "failed to serialize reconstructed stream");
            metrics::counter!(telemetry::STREAM_RECONSTRUCTIONS_TOTAL, "outcome" => "passthrough")
                .increment(1);
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            r#"data: {{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1700000000,"model":"ai/smollm2","choices":[{{"index":0,"delta":{{"content":"{content}"}},"finish_reason":null}}]}}"#
        )
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn joins_fragments_into_message() {
        let body = format!("{}\n\n{}\n\ndata: [DONE]\n\n", chunk("Hello"), chunk(" world"));
        let out = parse(&reconstruct_stream(&body));

        assert_eq!(out["object"], "chat.completion");
        let choice = &out["choices"][0];
        assert_eq!(choice["message"]["role"], "assistant");
        assert_eq!(choice["message"]["content"], "Hello world");
        assert_eq!(choice["finish_reason"], "stop");
        assert!(choice.get("delta").is_none());
        assert_eq!(choice["index"], 0);
    }

    #[test]
    fn keeps_top_level_fields_of_last_chunk() {
        let body = concat!(
            "data: {\"id\":\"a\",\"created\":1,\"model\":\"m\",\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            "data: {\"id\":\"b\",\"created\":2,\"model\":\"m\",\"system_fingerprint\":\"fp\",",
            "\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":1,\"total_tokens\":4},",
            "\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}]}\n",
        );
        let out = parse(&reconstruct_stream(body));

        assert_eq!(out["id"], "b");
        assert_eq!(out["created"], 2);
        assert_eq!(out["system_fingerprint"], "fp");
        assert_eq!(out["usage"]["total_tokens"], 4);
        assert_eq!(out["choices"][0]["finish_reason"], "length");
        assert_eq!(out["choices"][0]["message"]["content"], "x");
    }

    #[test]
    fn stops_at_done() {
        let body = format!("{}\ndata: [DONE]\n{}\n", chunk("kept"), chunk("ignored"));
        let out = parse(&reconstruct_stream(&body));
        assert_eq!(out["choices"][0]["message"]["content"], "kept");
    }

    #[test]
    fn skips_malformed_chunks() {
        let body = format!("{}\ndata: {{not json\n{}\n", chunk("a"), chunk("b"));
        let out = parse(&reconstruct_stream(&body));
        assert_eq!(out["choices"][0]["message"]["content"], "ab");
    }

    #[test]
    fn nothing_parseable_returns_body() {
        let body = "data: garbage\n\ndata: more garbage\n";
        assert_eq!(reconstruct_stream(body), body);
    }

    #[test]
    fn done_only_returns_body() {
        let body = "data: [DONE]\n\n";
        assert_eq!(reconstruct_stream(body), body);
    }

    #[test]
    fn handles_crlf_lines() {
        let body = format!("{}\r\n\r\n{}\r\n\r\ndata: [DONE]\r\n", chunk("a"), chunk("b"));
        let out = parse(&reconstruct_stream(&body));
        assert_eq!(out["choices"][0]["message"]["content"], "ab");
    }

    #[test]
    fn empty_choices_still_marks_completion() {
        let body = format!(
            "{}\ndata: {{\"id\":\"u\",\"choices\":[],\"usage\":{{\"total_tokens\":9}}}}\n",
            chunk("lost")
        );
        let out = parse(&reconstruct_stream(&body));

        assert_eq!(out["object"], "chat.completion");
        assert_eq!(out["choices"], serde_json::json!([]));
        assert_eq!(out["usage"]["total_tokens"], 9);
    }

    #[test]
    fn only_first_choice_contributes() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}},",
            "{\"delta\":{\"content\":\"two\"}}]}\n",
        );
        let out = parse(&reconstruct_stream(body));

        assert_eq!(out["choices"][0]["message"]["content"], "one");
        assert_eq!(out["choices"][1]["delta"]["content"], "two");
    }

    #[test]
    fn detects_event_streams() {
        assert!(is_event_stream("data: {}\n\n"));
        assert!(!is_event_stream("{\"object\":\"chat.completion\"}"));
    }

    #[test]
    fn last_object_wins_even_with_odd_shapes() {
        let body = concat!(
            "data: {\"id\":\"first\",\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n",
            "data: {\"id\":\"last\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\",",
            "\"message\":{\"role\":\"assistant\"}}],\"usage\":{\"total_tokens\":3}}\n",
        );
        let out = parse(&reconstruct_stream(body));

        assert_eq!(out["id"], "last");
        assert_eq!(out["usage"]["total_tokens"], 3);
        assert_eq!(out["choices"][0]["message"]["content"], "hi");
        assert_eq!(out["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn non_string_content_is_ignored_but_chunk_counts() {
        let body = concat!(
            "data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            "data: {\"id\":\"b\",\"object\":7,\"choices\":[{\"delta\":{\"content\":42},\"finish_reason\":1}]}\n",
        );
        let out = parse(&reconstruct_stream(body));

        assert_eq!(out["id"], "b");
        assert_eq!(out["object"], "chat.completion");
        assert_eq!(out["choices"][0]["message"]["content"], "x");
        assert_eq!(out["choices"][0]["finish_reason"], 1);
    }

    #[test]
    fn non_object_payload_is_skipped() {
        let body = format!("{}\ndata: [1,2]\ndata: 5\n", chunk("kept"));
        let out = parse(&reconstruct_stream(&body));
        assert_eq!(out["id"], "chatcmpl-1");
        assert_eq!(out["choices"][0]["message"]["content"], "kept");
    }

    #[test]
    fn other_choices_pass_through_verbatim() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}},{\"index\":1, \"delta\":{\"content\":\"b\"}}]}\n";
        let out = reconstruct_stream(body);
        assert!(out.contains(r#"{"index":1, "delta":{"content":"b"}}"#), "{out}");
    }

    #[test]
    fn message_replaces_delta_in_place() {
        let body = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a\"},\"logprobs\":null}]}\n";
        let out = reconstruct_stream(body);
        assert!(
            out.contains(r#"{"index":0,"message":{"role":"assistant","content":"a"},"logprobs":null,"finish_reason":"stop"}"#),
            "{out}"
        );
    }
}
