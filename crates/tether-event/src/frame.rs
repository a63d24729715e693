//! Engine event frames and reply envelopes.
//!
//! Every engine-originated message arrives as a named event with an
//! opaque byte payload. [`EventFrame::decode`] turns the bytes into a
//! structured payload; classification helpers then tell the router
//! where the frame belongs:
//!
//! | Shape | Classified as |
//! |-------|---------------|
//! | payload has `status` + `token` | task event |
//! | payload has `token` only | correlated reply |
//! | anything else | direct event, routed by name |
//!
//! Replies to invocations additionally follow the envelope contract
//! decoded by [`ReplyEnvelope`]:
//!
//! ```json
//! { "token": "<cb uuid>", "ok": true,  "result": { ... } }
//! { "token": "<cb uuid>", "ok": false, "error": { "code": "...", ... } }
//! ```
//!
//! The `error` value is preserved verbatim so the engine's structured
//! failure fields survive the crossing.

use crate::{EventError, TaskEvent};
use serde_json::Value;
use tether_types::CallbackToken;

/// A named engine event with its decoded payload.
#[derive(Debug, Clone)]
pub struct EventFrame {
    /// Event name as delivered by the transport.
    pub name: String,
    /// Decoded payload.
    pub payload: Value,
}

impl EventFrame {
    /// Decodes raw payload bytes into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MalformedPayload`] if the bytes are not
    /// valid JSON. Empty payloads decode to `Value::Null` (an event
    /// may legitimately carry no data).
    pub fn decode(name: impl Into<String>, raw: &[u8]) -> Result<Self, EventError> {
        let payload = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(raw)
                .map_err(|e| EventError::MalformedPayload(e.to_string()))?
        };
        Ok(Self {
            name: name.into(),
            payload,
        })
    }

    /// Returns the callback token if the payload carries a well-formed
    /// `token` field and no task discriminator.
    ///
    /// A payload that also carries `status` belongs to the task stream,
    /// not the callback registry; see [`is_task_event`](Self::is_task_event).
    #[must_use]
    pub fn callback_token(&self) -> Option<CallbackToken> {
        if self.is_task_event() {
            return None;
        }
        self.payload
            .get("token")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .map(CallbackToken)
    }

    /// Returns `true` if the payload carries the task discriminator.
    #[must_use]
    pub fn is_task_event(&self) -> bool {
        self.payload.get("status").is_some() && self.payload.get("token").is_some()
    }

    /// Decodes the frame as a task event.
    ///
    /// # Errors
    ///
    /// Propagates decoding failures from [`TaskEvent::from_payload`].
    pub fn task_event(&self) -> Result<TaskEvent, EventError> {
        TaskEvent::from_payload(self.payload.clone())
    }
}

/// Decoded reply to a correlated invocation.
#[derive(Debug, Clone)]
pub struct ReplyEnvelope {
    /// Token of the pending invocation this reply answers.
    pub token: CallbackToken,
    /// `Ok(result)` for success, `Err(error)` with the engine's
    /// structured failure payload preserved verbatim.
    pub result: Result<Value, Value>,
}

impl ReplyEnvelope {
    /// Decodes a reply envelope from an already-parsed payload.
    ///
    /// # Errors
    ///
    /// - [`EventError::MissingField`] if `token` or `ok` is absent
    /// - [`EventError::MalformedPayload`] if `token` is not a UUID or
    ///   `ok` is not a boolean
    pub fn from_payload(payload: &Value) -> Result<Self, EventError> {
        let token_str = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField("token"))?;
        let uuid = token_str.parse().map_err(|_| {
            EventError::MalformedPayload(format!("invalid callback token: {token_str}"))
        })?;

        let ok = match payload.get("ok") {
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(EventError::MalformedPayload(format!(
                    "field 'ok' must be a boolean, got: {other}"
                )))
            }
            None => return Err(EventError::MissingField("ok")),
        };

        let result = if ok {
            Ok(payload.get("result").cloned().unwrap_or(Value::Null))
        } else {
            Err(payload.get("error").cloned().unwrap_or(Value::Null))
        };

        Ok(Self {
            token: CallbackToken(uuid),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_types::{ErrorCode, TaskToken};

    #[test]
    fn decode_valid_json() {
        let frame = EventFrame::decode("changed", br#"{"value": "B"}"#).unwrap();
        assert_eq!(frame.name, "changed");
        assert_eq!(frame.payload["value"], "B");
    }

    #[test]
    fn decode_empty_payload_is_null() {
        let frame = EventFrame::decode("tick", b"").unwrap();
        assert_eq!(frame.payload, Value::Null);
    }

    #[test]
    fn decode_malformed_bytes() {
        let err = EventFrame::decode("changed", b"{not json").unwrap_err();
        assert_eq!(err.code(), "EVENT_MALFORMED_PAYLOAD");
    }

    #[test]
    fn callback_token_extraction() {
        let token = CallbackToken::new();
        let payload = format!(r#"{{"token": "{}", "ok": true}}"#, token.uuid());
        let frame = EventFrame::decode("method_result", payload.as_bytes()).unwrap();

        assert_eq!(frame.callback_token(), Some(token));
        assert!(!frame.is_task_event());
    }

    #[test]
    fn callback_token_absent() {
        let frame = EventFrame::decode("tick", br#"{"elapsed": 3}"#).unwrap();
        assert_eq!(frame.callback_token(), None);
    }

    #[test]
    fn callback_token_invalid_uuid_ignored() {
        let frame = EventFrame::decode("x", br#"{"token": "nope"}"#).unwrap();
        assert_eq!(frame.callback_token(), None);
    }

    #[test]
    fn task_discriminator_wins_over_callback() {
        let token = TaskToken::new();
        let payload = format!(
            r#"{{"token": "{}", "status": "progress", "step": 1}}"#,
            token.uuid()
        );
        let frame = EventFrame::decode("task_update", payload.as_bytes()).unwrap();

        assert!(frame.is_task_event());
        assert_eq!(frame.callback_token(), None);
        assert_eq!(frame.task_event().unwrap().token, token);
    }

    #[test]
    fn reply_envelope_success() {
        let token = CallbackToken::new();
        let payload = json!({
            "token": token.uuid().to_string(),
            "ok": true,
            "result": { "answer": 42 },
        });

        let reply = ReplyEnvelope::from_payload(&payload).unwrap();
        assert_eq!(reply.token, token);
        assert_eq!(reply.result.unwrap()["answer"], 42);
    }

    #[test]
    fn reply_envelope_success_without_result_defaults_null() {
        let token = CallbackToken::new();
        let payload = json!({ "token": token.uuid().to_string(), "ok": true });

        let reply = ReplyEnvelope::from_payload(&payload).unwrap();
        assert_eq!(reply.result.unwrap(), Value::Null);
    }

    #[test]
    fn reply_envelope_error_preserves_fields() {
        let token = CallbackToken::new();
        let payload = json!({
            "token": token.uuid().to_string(),
            "ok": false,
            "error": { "code": "ANIMATION_BUSY", "detail": "already playing" },
        });

        let reply = ReplyEnvelope::from_payload(&payload).unwrap();
        let err = reply.result.unwrap_err();
        assert_eq!(err["code"], "ANIMATION_BUSY");
        assert_eq!(err["detail"], "already playing");
    }

    #[test]
    fn reply_envelope_missing_ok() {
        let token = CallbackToken::new();
        let payload = json!({ "token": token.uuid().to_string() });

        let err = ReplyEnvelope::from_payload(&payload).unwrap_err();
        assert_eq!(err.code(), "EVENT_MISSING_FIELD");
    }

    #[test]
    fn reply_envelope_non_bool_ok() {
        let token = CallbackToken::new();
        let payload = json!({ "token": token.uuid().to_string(), "ok": "yes" });

        let err = ReplyEnvelope::from_payload(&payload).unwrap_err();
        assert_eq!(err.code(), "EVENT_MALFORMED_PAYLOAD");
    }
}
