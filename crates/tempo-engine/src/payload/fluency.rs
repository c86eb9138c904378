use crate::ids::IdGenerator;
use serde::de::Error as _;
use serde_json::{Map, Value};

const DURATION_MS: &str = "durationMs";
const ACTIVITY_ATTEMPT_ID: &str = "activityAttemptId";
const ACTIVITY_STEP_ATTEMPT_ID: &str = "activityStepAttemptId";
const SKIP: &str = "skip";

/// Body of a FluencyBuilder time request:
/// `{"variables":{"messages":[{"skip","durationMs","activityAttemptId","activityStepAttemptId"}, ...]}}`.
///
/// The document is kept as parsed, key order included, and only the three
/// per-message fields written by [`TimePayload::apply_duration`] change.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePayload {
    root: Value,
}

impl TimePayload {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let root: Value = serde_json::from_str(body)?;
        let messages = root
            .pointer("/variables/messages")
            .and_then(Value::as_array)
            .ok_or_else(|| serde_json::Error::custom("missing variables.messages array"))?;
        if messages.iter().any(|m| !m.is_object()) {
            return Err(serde_json::Error::custom("message is not an object"));
        }
        Ok(Self { root })
    }

    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.root)
    }

    fn messages(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.root
            .pointer("/variables/messages")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    fn messages_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.root
            .pointer_mut("/variables/messages")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }

    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    /// True when there is at least one message and none is skipped. A message
    /// without a `skip` flag counts as not skipped.
    pub fn is_injectable(&self) -> bool {
        self.message_count() > 0
            && self
                .messages()
                .all(|m| !m.get(SKIP).and_then(Value::as_bool).unwrap_or(false))
    }

    /// Spread `total_ms` evenly over every message and give each one fresh
    /// attempt ids. Existing values, `null` included, are overwritten in place.
    pub fn apply_duration(&mut self, total_ms: u64, ids: &dyn IdGenerator) {
        let share = split_duration(total_ms, self.message_count());
        for message in self.messages_mut() {
            message.insert(DURATION_MS.into(), Value::from(share));
            message.insert(ACTIVITY_ATTEMPT_ID.into(), Value::from(ids.next_id()));
            message.insert(ACTIVITY_STEP_ATTEMPT_ID.into(), Value::from(ids.next_id()));
        }
    }
}

/// `round(total_ms / parts)`, rounding halves up. Zero parts yields zero.
pub fn split_duration(total_ms: u64, parts: usize) -> u64 {
    if parts == 0 {
        return 0;
    }
    let total = u128::from(total_ms);
    let parts = parts as u128;
    ((2 * total + parts) / (2 * parts)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    const BODY: &str = r#"{"operationName":"track","variables":{"courseId":"c1","messages":[
        {"skip":false,"durationMs":0,"activityAttemptId":"a","activityStepAttemptId":"b","kind":"step"},
        {"skip":false,"durationMs":0,"activityAttemptId":"c","activityStepAttemptId":"d"}
    ]}}"#;

    #[test]
    fn test_split_duration_rounds_half_up() {
        assert_eq!(split_duration(1000, 3), 333);
        assert_eq!(split_duration(1001, 2), 501);
        assert_eq!(split_duration(5, 2), 3);
        assert_eq!(split_duration(60_000, 1), 60_000);
        assert_eq!(split_duration(10, 0), 0);
    }

    #[test]
    fn test_apply_duration_keeps_unknown_fields() {
        let mut payload = TimePayload::parse(BODY).unwrap();
        payload.apply_duration(90_000, &SequentialIds::new("x"));

        let value: Value = serde_json::from_str(&payload.to_body().unwrap()).unwrap();
        assert_eq!(value["operationName"], "track");
        assert_eq!(value["variables"]["courseId"], "c1");
        assert_eq!(value["variables"]["messages"][0]["kind"], "step");
        assert_eq!(value["variables"]["messages"][0]["durationMs"], 45_000);
        assert_eq!(value["variables"]["messages"][0]["activityAttemptId"], "x-1");
        assert_eq!(value["variables"]["messages"][0]["activityStepAttemptId"], "x-2");
        assert_eq!(value["variables"]["messages"][1]["activityAttemptId"], "x-3");
    }

    #[test]
    fn test_serialization_keeps_captured_key_order() {
        let body = r#"{"operationName":"track","variables":{"messages":[{"zeta":1,"skip":false,"durationMs":0,"alpha":2,"activityAttemptId":"a","activityStepAttemptId":"b"}],"extra":true},"query":"q"}"#;
        let mut payload = TimePayload::parse(body).unwrap();
        payload.apply_duration(1000, &SequentialIds::new("n"));
        assert_eq!(
            payload.to_body().unwrap(),
            r#"{"operationName":"track","variables":{"messages":[{"zeta":1,"skip":false,"durationMs":1000,"alpha":2,"activityAttemptId":"n-1","activityStepAttemptId":"n-2"}],"extra":true},"query":"q"}"#
        );
    }

    #[test]
    fn test_null_attempt_ids_are_accepted_and_replaced() {
        let body = r#"{"variables":{"messages":[{"skip":false,"durationMs":null,"activityAttemptId":null,"activityStepAttemptId":null}]}}"#;
        let mut payload = TimePayload::parse(body).unwrap();
        assert!(payload.is_injectable());
        payload.apply_duration(500, &SequentialIds::new("z"));
        let value: Value = serde_json::from_str(&payload.to_body().unwrap()).unwrap();
        assert_eq!(value["variables"]["messages"][0]["durationMs"], 500);
        assert_eq!(value["variables"]["messages"][0]["activityAttemptId"], "z-1");
        assert_eq!(value["variables"]["messages"][0]["activityStepAttemptId"], "z-2");
    }

    #[test]
    fn test_parse_rejects_missing_messages() {
        assert!(TimePayload::parse(r#"{"variables":{}}"#).is_err());
        assert!(TimePayload::parse(r#"{"variables":{"messages":[1]}}"#).is_err());
        assert!(TimePayload::parse("not json").is_err());
    }

    #[test]
    fn test_skipped_message_is_not_injectable() {
        let body = r#"{"variables":{"messages":[{"skip":true,"durationMs":0,"activityAttemptId":"a","activityStepAttemptId":"b"}]}}"#;
        assert!(!TimePayload::parse(body).unwrap().is_injectable());
        let empty = r#"{"variables":{"messages":[]}}"#;
        assert!(!TimePayload::parse(empty).unwrap().is_injectable());
        assert!(TimePayload::parse(BODY).unwrap().is_injectable());
    }
}
