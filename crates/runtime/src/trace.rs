use protocol::Event;
use serde_json::Value;

/// Opt-in debug trace of public calls and messages, under target `embed`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    enabled: bool,
}

impl Trace {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn call(&self, method: &str, args: &[Value]) {
        if !self.enabled {
            return;
        }
        let args: Vec<String> = args
            .iter()
            .filter_map(sanitize)
            .map(|v| v.to_string())
            .collect();
        tracing::debug!(target: "embed", "{method}({})", args.join(", "));
    }

    pub fn note(&self, message: &str) {
        if self.enabled {
            tracing::debug!(target: "embed", "{message}");
        }
    }

    pub fn sent(&self, event: &Event) {
        self.message("send", event);
    }

    pub fn received(&self, event: &Event) {
        self.message("received", event);
    }

    fn message(&self, direction: &str, event: &Event) {
        if !self.enabled {
            return;
        }
        match sanitize(&event.detail) {
            Some(detail) => {
                tracing::debug!(target: "embed", "{direction} {} {detail}", event.kind)
            }
            None => tracing::debug!(target: "embed", "{direction} {}", event.kind),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drops `null`, `""`, `false` and `{}`, and object members holding one of
/// those. Nested objects are logged as they are.
pub fn sanitize(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let kept: serde_json::Map<String, Value> = map
                .iter()
                .filter(|(_, v)| !is_blank(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        other if is_blank(other) => None,
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn drops_empty_values() {
        assert_eq!(sanitize(&json!(null)), None);
        assert_eq!(sanitize(&json!("")), None);
        assert_eq!(sanitize(&json!(false)), None);
        assert_eq!(sanitize(&json!({})), None);
        assert_eq!(sanitize(&json!(0)), Some(json!(0)));
    }

    #[test]
    fn drops_empty_members() {
        let args = json!({
            "expandNavigator": true,
            "fileName": "",
            "hideMainHeaderAndFooter": false,
            "filter": {},
            "layers": []
        });
        assert_eq!(
            sanitize(&args),
            Some(json!({"expandNavigator": true, "layers": []}))
        );
    }

    #[test]
    fn nested_members_are_kept() {
        let args = json!({"filter": {"flag": false, "name": null}, "debug": false});
        assert_eq!(
            sanitize(&args),
            Some(json!({"filter": {"flag": false, "name": null}}))
        );
    }
}
