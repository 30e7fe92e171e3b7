use bytes::Bytes;

/// Body acknowledging a publish request.
pub const PUBLISH_ACK: &str = "{status: true}\n";

/// Build the notification chunk for one subscriber:
/// `{content: "X"}\n`, or `NAME({content: "X"})\n` when a JSONP callback was
/// supplied. The content is written as a JSON string literal.
pub fn notification(callback: Option<&str>, content: &str) -> Bytes {
    let literal = serde_json::Value::String(content.to_owned()).to_string();

    let body = match callback {
        Some(name) => format!("{name}({{content: {literal}}})\n"),
        None => format!("{{content: {literal}}}\n"),
    };

    Bytes::from(body)
}
