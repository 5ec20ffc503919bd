//! Secret masking for request logging.

use serde_json::Value;

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-organization-id",
    "x-user-id",
    "x-author-id",
    "user-id",
    "api-key",
    "apikey",
];

const SENSITIVE_FIELDS: &[&str] = &[
    "apiKey",
    "apikey",
    "key",
    "token",
    "accessToken",
    "authorization",
    "password",
    "secret",
    "userId",
    "authorId",
    "uploadedBy",
    "orgId",
    "organizationId",
];

const VISIBLE: usize = 4;

/// Keep the first and last four characters of a secret and star out the rest.
///
/// Secrets too short to keep both ends are replaced entirely, with at least four stars.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= VISIBLE * 2 {
        return "*".repeat(chars.len().max(4));
    }
    let start: String = chars[..VISIBLE].iter().collect();
    let end: String = chars[chars.len() - VISIBLE..].iter().collect();
    format!("{start}{}{end}", "*".repeat(chars.len() - VISIBLE * 2))
}

/// Mask the values of sensitive headers (case-insensitive names).
pub fn mask_headers<'a, I>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            let value = if SENSITIVE_HEADERS.contains(&lower.as_str()) {
                mask_secret(value)
            } else {
                value.to_string()
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Recursively mask sensitive fields in a JSON body. Non-string secrets become `[masked]`.
pub fn mask_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if SENSITIVE_FIELDS.contains(&k.as_str()) {
                        match v {
                            Value::String(s) => Value::String(mask_secret(s)),
                            _ => Value::String("[masked]".into()),
                        }
                    } else {
                        mask_body(v)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_body).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn long_secret_keeps_ends() {
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1*********abcd");
    }

    #[test]
    fn short_secret_fully_masked() {
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("abcdefgh"), "********");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn headers_masked_case_insensitively() {
        let masked = mask_headers([
            ("Content-Type", "application/json"),
            ("X-API-Key", "key_abcdefghijkl"),
            ("X-Organization-Id", "org_1"),
        ]);
        assert_eq!(masked[0].1, "application/json");
        assert_eq!(masked[1].1, "key_********ijkl");
        assert_eq!(masked[2].1, "*****");
    }

    #[test]
    fn body_masked_recursively() {
        let body = json!({
            "content": "hello",
            "userId": "usr_0123456789",
            "nested": {"token": 42, "items": [{"password": "hunter2hunter2"}]}
        });
        let masked = mask_body(&body);
        assert_eq!(masked["content"], "hello");
        assert_eq!(masked["userId"], "usr_******6789");
        assert_eq!(masked["nested"]["token"], "[masked]");
        assert_eq!(masked["nested"]["items"][0]["password"], "hunt******ter2");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(mask_body(&json!(7)), json!(7));
        assert_eq!(mask_body(&Value::Null), Value::Null);
    }
}
