use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::handlers::http::utils::headers::get_header_value;

fn is_form(headers: &HeaderMap) -> bool {
    get_header_value(headers, CONTENT_TYPE.as_str())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Parse a JSON body.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))
}

/// Parse a JSON or url-encoded form body, chosen by `Content-Type`.
/// Form fields are all strings, so only string-field types fit a form.
pub fn parse_json_or_form<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, String> {
    if !is_form(headers) {
        return parse_json(body);
    }

    let fields: Map<String, Value> = form_urlencoded::parse(body.as_ref())
        .into_owned()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    serde_json::from_value(Value::Object(fields)).map_err(|e| format!("Invalid form body: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use shared::types::LoginData;

    #[test]
    fn parses_login_from_json_and_form() {
        let json: LoginData = parse_json_or_form(
            &HeaderMap::new(),
            &Bytes::from(r#"{"email":"a@b.org","password":"pw"}"#),
        )
        .unwrap();
        assert_eq!(json.email, "a@b.org");

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let form: LoginData =
            parse_json_or_form(&headers, &Bytes::from("username=a%40b.org&password=p+w")).unwrap();
        assert_eq!(form.email, "a@b.org");
        assert_eq!(form.password, "p w");
    }

    #[test]
    fn reports_missing_fields() {
        let err = parse_json::<LoginData>(&Bytes::from(r#"{"email":"a@b.org"}"#)).unwrap_err();
        assert!(err.contains("password"));
    }
}
