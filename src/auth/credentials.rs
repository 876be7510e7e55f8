//! Authorization header parsing. No validation beyond the scheme prefix.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;

use super::error::ExtractError;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

/// Anything that can hand out raw header values by name.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&[u8]>;
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<&[u8]> {
        self.get(name).map(axum::http::HeaderValue::as_bytes)
    }
}

impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&[u8]> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_bytes)
    }
}

fn extract_with_prefix<'a, H>(headers: &'a H, prefix: &str) -> Result<&'a str, ExtractError>
where
    H: HeaderSource + ?Sized,
{
    let raw = headers
        .header(AUTHORIZATION.as_str())
        .filter(|value| !value.is_empty())
        .ok_or(ExtractError::Missing)?;
    let value = std::str::from_utf8(raw).map_err(|_| ExtractError::Malformed)?;

    // Case-sensitive: "bearer x" is rejected.
    value.strip_prefix(prefix).ok_or(ExtractError::Malformed)
}

/// Token after `Bearer ` in the `Authorization` header.
///
/// # Errors
/// `Missing` if the header is absent or empty, `Malformed` otherwise.
pub fn extract_bearer<H>(headers: &H) -> Result<&str, ExtractError>
where
    H: HeaderSource + ?Sized,
{
    extract_with_prefix(headers, BEARER_PREFIX)
}

/// Key after `ApiKey ` in the `Authorization` header.
///
/// # Errors
/// `Missing` if the header is absent or empty, `Malformed` otherwise.
pub fn extract_api_key<H>(headers: &H) -> Result<&str, ExtractError>
where
    H: HeaderSource + ?Sized,
{
    extract_with_prefix(headers, API_KEY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn map(value: &str) -> HashMap<String, String> {
        HashMap::from([("Authorization".to_string(), value.to_string())])
    }

    #[test]
    fn bearer_remainder_is_verbatim() {
        assert_eq!(extract_bearer(&map("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&map("Bearer  padded ")), Ok(" padded "));
    }

    #[test]
    fn missing_and_empty() {
        let empty: HashMap<String, String> = HashMap::new();
        assert_eq!(extract_bearer(&empty), Err(ExtractError::Missing));
        assert_eq!(extract_bearer(&map("")), Err(ExtractError::Missing));
        assert_eq!(extract_api_key(&empty), Err(ExtractError::Missing));
    }

    #[test]
    fn prefix_is_case_sensitive() {
        assert_eq!(extract_bearer(&map("bearer abc")), Err(ExtractError::Malformed));
        assert_eq!(extract_bearer(&map("BEARER abc")), Err(ExtractError::Malformed));
        assert_eq!(extract_api_key(&map("apikey abc")), Err(ExtractError::Malformed));
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert_eq!(extract_bearer(&map("ApiKey abc")), Err(ExtractError::Malformed));
        assert_eq!(extract_api_key(&map("Bearer abc")), Err(ExtractError::Malformed));
        assert_eq!(extract_bearer(&map("Basic dXNlcjpwYXNz")), Err(ExtractError::Malformed));
        assert_eq!(extract_bearer(&map("Bearer")), Err(ExtractError::Malformed));
    }

    #[test]
    fn api_key() {
        let key = "f271c81ff7084ee5b99a5091b42d486e";
        assert_eq!(extract_api_key(&map(&format!("ApiKey {key}"))), Ok(key));
    }

    #[test]
    fn hashmap_lookup_ignores_name_case() {
        let headers = HashMap::from([("authorization".to_string(), "Bearer t".to_string())]);
        assert_eq!(extract_bearer(&headers), Ok("t"));
    }

    #[test]
    fn header_map_source() -> Result<(), Box<dyn std::error::Error>> {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(ExtractError::Missing));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token123"));
        assert_eq!(extract_bearer(&headers), Ok("token123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff\xfe")?);
        assert_eq!(extract_bearer(&headers), Err(ExtractError::Malformed));
        Ok(())
    }
}
