use std::fmt;

use error_common::{RegistryError, Result};
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

pub const BEARER_SCHEME: &str = "Bearer";

/// Bearer token taken from a request, not yet verified.
///
/// `Debug` never prints the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Cookie,
}

/// Where a transport is allowed to look for credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialLookup {
    /// `authorization` header or metadata entry only
    HeaderOnly,
    /// `authorization` header, else the session cookie
    HeaderThenCookie,
}

impl Credential {
    /// Parse an `Authorization` header value of the form `Bearer <token>`.
    ///
    /// # Errors
    /// [`RegistryError::InvalidTokenFormat`] unless the value has exactly two
    /// whitespace separated fields and the first one is `Bearer`.
    pub fn from_authorization_header(value: &str) -> Result<Self> {
        let mut fields = value.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(BEARER_SCHEME), Some(token), None) => Ok(Self {
                token: token.to_string(),
                source: CredentialSource::Header,
            }),
            _ => Err(RegistryError::InvalidTokenFormat(
                "authorization header must be of the form 'Bearer <token>'".to_string(),
            )),
        }
    }

    /// Raw session cookie value; an empty cookie counts as no credential
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self {
            token: value.to_string(),
            source: CredentialSource::Cookie,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Value for an outgoing `authorization` header or metadata entry
    pub fn to_bearer_value(&self) -> String {
        format!("{BEARER_SCHEME} {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Find the request credential. The header always wins; the cookie is only
/// consulted when the header is absent and `lookup` allows it.
///
/// # Errors
/// [`RegistryError::InvalidTokenFormat`] when the header is present but malformed.
pub fn extract_credential(
    headers: &HeaderMap,
    lookup: CredentialLookup,
    cookie_name: &str,
) -> Result<Option<Credential>> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| {
            RegistryError::InvalidTokenFormat("authorization header is not valid text".to_string())
        })?;
        return Credential::from_authorization_header(value).map(Some);
    }

    if lookup == CredentialLookup::HeaderOnly {
        return Ok(None);
    }

    Ok(cookie_value(headers, cookie_name).and_then(Credential::from_cookie_value))
}

/// Value of the named cookie across every `Cookie` header
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append((*name).clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_header() {
        let credential = Credential::from_authorization_header("Bearer abc123").unwrap();
        assert_eq!(credential.token(), "abc123");
        assert_eq!(credential.source(), CredentialSource::Header);
        assert_eq!(credential.to_bearer_value(), "Bearer abc123");
    }

    #[test]
    fn test_malformed_headers() {
        for value in ["abc123", "Bearer", "Basic abc123", "bearer abc123", "Bearer abc 123", ""] {
            let err = Credential::from_authorization_header(value).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidTokenFormat(_)), "{value:?}");
        }
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let map = headers(&[(&AUTHORIZATION, "Bearer from-header"), (&COOKIE, "hatk=from-cookie")]);
        let credential = extract_credential(&map, CredentialLookup::HeaderThenCookie, "hatk")
            .unwrap()
            .unwrap();
        assert_eq!(credential.token(), "from-header");
    }

    #[test]
    fn test_malformed_header_does_not_fall_back_to_cookie() {
        let map = headers(&[(&AUTHORIZATION, "Token nope"), (&COOKIE, "hatk=from-cookie")]);
        assert!(extract_credential(&map, CredentialLookup::HeaderThenCookie, "hatk").is_err());
    }

    #[test]
    fn test_cookie_lookup() {
        let map = headers(&[(&COOKIE, "theme=dark; hatk=session-token"), (&COOKIE, "other=1")]);

        let credential = extract_credential(&map, CredentialLookup::HeaderThenCookie, "hatk")
            .unwrap()
            .unwrap();
        assert_eq!(credential.token(), "session-token");
        assert_eq!(credential.source(), CredentialSource::Cookie);

        assert!(extract_credential(&map, CredentialLookup::HeaderOnly, "hatk")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_cookie_is_no_credential() {
        let map = headers(&[(&COOKIE, "hatk=")]);
        assert!(extract_credential(&map, CredentialLookup::HeaderThenCookie, "hatk")
            .unwrap()
            .is_none());
        assert!(extract_credential(&HeaderMap::new(), CredentialLookup::HeaderThenCookie, "hatk")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::from_authorization_header("Bearer secret-value").unwrap();
        assert!(!format!("{credential:?}").contains("secret-value"));
    }
}
