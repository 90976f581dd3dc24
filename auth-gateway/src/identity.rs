use serde::Serialize;

/// Subject and scopes confirmed by the identity service for one request.
///
/// Handlers receive it from the request extensions; it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub scopes: Vec<String>,
}

impl VerifiedIdentity {
    pub fn new(subject: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            scopes,
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|granted| granted == scope)
    }

    /// True when at least one of `scopes` was granted
    pub fn has_any_scope<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        scopes.iter().any(|scope| self.has_scope(scope.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_of_scopes() {
        let identity = VerifiedIdentity::new("acct-1", vec!["read".into(), "write".into()]);
        assert!(identity.has_any_scope(&["admin", "write"]));
        assert!(!identity.has_any_scope(&["admin", "global"]));
        assert!(!identity.has_any_scope::<&str>(&[]));
    }
}
