/// Identity attached to a request by the auth middleware.
///
/// The shared secret authenticates the caller as a whole; the optional
/// `x-user-email` header only labels who performed a write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalContext {
    email: Option<String>,
}

impl PrincipalContext {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(email: Option<String>) -> Self {
        Self {
            email: email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Value recorded as `performed_by`.
    pub fn performed_by(&self) -> &str {
        self.email.as_deref().unwrap_or(Self::UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identity_is_unknown() {
        assert_eq!(PrincipalContext::new(None).performed_by(), "unknown");
        assert_eq!(PrincipalContext::new(Some("  ".into())).performed_by(), "unknown");
        assert_eq!(
            PrincipalContext::new(Some("a@b.io".into())).performed_by(),
            "a@b.io"
        );
    }
}
