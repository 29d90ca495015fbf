use std::fmt;

use zeroize::Zeroizing;

/// Credential string that is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the raw value. Only call this where the value goes on the wire.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::Secret;

    #[test]
    fn debug_output_is_redacted() {
        let secret = Secret::new("y0_AgAAAABC");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("y0_AgAAAABC"));
        assert_eq!(secret.expose(), "y0_AgAAAABC");
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        assert!(Secret::new("  ").is_empty());
        assert!(!Secret::new("token").is_empty());
    }
}
