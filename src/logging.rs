//! Safe logging helpers.
//!
//! Tokens for the pricing APIs must never reach logs or terminal output
//! verbatim.

use std::fmt;

/// Masked token representation
///
/// Shows only the first 4 characters followed by `***`, for safe logging.
#[derive(Clone, Debug)]
pub struct SensitiveToken<'a> {
    inner: &'a str,
}

impl<'a> SensitiveToken<'a> {
    /// # Example
    /// ```
    /// use workload_pricing::logging::SensitiveToken;
    ///
    /// let token = "vntg_tkn_0123456789abcdef";
    /// assert_eq!(SensitiveToken::new(token).to_string(), "vntg***");
    /// ```
    pub fn new(token: &'a str) -> Self {
        Self { inner: token }
    }
}

impl<'a> fmt::Display for SensitiveToken<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible_len = 4;
        if self.inner.len() <= visible_len * 2 || !self.inner.is_char_boundary(visible_len) {
            // Too short to show any of it
            write!(f, "***")
        } else {
            write!(f, "{}***", &self.inner[..visible_len])
        }
    }
}

/// Mask a token for display, keeping an empty token visibly empty
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        String::new()
    } else {
        SensitiveToken::new(token).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_token_display() {
        let sanitized = SensitiveToken::new("vntg_tkn_0123456789abcdef");
        assert_eq!(format!("{}", sanitized), "vntg***");
    }

    #[test]
    fn test_sensitive_token_short() {
        assert_eq!(SensitiveToken::new("abc123").to_string(), "***");
        assert_eq!(SensitiveToken::new("12345678").to_string(), "***");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "");
        assert_eq!(mask_token("vntg_tkn_0123456789"), "vntg***");
    }
}
