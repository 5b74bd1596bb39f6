//! Session configuration

use crate::types::close_code;

/// Tunables for a connection session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum inbound frame size in bytes; larger frames are reported to
    /// the consumer's decode-error hook and dropped, the connection stays
    /// open
    pub max_message_size: Option<usize>,
    /// Close code sent when a hook fails
    pub error_close_code: u16,
    /// Close code sent when the connect phase declines the connection
    pub refusal_close_code: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_size: Some(64 * 1024 * 1024), // 64MB
            error_close_code: close_code::SERVER_ERROR,
            refusal_close_code: close_code::POLICY_VIOLATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_message_size, Some(64 * 1024 * 1024));
        assert_eq!(config.error_close_code, 1011);
        assert_eq!(config.refusal_close_code, 1008);
    }
}
