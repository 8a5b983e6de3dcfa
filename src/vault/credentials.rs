//! Broker connection credentials.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Separator between the four fields of a credential record.
pub const FIELD_SEPARATOR: char = ':';

/// Reasons a decrypted record is rejected. Never carries field contents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not valid UTF-8")]
    NotUtf8,

    #[error("expected 4 fields (host:port:username:password), found {0}")]
    FieldCount(usize),

    #[error("port is not a number in 0-65535")]
    InvalidPort,

    #[error("host is empty")]
    EmptyHost,
}

/// Where and as whom to connect to the message broker.
///
/// Only ever built from a complete, authenticated record. Every field is
/// zeroized on drop and the password is redacted from `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectionDescriptor {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse `host:port:username:password`.
    ///
    /// A single trailing line ending is ignored, so records written by a text
    /// editor decrypt to the same password.
    pub fn parse_record(record: &str) -> Result<Self, RecordError> {
        let record = record
            .strip_suffix("\r\n")
            .or_else(|| record.strip_suffix('\n'))
            .unwrap_or(record);

        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        let [host, port, username, password] = fields.as_slice() else {
            return Err(RecordError::FieldCount(fields.len()));
        };

        if host.is_empty() {
            return Err(RecordError::EmptyHost);
        }
        let port = port.parse::<u16>().map_err(|_| RecordError::InvalidPort)?;

        Ok(Self::new(*host, port, *username, *password))
    }

    /// Parse a record from raw decrypted bytes.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let record = std::str::from_utf8(bytes).map_err(|_| RecordError::NotUtf8)?;
        Self::parse_record(record)
    }

    /// Serialize back to the colon-delimited record.
    pub fn to_record(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.host,
            self.port,
            self.username,
            self.password,
            sep = FIELD_SEPARATOR
        ))
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_record(s)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let descriptor: ConnectionDescriptor = "broker.example.com:8883:alice:secret".parse().unwrap();
        assert_eq!(descriptor.host, "broker.example.com");
        assert_eq!(descriptor.port, 8883);
        assert_eq!(descriptor.username, "alice");
        assert_eq!(descriptor.password, "secret");
        assert_eq!(descriptor.to_record().as_str(), "broker.example.com:8883:alice:secret");
    }

    #[test]
    fn test_trailing_newline_ignored() {
        let unix = ConnectionDescriptor::parse_record("h:1883:u:p\n").unwrap();
        let dos = ConnectionDescriptor::parse_record("h:1883:u:p\r\n").unwrap();
        assert_eq!(unix.password, "p");
        assert_eq!(dos.password, "p");
    }

    #[test]
    fn test_field_count_enforced() {
        assert_eq!(
            ConnectionDescriptor::parse_record("h:1883:u").unwrap_err(),
            RecordError::FieldCount(3)
        );
        // A colon in the password is not representable in this format.
        assert_eq!(
            ConnectionDescriptor::parse_record("h:1883:u:pa:ss").unwrap_err(),
            RecordError::FieldCount(5)
        );
        assert_eq!(
            ConnectionDescriptor::parse_record("").unwrap_err(),
            RecordError::FieldCount(1)
        );
    }

    #[test]
    fn test_invalid_port_and_host() {
        assert_eq!(
            ConnectionDescriptor::parse_record("h:70000:u:p").unwrap_err(),
            RecordError::InvalidPort
        );
        assert_eq!(
            ConnectionDescriptor::parse_record("h:mqtt:u:p").unwrap_err(),
            RecordError::InvalidPort
        );
        assert_eq!(
            ConnectionDescriptor::parse_record(":1883:u:p").unwrap_err(),
            RecordError::EmptyHost
        );
    }

    #[test]
    fn test_non_utf8_rejected() {
        assert_eq!(
            ConnectionDescriptor::parse_bytes(&[0x68, 0x3a, 0xff, 0xfe]).unwrap_err(),
            RecordError::NotUtf8
        );
    }

    #[test]
    fn test_zeroize_clears_fields() {
        let mut descriptor = ConnectionDescriptor::new("broker.example.com", 8883, "alice", "secret");
        descriptor.zeroize();
        assert!(descriptor.host.is_empty());
        assert_eq!(descriptor.port, 0);
        assert!(descriptor.username.is_empty());
        assert!(descriptor.password.is_empty());
    }

    #[test]
    fn test_debug_redacts_password() {
        let descriptor = ConnectionDescriptor::new("h", 1883, "u", "hunter2");
        let debug = format!("{:?}", descriptor);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
