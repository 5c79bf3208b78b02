use crate::error::ErrorCode;
use std::fmt;

/// Error code range: 1000-1002.
pub struct InitErrorCodes;

impl InitErrorCodes {
    pub const CODEC: i32 = 1000;
    pub const BUS: i32 = 1001;
    pub const PIN: i32 = 1002;
}

/// Fatal errors from `AudioSource::init`. AudioTask is never started when
/// `init` returns one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// Codec negotiation or configuration failed.
    Codec { details: String },
    /// The audio bus (I2S/I2C) could not be claimed.
    Bus { details: String },
    /// A required GPIO pin could not be configured.
    Pin { details: String },
}

impl ErrorCode for InitError {
    fn code(&self) -> i32 {
        match self {
            InitError::Codec { .. } => InitErrorCodes::CODEC,
            InitError::Bus { .. } => InitErrorCodes::BUS,
            InitError::Pin { .. } => InitErrorCodes::PIN,
        }
    }

    fn message(&self) -> String {
        match self {
            InitError::Codec { details } => format!("codec init failed: {details}"),
            InitError::Bus { details } => format!("bus claim failed: {details}"),
            InitError::Pin { details } => format!("pin config failed: {details}"),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InitError::{:?} (code {}): {}", self, self.code(), self.message())
    }
}

impl std::error::Error for InitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codec = InitError::Codec { details: "x".into() };
        let bus = InitError::Bus { details: "x".into() };
        let pin = InitError::Pin { details: "x".into() };
        assert_ne!(codec.code(), bus.code());
        assert_ne!(bus.code(), pin.code());
    }
}
