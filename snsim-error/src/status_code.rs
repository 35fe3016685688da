use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde")]
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Status codes used to categorize errors.
///
/// # Ranges:
/// - 0xxx: Success
/// - 1xxx: General errors
/// - 2xxx: Lookup errors (missing topic / subscription)
/// - 3xxx: Validation errors (bad request data)
/// - 4xxx: Delivery errors (downstream endpoints)
///
/// `num_enum::TryFromPrimitive` gives a native `TryFrom<u32>`, handy when the
/// code travels over the wire adapter.
#[cfg_attr(feature = "serde", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Success ===
    Success = 0,

    // === 1xxx: General ===
    Unknown = 1000,
    Internal = 1001,
    Cancelled = 1002,
    SerializationFailed = 1003,

    // === 2xxx: Lookup ===
    NotFound = 2000,
    TopicNotFound = 2001,
    SubscriptionNotFound = 2002,

    // === 3xxx: Validation ===
    InvalidArgs = 3000,
    MissingField = 3001,
    InvalidProtocol = 3002,
    InvalidToken = 3003,
    MessageTooLarge = 3004,

    // === 4xxx: Delivery ===
    EndpointUnavailable = 4000,
    EndpointRejected = 4001,
    RetriesExhausted = 4002,
    Timeout = 4003,
    RateLimited = 4004,
}

/// Coarse classification every error in the workspace maps onto.
///
/// `NotFound` and `Validation` are returned synchronously to callers of the
/// registries and the facade. `Transient` and `Permanent` only ever come out of
/// the delivery engine and end up in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    Validation,
    Transient,
    Permanent,
}

/// Level at which a failure with a given code is worth logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Numeric representation of the status code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns `true` if an operation failing with this code may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EndpointUnavailable | Self::Timeout | Self::RateLimited
        )
    }

    /// Class of the error this code stands for.
    pub fn class(&self) -> ErrorClass {
        match self.code() {
            2000..=2999 => ErrorClass::NotFound,
            3000..=3999 => ErrorClass::Validation,
            _ if self.is_retryable() => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }

    /// Recommended log level for this code.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::TopicNotFound | Self::SubscriptionNotFound => LogLevel::Debug,
            Self::InvalidArgs
            | Self::MissingField
            | Self::InvalidProtocol
            | Self::InvalidToken
            | Self::MessageTooLarge
            | Self::Cancelled => LogLevel::Info,
            Self::EndpointUnavailable | Self::Timeout | Self::RateLimited => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// HTTP status the wire adapter should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::NotFound | Self::TopicNotFound | Self::SubscriptionNotFound => 404,
            Self::InvalidArgs
            | Self::MissingField
            | Self::InvalidProtocol
            | Self::InvalidToken
            | Self::MessageTooLarge => 400,
            Self::RateLimited => 429,
            Self::Timeout => 408,
            Self::EndpointUnavailable => 503,
            _ => 500,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for StatusCode
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
