use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during clock synchronization
#[derive(Debug, Error)]
pub enum NetClockError {
    // ===== Fatal setup errors =====
    /// The time server hostname could not be resolved
    #[error("failed to resolve time server {host}")]
    Resolve {
        /// The hostname that failed to resolve
        host: String,
        /// The underlying source of the error
        #[source]
        source: io::Error,
    },

    /// The local UDP socket could not be bound
    #[error("failed to bind local socket")]
    Bind(#[source] io::Error),

    // ===== Transient exchange errors =====
    /// Network I/O error during an exchange
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    /// No response arrived within the exchange timeout
    #[error("no response within {timeout:?}")]
    Timeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The response datagram was shorter than a full packet
    #[error("short response: {len} bytes")]
    ShortResponse {
        /// Number of bytes actually received
        len: usize,
    },

    /// The response's origin timestamp does not echo our request's
    /// transmit timestamp (stale or mismatched response)
    #[error("response origin timestamp does not echo the request")]
    StaleResponse,

    // ===== Exhaustion =====
    /// Every exchange attempt in a sampling cycle failed
    #[error("all {attempts} exchange attempts failed")]
    SamplesExhausted {
        /// Number of attempts that were made
        attempts: u32,
    },

    // ===== Query errors =====
    /// The clock has not completed its first successful sync yet
    #[error("clock not yet synchronized")]
    NotSynchronized,
}

impl NetClockError {
    /// Check whether this error is a transient exchange failure.
    ///
    /// Transient failures are absorbed by the sampler as "this attempt
    /// doesn't count". Setup failures and cycle exhaustion are not
    /// transient and cross the engine boundary.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout { .. } | Self::ShortResponse { .. } | Self::StaleResponse
        )
    }
}

/// Result type alias for clock synchronization operations
pub type Result<T> = std::result::Result<T, NetClockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NetClockError::Resolve {
            host: "pool.ntp.org".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
        };
        assert_eq!(err.to_string(), "failed to resolve time server pool.ntp.org");

        let err = NetClockError::SamplesExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "all 5 exchange attempts failed");
    }

    #[test]
    fn test_error_is_transient() {
        assert!(
            NetClockError::Timeout {
                timeout: Duration::from_secs(5)
            }
            .is_transient()
        );
        assert!(NetClockError::ShortResponse { len: 12 }.is_transient());
        assert!(NetClockError::StaleResponse.is_transient());

        assert!(!NetClockError::NotSynchronized.is_transient());
        assert!(!NetClockError::SamplesExhausted { attempts: 5 }.is_transient());
        assert!(!NetClockError::Bind(io::Error::other("denied")).is_transient());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: NetClockError = io_err.into();
        assert!(matches!(err, NetClockError::Network(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NetClockError>();
    }
}
