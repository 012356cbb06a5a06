//! UDP exchange transport.
//!
//! Performs exactly one request/response round trip per call: build a
//! request carrying the local send time, transmit it, wait (bounded by
//! the mandatory timeout) for the response, and capture the local
//! receive instant immediately after the datagram is read.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::error::{NetClockError, Result};
use crate::sntp::exchange::ExchangeSample;
use crate::sntp::packet::{PACKET_LEN, SntpPacket};
use crate::sntp::timestamp::{NtpTimestamp, unix_now_nanos};

/// Standard NTP server port.
pub const NTP_PORT: u16 = 123;

/// Default per-exchange response timeout.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// One request/response timing exchange with a remote time authority.
///
/// The trait seam exists so the sampler and engine can run against the
/// in-memory transport in [`crate::testing`] as well as real UDP.
#[async_trait]
pub trait TimeExchange: Send + Sync {
    /// Perform one exchange and return the four raw timestamps with the
    /// derived offset and delay.
    ///
    /// # Errors
    /// Transient failures (send error, timeout, short or stale response)
    /// are returned as errors for which [`NetClockError::is_transient`]
    /// is true; callers treat those as a dropped sample, not as fatal.
    async fn exchange(&self) -> Result<ExchangeSample>;
}

/// UDP transport bound to a local ephemeral port and aimed at one
/// resolved server address.
#[derive(Debug)]
pub struct UdpTransport {
    /// Local socket (client-selected ephemeral port).
    socket: UdpSocket,
    /// Resolved server endpoint.
    server: SocketAddr,
    /// Mandatory bound on the wait for a response.
    timeout: Duration,
}

impl UdpTransport {
    /// Resolve the server and bind a local ephemeral socket.
    ///
    /// # Errors
    /// Returns [`NetClockError::Resolve`] if the hostname yields no
    /// address and [`NetClockError::Bind`] if the local socket cannot be
    /// bound. Both are fatal setup errors.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let server = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| NetClockError::Resolve {
                host: host.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| NetClockError::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned"),
            })?;
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(NetClockError::Bind)?;
        tracing::debug!(%server, local = ?socket.local_addr(), "time exchange transport ready");
        Ok(Self {
            socket,
            server,
            timeout,
        })
    }

    /// The resolved server endpoint.
    #[must_use]
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }
}

#[async_trait]
impl TimeExchange for UdpTransport {
    async fn exchange(&self) -> Result<ExchangeSample> {
        // T1 is captured as late as possible before the send and embedded
        // in the request's transmit field.
        let t1 = unix_now_nanos();
        let request = SntpPacket::client_request(NtpTimestamp::from_unix_nanos(t1));
        self.socket
            .send_to(&request.encode(), self.server)
            .await
            .map_err(NetClockError::Network)?;

        let mut buf = [0u8; 128];
        let received = tokio::time::timeout(self.timeout, async {
            loop {
                let (len, src) = self.socket.recv_from(&mut buf).await?;
                if src.ip() == self.server.ip() {
                    return Ok::<usize, std::io::Error>(len);
                }
                tracing::debug!(%src, "ignoring datagram from unexpected source");
            }
        })
        .await;
        // T4 immediately after the datagram is read.
        let t4 = unix_now_nanos();

        let len = match received {
            Err(_elapsed) => {
                return Err(NetClockError::Timeout {
                    timeout: self.timeout,
                });
            }
            Ok(result) => result.map_err(NetClockError::Network)?,
        };
        if len < PACKET_LEN {
            tracing::warn!(len, "undersized response from time server");
            return Err(NetClockError::ShortResponse { len });
        }
        let response =
            SntpPacket::decode(&buf[..len]).map_err(|_| NetClockError::ShortResponse { len })?;
        // The server must echo our transmit timestamp as its origin;
        // anything else is a stale or mismatched response.
        if response.origin != request.transmit {
            tracing::warn!(
                origin = %response.origin,
                expected = %request.transmit,
                "response does not echo the request"
            );
            return Err(NetClockError::StaleResponse);
        }

        let t2 = response.receive.to_unix_nanos();
        let t3 = response.transmit.to_unix_nanos();
        Ok(ExchangeSample::calculate(t1, t2, t3, t4))
    }
}
