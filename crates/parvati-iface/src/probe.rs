//! Live public-IP probing.

use crate::error::{ProbeError, StunError};
use crate::stun::{BindingMessage, StunClass};
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default STUN servers queried in order
pub const DEFAULT_STUN_SERVERS: &[&str] = &["stun.l.google.com:19302", "stun1.l.google.com:19302"];

/// Default time to wait for one STUN server
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Learns the externally visible address of a local address
pub trait PublicIpProbe: Send + Sync {
    /// Probe from `local` and return the address the outside world sees
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when no probe target answered usefully.
    fn probe(&self, local: IpAddr) -> Result<IpAddr, ProbeError>;
}

/// STUN Binding based probe
#[derive(Debug, Clone)]
pub struct StunProbe {
    servers: Vec<String>,
    timeout: Duration,
}

impl Default for StunProbe {
    fn default() -> Self {
        Self::new(
            DEFAULT_STUN_SERVERS.iter().map(ToString::to_string).collect(),
            DEFAULT_PROBE_TIMEOUT,
        )
    }
}

impl StunProbe {
    /// Probe using `servers` (`host:port`), waiting `timeout` for each
    #[must_use]
    pub fn new(servers: Vec<String>, timeout: Duration) -> Self {
        Self { servers, timeout }
    }

    /// Configured servers
    #[must_use]
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn resolve(&self, local: IpAddr) -> Vec<SocketAddr> {
        self.servers
            .iter()
            .filter_map(|server| match server.to_socket_addrs() {
                Ok(addrs) => Some(addrs),
                Err(e) => {
                    debug!(%server, error = %e, "could not resolve STUN server");
                    None
                }
            })
            .flatten()
            .filter(|addr| addr.is_ipv4() == local.is_ipv4())
            .collect()
    }

    fn query(&self, socket: &UdpSocket, server: SocketAddr) -> Result<IpAddr, ProbeError> {
        let request = BindingMessage::request();
        socket.send_to(&request.encode(), server)?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 1024];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ProbeError::Timeout(self.timeout.as_millis() as u64));
            }
            socket.set_read_timeout(Some(remaining))?;
            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(ProbeError::Timeout(self.timeout.as_millis() as u64));
                }
                Err(e) => return Err(e.into()),
            };
            if from != server {
                continue;
            }

            let response = BindingMessage::decode(&buf[..len])?;
            if response.transaction_id != request.transaction_id {
                return Err(StunError::TransactionMismatch.into());
            }
            if response.class != StunClass::SuccessResponse {
                return Err(StunError::ErrorResponse.into());
            }
            return response
                .mapped_address()
                .map(|addr| addr.ip())
                .ok_or_else(|| StunError::MissingAttribute.into());
        }
    }
}

impl PublicIpProbe for StunProbe {
    fn probe(&self, local: IpAddr) -> Result<IpAddr, ProbeError> {
        let servers = self.resolve(local);
        if servers.is_empty() {
            return Err(ProbeError::NoServer(if local.is_ipv4() { "IPv4" } else { "IPv6" }));
        }

        let socket = UdpSocket::bind(SocketAddr::new(local, 0))?;
        let mut last_err = None;
        for server in servers {
            match self.query(&socket, server) {
                Ok(ip) => {
                    debug!(%local, %server, public = %ip, "STUN probe succeeded");
                    return Ok(ip);
                }
                Err(e) => {
                    debug!(%local, %server, error = %e, "STUN probe failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(ProbeError::NoServer("any family")))
    }
}
