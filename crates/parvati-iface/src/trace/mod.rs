//! NAT path tracing.
//!
//! [`PathTracer`] repeatedly asks a [`HopSource`] for the path towards a
//! NAT'd address with an increasing hop limit until one of the
//! [`StopReason`]s applies. The result is diagnostic only.

mod udp;

pub use udp::{UdpHopSource, parse_reply, ReplyKind, BASE_PORT};

use crate::error::{GatewayError, TraceError};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Per-hop timeout used when none is configured
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper hop limit used when none is configured
pub const DEFAULT_MAX_HOPS: u8 = 30;

/// One step of a traced path
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    /// Hop count, starting at 1
    pub ttl: u8,
    /// Responder, `None` when the hop timed out
    pub ip: Option<IpAddr>,
    /// Round trip in milliseconds, 0 when the hop timed out
    pub rtt_ms: f64,
}

impl Hop {
    /// Hop answered by `ip`
    #[must_use]
    pub fn reply(ttl: u8, ip: IpAddr, rtt_ms: f64) -> Self {
        Self {
            ttl,
            ip: Some(ip),
            rtt_ms,
        }
    }

    /// Hop that timed out
    #[must_use]
    pub fn timeout(ttl: u8) -> Self {
        Self {
            ttl,
            ip: None,
            rtt_ms: 0.0,
        }
    }

    /// True when nothing answered
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.ip.is_none()
    }
}

/// Produces a path of at most `hop_limit` hops
pub trait HopSource: Send + Sync {
    /// Trace from `local` towards `target`, one probe per hop up to `hop_limit`.
    ///
    /// The returned path is shorter than `hop_limit` when the target (or an
    /// unreachable report) was reached first.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] when probes cannot be sent or replies read.
    fn trace(
        &self,
        local: IpAddr,
        target: IpAddr,
        hop_limit: u8,
        timeout: Duration,
    ) -> Result<Vec<Hop>, TraceError>;
}

/// Why the tracer stopped deepening
#[derive(Debug)]
pub enum StopReason {
    /// The last hop is the target address
    Found,
    /// The path did not grow with the hop limit
    NoProgress,
    /// The last three hops timed out
    TimeoutRun,
    /// The configured maximum hop limit was reached
    MaxHops,
    /// The hop source failed
    Error(TraceError),
}

impl StopReason {
    /// Short name used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NoProgress => "no-progress",
            Self::TimeoutRun => "timeout-run",
            Self::MaxHops => "max-hops",
            Self::Error(_) => "error",
        }
    }
}

/// Longest path seen and the reason tracing stopped
#[derive(Debug)]
pub struct TraceOutcome {
    /// Best path, possibly partial or empty
    pub hops: Vec<Hop>,
    /// Termination reason
    pub reason: StopReason,
}

impl TraceOutcome {
    /// True when the public address was observed as a responder
    #[must_use]
    pub fn found_public(&self) -> bool {
        matches!(self.reason, StopReason::Found)
    }

    /// Trace failure, if tracing stopped on one
    #[must_use]
    pub fn error(&self) -> Option<&TraceError> {
        match &self.reason {
            StopReason::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Stop decision for one iteration, given the previous best length.
///
/// `None` means deepen further.
#[must_use]
pub fn stop_reason(prev_len: usize, path: &[Hop], target: IpAddr) -> Option<StopReason> {
    if path.len() <= prev_len {
        return Some(StopReason::NoProgress);
    }
    if path.last().and_then(|hop| hop.ip) == Some(target) {
        return Some(StopReason::Found);
    }
    if path.len() >= 3 && path[path.len() - 3..].iter().all(Hop::timed_out) {
        return Some(StopReason::TimeoutRun);
    }
    None
}

/// Iterative-deepening path tracer
pub struct PathTracer<'a> {
    source: &'a dyn HopSource,
    timeout: Duration,
    max_hops: u8,
}

impl<'a> PathTracer<'a> {
    /// Tracer over `source` with default timeout and hop limit
    #[must_use]
    pub fn new(source: &'a dyn HopSource) -> Self {
        Self {
            source,
            timeout: DEFAULT_HOP_TIMEOUT,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Set the per-hop timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum hop limit
    #[must_use]
    pub fn max_hops(mut self, max_hops: u8) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    /// Trace from `local` until `target` answers or tracing gives up
    pub fn run(&self, local: IpAddr, target: IpAddr) -> TraceOutcome {
        let mut best = Vec::new();
        let mut hop_limit = 1u8;

        let reason = loop {
            let path = match self.source.trace(local, target, hop_limit, self.timeout) {
                Ok(path) => path,
                Err(e) => break StopReason::Error(e),
            };
            if let Some(reason) = stop_reason(best.len(), &path, target) {
                if !matches!(reason, StopReason::NoProgress) {
                    best = path;
                }
                break reason;
            }
            best = path;
            if hop_limit >= self.max_hops {
                break StopReason::MaxHops;
            }
            hop_limit += 1;
        };

        debug!(%local, %target, hops = best.len(), reason = reason.as_str(), "path trace finished");
        TraceOutcome { hops: best, reason }
    }
}

/// Address of the first router on the way from `local` to `target`
///
/// # Errors
///
/// Returns [`GatewayError::Trace`] if the probe fails and
/// [`GatewayError::NoReply`] if nothing answered at hop 1.
pub fn find_gateway(
    source: &dyn HopSource,
    local: IpAddr,
    target: IpAddr,
    timeout: Duration,
) -> Result<IpAddr, GatewayError> {
    let path = source.trace(local, target, 1, timeout)?;
    path.first()
        .and_then(|hop| hop.ip)
        .ok_or(GatewayError::NoReply)
}
