//! Error types for interface discovery, probing and tracing.

use std::fmt;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Where a public-IP lookup was restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single enumerated interface
    Interface {
        /// OS interface index
        index: u32,
        /// Interface name
        name: String,
    },
    /// An interface number that matched nothing in the list
    Unknown(u32),
    /// Every interface in the list
    All,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface { index, name } => write!(f, "interface {index}. ({name})"),
            Self::Unknown(index) => write!(f, "interface {index}"),
            Self::All => f.write_str("any interface"),
        }
    }
}

fn quoted(ips: &[IpAddr]) -> String {
    ips.iter()
        .map(|ip| format!("'{ip}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn known(listing: &str) -> String {
    if listing.is_empty() {
        String::new()
    } else {
        format!("\nKnown interfaces were:\n{listing}")
    }
}

/// Interface discovery and selection errors
#[derive(Debug, Error)]
pub enum IfaceError {
    /// The OS could not report its interfaces
    #[error("Unable to enumerate network interfaces: {0}")]
    Enumeration(String),

    /// No qualifying address in scope
    #[error("No suitable {filter} IPs were found in {scope}{}", known(.listing))]
    NoPublicIp {
        /// Interface or global scope of the lookup
        scope: Scope,
        /// Rendered want-mask
        filter: String,
        /// Diagnostic per-interface summary, may be empty
        listing: String,
    },

    /// More than one qualifying address in scope
    #[error(
        "Found more than one {filter} IP in {scope}: {}. Please specify which interface you wish to use.{}",
        quoted(.candidates),
        known(.listing)
    )]
    AmbiguousPublicIp {
        /// Interface or global scope of the lookup
        scope: Scope,
        /// Rendered want-mask
        filter: String,
        /// Every externally visible candidate address
        candidates: Vec<IpAddr>,
        /// Diagnostic per-interface summary
        listing: String,
    },

    /// A configured interface name matched nothing
    #[error("Unable to parse interface name '{name}': no such interface")]
    UnknownInterface {
        /// Name as configured
        name: String,
    },

    /// A filter was requested without any address family bit
    #[error("Address filter selects no address family")]
    EmptyMask,

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        /// Path of the config file
        path: PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

impl IfaceError {
    /// Candidate addresses of an ambiguity error, empty otherwise
    #[must_use]
    pub fn candidates(&self) -> &[IpAddr] {
        match self {
            Self::AmbiguousPublicIp { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

/// Live public-IP probe failure, attached to a single address record
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Socket level failure
    #[error("probe I/O error: {0}")]
    Io(#[from] io::Error),

    /// No server answered in time
    #[error("no STUN server answered within {0} ms")]
    Timeout(u64),

    /// No configured server shares the local address family
    #[error("no STUN server available for {0}")]
    NoServer(&'static str),

    /// A server answered with something unusable
    #[error("STUN protocol error: {0}")]
    Stun(#[from] StunError),
}

/// STUN codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StunError {
    /// Message shorter than the fixed header
    #[error("STUN message too short")]
    MessageTooShort,
    /// Magic cookie mismatch
    #[error("Invalid STUN magic cookie")]
    InvalidMagicCookie,
    /// Unsupported method or class
    #[error("Invalid STUN message type")]
    InvalidMessageType,
    /// Malformed attribute value
    #[error("Invalid STUN attribute")]
    InvalidAttribute,
    /// Response carries another transaction ID
    #[error("Transaction ID mismatch")]
    TransactionMismatch,
    /// Server replied with an error response
    #[error("STUN error response")]
    ErrorResponse,
    /// Response has no mapped address
    #[error("Missing required STUN attribute")]
    MissingAttribute,
}

/// Path trace failures
#[derive(Debug, Error)]
pub enum TraceError {
    /// Raw sockets need elevated privileges
    #[error("raw socket access denied (traceroute needs root or CAP_NET_RAW)")]
    Permission,

    /// Socket level failure
    #[error("trace I/O error: {0}")]
    Io(#[from] io::Error),

    /// Local and target addresses are of different families
    #[error("cannot trace from {local} to {target}: address family mismatch")]
    FamilyMismatch {
        /// Source address
        local: IpAddr,
        /// Destination address
        target: IpAddr,
    },
}

impl TraceError {
    /// Map an I/O error, singling out missing privileges
    #[must_use]
    pub fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::Permission
        } else {
            Self::Io(err)
        }
    }
}

/// Gateway detection failures
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The single-hop probe failed
    #[error("gateway probe failed: {0}")]
    Trace(#[from] TraceError),

    /// Nothing answered at hop 1
    #[error("no router answered at hop 1")]
    NoReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = IfaceError::AmbiguousPublicIp {
            scope: Scope::All,
            filter: "public v4".to_string(),
            candidates: vec!["203.0.113.5".parse().unwrap(), "203.0.113.9".parse().unwrap()],
            listing: " - 2. (eth0) 203.0.113.5\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'203.0.113.5', '203.0.113.9'"));
        assert!(msg.contains("Known interfaces were:"));
        assert_eq!(err.candidates().len(), 2);
    }

    #[test]
    fn test_no_public_ip_scope() {
        let err = IfaceError::NoPublicIp {
            scope: Scope::Interface {
                index: 2,
                name: "eth0".to_string(),
            },
            filter: "public v6".to_string(),
            listing: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "No suitable public v6 IPs were found in interface 2. (eth0)"
        );
    }

    #[test]
    fn test_permission_mapping() {
        let err = TraceError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TraceError::Permission));
        let err = TraceError::from_io(io::Error::from(io::ErrorKind::AddrNotAvailable));
        assert!(matches!(err, TraceError::Io(_)));
    }
}
