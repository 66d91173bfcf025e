//! # Parvati Interfaces
//!
//! Public IP discovery and NAT path detection for the Parvati client.
//!
//! This crate provides:
//! - Interface enumeration and static address classification
//! - Live public-IP probing over STUN
//! - Selection of exactly one public address per family, refusing to guess
//! - Iterative-deepening path tracing towards the NAT's public address
//! - Interface preferences read from the `[interfaces]` config section
//!
//! ## Example
//!
//! ```rust,no_run
//! use parvati_iface::{InterfaceList, WantMask};
//!
//! let list = InterfaceList::new(WantMask::ANY_V4 | WantMask::LIVE_IP)?;
//! let record = list.get_public_ip(0, WantMask::PUBLIC_V4 | WantMask::PRIVATE_V4)?;
//! println!("public address: {:?}", record.remote_ip);
//! # Ok::<(), parvati_iface::IfaceError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod interface;
pub mod list;
pub mod mask;
pub mod probe;
pub mod record;
mod show;
pub mod stun;
pub mod trace;

pub use classify::AddressClass;
pub use config::{InterfaceConfig, read_config};
pub use error::{GatewayError, IfaceError, ProbeError, Scope, StunError, TraceError};
pub use filter::filter_interface_ips;
pub use interface::{Interface, InterfaceSource, SystemInterfaces};
pub use list::{InterfaceList, interface_to_public_ip_string};
pub use mask::{WantMask, filter_to_string};
pub use probe::{PublicIpProbe, StunProbe};
pub use record::AddressRecord;
pub use trace::{Hop, HopSource, PathTracer, StopReason, TraceOutcome, UdpHopSource, find_gateway};

/// Public IPv4 addresses
pub const WANT_PUBLIC_V4: WantMask = WantMask::PUBLIC_V4;
/// Private IPv4 addresses
pub const WANT_PRIVATE_V4: WantMask = WantMask::PRIVATE_V4;
/// Public IPv6 addresses
pub const WANT_PUBLIC_V6: WantMask = WantMask::PUBLIC_V6;
/// Private IPv6 addresses
pub const WANT_PRIVATE_V6: WantMask = WantMask::PRIVATE_V6;
/// Probe the externally visible address
pub const WANT_LIVE_IP: WantMask = WantMask::LIVE_IP;
