//! Static address classification.

use crate::mask::WantMask;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Public/private class of a usable unicast address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressClass {
    /// Globally routable IPv4
    PublicV4,
    /// RFC 1918 or shared address space (100.64.0.0/10) IPv4
    PrivateV4,
    /// Global unicast IPv6 (2000::/3)
    PublicV6,
    /// Unique-local IPv6 (fc00::/7)
    PrivateV6,
}

impl AddressClass {
    /// Classify an address.
    ///
    /// Returns `None` for loopback, link-local, multicast, unspecified and
    /// broadcast addresses, which are never candidates.
    #[must_use]
    pub fn classify(ip: IpAddr) -> Option<Self> {
        match ip {
            IpAddr::V4(v4) => classify_v4(v4),
            IpAddr::V6(v6) => classify_v6(v6),
        }
    }

    /// The want-mask bit matching this class
    #[must_use]
    pub const fn mask(self) -> WantMask {
        match self {
            Self::PublicV4 => WantMask::PUBLIC_V4,
            Self::PrivateV4 => WantMask::PRIVATE_V4,
            Self::PublicV6 => WantMask::PUBLIC_V6,
            Self::PrivateV6 => WantMask::PRIVATE_V6,
        }
    }

    /// True for the public classes
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::PublicV4 | Self::PublicV6)
    }
}

fn classify_v4(ip: Ipv4Addr) -> Option<AddressClass> {
    if ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
    {
        return None;
    }
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 carrier-grade NAT space
    let shared = a == 100 && (b & 0xc0) == 64;
    if ip.is_private() || shared {
        Some(AddressClass::PrivateV4)
    } else {
        Some(AddressClass::PublicV4)
    }
}

fn classify_v6(ip: Ipv6Addr) -> Option<AddressClass> {
    let first = ip.segments()[0];
    if (first & 0xfe00) == 0xfc00 {
        Some(AddressClass::PrivateV6)
    } else if (first & 0xe000) == 0x2000 {
        Some(AddressClass::PublicV6)
    } else {
        None
    }
}

/// True when `ip` belongs to one of the classes in `mask`
#[must_use]
pub fn matches_mask(ip: IpAddr, mask: WantMask) -> bool {
    AddressClass::classify(ip).is_some_and(|class| mask.contains(class.mask()))
}
