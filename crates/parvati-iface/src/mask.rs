//! Address want-masks.
//!
//! A [`WantMask`] says which address classes a caller is interested in and
//! whether the externally visible address must be probed live.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitset of wanted address classes.
///
/// The zero mask means "use the interface list's default filter".
/// [`WantMask::LIVE_IP`] is a modifier: it carries no address family on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WantMask(u8);

impl WantMask {
    /// No bits set
    pub const NONE: Self = Self(0);
    /// Globally routable IPv4 addresses
    pub const PUBLIC_V4: Self = Self(0b0000_0001);
    /// RFC 1918 / shared address space IPv4 addresses
    pub const PRIVATE_V4: Self = Self(0b0000_0010);
    /// Global unicast IPv6 addresses
    pub const PUBLIC_V6: Self = Self(0b0000_0100);
    /// Unique-local IPv6 addresses
    pub const PRIVATE_V6: Self = Self(0b0000_1000);
    /// Probe the externally visible address of private addresses
    pub const LIVE_IP: Self = Self(0b0001_0000);

    /// Both IPv4 classes
    pub const ANY_V4: Self = Self(Self::PUBLIC_V4.0 | Self::PRIVATE_V4.0);
    /// Both IPv6 classes
    pub const ANY_V6: Self = Self(Self::PUBLIC_V6.0 | Self::PRIVATE_V6.0);
    /// Every address family bit
    pub const ALL_FAMILIES: Self = Self(Self::ANY_V4.0 | Self::ANY_V6.0);

    /// Build a mask from raw bits, dropping unknown bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::ALL_FAMILIES.0 | Self::LIVE_IP.0))
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no bit at all is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set in `self`
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Only the address family bits
    #[must_use]
    pub const fn families(self) -> Self {
        Self(self.0 & Self::ALL_FAMILIES.0)
    }

    /// True when at least one address family bit is set
    #[must_use]
    pub const fn has_family(self) -> bool {
        self.families().0 != 0
    }

    /// True when a live probe is requested
    #[must_use]
    pub const fn wants_live(self) -> bool {
        self.contains(Self::LIVE_IP)
    }

    /// Copy with the bits of `other` added
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Copy with the bits of `other` removed
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for WantMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for WantMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for WantMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for WantMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&filter_to_string(*self))
    }
}

fn family_part(mask: WantMask, public: WantMask, private: WantMask, name: &str) -> Option<String> {
    match (mask.contains(public), mask.contains(private)) {
        (true, true) => Some(name.to_string()),
        (true, false) => Some(format!("public {name}")),
        (false, true) => Some(format!("private {name}")),
        (false, false) => None,
    }
}

/// Human readable rendering of the address families in `mask`.
///
/// Examples: `any`, `v4`, `public v6`, `public`, `v4 or private v6`.
/// The live-probe modifier is not rendered.
#[must_use]
pub fn filter_to_string(mask: WantMask) -> String {
    let families = mask.families();
    if families == WantMask::ALL_FAMILIES {
        return "any".to_string();
    }
    if families == WantMask::PUBLIC_V4 | WantMask::PUBLIC_V6 {
        return "public".to_string();
    }
    if families == WantMask::PRIVATE_V4 | WantMask::PRIVATE_V6 {
        return "private".to_string();
    }

    let parts: Vec<String> = [
        family_part(families, WantMask::PUBLIC_V4, WantMask::PRIVATE_V4, "v4"),
        family_part(families, WantMask::PUBLIC_V6, WantMask::PRIVATE_V6, "v6"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "no".to_string()
    } else {
        parts.join(" or ")
    }
}
