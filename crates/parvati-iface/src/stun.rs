//! Minimal STUN Binding codec (RFC 5389).
//!
//! Only what is needed to learn the externally visible address of a socket:
//! encoding a Binding Request and decoding the MAPPED-ADDRESS or
//! XOR-MAPPED-ADDRESS of the response.

use crate::error::StunError;
use rand::RngCore;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// STUN magic cookie (0x2112A442)
pub(crate) const MAGIC_COOKIE: u32 = 0x2112_A442;

/// STUN message header size (20 bytes)
pub(crate) const HEADER_SIZE: usize = 20;

const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;

const FAMILY_V4: u8 = 0x01;
const FAMILY_V6: u8 = 0x02;

/// STUN message class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunClass {
    /// Request message
    Request,
    /// Indication (no response expected)
    Indication,
    /// Success response
    SuccessResponse,
    /// Error response
    ErrorResponse,
}

impl StunClass {
    const fn bits(self) -> u16 {
        match self {
            Self::Request => 0b00,
            Self::Indication => 0b01,
            Self::SuccessResponse => 0b10,
            Self::ErrorResponse => 0b11,
        }
    }
}

const BINDING: u16 = 0x0001;

/// Encode the Binding method and a class into the 14-bit message type.
///
/// ```text
///  0                 1
///  2  3  4 5 6 7 8 9 0 1 2 3 4 5
/// +--+--+-+-+-+-+-+-+-+-+-+-+-+-+
/// |M |M |M|M|M|C|M|M|M|C|M|M|M|M|
/// |11|10|9|8|7|1|6|5|4|0|3|2|1|0|
/// +--+--+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
fn encode_type(method: u16, class: StunClass) -> u16 {
    let class_bits = class.bits();
    let m0_m3 = method & 0x0F;
    let c0 = (class_bits & 0x01) << 4;
    let m4_m6 = (method & 0x70) << 1;
    let c1 = (class_bits & 0x02) << 7;
    let m7_m11 = (method & 0xF80) << 2;
    m0_m3 | c0 | m4_m6 | c1 | m7_m11
}

fn decode_type(msg_type: u16) -> Result<StunClass, StunError> {
    let c0 = (msg_type >> 4) & 0x01;
    let c1 = (msg_type >> 8) & 0x01;
    let class = match c0 | (c1 << 1) {
        0b00 => StunClass::Request,
        0b01 => StunClass::Indication,
        0b10 => StunClass::SuccessResponse,
        _ => StunClass::ErrorResponse,
    };

    let method = (msg_type & 0x0F) | ((msg_type >> 1) & 0x70) | ((msg_type >> 2) & 0xF80);
    if method != BINDING {
        return Err(StunError::InvalidMessageType);
    }
    Ok(class)
}

/// A Binding message reduced to the fields the probe cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMessage {
    /// Message class
    pub class: StunClass,
    /// Transaction ID (96 bits)
    pub transaction_id: [u8; 12],
    /// XOR-MAPPED-ADDRESS, if present
    pub xor_mapped: Option<SocketAddr>,
    /// Legacy MAPPED-ADDRESS, if present
    pub mapped: Option<SocketAddr>,
}

impl BindingMessage {
    /// New Binding Request with a random transaction ID
    #[must_use]
    pub fn request() -> Self {
        let mut transaction_id = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut transaction_id);
        Self {
            class: StunClass::Request,
            transaction_id,
            xor_mapped: None,
            mapped: None,
        }
    }

    /// Encode to wire bytes. Requests carry no attributes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + 12);
        bytes.extend_from_slice(&encode_type(BINDING, self.class).to_be_bytes());
        bytes.extend_from_slice(&[0u8; 2]);
        bytes.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
        bytes.extend_from_slice(&self.transaction_id);

        if let Some(addr) = self.xor_mapped {
            push_attribute(&mut bytes, ATTR_XOR_MAPPED_ADDRESS, &xor_address(addr, &self.transaction_id));
        }
        if let Some(addr) = self.mapped {
            push_attribute(&mut bytes, ATTR_MAPPED_ADDRESS, &plain_address(addr));
        }

        let len = (bytes.len() - HEADER_SIZE) as u16;
        bytes[2..4].copy_from_slice(&len.to_be_bytes());
        bytes
    }

    /// Decode wire bytes
    ///
    /// # Errors
    ///
    /// Returns [`StunError`] for short messages, a wrong magic cookie, a
    /// non-Binding method or a malformed address attribute.
    pub fn decode(bytes: &[u8]) -> Result<Self, StunError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StunError::MessageTooShort);
        }

        let msg_type = u16::from_be_bytes([bytes[0], bytes[1]]);
        let msg_length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let cookie = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if cookie != MAGIC_COOKIE {
            return Err(StunError::InvalidMagicCookie);
        }
        let class = decode_type(msg_type)?;

        let mut transaction_id = [0u8; 12];
        transaction_id.copy_from_slice(&bytes[8..HEADER_SIZE]);

        let mut message = Self {
            class,
            transaction_id,
            xor_mapped: None,
            mapped: None,
        };

        let end = bytes.len().min(HEADER_SIZE + msg_length);
        let mut offset = HEADER_SIZE;
        while offset + 4 <= end {
            let attr_type = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
            let attr_len = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
            offset += 4;
            if offset + attr_len > end {
                break;
            }
            let value = &bytes[offset..offset + attr_len];
            match attr_type {
                ATTR_XOR_MAPPED_ADDRESS => {
                    message.xor_mapped = Some(decode_address(value, Some(&transaction_id))?);
                }
                ATTR_MAPPED_ADDRESS => {
                    message.mapped = Some(decode_address(value, None)?);
                }
                _ => {}
            }
            // Attributes are padded to a 4-byte boundary
            offset += attr_len + (4 - attr_len % 4) % 4;
        }

        Ok(message)
    }

    /// The reflexive address, preferring XOR-MAPPED-ADDRESS
    #[must_use]
    pub fn mapped_address(&self) -> Option<SocketAddr> {
        self.xor_mapped.or(self.mapped)
    }
}

fn push_attribute(bytes: &mut Vec<u8>, attr_type: u16, value: &[u8]) {
    bytes.extend_from_slice(&attr_type.to_be_bytes());
    bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
    bytes.extend_from_slice(value);
    let padding = (4 - value.len() % 4) % 4;
    bytes.extend(std::iter::repeat_n(0, padding));
}

fn xor_key(transaction_id: &[u8; 12]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    key[4..].copy_from_slice(transaction_id);
    key
}

fn plain_address(addr: SocketAddr) -> Vec<u8> {
    let mut value = vec![0];
    match addr.ip() {
        IpAddr::V4(ip) => {
            value.push(FAMILY_V4);
            value.extend_from_slice(&addr.port().to_be_bytes());
            value.extend_from_slice(&ip.octets());
        }
        IpAddr::V6(ip) => {
            value.push(FAMILY_V6);
            value.extend_from_slice(&addr.port().to_be_bytes());
            value.extend_from_slice(&ip.octets());
        }
    }
    value
}

fn xor_address(addr: SocketAddr, transaction_id: &[u8; 12]) -> Vec<u8> {
    let key = xor_key(transaction_id);
    let mut value = plain_address(addr);
    let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
    value[2..4].copy_from_slice(&port.to_be_bytes());
    for (byte, k) in value[4..].iter_mut().zip(key.iter()) {
        *byte ^= k;
    }
    value
}

fn decode_address(value: &[u8], transaction_id: Option<&[u8; 12]>) -> Result<SocketAddr, StunError> {
    if value.len() < 4 {
        return Err(StunError::InvalidAttribute);
    }
    let family = value[1];
    let mut port = u16::from_be_bytes([value[2], value[3]]);
    let key = transaction_id.map(xor_key);
    if key.is_some() {
        port ^= (MAGIC_COOKIE >> 16) as u16;
    }

    let mut raw = [0u8; 16];
    let len = match family {
        FAMILY_V4 => 4,
        FAMILY_V6 => 16,
        _ => return Err(StunError::InvalidAttribute),
    };
    if value.len() < 4 + len {
        return Err(StunError::InvalidAttribute);
    }
    raw[..len].copy_from_slice(&value[4..4 + len]);
    if let Some(key) = key {
        for (byte, k) in raw[..len].iter_mut().zip(key.iter()) {
            *byte ^= k;
        }
    }

    let ip = if family == FAMILY_V4 {
        IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
    } else {
        IpAddr::V6(Ipv6Addr::from(raw))
    };
    Ok(SocketAddr::new(ip, port))
}
