//! UDP probes with ICMP reply capture.

use super::{Hop, HopSource};
use crate::error::TraceError;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};
use tracing::trace;

/// First destination port of the classic traceroute range
pub const BASE_PORT: u16 = 33434;

const UDP: u8 = 17;
const PAYLOAD: &[u8] = b"parvati-trace";

/// What an ICMP reply says about a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// A router on the path dropped the probe
    TimeExceeded,
    /// The probe could not be delivered further; the path ends here
    Unreachable,
}

/// Match an ICMP or ICMPv6 packet against a probe sent to `target:port`.
///
/// IPv4 packets from a raw socket start with the IP header; ICMPv6 packets
/// start with the ICMPv6 header.
#[must_use]
pub fn parse_reply(packet: &[u8], target: IpAddr, port: u16) -> Option<ReplyKind> {
    match target {
        IpAddr::V4(target) => parse_v4(packet, target, port),
        IpAddr::V6(target) => parse_v6(packet, target, port),
    }
}

fn parse_v4(packet: &[u8], target: Ipv4Addr, port: u16) -> Option<ReplyKind> {
    let ihl = (*packet.first()? as usize & 0x0f) * 4;
    let icmp = packet.get(ihl..)?;
    let kind = match *icmp.first()? {
        11 => ReplyKind::TimeExceeded,
        3 => ReplyKind::Unreachable,
        _ => return None,
    };
    // 8 byte ICMP header, then the offending IP header
    let inner = icmp.get(8..)?;
    let inner_ihl = (*inner.first()? as usize & 0x0f) * 4;
    if *inner.get(9)? != UDP {
        return None;
    }
    let dst = inner.get(16..20)?;
    if Ipv4Addr::new(dst[0], dst[1], dst[2], dst[3]) != target {
        return None;
    }
    let udp = inner.get(inner_ihl..inner_ihl + 4)?;
    (u16::from_be_bytes([udp[2], udp[3]]) == port).then_some(kind)
}

fn parse_v6(packet: &[u8], target: Ipv6Addr, port: u16) -> Option<ReplyKind> {
    let kind = match *packet.first()? {
        3 => ReplyKind::TimeExceeded,
        1 => ReplyKind::Unreachable,
        _ => return None,
    };
    // 8 byte ICMPv6 header, then the fixed 40 byte IPv6 header
    let inner = packet.get(8..)?;
    if *inner.get(6)? != UDP {
        return None;
    }
    let dst: [u8; 16] = inner.get(24..40)?.try_into().ok()?;
    if Ipv6Addr::from(dst) != target {
        return None;
    }
    let udp = inner.get(40..44)?;
    (u16::from_be_bytes([udp[2], udp[3]]) == port).then_some(kind)
}

/// Traceroute-style hop source: UDP out, raw ICMP in.
///
/// Reading ICMP needs a raw socket, so this needs root or `CAP_NET_RAW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpHopSource;

impl UdpHopSource {
    fn sockets(local: IpAddr) -> io::Result<(UdpSocket, UdpSocket)> {
        let bind: SocketAddr = SocketAddr::new(local, 0);
        let (domain, icmp) = match local {
            IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
            IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
        };

        let sender = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        sender.bind(&bind.into())?;
        let sender: UdpSocket = sender.into();

        let listener = Socket::new(domain, Type::RAW, Some(icmp))?;
        listener.bind(&bind.into())?;
        let listener: UdpSocket = listener.into();
        Ok((sender, listener))
    }

    fn set_hop_limit(sender: &UdpSocket, local: IpAddr, ttl: u8) -> io::Result<()> {
        match local {
            IpAddr::V4(_) => sender.set_ttl(u32::from(ttl)),
            IpAddr::V6(_) => SockRef::from(sender).set_unicast_hops_v6(u32::from(ttl)),
        }
    }

    fn await_reply(
        listener: &UdpSocket,
        target: IpAddr,
        port: u16,
        sent: Instant,
        timeout: Duration,
    ) -> io::Result<Option<(IpAddr, ReplyKind)>> {
        let deadline = sent + timeout;
        let mut buf = [0u8; 1500];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            listener.set_read_timeout(Some(remaining))?;
            match listener.recv_from(&mut buf) {
                Ok((len, from)) => {
                    if let Some(kind) = parse_reply(&buf[..len], target, port) {
                        return Ok(Some((from.ip(), kind)));
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl HopSource for UdpHopSource {
    fn trace(
        &self,
        local: IpAddr,
        target: IpAddr,
        hop_limit: u8,
        timeout: Duration,
    ) -> Result<Vec<Hop>, TraceError> {
        if local.is_ipv4() != target.is_ipv4() {
            return Err(TraceError::FamilyMismatch { local, target });
        }
        let (sender, listener) = Self::sockets(local).map_err(TraceError::from_io)?;

        let mut path = Vec::with_capacity(hop_limit as usize);
        for ttl in 1..=hop_limit {
            let port = BASE_PORT.wrapping_add(u16::from(ttl) - 1);
            Self::set_hop_limit(&sender, local, ttl).map_err(TraceError::from_io)?;

            let sent = Instant::now();
            sender
                .send_to(PAYLOAD, SocketAddr::new(target, port))
                .map_err(TraceError::from_io)?;

            match Self::await_reply(&listener, target, port, sent, timeout).map_err(TraceError::from_io)? {
                Some((from, kind)) => {
                    let rtt_ms = sent.elapsed().as_secs_f64() * 1000.0;
                    trace!(ttl, %from, rtt_ms, ?kind, "hop replied");
                    path.push(Hop::reply(ttl, from, rtt_ms));
                    if kind == ReplyKind::Unreachable || from == target {
                        break;
                    }
                }
                None => {
                    trace!(ttl, "hop timed out");
                    path.push(Hop::timeout(ttl));
                }
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_reply(icmp_type: u8, dst: [u8; 4], port: u16) -> Vec<u8> {
        let mut packet = vec![0u8; 20];
        packet[0] = 0x45;
        packet.extend_from_slice(&[icmp_type, 0, 0, 0, 0, 0, 0, 0]);
        let mut inner = vec![0u8; 20];
        inner[0] = 0x45;
        inner[9] = UDP;
        inner[16..20].copy_from_slice(&dst);
        packet.extend_from_slice(&inner);
        packet.extend_from_slice(&[0x80, 0x00]);
        packet.extend_from_slice(&port.to_be_bytes());
        packet
    }

    #[test]
    fn test_parse_v4_time_exceeded() {
        let target: IpAddr = "203.0.113.5".parse().unwrap();
        let packet = v4_reply(11, [203, 0, 113, 5], BASE_PORT);
        assert_eq!(parse_reply(&packet, target, BASE_PORT), Some(ReplyKind::TimeExceeded));

        let packet = v4_reply(3, [203, 0, 113, 5], BASE_PORT + 2);
        assert_eq!(parse_reply(&packet, target, BASE_PORT + 2), Some(ReplyKind::Unreachable));
    }

    #[test]
    fn test_parse_v4_ignores_other_probes() {
        let target: IpAddr = "203.0.113.5".parse().unwrap();
        let packet = v4_reply(11, [198, 51, 100, 1], BASE_PORT);
        assert_eq!(parse_reply(&packet, target, BASE_PORT), None);
        let packet = v4_reply(11, [203, 0, 113, 5], BASE_PORT + 1);
        assert_eq!(parse_reply(&packet, target, BASE_PORT), None);
        let packet = v4_reply(0, [203, 0, 113, 5], BASE_PORT);
        assert_eq!(parse_reply(&packet, target, BASE_PORT), None);
        assert_eq!(parse_reply(&packet[..30], target, BASE_PORT), None);
    }

    #[test]
    fn test_parse_v6_time_exceeded() {
        let target: Ipv6Addr = "2001:db8::5".parse().unwrap();
        let mut packet = vec![3, 0, 0, 0, 0, 0, 0, 0];
        let mut inner = vec![0u8; 40];
        inner[0] = 0x60;
        inner[6] = UDP;
        inner[24..40].copy_from_slice(&target.octets());
        packet.extend_from_slice(&inner);
        packet.extend_from_slice(&[0x80, 0x00]);
        packet.extend_from_slice(&BASE_PORT.to_be_bytes());
        assert_eq!(
            parse_reply(&packet, IpAddr::V6(target), BASE_PORT),
            Some(ReplyKind::TimeExceeded)
        );
        packet[0] = 1;
        assert_eq!(
            parse_reply(&packet, IpAddr::V6(target), BASE_PORT),
            Some(ReplyKind::Unreachable)
        );
    }

    #[test]
    fn test_family_mismatch() {
        let err = UdpHopSource
            .trace(
                "192.168.1.20".parse().unwrap(),
                "2001:db8::5".parse().unwrap(),
                1,
                Duration::from_millis(10),
            )
            .unwrap_err();
        assert!(matches!(err, TraceError::FamilyMismatch { .. }));
    }
}
