//! Path tracer termination with synthetic hop sources.

use parvati_iface::{
    GatewayError, Hop, HopSource, PathTracer, StopReason, TraceError, find_gateway,
};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

const LOCAL: &str = "192.168.1.20";
const PUBLIC: &str = "203.0.113.5";

/// Replays a fixed path, truncated to the requested hop limit, and records
/// every hop limit it was asked for.
struct Replay {
    path: Vec<Hop>,
    limits: Mutex<Vec<u8>>,
}

impl Replay {
    fn new(path: Vec<Hop>) -> Self {
        Self {
            path,
            limits: Mutex::new(Vec::new()),
        }
    }

    fn limits(&self) -> Vec<u8> {
        self.limits.lock().unwrap().clone()
    }
}

impl HopSource for Replay {
    fn trace(
        &self,
        _local: IpAddr,
        _target: IpAddr,
        hop_limit: u8,
        timeout: Duration,
    ) -> Result<Vec<Hop>, TraceError> {
        assert_eq!(timeout, Duration::from_millis(500));
        self.limits.lock().unwrap().push(hop_limit);
        Ok(self.path.iter().take(hop_limit as usize).cloned().collect())
    }
}

#[test]
fn test_stops_when_public_address_answers() {
    let path = vec![
        Hop::reply(1, ip("192.168.1.1"), 0.4),
        Hop::reply(2, ip("100.64.0.1"), 3.1),
        Hop::reply(3, ip("198.51.100.1"), 7.9),
        Hop::reply(4, ip("198.51.100.77"), 9.0),
        Hop::reply(5, ip(PUBLIC), 9.5),
        Hop::reply(6, ip("198.51.100.99"), 11.0),
    ];
    let source = Replay::new(path);
    let outcome = PathTracer::new(&source).run(ip(LOCAL), ip(PUBLIC));

    assert!(outcome.found_public());
    assert_eq!(outcome.hops.len(), 5);
    assert_eq!(outcome.hops[4].ip, Some(ip(PUBLIC)));
    assert_eq!(source.limits(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_stops_after_three_timeouts() {
    let path = vec![
        Hop::reply(1, ip("192.168.1.1"), 0.4),
        Hop::reply(2, ip("100.64.0.1"), 3.1),
        Hop::timeout(3),
        Hop::timeout(4),
        Hop::timeout(5),
        Hop::reply(6, ip(PUBLIC), 20.0),
    ];
    let source = Replay::new(path);
    let outcome = PathTracer::new(&source).run(ip(LOCAL), ip(PUBLIC));

    assert!(!outcome.found_public());
    assert!(matches!(outcome.reason, StopReason::TimeoutRun));
    assert_eq!(outcome.hops.len(), 5);
    assert_eq!(source.limits(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_keeps_longest_path_when_progress_stops() {
    let path = vec![
        Hop::reply(1, ip("192.168.1.1"), 0.4),
        Hop::reply(2, ip("100.64.0.1"), 3.1),
    ];
    let source = Replay::new(path);
    let outcome = PathTracer::new(&source).run(ip(LOCAL), ip(PUBLIC));

    assert!(matches!(outcome.reason, StopReason::NoProgress));
    assert_eq!(outcome.hops.len(), 2);
    assert_eq!(source.limits(), vec![1, 2, 3]);
}

struct FailsAt(u8);

impl HopSource for FailsAt {
    fn trace(
        &self,
        _local: IpAddr,
        _target: IpAddr,
        hop_limit: u8,
        _timeout: Duration,
    ) -> Result<Vec<Hop>, TraceError> {
        if hop_limit >= self.0 {
            return Err(TraceError::Permission);
        }
        Ok((1..=hop_limit)
            .map(|ttl| Hop::reply(ttl, ip(&format!("10.0.0.{ttl}")), 1.0))
            .collect())
    }
}

#[test]
fn test_error_stops_immediately_keeping_best_path() {
    let source = FailsAt(3);
    let outcome = PathTracer::new(&source).run(ip(LOCAL), ip(PUBLIC));
    assert!(matches!(outcome.error(), Some(TraceError::Permission)));
    assert_eq!(outcome.hops.len(), 2);
    assert!(!outcome.found_public());
}

#[test]
fn test_gateway_detection_failure_is_independent() {
    let source = FailsAt(1);
    let err = find_gateway(&source, ip(LOCAL), ip(PUBLIC), Duration::from_millis(500)).unwrap_err();
    assert!(matches!(err, GatewayError::Trace(TraceError::Permission)));
}
