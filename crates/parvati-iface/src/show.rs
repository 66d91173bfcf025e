//! Human readable interface report.

use crate::list::InterfaceList;
use crate::record::AddressRecord;
use crate::trace::{PathTracer, TraceOutcome, find_gateway};
use std::io::{self, Write};
use std::net::IpAddr;
use tracing::warn;

impl InterfaceList {
    /// Write a per-interface report using the list's default filter.
    ///
    /// Interfaces without matching addresses are skipped. NAT'd addresses get
    /// their router address and the traced path to the public address.
    ///
    /// # Errors
    ///
    /// Only write failures are returned; probe and trace failures are rendered.
    pub fn show(&self, w: &mut dyn Write) -> io::Result<()> {
        for iface in self.interfaces() {
            let records = self.filter_interface(iface, self.filter());
            if matches!(&records, Ok(r) if r.is_empty()) {
                continue;
            }

            write!(w, "{}. {}", iface.index, iface.name)?;
            if !iface.hardware_addr.is_empty() {
                write!(w, " [MAC: {}]", iface.hardware_addr)?;
            }
            writeln!(w)?;

            let records = match records {
                Ok(records) => records,
                Err(e) => {
                    writeln!(w, "Could not find addresses: {e}")?;
                    continue;
                }
            };
            for record in &records {
                self.show_record(w, record)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn show_record(&self, w: &mut dyn Write, record: &AddressRecord) -> io::Result<()> {
        let local = record.local_ip;
        if let Some(err) = &record.error {
            return writeln!(w, " - {local} ({err})");
        }
        match (record.remote_ip, record.has_nat()) {
            (Some(public), Some(true)) => {
                write!(w, " - {local}")?;
                match find_gateway(self.hops.as_ref(), local, public, self.hop_timeout) {
                    Ok(gateway) => write!(w, " [Router LAN IP: {gateway}]")?,
                    Err(e) => write!(w, " [Gateway IP detection failed: '{e}']")?,
                }
                let outcome = PathTracer::new(self.hops.as_ref())
                    .timeout(self.hop_timeout)
                    .max_hops(self.max_hops)
                    .run(local, public);
                write_path(w, &outcome, public)?;
                writeln!(w)
            }
            (Some(_), _) => writeln!(w, " - {local} (no-NAT)"),
            (None, _) => writeln!(w, " - {local}"),
        }
    }
}

fn write_path(w: &mut dyn Write, outcome: &TraceOutcome, public: IpAddr) -> io::Result<()> {
    if outcome.hops.is_empty() {
        return match outcome.error() {
            Some(e) => {
                warn!(%public, error = %e, "path trace failed");
                write!(w, " --NAT--> {public} [Error reading route: {e}]")
            }
            None => write!(w, " --NAT--> {public} [No info from traceroute]"),
        };
    }
    for hop in &outcome.hops {
        match hop.ip {
            Some(ip) => write!(w, " --NAT [{:.3} ms]--> {ip}", hop.rtt_ms)?,
            None => write!(w, " --NAT [timed out]--> ???")?,
        }
    }
    if !outcome.found_public() {
        write!(w, " --???--> {public}")?;
    }
    Ok(())
}
