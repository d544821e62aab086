//! UDP transport receiver.
//!
//! Binds the configured address and delivers whole datagrams to the framer.
//! The wire format is one SBE message per datagram, no length prefix. A
//! multicast group address joins the group on the configured interface in
//! NORMAL mode; unicast addresses (loopback included) bind directly. TESTING
//! mode binds whatever it is given and never attempts a join.
//!
//! The socket blocks with a 100 ms read timeout so the owning thread can poll
//! its shutdown flag between reads.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

use crate::config::{IngestConfig, IngestMode};

/// Read-timeout bounding shutdown latency.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Non-fatal receiver counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverStats {
    pub datagrams: u64,
    pub timeouts: u64,
    pub recv_errors: u64,
}

pub struct UdpReceiver {
    socket: UdpSocket,
    stats: ReceiverStats,
}

impl UdpReceiver {
    /// Bind per the ingest configuration. Bind failures are fatal and
    /// propagate to the caller.
    pub fn bind(cfg: &IngestConfig) -> io::Result<Self> {
        let addr: SocketAddr = cfg
            .bind
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let v4 = match addr {
            SocketAddr::V4(v4) => v4,
            SocketAddr::V6(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "IPv6 bind addresses are not supported",
                ))
            }
        };

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_recv_buffer_size(cfg.recv_buffer_bytes)?;

        let join_group = cfg.mode == IngestMode::Normal && v4.ip().is_multicast();
        let bind_addr = if join_group {
            // Multicast receivers bind the wildcard on the group port.
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), v4.port())
        } else {
            addr
        };
        socket.bind(&bind_addr.into())?;

        if join_group {
            let interface = match &cfg.interface {
                Some(s) => s
                    .parse::<Ipv4Addr>()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
                None => Ipv4Addr::UNSPECIFIED,
            };
            socket.join_multicast_v4(v4.ip(), &interface)?;
            info!(group = %v4.ip(), %interface, "joined multicast group");
        }

        let socket: UdpSocket = socket.into();
        socket.set_read_timeout(Some(READ_TIMEOUT))?;

        info!(bind = %bind_addr, mode = %cfg.mode, "udp receiver bound");
        Ok(Self { socket, stats: ReceiverStats::default() })
    }

    /// Receive one datagram into `buf`.
    ///
    /// `Ok(None)` means the read timed out (poll your shutdown flag and call
    /// again); any other error is the caller's to log and retry with backoff.
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((len, _src)) => {
                self.stats.datagrams += 1;
                Ok(Some(len))
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                self.stats.timeouts += 1;
                Ok(None)
            }
            Err(e) => {
                self.stats.recv_errors += 1;
                Err(e)
            }
        }
    }

    /// The address actually bound (resolves port 0 in tests).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    #[inline]
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    fn testing_config(bind: &str) -> IngestConfig {
        IngestConfig {
            bind: bind.to_string(),
            interface: None,
            recv_buffer_bytes: 4 * 1024 * 1024,
            mode: IngestMode::Testing,
        }
    }

    #[test]
    fn binds_loopback_without_join() {
        let receiver = UdpReceiver::bind(&testing_config("127.0.0.1:0")).unwrap();
        let addr = receiver.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn testing_mode_accepts_multicast_address_without_join() {
        // In TESTING mode a group address binds directly; no IGMP traffic.
        let receiver = UdpReceiver::bind(&testing_config("224.0.0.251:0"));
        // Direct multicast bind is platform-dependent; accept either outcome
        // but never panic.
        drop(receiver);
    }

    #[test]
    fn recv_times_out_quietly() {
        let mut receiver = UdpReceiver::bind(&testing_config("127.0.0.1:0")).unwrap();
        let mut buf = [0u8; 64];
        assert!(receiver.recv(&mut buf).unwrap().is_none());
        assert_eq!(receiver.stats().timeouts, 1);
    }

    #[test]
    fn rejects_garbage_bind() {
        assert!(UdpReceiver::bind(&testing_config("not-an-address")).is_err());
    }
}
