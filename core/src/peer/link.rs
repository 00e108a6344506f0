use crate::peer::message::PeerAlertMessage;
use crate::prelude::{PipelineError, PipelineResult};
use crate::telemetry::log::LogManager;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Each alert datagram is sent this many times back to back, as
/// redundancy against wireless loss. Duplicates are harmless on the
/// receive side.
pub const SEND_REDUNDANCY: usize = 3;

/// Inbound alert after decode and self-echo suppression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAlert {
    /// First characters of the sender uuid, enough for a UI notice.
    pub sender_short: String,
}

/// Broadcast UDP messaging layer shared by all peers on one port.
///
/// Send and receive use the same socket, bound to the wildcard
/// address with broadcast enabled. Every failure at this boundary is
/// logged and swallowed by the caller; nothing here escalates.
pub struct PeerLink {
    socket: UdpSocket,
    session_uuid: String,
    port: u16,
    target: Option<SocketAddr>,
    logger: LogManager,
}

impl PeerLink {
    /// Binds the shared alert socket. `port` is the well-known peer
    /// port; tests pass 0 for an ephemeral one.
    pub async fn bind(session_uuid: String, port: u16) -> PipelineResult<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            session_uuid,
            port,
            target: None,
            logger: LogManager::new("peer"),
        })
    }

    /// Pins all outbound alerts to one unicast target instead of the
    /// subnet broadcast address. For networks that filter broadcast
    /// traffic, and for loopback tests.
    pub fn set_target(&mut self, target: SocketAddr) {
        self.target = Some(target);
    }

    pub fn session_uuid(&self) -> &str {
        &self.session_uuid
    }

    pub fn local_addr(&self) -> PipelineResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Sends one alert to the subnet broadcast address, repeated
    /// `SEND_REDUNDANCY` times.
    pub async fn send_alert(&self) -> PipelineResult<()> {
        let target = match self.target {
            Some(target) => target,
            None => SocketAddr::new(IpAddr::V4(broadcast_address()), self.port),
        };
        self.send_alert_to(target).await
    }

    /// Send path with an explicit target; the broadcast resolution is
    /// the only difference from `send_alert`.
    pub async fn send_alert_to(&self, target: SocketAddr) -> PipelineResult<()> {
        let message = PeerAlertMessage::alert(&self.session_uuid);
        let payload = message
            .encode()
            .map_err(|e| PipelineError::InvalidInput(format!("encoding alert: {}", e)))?;
        for _ in 0..SEND_REDUNDANCY {
            self.socket.send_to(&payload, target).await?;
        }
        self.logger
            .record(&format!("alert burst of {} sent to {}", SEND_REDUNDANCY, target));
        Ok(())
    }

    /// Decode plus self-echo suppression. Malformed payloads and our
    /// own broadcast echo yield `None`.
    pub fn accept(&self, payload: &[u8]) -> Option<PeerAlert> {
        let message = PeerAlertMessage::decode(payload)?;
        if message.uuid == self.session_uuid {
            return None;
        }
        Some(PeerAlert {
            sender_short: message.short_id(),
        })
    }

    /// Blocks on the socket until a genuine peer alert arrives.
    /// Malformed datagrams and self echoes are dropped silently; a
    /// socket error ends the listener loop upstream.
    pub async fn recv_alert(&self) -> PipelineResult<PeerAlert> {
        let mut buf = [0u8; 1024];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            match self.accept(&buf[..len]) {
                Some(alert) => return Ok(alert),
                None => {
                    self.logger.record("dropped datagram (malformed or own echo)");
                }
            }
        }
    }
}

/// First non-loopback interface carrying an IPv4 broadcast address,
/// falling back to the limited broadcast address when none is found.
/// Enumeration failures also fall back rather than erroring out.
/// `if_addrs` only reports interfaces with configured addresses and
/// exposes no up/down state, so an addressed-but-down interface can
/// still be selected here.
fn broadcast_address() -> Ipv4Addr {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            for interface in interfaces {
                if interface.is_loopback() {
                    continue;
                }
                if let if_addrs::IfAddr::V4(v4) = &interface.addr {
                    if let Some(broadcast) = v4.broadcast {
                        return broadcast;
                    }
                }
            }
            Ipv4Addr::BROADCAST
        }
        Err(_) => Ipv4Addr::BROADCAST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn own_uuid_is_suppressed_and_foreign_uuid_accepted() {
        let link = PeerLink::bind("self-uuid-0001".into(), 0).await.unwrap();

        let own = PeerAlertMessage::alert("self-uuid-0001").encode().unwrap();
        assert!(link.accept(&own).is_none());

        let other = PeerAlertMessage::alert("peer-uuid-0002").encode().unwrap();
        let alert = link.accept(&other).unwrap();
        assert_eq!(alert.sender_short, "peer");

        assert!(link.accept(b"garbage").is_none());
    }

    #[tokio::test]
    async fn listener_skips_own_burst_and_surfaces_peer_alert() {
        let receiver = PeerLink::bind("receiver-uuid".into(), 0).await.unwrap();
        let sender = PeerLink::bind("sender-uuid".into(), 0).await.unwrap();
        let mut target = receiver.local_addr().unwrap();
        target.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));

        // Our own burst first: all three copies must be suppressed.
        receiver.send_alert_to(target).await.unwrap();
        sender.send_alert_to(target).await.unwrap();

        let alert = timeout(Duration::from_secs(5), receiver.recv_alert())
            .await
            .expect("listener timed out")
            .unwrap();
        assert_eq!(alert.sender_short, "send");
    }

    #[tokio::test]
    async fn each_foreign_datagram_dispatches_exactly_once() {
        let receiver = PeerLink::bind("receiver-uuid".into(), 0).await.unwrap();
        let sender = PeerLink::bind("sender-uuid".into(), 0).await.unwrap();
        let mut target = receiver.local_addr().unwrap();
        target.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));

        sender.send_alert_to(target).await.unwrap();

        // One call sends SEND_REDUNDANCY identical datagrams; each is
        // dispatched independently (duplicates are idempotent for the
        // consumer).
        for _ in 0..SEND_REDUNDANCY {
            let alert = timeout(Duration::from_secs(5), receiver.recv_alert())
                .await
                .expect("listener timed out")
                .unwrap();
            assert_eq!(alert.sender_short, "send");
        }
    }
}
