//! Frame fan-out
//!
//! The broadcaster takes frames from the queue one at a time and writes each
//! to every registered viewer as a multipart part. A viewer whose write fails
//! or times out is removed; the others keep receiving.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;

use crate::media::part_header;
use crate::registry::{ClientId, ClientRegistry};

use super::Shared;

/// Result of delivering one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Viewers that received the frame
    pub delivered: usize,
    /// Viewers removed because their write failed
    pub lost: Vec<ClientId>,
    /// Bytes written across all viewers (part headers included)
    pub bytes_sent: u64,
}

/// Write one frame to every registered viewer
///
/// Writes are sequential in registration order. Lost viewers are removed from
/// the registry in a single batch and their sockets shut down afterwards.
pub async fn broadcast_frame(
    registry: &ClientRegistry,
    frame: &Bytes,
    write_timeout: Duration,
) -> BroadcastReport {
    let clients = registry.snapshot().await;
    let header = part_header(frame.len());
    let part_len = (header.len() + frame.len()) as u64;

    let mut report = BroadcastReport::default();

    for client in &clients {
        match client.send_part(&header, frame, write_timeout).await {
            Ok(()) => {
                report.delivered += 1;
                report.bytes_sent += part_len;
            }
            Err(e) => {
                tracing::info!(
                    client_id = client.id(),
                    peer = %client.peer_addr(),
                    frames_sent = client.frames_sent(),
                    error = %e,
                    "Viewer lost"
                );
                report.lost.push(client.id());
            }
        }
    }

    for client in registry.remove(&report.lost).await {
        client.close().await;
    }

    report
}

/// Broadcaster task body; returns once `shutdown` flips to `true`
pub(crate) async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Broadcaster started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        // Frames stay queued until someone is watching.
        if shared.registry.is_empty().await {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shared.registry.registered() => {}
            }
            continue;
        }

        let Some(frame) = shared.queue.take() else {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shared.queue.ready() => {}
            }
            continue;
        };

        // Shutdown cancels a pass in progress
        let report = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            report = broadcast_frame(&shared.registry, &frame, shared.config.write_timeout) => report,
        };

        shared.metrics.add_frames_broadcast(1);
        shared.metrics.add_bytes_sent(report.bytes_sent);
        shared.metrics.add_viewers_dropped(report.lost.len() as u64);

        tracing::trace!(
            size = frame.len(),
            delivered = report.delivered,
            lost = report.lost.len(),
            "Frame broadcast"
        );
    }

    tracing::debug!("Broadcaster stopped");
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use tokio_test::io::Builder;

    use super::*;
    use crate::registry::Client;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50100)
    }

    #[tokio::test]
    async fn test_broadcast_to_all_viewers() {
        let registry = ClientRegistry::new(4);
        let frame = Bytes::from_static(b"\xff\xd8jpeg\xff\xd9");
        let header = part_header(frame.len());

        for _ in 0..2 {
            let mock = Builder::new().write(&header).write(&frame).build();
            registry
                .register(Client::new(registry.next_id(), addr(), mock))
                .await
                .unwrap();
        }

        let report = broadcast_frame(&registry, &frame, TIMEOUT).await;

        assert_eq!(report.delivered, 2);
        assert!(report.lost.is_empty());
        assert_eq!(report.bytes_sent, 2 * (header.len() + frame.len()) as u64);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_viewer_is_removed_others_continue() {
        let registry = ClientRegistry::new(4);
        let frame = Bytes::from_static(b"frame-one");
        let header = part_header(frame.len());

        let healthy = Builder::new().write(&header).write(&frame).build();
        let broken = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();

        let good = registry
            .register(Client::new(registry.next_id(), addr(), healthy))
            .await
            .unwrap();
        let bad = registry
            .register(Client::new(registry.next_id(), addr(), broken))
            .await
            .unwrap();

        let report = broadcast_frame(&registry, &frame, TIMEOUT).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.lost, vec![bad.id()]);

        let remaining = registry.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), good.id());
        assert_eq!(good.frames_sent(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_viewers() {
        let registry = ClientRegistry::new(4);

        let report = broadcast_frame(&registry, &Bytes::from_static(b"x"), TIMEOUT).await;

        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_stalled_viewer_times_out() {
        let registry = ClientRegistry::new(4);
        // Never read, so writes block once the pipe buffer is full
        let (writer, _reader) = tokio::io::duplex(16);
        let stalled = registry
            .register(Client::new(registry.next_id(), addr(), writer))
            .await
            .unwrap();

        let frame = Bytes::from(vec![0u8; 1024]);
        let report = broadcast_frame(&registry, &frame, Duration::from_millis(50)).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.lost, vec![stalled.id()]);
        assert!(registry.is_empty().await);
    }
}
