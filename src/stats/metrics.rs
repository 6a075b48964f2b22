//! Statistics and metrics for the MJPEG server

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Live counters updated by the acceptor, broadcaster and producer
///
/// All counters are relaxed atomics; they are diagnostics, not
/// synchronization.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    frames_queued: AtomicU64,
    frames_dropped: AtomicU64,
    frames_rejected: AtomicU64,
    frames_broadcast: AtomicU64,
    bytes_sent: AtomicU64,
    connections_accepted: AtomicU64,
    viewers_admitted: AtomicU64,
    auth_failures: AtomicU64,
    bad_requests: AtomicU64,
    busy_rejections: AtomicU64,
    viewers_dropped: AtomicU64,
    started_at: Mutex<Option<Instant>>,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        pub fn $inc(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(add_frames_queued, frames_queued);
    counter!(add_frames_dropped, frames_dropped);
    counter!(add_frames_rejected, frames_rejected);
    counter!(add_frames_broadcast, frames_broadcast);
    counter!(add_bytes_sent, bytes_sent);
    counter!(add_connections_accepted, connections_accepted);
    counter!(add_viewers_admitted, viewers_admitted);
    counter!(add_auth_failures, auth_failures);
    counter!(add_bad_requests, bad_requests);
    counter!(add_busy_rejections, busy_rejections);
    counter!(add_viewers_dropped, viewers_dropped);

    /// Mark the server as started (resets uptime)
    pub fn mark_started(&self) {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Mark the server as stopped
    pub fn mark_stopped(&self) {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self, active_viewers: usize, queued_frames: usize) -> ServerStats {
        let started_at = *self.started_at.lock().unwrap_or_else(|e| e.into_inner());
        let uptime = started_at.map(|t| t.elapsed()).unwrap_or_default();

        ServerStats {
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            viewers_admitted: self.viewers_admitted.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            bad_requests: self.bad_requests.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            viewers_dropped: self.viewers_dropped.load(Ordering::Relaxed),
            active_viewers: active_viewers as u64,
            queued_frames: queued_frames as u64,
            uptime,
        }
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Frames accepted by `put_frame`
    pub frames_queued: u64,
    /// Frames discarded by the drop-oldest policy
    pub frames_dropped: u64,
    /// Empty frames ignored
    pub frames_rejected: u64,
    /// Frames taken from the queue and fanned out
    pub frames_broadcast: u64,
    /// Total bytes written to viewers (part headers included)
    pub bytes_sent: u64,
    /// TCP connections accepted
    pub connections_accepted: u64,
    /// Connections promoted to streaming viewers
    pub viewers_admitted: u64,
    /// Requests answered with 401 after presenting credentials
    pub auth_failures: u64,
    /// Requests answered with 400
    pub bad_requests: u64,
    /// Connections refused with 503 because the viewer limit was reached
    pub busy_rejections: u64,
    /// Viewers removed after a failed write
    pub viewers_dropped: u64,
    /// Viewers currently registered
    pub active_viewers: u64,
    /// Frames currently waiting in the queue
    pub queued_frames: u64,
    /// Time since `start()`, zero when stopped
    pub uptime: Duration,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average outgoing bitrate since start (bits/sec)
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }

    /// Average broadcast framerate since start
    pub fn framerate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_broadcast as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_stats_new() {
        let stats = ServerStats::new();
        assert_eq!(stats.frames_queued, 0);
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.active_viewers, 0);
        assert_eq!(stats.uptime, Duration::ZERO);
    }

    #[test]
    fn test_counters() {
        let metrics = ServerMetrics::new();

        metrics.add_frames_queued(3);
        metrics.add_frames_dropped(1);
        metrics.add_bytes_sent(1500);
        metrics.add_viewers_admitted(2);
        metrics.add_viewers_dropped(1);

        let stats = metrics.snapshot(1, 2);
        assert_eq!(stats.frames_queued, 3);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.bytes_sent, 1500);
        assert_eq!(stats.viewers_admitted, 2);
        assert_eq!(stats.viewers_dropped, 1);
        assert_eq!(stats.active_viewers, 1);
        assert_eq!(stats.queued_frames, 2);
    }

    #[test]
    fn test_uptime_only_while_started() {
        let metrics = ServerMetrics::new();
        assert_eq!(metrics.snapshot(0, 0).uptime, Duration::ZERO);

        metrics.mark_started();
        std::thread::sleep(Duration::from_millis(5));
        assert!(metrics.snapshot(0, 0).uptime >= Duration::from_millis(5));

        metrics.mark_stopped();
        assert_eq!(metrics.snapshot(0, 0).uptime, Duration::ZERO);
    }

    #[test]
    fn test_bitrate() {
        let stats = ServerStats {
            bytes_sent: 1_000_000,
            uptime: Duration::from_secs(10),
            ..ServerStats::default()
        };

        // 1,000,000 bytes * 8 bits / 10 seconds = 800,000 bps
        assert_eq!(stats.bitrate(), 800_000);
    }

    #[test]
    fn test_bitrate_zero_duration() {
        let stats = ServerStats {
            bytes_sent: 1_000_000,
            ..ServerStats::default()
        };

        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_framerate() {
        let stats = ServerStats {
            frames_broadcast: 300,
            uptime: Duration::from_secs(10),
            ..ServerStats::default()
        };

        assert!((stats.framerate() - 30.0).abs() < f64::EPSILON);
    }
}
