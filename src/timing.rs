//! Request timing collection
//!
//! Wall-clock durations for the measured phases of a proxied request. Each
//! value belongs to exactly one request; there is no shared stopwatch, so
//! independent client instances never observe each other's timings.

use std::future::Future;
use std::time::{Duration, Instant};

/// Elapsed durations for the phases of a single proxied request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    /// Time spent opening the TCP connection to the proxy.
    ///
    /// Exactly zero when an existing keep-alive connection was reused.
    pub connect: Duration,
    /// Time from sending the request until the first response byte arrived
    pub first_byte: Duration,
    /// Time from sending the request until the response was fully decoded
    pub total: Duration,
}

impl Timings {
    /// Connect time in whole milliseconds
    pub fn connect_ms(&self) -> u128 {
        self.connect.as_millis()
    }

    /// First-byte time in whole milliseconds
    pub fn first_byte_ms(&self) -> u128 {
        self.first_byte.as_millis()
    }

    /// Total response time in whole milliseconds
    pub fn total_ms(&self) -> u128 {
        self.total.as_millis()
    }
}

/// Run a future and return its output together with the elapsed wall time
pub async fn timed<F: Future>(future: F) -> (F::Output, Duration) {
    let started = Instant::now();
    let output = future.await;
    (output, started.elapsed())
}
