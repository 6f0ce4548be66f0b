//! Asynchronous lease streams.
//!
//! [`LeaseStream`] runs the lexer → parser pipeline on Tokio's blocking pool
//! and hands records to the consumer one at a time over a channel of
//! capacity one, so a producer is never more than a record ahead of its
//! consumer and the file is never buffered whole.
//!
//! Dropping or [closing](LeaseStream::close) the stream cancels the parse:
//! the producer notices at its next handoff, stops reading and releases
//! its input.

use std::io::Read;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::lease::{LeaseV4, LeaseV6};
use crate::parser::{parse_v4, parse_v6};

/// Records in flight between the parser and the consumer.
const HANDOFF_CAPACITY: usize = 1;

/// An ordered, single-consumer stream of parsed lease records.
///
/// Must be created from within a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use dhcpd_leases::{Config, LeaseStream};
///
/// # async fn example() -> dhcpd_leases::Result<()> {
/// let file = std::fs::File::open("/var/lib/dhcp/dhcpd.leases")?;
/// let mut leases = LeaseStream::v4(file, Config::default());
/// while let Some(lease) = leases.next().await {
///     println!("{}", lease?.ip);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LeaseStream<T> {
    receiver: mpsc::Receiver<Result<T>>,
}

impl LeaseStream<LeaseV4> {
    /// Streams the leases of a `dhcpd.leases` database.
    pub fn v4<R>(input: R, config: Config) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::spawn(move || parse_v4(input, &config))
    }
}

impl LeaseStream<LeaseV6> {
    /// Streams the leases of a `dhcpd6.leases` database.
    pub fn v6<R>(input: R, config: Config) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::spawn(move || parse_v6(input, &config))
    }
}

impl<T: Send + 'static> LeaseStream<T> {
    fn spawn<F, P>(parser: F) -> Self
    where
        F: FnOnce() -> P + Send + 'static,
        P: Iterator<Item = Result<T>>,
    {
        let (sender, receiver) = mpsc::channel(HANDOFF_CAPACITY);
        tokio::task::spawn_blocking(move || {
            for item in parser() {
                if sender.blocking_send(item).is_err() {
                    debug!("Lease stream consumer went away, stopping parse");
                    return;
                }
            }
        });
        Self { receiver }
    }

    /// Receives the next record, or `None` once the stream is exhausted.
    ///
    /// An `Err` item is always the last one.
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.receiver.recv().await
    }

    /// Stops the parse. Records already handed off can still be received.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    const LEASE_BLOCK: &[u8] = b"lease 10.0.0.1 { binding state active; }\n";

    /// Reader producing lease blocks forever; records when it is dropped.
    struct EndlessLeases {
        offset: usize,
        dropped: Arc<AtomicBool>,
    }

    impl Read for EndlessLeases {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let remaining = &LEASE_BLOCK[self.offset..];
            let count = remaining.len().min(buf.len());
            buf[..count].copy_from_slice(&remaining[..count]);
            self.offset = (self.offset + count) % LEASE_BLOCK.len();
            Ok(count)
        }
    }

    impl Drop for EndlessLeases {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    async fn wait_for(flag: &AtomicBool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !flag.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("producer did not release its input");
    }

    #[tokio::test]
    async fn test_stream_yields_leases_in_order() {
        let input = "lease 10.0.0.1 { }\nlease 10.0.0.2 { }\nlease 10.0.0.3 { }\n";
        let mut stream = LeaseStream::v4(input.as_bytes(), Config::default());

        let mut ips = Vec::new();
        while let Some(lease) = stream.next().await {
            ips.push(lease.unwrap().ip);
        }
        assert_eq!(
            ips,
            [
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_ends_with_error() {
        let input = "lease 10.0.0.1 { }\n}\n";
        let mut stream = LeaseStream::v4(input.as_bytes(), Config::default());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(stream.next().await, Some(Err(Error::Parse(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_v6_stream() {
        let input = r#"ia-na "\276\257\244\320\000\003\000\001 \311\320\244\257\276" {
  iaaddr 2001:db8::1 { max-life 600; }
}
"#;
        let mut stream = LeaseStream::v6(input.as_bytes(), Config::default());
        let lease = stream.next().await.unwrap().unwrap();
        assert_eq!(lease.addresses.len(), 1);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_producer() {
        let dropped = Arc::new(AtomicBool::new(false));
        let input = EndlessLeases {
            offset: 0,
            dropped: Arc::clone(&dropped),
        };
        let mut stream = LeaseStream::v4(input, Config::default());
        for _ in 0..3 {
            let lease = stream.next().await.unwrap().unwrap();
            assert_eq!(lease.binding_state.as_deref(), Some("active"));
        }

        drop(stream);
        wait_for(&dropped).await;
    }

    #[tokio::test]
    async fn test_close_stops_producer() {
        let dropped = Arc::new(AtomicBool::new(false));
        let input = EndlessLeases {
            offset: 0,
            dropped: Arc::clone(&dropped),
        };
        let mut stream = LeaseStream::v4(input, Config::default());
        assert!(stream.next().await.is_some());

        stream.close();
        wait_for(&dropped).await;
    }
}
