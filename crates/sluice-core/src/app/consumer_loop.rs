//! ConsumerLoop - ブローカーから fetch して共有チャネルへ流す
//!
//! Fetch failures are treated as transient broker faults and retried forever
//! with a capped doubling backoff. The loop ends only on cancellation or when
//! the client reports it is closed; either way the channel is closed on exit
//! so workers see end-of-stream.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::status::ProcessorStats;
use crate::domain::{QueueError, QueueMessage};
use crate::ports::QueueClient;
use crate::retry::Backoff;

pub(crate) async fn consume_with_retry(
    queue: Arc<dyn QueueClient>,
    messages: async_channel::Sender<QueueMessage>,
    stats: Arc<ProcessorStats>,
    reconnect_seed: Duration,
    reconnect_max: Duration,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(reconnect_seed, reconnect_max);

    loop {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fetched = queue.fetch() => fetched,
        };

        match fetched {
            Ok(message) => {
                backoff.reset();
                // channel が満杯でも shutdown には反応する
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = messages.send(message) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(QueueError::Closed) => {
                info!("queue client closed, consumer loop exiting");
                break;
            }
            Err(err) => {
                stats.record_fetch_failure();
                let delay = backoff.next_delay();
                warn!(error = %err, retry_in = ?delay, "queue fetch failed, retrying");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    // the only sender: closing here lets workers drain what is buffered and exit
    messages.close();
    debug!("consumer loop stopped");
}
