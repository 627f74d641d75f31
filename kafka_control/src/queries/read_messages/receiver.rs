use crate::models::KafkaMessage;
use crate::queries::read_messages::ReaderEvent;
use anyhow::bail;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Consumer side of a read session. Dropping it stops every reader.
pub struct MessageReceiver {
    rx: Receiver<ReaderEvent>,
    cancellation_token: CancellationToken,
    active_readers: usize,
}

impl MessageReceiver {
    pub(crate) fn new(
        rx: Receiver<ReaderEvent>,
        cancellation_token: CancellationToken,
        active_readers: usize,
    ) -> Self {
        Self {
            rx,
            cancellation_token,
            active_readers,
        }
    }

    /// `Ok(None)` once every reader finished. A reader error cancels the whole session,
    /// messages already buffered stay available through later calls.
    pub async fn next(&mut self) -> Result<Option<KafkaMessage>, anyhow::Error> {
        while self.active_readers > 0 {
            let Some(event) = self.rx.recv().await else {
                let missing = self.active_readers;
                self.active_readers = 0;
                bail!("{} partition readers stopped without finishing", missing)
            };

            match event {
                ReaderEvent::Message(message) => return Ok(Some(message)),
                ReaderEvent::Error(error) => {
                    self.cancellation_token.cancel();
                    return Err(error);
                }
                ReaderEvent::Finished { partition } => {
                    self.active_readers -= 1;
                    debug!(
                        "Reader of partition {} finished, {} left",
                        partition, self.active_readers
                    );
                }
            }
        }

        Ok(None)
    }

    /// Asks every reader to stop and returns without waiting for them.
    pub fn stop(&self) {
        self.cancellation_token.cancel()
    }

    pub fn active_readers(&self) -> usize {
        self.active_readers
    }
}

impl Drop for MessageReceiver {
    fn drop(&mut self) {
        self.cancellation_token.cancel()
    }
}
