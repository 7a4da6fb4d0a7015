use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{ready, Context, Poll},
};

use futures::{stream::FusedStream, Stream};
use pin_project_lite::pin_project;

use crate::{
    error::{TableError, TableResult},
    id::ScanId,
    result::RowResult,
};

pin_project! {
    /// Pull view over a scan: a lazy, finite, non-restartable sequence of rows.
    ///
    /// The transport fills a bounded buffer and waits while it is full. An
    /// error is yielded once and ends the stream. A scan that ends without
    /// completing, for instance because its driver was dropped, yields
    /// [`TableError::Abandoned`]. Dropping the stream (or calling
    /// [`ScanStream::cancel`]) stops the scan at the next row.
    pub struct ScanStream {
        id: ScanId,
        #[pin]
        rows: flume::r#async::RecvStream<'static, TableResult<RowResult>>,
        completed: Arc<AtomicBool>,
        finished: bool,
    }
}

impl ScanStream {
    pub(crate) fn new(
        id: ScanId,
        receiver: flume::Receiver<TableResult<RowResult>>,
        completed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            rows: receiver.into_stream(),
            completed,
            finished: false,
        }
    }

    /// Identifier of the underlying scan.
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Stop the scan. Equivalent to dropping the stream.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for ScanStream {
    type Item = TableResult<RowResult>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }
        match ready!(this.rows.poll_next(cx)) {
            Some(Ok(row)) => Poll::Ready(Some(Ok(row))),
            Some(Err(error)) => {
                *this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
            None => {
                *this.finished = true;
                if this.completed.load(Ordering::Acquire) {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Err(TableError::Abandoned)))
                }
            }
        }
    }
}

impl FusedStream for ScanStream {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, StreamExt};

    use super::*;
    use crate::{id::ScanIdGenerator, scan::ScanDriver, table_name::TableName};

    fn channel(capacity: usize) -> (ScanDriver, ScanStream) {
        let id = ScanIdGenerator::new().generate();
        let (sender, receiver) = flume::bounded(capacity);
        let completed = Arc::new(AtomicBool::new(false));
        let driver = ScanDriver::for_channel(
            id,
            TableName::new("t").unwrap(),
            sender,
            Arc::clone(&completed),
        );
        (driver, ScanStream::new(id, receiver, completed))
    }

    #[test]
    fn ends_after_first_error() {
        let (sender, receiver) = flume::unbounded();
        sender.send(Ok(RowResult::empty("a"))).unwrap();
        sender.send(Err(TableError::Transport("reset".into()))).unwrap();
        sender.send(Ok(RowResult::empty("b"))).unwrap();

        let stream = ScanStream::new(
            ScanIdGenerator::new().generate(),
            receiver,
            Arc::new(AtomicBool::new(false)),
        );
        let items: Vec<_> = block_on(stream.collect());
        assert_eq!(
            items,
            vec![
                Ok(RowResult::empty("a")),
                Err(TableError::Transport("reset".into()))
            ]
        );
    }

    #[test]
    fn completed_scan_ends_cleanly() {
        let (mut driver, mut stream) = channel(4);
        block_on(async {
            assert!(driver.on_next(RowResult::empty("a")).await);
            driver.on_complete().await;
            assert_eq!(stream.next().await, Some(Ok(RowResult::empty("a"))));
            assert_eq!(stream.next().await, None);
        });
        assert!(stream.is_terminated());
    }

    #[test]
    fn dropped_driver_with_full_buffer_reports_abandonment() {
        let (mut driver, stream) = channel(1);
        assert!(block_on(driver.on_next(RowResult::empty("a"))));
        drop(driver);

        let items: Vec<_> = block_on(stream.collect());
        assert_eq!(
            items,
            vec![Ok(RowResult::empty("a")), Err(TableError::Abandoned)]
        );
    }

    #[test]
    fn dropped_driver_with_room_reports_abandonment_once() {
        let (driver, stream) = channel(4);
        drop(driver);

        let items: Vec<_> = block_on(stream.collect());
        assert_eq!(items, vec![Err(TableError::Abandoned)]);
    }
}
