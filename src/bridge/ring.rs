use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

/// Shared state of one receive session: the sample ring, the overrun counter and the
/// shutdown flag.
///
/// The ring holds `N - 1` samples. When it is full, the newest samples are dropped and
/// counted as overruns.
///
/// # Example
/// ```ignore
/// let mut session: ScanSession<i8, 4096> = ScanSession::new();
/// let (sink, source, shutdown) = session.split();
/// ```
pub struct ScanSession<S, const N: usize> {
    queue: Queue<S, N>,
    overruns: AtomicUsize,
    shutdown: AtomicBool,
}

impl<S, const N: usize> fmt::Debug for ScanSession<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("len", &self.queue.len())
            .field("overruns", &self.overruns.load(Ordering::Relaxed))
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

impl<S, const N: usize> Default for ScanSession<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, const N: usize> ScanSession<S, N> {
    /// An empty session.
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            overruns: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Splits the session into its producer, consumer and shutdown handles.
    pub fn split(&mut self) -> (SampleSink<'_, S, N>, SampleSource<'_, S, N>, ShutdownFlag<'_>) {
        let (producer, consumer) = self.queue.split();
        (
            SampleSink {
                producer,
                overruns: &self.overruns,
            },
            SampleSource {
                consumer,
                overruns: &self.overruns,
            },
            ShutdownFlag(&self.shutdown),
        )
    }
}

/// Producer side, fed from the backend's RX callback.
pub struct SampleSink<'a, S, const N: usize> {
    producer: Producer<'a, S, N>,
    overruns: &'a AtomicUsize,
}

impl<S, const N: usize> fmt::Debug for SampleSink<'_, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleSink")
            .field("overruns", &self.overruns.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S: Copy, const N: usize> SampleSink<'_, S, N> {
    /// Queues as many of `samples` as fit and returns how many were accepted.
    ///
    /// The rest are dropped and added to the overrun count.
    pub fn push_samples(&mut self, samples: &[S]) -> usize {
        let mut accepted = 0;
        for &sample in samples {
            if self.producer.enqueue(sample).is_err() {
                break;
            }
            accepted += 1;
        }
        let dropped = samples.len() - accepted;
        if dropped > 0 {
            // only the sink writes the counter
            let total = self.overruns.load(Ordering::Relaxed) + dropped;
            self.overruns.store(total, Ordering::Relaxed);
            warn!("ring full, dropped {} samples", dropped);
        }
        accepted
    }
}

/// Consumer side, drained by the processing loop.
pub struct SampleSource<'a, S, const N: usize> {
    consumer: Consumer<'a, S, N>,
    overruns: &'a AtomicUsize,
}

impl<S, const N: usize> fmt::Debug for SampleSource<'_, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleSource")
            .field("len", &self.consumer.len())
            .field("overruns", &self.overruns.load(Ordering::Relaxed))
            .finish()
    }
}

impl<S: Copy, const N: usize> SampleSource<'_, S, N> {
    /// Takes one sample, or `WouldBlock` if the ring is empty.
    pub fn read(&mut self) -> nb::Result<S, Infallible> {
        self.consumer.dequeue().ok_or(nb::Error::WouldBlock)
    }

    /// Drains up to `buf.len()` samples into `buf` and returns how many were copied.
    pub fn read_into(&mut self, buf: &mut [S]) -> usize {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.read() {
                Ok(sample) => *slot = sample,
                Err(_) => break,
            }
            n += 1;
        }
        n
    }

    /// Samples currently queued.
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples dropped so far because the ring was full.
    pub fn overruns(&self) -> usize {
        self.overruns.load(Ordering::Relaxed)
    }
}

/// Cooperative stop request, shared between a signal handler and the loops.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownFlag<'a>(&'a AtomicBool);

impl ShutdownFlag<'_> {
    /// Asks every loop holding this flag to stop after its current iteration.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_empty_would_block() {
        let mut session: ScanSession<i8, 8> = ScanSession::new();
        let (_sink, mut source, _) = session.split();
        assert_eq!(source.read(), Err(nb::Error::WouldBlock));
        assert!(source.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let mut session: ScanSession<i8, 8> = ScanSession::new();
        let (mut sink, mut source, _) = session.split();
        assert_eq!(sink.push_samples(&[1, -2, 3]), 3);
        assert_eq!(source.len(), 3);
        assert_eq!(nb::block!(source.read()), Ok(1));
        let mut buf = [0i8; 4];
        assert_eq!(source.read_into(&mut buf), 2);
        assert_eq!(buf[..2], [-2, 3]);
    }

    #[test]
    fn test_overflow_drops_newest_and_counts() {
        let mut session: ScanSession<i16, 8> = ScanSession::new();
        let (mut sink, mut source, _) = session.split();
        let samples: Vec<i16> = (0..10).collect();
        assert_eq!(sink.push_samples(&samples), 7);
        assert_eq!(source.overruns(), 3);

        let mut buf = [0i16; 10];
        assert_eq!(source.read_into(&mut buf), 7);
        assert_eq!(buf[..7], [0, 1, 2, 3, 4, 5, 6]);

        assert_eq!(sink.push_samples(&samples[..8]), 7);
        assert_eq!(source.overruns(), 4);
    }

    #[test]
    fn test_shutdown_flag_is_shared() {
        let mut session: ScanSession<i8, 4> = ScanSession::new();
        let (_, _, shutdown) = session.split();
        let copy = shutdown;
        assert!(!shutdown.is_requested());
        copy.request();
        assert!(shutdown.is_requested());
    }
}
