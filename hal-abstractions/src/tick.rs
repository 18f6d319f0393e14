//! Periodic hardware tick

/// Periodic interrupt source used to time a measurement window
///
/// The board arms a timer whose interrupt handler forwards each tick to
/// whoever counts them. The main context never counts ticks itself; it parks
/// in [`wait`](Self::wait) between polls of the shared counters.
pub trait TickSource {
    /// Start firing the tick interrupt every `period_ms` milliseconds
    fn arm(&mut self, period_ms: u32);

    /// Stop the tick interrupt. Idempotent.
    fn disarm(&mut self);

    /// Park the main context until an interrupt may have fired
    fn wait(&mut self);
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn arm(&mut self, period_ms: u32) {
        (**self).arm(period_ms)
    }

    fn disarm(&mut self) {
        (**self).disarm()
    }

    fn wait(&mut self) {
        (**self).wait()
    }
}
