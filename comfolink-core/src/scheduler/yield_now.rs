//! The scheduler's only true suspension primitive.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

/// Return control to the scheduler for one tick.
///
/// The awaiting task is parked until the host's next poll call resumes
/// it. Every other await in the driver is ordinary nested composition
/// that resolves within the current tick unless it bottoms out here.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::task::Waker;

    #[test]
    fn test_yield_now_suspends_exactly_once() {
        let mut cx = Context::from_waker(Waker::noop());
        let mut future = yield_now();
        let mut pinned = Pin::new(&mut future);

        assert!(pinned.as_mut().poll(&mut cx).is_pending());
        assert!(pinned.as_mut().poll(&mut cx).is_ready());
    }
}
