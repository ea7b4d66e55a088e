//! Request Serializer
//!
//! FIFO mutual exclusion in front of outbound requests. At most one
//! [`RequestTicket`] is live at a time; tickets are granted strictly in the
//! order `acquire` was called.
//!
//! A waiter dropped before its turn is skipped. A turn granted to a waiter
//! that is dropped before it observed the grant is passed on, because the
//! ticket itself travels through the waiter's channel and releases on drop.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct State {
    busy: bool,
    waiters: VecDeque<oneshot::Sender<RequestTicket>>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
}

impl Inner {
    fn hand_off(self: &Arc<Self>) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            let ticket = RequestTicket {
                serializer: Arc::clone(self),
                released: false,
            };
            match waiter.send(ticket) {
                Ok(()) => return,
                Err(mut unclaimed) => unclaimed.released = true,
            }
        }
        state.busy = false;
    }
}

/// FIFO request serializer, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RequestSerializer {
    inner: Arc<Inner>,
}

impl RequestSerializer {
    /// Create an idle serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for this caller's turn.
    pub async fn acquire(&self) -> RequestTicket {
        loop {
            let turn = {
                let mut state = self.inner.state.lock();
                if !state.busy {
                    state.busy = true;
                    return RequestTicket {
                        serializer: Arc::clone(&self.inner),
                        released: false,
                    };
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                rx
            };

            if let Ok(ticket) = turn.await {
                return ticket;
            }
        }
    }

    /// Hand the turn to the next waiter.
    pub fn release(&self, ticket: RequestTicket) {
        ticket.release();
    }

    /// Whether a ticket is currently granted.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().busy
    }

    /// Callers queued behind the current ticket.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }
}

/// Permission to run one request. Released exactly once, on
/// [`RequestTicket::release`] or drop.
#[derive(Debug)]
#[must_use = "dropping a ticket releases it immediately"]
pub struct RequestTicket {
    serializer: Arc<Inner>,
    released: bool,
}

impl RequestTicket {
    /// Release the ticket.
    pub fn release(mut self) {
        self.released = true;
        self.serializer.hand_off();
    }
}

impl Drop for RequestTicket {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.serializer.hand_off();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    use super::*;

    #[tokio::test]
    async fn first_acquire_is_immediate() {
        let serializer = RequestSerializer::new();

        let ticket = serializer.acquire().await;
        assert!(serializer.is_busy());

        serializer.release(ticket);
        assert!(!serializer.is_busy());
    }

    #[tokio::test]
    async fn tickets_are_granted_in_call_order() {
        let serializer = RequestSerializer::new();
        let granted = Arc::new(Mutex::new(Vec::new()));
        let holder = serializer.acquire().await;

        let mut tasks = Vec::new();
        for id in 0..5 {
            let waiter = serializer.clone();
            let granted = Arc::clone(&granted);
            tasks.push(tokio::spawn(async move {
                let ticket = waiter.acquire().await;
                granted.lock().push(id);
                tokio::task::yield_now().await;
                ticket.release();
            }));
            while serializer.waiting() < id + 1 {
                tokio::task::yield_now().await;
            }
        }

        holder.release();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(*granted.lock(), vec![0, 1, 2, 3, 4]);
        assert!(!serializer.is_busy());
    }

    #[test]
    fn only_one_ticket_is_live() {
        let serializer = RequestSerializer::new();
        let mut first = task::spawn(serializer.acquire());
        let ticket = assert_ready!(first.poll());

        let mut second = task::spawn(serializer.acquire());
        assert_pending!(second.poll());

        drop(ticket);
        assert!(second.is_woken());
        let _ticket = assert_ready!(second.poll());
        assert!(serializer.is_busy());
    }

    #[test]
    fn cancelled_waiter_is_skipped() {
        let serializer = RequestSerializer::new();
        let holder = assert_ready!(task::spawn(serializer.acquire()).poll());

        let mut cancelled = task::spawn(serializer.acquire());
        assert_pending!(cancelled.poll());
        let mut next = task::spawn(serializer.acquire());
        assert_pending!(next.poll());

        drop(cancelled);
        holder.release();

        assert!(next.is_woken());
        let _ticket = assert_ready!(next.poll());
    }

    #[test]
    fn granted_but_unclaimed_turn_passes_on() {
        let serializer = RequestSerializer::new();
        let holder = assert_ready!(task::spawn(serializer.acquire()).poll());

        let mut granted = task::spawn(serializer.acquire());
        assert_pending!(granted.poll());
        let mut next = task::spawn(serializer.acquire());
        assert_pending!(next.poll());

        holder.release();
        assert!(granted.is_woken());
        drop(granted);

        let ticket = assert_ready!(next.poll());
        ticket.release();
        assert!(!serializer.is_busy());
    }
}
