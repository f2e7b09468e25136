use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Per-call state shared between the transport and the dispatcher.
///
/// The transport trips the flag when the caller goes away or a deadline
/// passes; the dispatcher refuses to invoke a receiver once it is set.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns a guard that cancels this context when dropped.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop {
            context: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct CancelOnDrop {
    context: CallContext,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.context.cancel();
    }
}
