//! Causality tracking for nested calls
//!
//! Decoding an ORPCTHIS records its causality id as the inbound call id of
//! the current thread. While that id is set, every ORPCTHIS encoded on the
//! same thread carries it instead of its own id, so a callback made while
//! servicing a call stays in that call's chain. Threads servicing unrelated
//! chains never observe each other's id.
//!
//! The id stays set until it is cleared or a [`CausalityScope`] that was
//! entered earlier is dropped. Code that services inbound calls on a thread
//! pool should run each call inside a scope.

use std::cell::Cell;
use tracing::trace;
use uuid::Uuid;

thread_local! {
    static INBOUND: Cell<Option<Uuid>> = const { Cell::new(None) };
}

/// Causality id of the inbound call being serviced on this thread
pub fn current_inbound() -> Option<Uuid> {
    INBOUND.with(|c| c.get())
}

pub(crate) fn set_inbound(causality_id: Uuid) {
    trace!(%causality_id, "recording inbound causality id");
    INBOUND.with(|c| c.set(Some(causality_id)));
}

/// Forget the inbound causality id of this thread
pub fn clear() {
    INBOUND.with(|c| c.set(None));
}

/// Restores the thread's inbound causality id when dropped
///
/// ```
/// use dcom_orpc::causality::{self, CausalityScope};
///
/// {
///     let _scope = CausalityScope::enter();
///     // decode the inbound ORPCTHIS, make nested calls ...
/// }
/// assert_eq!(causality::current_inbound(), None);
/// ```
#[must_use = "the previous causality id is restored when the scope is dropped"]
pub struct CausalityScope {
    previous: Option<Uuid>,
}

impl CausalityScope {
    /// Start a call-chain boundary with no inbound id
    pub fn enter() -> Self {
        let previous = INBOUND.with(|c| c.replace(None));
        Self { previous }
    }

    /// Start a call-chain boundary servicing `causality_id`
    pub fn with_inbound(causality_id: Uuid) -> Self {
        let previous = INBOUND.with(|c| c.replace(Some(causality_id)));
        Self { previous }
    }
}

impl Drop for CausalityScope {
    fn drop(&mut self) {
        INBOUND.with(|c| c.set(self.previous));
    }
}
