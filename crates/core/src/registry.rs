use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::UserIdentity;

/// Tracks at most one active invocation per identity.
///
/// A new `acquire` for an identity cancels the current holder and waits for its ticket to be
/// dropped before installing itself. The wait is bounded by the grace period; a holder that
/// does not exit in time is detached and left to finish on its own, and its later release
/// leaves the newer entry untouched.
#[derive(Clone)]
pub struct SupersessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    slots: Mutex<HashMap<UserIdentity, Slot>>,
    grace_period: Duration,
}

struct Slot {
    /// Serializes acquires for one identity across the cancel-and-wait step.
    gate: Arc<AsyncMutex<()>>,
    active: Option<ActiveEntry>,
}

struct ActiveEntry {
    ticket_id: Uuid,
    cancel: CancellationToken,
    /// Cancelled when the holder's ticket is dropped.
    exited: CancellationToken,
}

/// Proof of being the active invocation for an identity. Dropping it releases the entry.
pub struct Ticket {
    id: Uuid,
    identity: UserIdentity,
    cancel: CancellationToken,
    registry: Arc<RegistryInner>,
    _exit: DropGuard,
}

impl Default for SupersessionRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GRACE_PERIOD)
    }
}

impl SupersessionRegistry {
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

    pub fn new(grace_period: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                slots: Mutex::new(HashMap::new()),
                grace_period,
            }),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.inner.grace_period
    }

    /// Become the active invocation for `identity`, superseding the current one.
    pub async fn acquire(&self, identity: UserIdentity) -> Ticket {
        // declared first so it runs after `gate` and `_serial` are gone
        let _prune = SlotPruner {
            inner: &self.inner,
            identity: identity.clone(),
        };
        let gate = {
            let mut slots = self.inner.slots();
            Arc::clone(&slots.entry(identity.clone()).or_insert_with(Slot::new).gate)
        };
        let _serial = gate.lock().await;

        let prior = {
            let slots = self.inner.slots();
            slots
                .get(&identity)
                .and_then(|slot| slot.active.as_ref())
                .map(|e| (e.ticket_id, e.cancel.clone(), e.exited.clone()))
        };

        if let Some((prior_id, cancel, exited)) = prior {
            cancel.cancel();
            match tokio::time::timeout(self.inner.grace_period, exited.cancelled()).await {
                Ok(()) => debug!(user_id = %identity, %prior_id, "superseded invocation exited"),
                Err(_) => warn!(
                    user_id = %identity,
                    %prior_id,
                    grace_ms = self.inner.grace_period.as_millis() as u64,
                    "superseded invocation ignored cancellation; detaching it"
                ),
            }
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let exited = CancellationToken::new();
        {
            let mut slots = self.inner.slots();
            let slot = slots
                .entry(identity.clone())
                .or_insert_with(|| Slot::with_gate(Arc::clone(&gate)));
            slot.active = Some(ActiveEntry {
                ticket_id: id,
                cancel: cancel.clone(),
                exited: exited.clone(),
            });
        }
        debug!(user_id = %identity, ticket_id = %id, "invocation registered");

        Ticket {
            id,
            identity,
            cancel,
            registry: Arc::clone(&self.inner),
            _exit: exited.drop_guard(),
        }
    }

    /// Release `ticket`. Equivalent to dropping it.
    pub fn release(&self, ticket: Ticket) {
        drop(ticket);
    }

    pub fn is_active(&self, identity: &UserIdentity) -> bool {
        self.active_ticket(identity).is_some()
    }

    pub fn active_ticket(&self, identity: &UserIdentity) -> Option<Uuid> {
        self.inner
            .slots()
            .get(identity)
            .and_then(|slot| slot.active.as_ref())
            .map(|e| e.ticket_id)
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .slots()
            .values()
            .filter(|slot| slot.active.is_some())
            .count()
    }
}

impl RegistryInner {
    fn slots(&self) -> MutexGuard<'_, HashMap<UserIdentity, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compare-and-remove: only clears the entry if it still belongs to `ticket_id`.
    fn release(&self, identity: &UserIdentity, ticket_id: Uuid) -> bool {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(identity) else {
            return false;
        };

        let owned = slot
            .active
            .as_ref()
            .is_some_and(|e| e.ticket_id == ticket_id);
        if owned {
            slot.active = None;
        }

        Self::prune(&mut slots, identity);
        owned
    }

    /// Drops the slot when nobody is active and nobody is waiting on the gate.
    fn prune(slots: &mut HashMap<UserIdentity, Slot>, identity: &UserIdentity) {
        let idle = slots
            .get(identity)
            .is_some_and(|slot| slot.active.is_none() && Arc::strong_count(&slot.gate) == 1);
        if idle {
            slots.remove(identity);
        }
    }
}

/// Cleans up after an `acquire` that was dropped before installing its entry.
struct SlotPruner<'a> {
    inner: &'a RegistryInner,
    identity: UserIdentity,
}

impl Drop for SlotPruner<'_> {
    fn drop(&mut self) {
        RegistryInner::prune(&mut self.inner.slots(), &self.identity);
    }
}

impl Slot {
    fn new() -> Self {
        Self::with_gate(Arc::new(AsyncMutex::new(())))
    }

    fn with_gate(gate: Arc<AsyncMutex<()>>) -> Self {
        Self { gate, active: None }
    }
}

impl Ticket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once a newer invocation for the same identity supersedes this one.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.registry.release(&self.identity, self.id) {
            debug!(user_id = %self.identity, ticket_id = %self.id, "invocation released");
        } else {
            debug!(
                user_id = %self.identity,
                ticket_id = %self.id,
                "stale ticket dropped; newer invocation left in place"
            );
        }
    }
}
