//! Cart synchronizer.
//!
//! Keeps the local [`CartSnapshot`] consistent with what the user just did
//! while converging with the remote cart.
//!
//! # Quantity edits
//!
//! [`CartSynchronizer::update_quantity`] changes the local line immediately
//! and schedules a remote sync for that line after a quiet period. A newer
//! edit to the same line cancels the scheduled job; edits to other lines are
//! independent. Once a job has woken up and claimed its slot it can no longer
//! be cancelled and runs to completion.
//!
//! A sync writes with `PUT /cart/item/:id`. When that is rejected or fails,
//! it falls back to `DELETE` followed by `POST` with the new quantity. If the
//! sync fails for good the local edit is kept and the failure is logged.
//!
//! # Reads
//!
//! [`CartSynchronizer::fetch_cart`] replaces the whole snapshot with the
//! server's lines. Every fetch carries a sequence number and a response older
//! than the last applied one is dropped. Quantities still waiting to be
//! synced are laid back over the fresh snapshot.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use secrecy::SecretString;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use techhub_core::{CartLine, CartSnapshot, Price, ProductId};

use crate::backend::{BackendError, StoreBackend};
use crate::config::{CartSettings, ResyncPolicy};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::session::SessionStore;

/// Question asked before clearing the cart.
pub const CLEAR_CART_PROMPT: &str = "Are you sure you want to clear all items from your cart?";

/// Yes/no gate in front of destructive cart operations.
pub trait Confirm {
    /// Ask `prompt`; `true` means proceed.
    fn confirm(self, prompt: &str) -> bool;
}

impl Confirm for bool {
    fn confirm(self, _prompt: &str) -> bool {
        self
    }
}

impl<F: FnOnce(&str) -> bool> Confirm for F {
    fn confirm(self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Outcome of [`CartSynchronizer::clear_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The user said no; nothing changed.
    Declined,
    /// The cart is empty.
    Cleared,
}

/// A confirmed remote write, replayed locally under [`ResyncPolicy::TrustLocal`].
#[derive(Debug)]
enum Write {
    Added(CartLine),
    Removed(ProductId),
    Quantity,
    Cleared,
}

struct LocalCart {
    snapshot: CartSnapshot,
    /// Sequence number of the last fetch applied.
    applied_seq: u64,
}

struct ScheduledSync {
    generation: u64,
    quantity: u32,
    /// The line a zero-quantity edit took out of the snapshot, so a later
    /// edit in the same quiet period can put it back.
    removed: Option<CartLine>,
    /// Set once the job has woken up; it can no longer be cancelled.
    fired: bool,
    handle: JoinHandle<()>,
}

/// Counts live sync jobs so callers can wait for them.
#[derive(Default)]
struct JobTracker {
    active: AtomicUsize,
    idle: Notify,
}

/// Held by a spawned job; dropping it (completion or abort) retires the job.
struct ActiveJob(Arc<JobTracker>);

impl ActiveJob {
    fn start(tracker: &Arc<JobTracker>) -> Self {
        tracker.active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(tracker))
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

struct CartInner<B> {
    backend: Arc<B>,
    session: SessionStore,
    settings: CartSettings,
    local: Mutex<LocalCart>,
    pending: Mutex<HashMap<ProductId, ScheduledSync>>,
    jobs: Arc<JobTracker>,
    next_generation: AtomicU64,
    fetch_seq: AtomicU64,
}

/// Owner of the local cart. Cheap to clone; clones share state.
pub struct CartSynchronizer<B> {
    inner: Arc<CartInner<B>>,
}

impl<B> Clone for CartSynchronizer<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: StoreBackend> CartSynchronizer<B> {
    /// Create a synchronizer with an empty local cart.
    #[must_use]
    pub fn new(backend: Arc<B>, session: SessionStore, settings: CartSettings) -> Self {
        Self {
            inner: Arc::new(CartInner {
                backend,
                session,
                settings,
                local: Mutex::new(LocalCart {
                    snapshot: CartSnapshot::new(),
                    applied_seq: 0,
                }),
                pending: Mutex::new(HashMap::new()),
                jobs: Arc::new(JobTracker::default()),
                next_generation: AtomicU64::new(1),
                fetch_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Copy of the local cart.
    pub async fn snapshot(&self) -> CartSnapshot {
        self.inner.local.lock().await.snapshot.clone()
    }

    /// Number of lines with a sync scheduled or in flight.
    pub async fn pending_syncs(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Replace the local cart with the server's.
    ///
    /// A rate-limited read is retried once after the configured backoff.
    /// Failures are logged and leave the snapshot untouched. Does nothing
    /// without a session.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) {
        let Some(token) = self.inner.session.token().await else {
            debug!("No session; skipping cart fetch");
            return;
        };

        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        match self.get_cart_with_retry(&token).await {
            Ok(lines) => self.apply_remote(seq, lines).await,
            Err(e) => {
                error!(error = %e, seq, "Failed to fetch cart");
                let detail = e.to_string();
                add_breadcrumb("cart", "Cart fetch failed", Some(&[("error", detail.as_str())]));
            }
        }
    }

    async fn get_cart_with_retry(
        &self,
        token: &SecretString,
    ) -> std::result::Result<Vec<CartLine>, BackendError> {
        match self.inner.backend.get_cart(token).await {
            Err(BackendError::RateLimited { retry_after }) => {
                warn!(
                    retry_after,
                    backoff_ms = self.inner.settings.rate_limit_backoff.as_millis(),
                    "Cart fetch rate limited; retrying once"
                );
                tokio::time::sleep(self.inner.settings.rate_limit_backoff).await;
                self.inner.backend.get_cart(token).await
            }
            other => other,
        }
    }

    async fn apply_remote(&self, seq: u64, lines: Vec<CartLine>) {
        // Lock order is `local` then `pending`.
        let mut local = self.inner.local.lock().await;
        if seq < local.applied_seq {
            debug!(seq, applied = local.applied_seq, "Discarding stale cart response");
            return;
        }

        let overrides: Vec<(ProductId, u32)> = self
            .inner
            .pending
            .lock()
            .await
            .iter()
            .map(|(id, job)| (id.clone(), job.quantity))
            .collect();

        let previous = std::mem::replace(&mut local.snapshot, CartSnapshot::from_lines(lines));
        local.applied_seq = seq;

        for (product_id, quantity) in overrides {
            if local.snapshot.set_quantity(&product_id, quantity) || quantity == 0 {
                continue;
            }
            if let Some(line) = previous.get(&product_id) {
                local.snapshot.upsert(CartLine {
                    quantity,
                    ..line.clone()
                });
            }
        }

        debug!(seq, lines = local.snapshot.len(), "Cart snapshot replaced");
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Add one unit of a product to the remote cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` without a session, or the backend's
    /// failure.
    #[instrument(skip(self, name, unit_price), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Price,
    ) -> Result<()> {
        let token = self.inner.session.require_token().await?;
        add_breadcrumb("cart", "Add item", Some(&[("product_id", product_id.as_str())]));

        self.inner
            .backend
            .add_to_cart(&token, &product_id, 1)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to add item to cart");
                AppError::from_backend(e, "Failed to add item to cart")
            })?;

        info!("Item added to cart");
        self.after_write(Write::Added(CartLine::new(product_id, name, unit_price, 1)))
            .await;
        Ok(())
    }

    /// Remove a line.
    ///
    /// Without a session only the local line is removed and this never fails.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure when signed in.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<()> {
        self.cancel_line(product_id).await;

        let Some(token) = self.inner.session.token().await else {
            self.inner.local.lock().await.snapshot.remove(product_id);
            debug!("Removed line locally");
            return Ok(());
        };

        add_breadcrumb("cart", "Remove item", Some(&[("product_id", product_id.as_str())]));
        self.remove_remote(&token, product_id).await.map_err(|e| {
            error!(error = %e, "Failed to remove item from cart");
            AppError::from_backend(e, "Failed to remove item from cart")
        })
    }

    async fn remove_remote(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> std::result::Result<(), BackendError> {
        self.inner
            .backend
            .remove_cart_item(token, product_id)
            .await?;
        self.after_write(Write::Removed(product_id.clone())).await;
        Ok(())
    }

    /// Set a line's quantity locally and schedule the remote sync.
    ///
    /// Zero removes the line; another edit before that removal is synced
    /// brings it back. Products not in the cart are ignored.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) {
        let removed = {
            let mut local = self.inner.local.lock().await;
            if let Some(line) = local.snapshot.get(product_id).cloned() {
                local.snapshot.set_quantity(product_id, quantity);
                (quantity == 0).then_some(line)
            } else {
                let pending = self.inner.pending.lock().await;
                let Some(line) = pending
                    .get(product_id)
                    .filter(|job| !job.fired)
                    .and_then(|job| job.removed.clone())
                else {
                    debug!("Line not in cart; ignoring quantity change");
                    return;
                };
                drop(pending);

                if quantity > 0 {
                    debug!(quantity, "Restoring line removed in this quiet period");
                    local.snapshot.upsert(CartLine {
                        quantity,
                        ..line.clone()
                    });
                }
                (quantity == 0).then_some(line)
            }
        };
        self.schedule(product_id.clone(), quantity, removed).await;
    }

    /// Empty the cart after `confirm` agrees.
    ///
    /// Without a session only the local cart is cleared. Scheduled quantity
    /// syncs are cancelled once the cart is cleared.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure when signed in; the cart is then left as
    /// it was.
    #[instrument(skip_all)]
    pub async fn clear_all(&self, confirm: impl Confirm) -> Result<ClearOutcome> {
        if !confirm.confirm(CLEAR_CART_PROMPT) {
            debug!("Cart clear declined");
            return Ok(ClearOutcome::Declined);
        }

        let Some(token) = self.inner.session.token().await else {
            self.cancel_pending().await;
            self.inner.local.lock().await.snapshot.clear();
            return Ok(ClearOutcome::Cleared);
        };

        add_breadcrumb("cart", "Clear cart", None);
        self.inner.backend.clear_cart(&token).await.map_err(|e| {
            error!(error = %e, "Failed to clear cart");
            AppError::from_backend(e, "Failed to clear cart")
        })?;

        self.cancel_pending().await;
        self.after_write(Write::Cleared).await;
        info!("Cart cleared");
        Ok(ClearOutcome::Cleared)
    }

    /// Drop the local cart and every scheduled sync.
    ///
    /// Fetches already in flight are discarded when they complete.
    pub async fn clear_local(&self) {
        self.cancel_pending().await;
        let barrier = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut local = self.inner.local.lock().await;
        local.snapshot.clear();
        local.applied_seq = barrier;
    }

    async fn after_write(&self, write: Write) {
        match self.inner.settings.resync {
            ResyncPolicy::Refetch => self.fetch_cart().await,
            ResyncPolicy::TrustLocal => {
                let mut local = self.inner.local.lock().await;
                match write {
                    Write::Added(line) => {
                        let merged = match local.snapshot.get(&line.product_id) {
                            Some(existing) => CartLine {
                                quantity: existing.quantity.saturating_add(line.quantity),
                                ..existing.clone()
                            },
                            None => line,
                        };
                        local.snapshot.upsert(merged);
                    }
                    Write::Removed(product_id) => {
                        local.snapshot.remove(&product_id);
                    }
                    // Already applied optimistically; a newer edit may be on top.
                    Write::Quantity => {}
                    Write::Cleared => local.snapshot.clear(),
                }
            }
        }
    }

    // =========================================================================
    // Debounced quantity sync
    // =========================================================================

    async fn schedule(&self, product_id: ProductId, quantity: u32, removed: Option<CartLine>) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let job = ActiveJob::start(&self.inner.jobs);
        let this = self.clone();
        let id = product_id.clone();

        let mut pending = self.inner.pending.lock().await;
        let handle = tokio::spawn(async move {
            let _job = job;
            tokio::time::sleep(this.inner.settings.debounce).await;
            if this.claim(&id, generation).await {
                this.sync_line(&id, quantity).await;
                this.release(&id, generation).await;
            }
        });

        let previous = pending.insert(
            product_id,
            ScheduledSync {
                generation,
                quantity,
                removed,
                fired: false,
                handle,
            },
        );
        if let Some(previous) = previous
            && !previous.fired
        {
            previous.handle.abort();
            debug!(superseded = previous.generation, generation, "Rescheduled quantity sync");
        }
    }

    /// Mark the job as fired if it is still the latest for its line.
    async fn claim(&self, product_id: &ProductId, generation: u64) -> bool {
        let mut pending = self.inner.pending.lock().await;
        match pending.get_mut(product_id) {
            Some(job) if job.generation == generation => {
                job.fired = true;
                true
            }
            _ => false,
        }
    }

    async fn release(&self, product_id: &ProductId, generation: u64) {
        let mut pending = self.inner.pending.lock().await;
        if pending
            .get(product_id)
            .is_some_and(|job| job.generation == generation)
        {
            pending.remove(product_id);
        }
    }

    async fn sync_line(&self, product_id: &ProductId, quantity: u32) {
        let Some(token) = self.inner.session.token().await else {
            debug!(product_id = %product_id, "No session; keeping local quantity");
            return;
        };

        if quantity == 0 {
            if let Err(e) = self.remove_remote(&token, product_id).await {
                error!(product_id = %product_id, error = %e, "Failed to remove cart line");
            }
            return;
        }

        let backend = &self.inner.backend;
        if let Err(e) = backend.update_cart_item(&token, product_id, quantity).await {
            warn!(
                product_id = %product_id,
                error = %e,
                "Quantity update failed; falling back to remove and re-add"
            );

            if let Err(e) = backend.remove_cart_item(&token, product_id).await {
                error!(product_id = %product_id, error = %e, "Fallback remove failed; local quantity kept");
                add_breadcrumb("cart", "Quantity sync failed", Some(&[("product_id", product_id.as_str())]));
                return;
            }
            if let Err(e) = backend.add_to_cart(&token, product_id, quantity).await {
                error!(product_id = %product_id, error = %e, "Fallback re-add failed; local quantity kept");
                add_breadcrumb("cart", "Quantity sync failed", Some(&[("product_id", product_id.as_str())]));
                return;
            }
        }

        debug!(product_id = %product_id, quantity, "Quantity synced");
        self.after_write(Write::Quantity).await;
    }

    async fn cancel_line(&self, product_id: &ProductId) {
        let mut pending = self.inner.pending.lock().await;
        if pending.get(product_id).is_some_and(|job| !job.fired)
            && let Some(job) = pending.remove(product_id)
        {
            job.handle.abort();
        }
    }

    /// Cancel every sync still in its quiet period. Returns how many were
    /// cancelled. Syncs already talking to the backend are left alone.
    pub async fn cancel_pending(&self) -> usize {
        let mut pending = self.inner.pending.lock().await;
        let before = pending.len();
        pending.retain(|_, job| {
            if job.fired {
                true
            } else {
                job.handle.abort();
                false
            }
        });
        let cancelled = before - pending.len();
        if cancelled > 0 {
            debug!(cancelled, "Cancelled scheduled quantity syncs");
        }
        cancelled
    }

    /// Wait until no sync is scheduled or in flight.
    pub async fn settle(&self) {
        let jobs = &self.inner.jobs;
        loop {
            let mut idle = pin!(jobs.idle.notified());
            idle.as_mut().enable();
            if jobs.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}
