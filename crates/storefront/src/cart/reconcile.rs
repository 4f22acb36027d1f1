//! Guest cart reconciliation.
//!
//! When a shopper signs in, the cart they built anonymously is merged into
//! their persisted cart: quantities are additive for matching
//! `(product_id, variant)` lines, everything else is inserted as-is. The
//! merge runs under the owner's lock (never twice concurrently for one
//! user) and is best-effort per line - a failing line does not stop the
//! rest.
//!
//! Effect ordering invariant: persisted writes happen first, the guest slot
//! is rewritten last, and only lines that actually applied are removed from
//! it. An interrupted merge can therefore leave unmerged lines behind for a
//! later retry, but can never leave the guest slot cleared with lines
//! unapplied.

use atelier_core::UserId;

use super::guest::GuestCartStore;
use super::store::PersistedCartStore;
use crate::models::CartLine;

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Guest lines considered.
    pub attempted: usize,
    /// Lines applied to the persisted cart (updated or inserted).
    pub applied: usize,
    /// Lines that failed and were requeued in the guest slot.
    pub failed: usize,
    /// The persisted cart could not even be read; nothing was attempted.
    pub aborted: bool,
}

impl MergeReport {
    /// No guest lines existed, so no merge ran.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            attempted: 0,
            applied: 0,
            failed: 0,
            aborted: false,
        }
    }

    /// Whether the persisted cart changed.
    #[must_use]
    pub const fn merged_any(&self) -> bool {
        self.applied > 0
    }
}

/// Merge the guest cart into `user_id`'s persisted cart.
///
/// Infallible by contract: partial failures are logged and requeued, never
/// surfaced to the shopper. The caller must hold the user's owner lock.
pub(super) async fn merge_guest_cart(
    guest: &dyn GuestCartStore,
    persisted: &dyn PersistedCartStore,
    user_id: UserId,
) -> MergeReport {
    let guest_lines = guest.read().await;
    if guest_lines.is_empty() {
        return MergeReport::skipped();
    }

    let existing = match persisted.list_for_user(user_id).await {
        Ok(lines) => lines,
        Err(e) => {
            // Fatal: without the persisted view, additive merging is
            // impossible. Leave the guest slot untouched for a later retry.
            tracing::warn!(%user_id, error = %e, "cart merge aborted, persisted cart unreadable");
            return MergeReport {
                attempted: guest_lines.len(),
                aborted: true,
                ..MergeReport::default()
            };
        }
    };

    let attempted = guest_lines.len();
    let mut remainder: Vec<CartLine> = Vec::new();

    for guest_line in guest_lines {
        let result = match existing
            .iter()
            .find(|line| line.matches(guest_line.product_id, &guest_line.variant))
        {
            // Server-authoritative quantities are never discarded: add the
            // guest quantity on top of what the persisted line already has.
            Some(match_line) => {
                persisted
                    .update_quantity(
                        match_line.id,
                        match_line.quantity.saturating_add(guest_line.quantity),
                    )
                    .await
            }
            None => persisted
                .insert(
                    user_id,
                    guest_line.product_id,
                    guest_line.quantity,
                    &guest_line.variant,
                )
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            tracing::warn!(
                %user_id,
                product_id = %guest_line.product_id,
                error = %e,
                "cart merge line failed, requeued in guest cart"
            );
            remainder.push(guest_line);
        }
    }

    let failed = remainder.len();
    let applied = attempted - failed;

    // Requeue only what did not apply; clear the slot when everything did.
    let cleanup = if remainder.is_empty() {
        guest.clear().await
    } else {
        guest.write(&remainder).await
    };
    if let Err(e) = cleanup {
        tracing::warn!(%user_id, error = %e, "guest cart slot not updated after merge");
    }

    if failed > 0 {
        tracing::warn!(%user_id, applied, failed, "cart merge completed partially");
    } else {
        tracing::info!(%user_id, applied, "guest cart merged");
    }

    MergeReport {
        attempted,
        applied,
        failed,
        aborted: false,
    }
}
