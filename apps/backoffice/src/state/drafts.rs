//! # Draft State
//!
//! The sale and purchase being built on the dashboard.
//!
//! ## Why Arc<Mutex<T>>?
//! Several commands can touch the same draft (add a line while the totals
//! panel refreshes). The mutex gives each draft operation exclusive access;
//! it is only ever held for the synchronous operation, never across an
//! `.await`.

use std::sync::{Arc, Mutex, PoisonError};

use mostrador_core::{DraftKind, Percentage, TransactionDraft};

#[derive(Debug)]
struct Drafts {
    sale: TransactionDraft,
    purchase: TransactionDraft,
}

impl Drafts {
    fn get_mut(&mut self, kind: DraftKind) -> &mut TransactionDraft {
        match kind {
            DraftKind::Sale => &mut self.sale,
            DraftKind::Purchase => &mut self.purchase,
        }
    }
}

/// Thread-safe holder of the current drafts.
#[derive(Debug, Clone)]
pub struct DraftState {
    drafts: Arc<Mutex<Drafts>>,
}

impl DraftState {
    /// Empty sale and purchase drafts taxed at `tax`.
    pub fn new(tax: Percentage) -> Self {
        DraftState {
            drafts: Arc::new(Mutex::new(Drafts {
                sale: TransactionDraft::sale(tax),
                purchase: TransactionDraft::purchase(tax),
            })),
        }
    }

    /// Runs `f` with exclusive access to one draft.
    ///
    /// A panic inside an earlier operation poisons the lock; the draft is
    /// still structurally valid, so the guard is recovered.
    pub fn with_draft<R>(&self, kind: DraftKind, f: impl FnOnce(&mut TransactionDraft) -> R) -> R {
        let mut drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        f(drafts.get_mut(kind))
    }

    /// A copy of one draft, for saving outside the lock.
    pub fn snapshot(&self, kind: DraftKind) -> TransactionDraft {
        self.with_draft(kind, |d| d.clone())
    }

    /// Starts a fresh draft once `saved` has been persisted.
    ///
    /// If the draft was edited while the save was in flight it is left
    /// alone, so those edits are not lost.
    ///
    /// ## Returns
    /// Whether the draft was reset.
    pub fn finish(&self, saved: &TransactionDraft, tax: Percentage) -> bool {
        self.with_draft(saved.kind, |d| {
            if d != saved {
                return false;
            }
            *d = TransactionDraft::new(saved.kind, tax);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mostrador_core::Product;

    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            code: "ARZ-1KG".to_string(),
            description: "Arroz".to_string(),
            category: None,
            unit: "pieza".to_string(),
            purchase_price_cents: 1_800,
            sale_price_cents: 2_500,
            stock: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_drafts_are_independent() {
        let state = DraftState::new(Percentage::from_percent(16));
        state
            .with_draft(DraftKind::Sale, |d| d.add_product(&product(), 2))
            .unwrap();

        assert_eq!(state.snapshot(DraftKind::Sale).line_count(), 1);
        assert!(state.snapshot(DraftKind::Purchase).is_empty());
    }

    #[test]
    fn test_finish_keeps_concurrent_edits() {
        let state = DraftState::new(Percentage::from_percent(16));
        state
            .with_draft(DraftKind::Sale, |d| d.add_product(&product(), 1))
            .unwrap();
        let saved = state.snapshot(DraftKind::Sale);

        state
            .with_draft(DraftKind::Sale, |d| d.set_quantity("p1", 3))
            .unwrap();
        assert!(!state.finish(&saved, Percentage::from_percent(8)));
        assert_eq!(state.snapshot(DraftKind::Sale).total_quantity(), 3);

        let saved = state.snapshot(DraftKind::Sale);
        assert!(state.finish(&saved, Percentage::from_percent(8)));
        let fresh = state.snapshot(DraftKind::Sale);
        assert!(fresh.is_empty());
        assert_eq!(fresh.tax, Percentage::from_percent(8));
    }
}
