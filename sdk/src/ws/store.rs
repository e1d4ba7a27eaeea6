//! Per-symbol quote store.
//!
//! Holds the latest [`QuoteRecord`] per symbol behind one `watch` channel per
//! key, so an update for `AAPL` wakes only the consumers watching `AAPL`.
//! Cloning the store yields another handle to the same data.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::types::{QuoteRecord, Symbol};

type Slot = watch::Sender<Option<QuoteRecord>>;

/// Shared keyed store of latest quotes.
#[derive(Debug, Clone, Default)]
pub struct QuoteStore {
    slots: Arc<RwLock<HashMap<Symbol, Slot>>>,
}

impl QuoteStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latest quote for a symbol.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<QuoteRecord> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(symbol).and_then(|slot| slot.borrow().clone())
    }

    /// Returns true if a quote is held for the symbol.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(symbol)
            .is_some_and(|slot| slot.borrow().is_some())
    }

    /// Returns the number of symbols with a quote.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.borrow().is_some()).count()
    }

    /// Returns true if no quotes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all held quotes ordered by symbol.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QuoteRecord> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<QuoteRecord> = slots
            .values()
            .filter_map(|slot| slot.borrow().clone())
            .collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        records
    }

    /// Returns a receiver that observes one symbol.
    ///
    /// The current value is `None` until a quote arrives and becomes `None`
    /// again when the symbol is evicted. Empty slots whose watchers have all
    /// been dropped are pruned here.
    pub fn watch(&self, symbol: &Symbol) -> watch::Receiver<Option<QuoteRecord>> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.receiver_count() > 0 || slot.borrow().is_some());
        slots
            .entry(symbol.clone())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Replaces the quote for the record's symbol and notifies its watchers.
    ///
    /// Returns the previous record, if any.
    pub fn upsert(&self, record: QuoteRecord) -> Option<QuoteRecord> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(record.symbol.clone())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(record))
    }

    /// Removes the quote for a symbol and notifies its watchers.
    ///
    /// Returns the removed record, if any.
    pub fn evict(&self, symbol: &Symbol) -> Option<QuoteRecord> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(symbol)?;
        let previous = slot.send_replace(None);
        if slot.receiver_count() == 0 {
            slots.remove(symbol);
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).expect("symbol")
    }

    fn record(symbol: &str, cents: i64) -> QuoteRecord {
        QuoteRecord {
            symbol: sym(symbol),
            price: Decimal::new(cents, 2),
            volume: Decimal::new(100, 0),
            timestamp: Utc
                .with_ymd_and_hms(2024, 3, 1, 15, 30, 0)
                .single()
                .expect("timestamp"),
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
        }
    }

    #[test]
    fn test_store_empty() {
        let store = QuoteStore::new();
        assert!(store.is_empty());
        assert!(store.get(&sym("AAPL")).is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_store_upsert_replaces_whole_record() {
        let store = QuoteStore::new();
        assert!(store.upsert(record("AAPL", 100)).is_none());

        let previous = store.upsert(record("AAPL", 200));
        assert_eq!(previous.map(|r| r.price), Some(Decimal::new(100, 2)));
        assert_eq!(
            store.get(&sym("AAPL")).map(|r| r.price),
            Some(Decimal::new(200, 2))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_evict() {
        let store = QuoteStore::new();
        store.upsert(record("AAPL", 100));

        assert!(store.evict(&sym("AAPL")).is_some());
        assert!(!store.contains(&sym("AAPL")));
        assert!(store.evict(&sym("AAPL")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_snapshot_sorted() {
        let store = QuoteStore::new();
        store.upsert(record("MSFT", 100));
        store.upsert(record("AAPL", 100));
        store.upsert(record("GOOG", 100));

        let symbols: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|r| r.symbol.to_string())
            .collect();
        assert_eq!(symbols, vec!["AAPL", "GOOG", "MSFT"]);
    }

    #[test]
    fn test_store_clones_share_data() {
        let store = QuoteStore::new();
        let other = store.clone();
        store.upsert(record("AAPL", 100));
        assert!(other.contains(&sym("AAPL")));
    }

    #[tokio::test]
    async fn test_store_watch_notifies_only_watched_symbol() {
        let store = QuoteStore::new();
        let mut aapl = store.watch(&sym("AAPL"));
        let msft = store.watch(&sym("MSFT"));
        assert!(aapl.borrow().is_none());

        store.upsert(record("AAPL", 150));

        assert!(aapl.has_changed().expect("sender alive"));
        assert!(!msft.has_changed().expect("sender alive"));
        aapl.changed().await.expect("changed");
        assert_eq!(
            aapl.borrow_and_update().as_ref().map(|r| r.price),
            Some(Decimal::new(150, 2))
        );
        assert!(!msft.has_changed().expect("sender alive"));
    }

    #[test]
    fn test_store_watch_wakes_only_affected_task() {
        let store = QuoteStore::new();
        let mut aapl = store.watch(&sym("AAPL"));
        let mut msft = store.watch(&sym("MSFT"));

        let mut aapl_changed = tokio_test::task::spawn(aapl.changed());
        let mut msft_changed = tokio_test::task::spawn(msft.changed());
        tokio_test::assert_pending!(aapl_changed.poll());
        tokio_test::assert_pending!(msft_changed.poll());

        store.upsert(record("AAPL", 150));

        assert!(aapl_changed.is_woken());
        assert!(!msft_changed.is_woken());
        tokio_test::assert_ready_ok!(aapl_changed.poll());
        tokio_test::assert_pending!(msft_changed.poll());
    }

    #[test]
    fn test_store_watch_prunes_abandoned_slots() {
        let store = QuoteStore::new();
        for symbol in ["A", "B", "C"] {
            drop(store.watch(&sym(symbol)));
        }
        store.upsert(record("MSFT", 100));
        let _kept = store.watch(&sym("GOOG"));

        let slot_count = |store: &QuoteStore| store.slots.read().expect("lock").len();
        assert_eq!(slot_count(&store), 2);

        let _aapl = store.watch(&sym("AAPL"));
        assert_eq!(slot_count(&store), 3);
        assert!(store.contains(&sym("MSFT")));
    }

    #[tokio::test]
    async fn test_store_watch_sees_eviction() {
        let store = QuoteStore::new();
        store.upsert(record("AAPL", 150));
        let mut rx = store.watch(&sym("AAPL"));
        assert!(rx.borrow_and_update().is_some());

        store.evict(&sym("AAPL"));

        rx.changed().await.expect("changed");
        assert!(rx.borrow().is_none());
    }
}
