use crate::database::DbPool;
use crate::error::{AppError, AppResult, CapacityError};
use crate::models::AvailabilitySnapshot;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Reads the ledger needs from durable storage. Kept as a seam so the
/// no-oversell property can be exercised in-process; production uses the
/// Postgres-backed store below.
pub trait CapacityStore: Send + Sync {
    async fn event_capacity(&self, event_id: Uuid) -> AppResult<Option<i64>>;

    /// Total quantity currently counting against capacity: PAID
    /// reservations plus PENDING holds created after `horizon`.
    /// `exclude` omits one reservation from the sum (used when deciding
    /// whether a lapsed hold can still be confirmed).
    async fn consumed(
        &self,
        event_id: Uuid,
        horizon: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> AppResult<i64>;
}

/// Holds the per-event lock while the caller records the reservation.
/// Must be dropped before any external gateway call.
#[derive(Debug)]
pub struct CapacityGuard {
    /// Spots remaining before this reservation was granted.
    pub remaining: i64,
    _guard: OwnedMutexGuard<()>,
}

/// Pure capacity check. `remaining` floors at zero so an over-committed
/// event (capacity lowered administratively) reads as sold out rather
/// than negative.
pub fn check_capacity(
    capacity: i64,
    consumed: i64,
    qty: i64,
    per_order_cap: i64,
) -> Result<i64, CapacityError> {
    if qty > per_order_cap {
        return Err(CapacityError::OverPerOrderLimit {
            limit: per_order_cap,
        });
    }
    let remaining = (capacity - consumed).max(0);
    if remaining == 0 {
        return Err(CapacityError::SoldOut);
    }
    if qty > remaining {
        return Err(CapacityError::InsufficientCapacity {
            requested: qty,
            remaining,
        });
    }
    Ok(remaining)
}

/// The availability ledger: serializes check-and-reserve per event so two
/// concurrent bookings cannot both observe the last spot. Consumption is
/// derived from reservation status, so releasing capacity (cancel,
/// refund, lapsed hold) is a plain status transition and needs no lock.
pub struct AvailabilityLedger<S> {
    store: S,
    per_order_cap: i64,
    hold_ttl: Duration,
    locks: Arc<StdMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl<S: Clone> Clone for AvailabilityLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            per_order_cap: self.per_order_cap,
            hold_ttl: self.hold_ttl,
            locks: self.locks.clone(),
        }
    }
}

impl<S: CapacityStore> AvailabilityLedger<S> {
    pub fn new(store: S, per_order_cap: i64, hold_ttl_minutes: i64) -> Self {
        Self {
            store,
            per_order_cap,
            hold_ttl: Duration::minutes(hold_ttl_minutes),
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub fn hold_ttl(&self) -> Duration {
        self.hold_ttl
    }

    /// Instant before which PENDING holds no longer count.
    pub fn hold_horizon(&self) -> DateTime<Utc> {
        Utc::now() - self.hold_ttl
    }

    async fn lock_event(&self, event_id: Uuid) -> OwnedMutexGuard<()> {
        let cell = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            // Entries are retained for the process lifetime; the registry
            // is bounded by the number of events ever booked.
            locks
                .entry(event_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        cell.lock_owned().await
    }

    /// Atomic check-and-reserve. On success the returned guard keeps the
    /// event serialized until the caller has durably recorded the PENDING
    /// hold; conflicting bookings wait on the same guard, so they observe
    /// the hold as soon as it exists.
    pub async fn reserve(&self, event_id: Uuid, qty: i64) -> AppResult<CapacityGuard> {
        if qty > self.per_order_cap {
            return Err(CapacityError::OverPerOrderLimit {
                limit: self.per_order_cap,
            }
            .into());
        }

        let guard = self.lock_event(event_id).await;
        let capacity = self
            .store
            .event_capacity(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let consumed = self
            .store
            .consumed(event_id, self.hold_horizon(), None)
            .await?;
        let remaining = check_capacity(capacity, consumed, qty, self.per_order_cap)?;

        Ok(CapacityGuard {
            remaining,
            _guard: guard,
        })
    }

    /// Re-validate a reservation whose hold has lapsed before confirming
    /// it as PAID. Serialized against `reserve` for the same event; the
    /// reservation's own row is excluded from the consumption sum.
    pub async fn confirm_lapsed(
        &self,
        event_id: Uuid,
        reservation_id: Uuid,
        qty: i64,
    ) -> AppResult<CapacityGuard> {
        let guard = self.lock_event(event_id).await;
        let capacity = self
            .store
            .event_capacity(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let consumed = self
            .store
            .consumed(event_id, self.hold_horizon(), Some(reservation_id))
            .await?;
        let remaining = check_capacity(capacity, consumed, qty, qty.max(self.per_order_cap))?;

        Ok(CapacityGuard {
            remaining,
            _guard: guard,
        })
    }

    /// Point-in-time availability for display. Unsynchronized read; the
    /// authoritative check happens in `reserve`.
    pub async fn snapshot(&self, event_id: Uuid) -> AppResult<AvailabilitySnapshot> {
        let capacity = self
            .store
            .event_capacity(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let booked = self
            .store
            .consumed(event_id, self.hold_horizon(), None)
            .await?;
        Ok(AvailabilitySnapshot {
            capacity,
            booked,
            remaining: (capacity - booked).max(0),
        })
    }
}

#[derive(Clone)]
pub struct PgCapacityStore {
    pool: DbPool,
}

impl PgCapacityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CapacityStore for PgCapacityStore {
    async fn event_capacity(&self, event_id: Uuid) -> AppResult<Option<i64>> {
        let capacity = sqlx::query_scalar::<_, i64>("SELECT capacity FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(capacity)
    }

    async fn consumed(
        &self,
        event_id: Uuid,
        horizon: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> AppResult<i64> {
        let consumed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(qty), 0)::bigint
            FROM reservations
            WHERE event_id = $1
              AND (status = 'PAID' OR (status = 'PENDING' AND created_at > $2))
              AND ($3::uuid IS NULL OR id <> $3)
            "#,
        )
        .bind(event_id)
        .bind(horizon)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(consumed)
    }
}

pub type PgAvailabilityLedger = AvailabilityLedger<PgCapacityStore>;

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory store: fixed capacity, shared consumption counter the
    /// test bumps while holding the guard, as the orchestrator does when
    /// it inserts the PENDING row.
    #[derive(Clone)]
    struct MemStore {
        capacity: i64,
        consumed: Arc<StdMutex<i64>>,
    }

    impl MemStore {
        fn new(capacity: i64) -> Self {
            Self {
                capacity,
                consumed: Arc::new(StdMutex::new(0)),
            }
        }

        fn record_hold(&self, qty: i64) {
            *self.consumed.lock().unwrap() += qty;
        }
    }

    impl CapacityStore for MemStore {
        async fn event_capacity(&self, _event_id: Uuid) -> AppResult<Option<i64>> {
            Ok(Some(self.capacity))
        }

        async fn consumed(
            &self,
            _event_id: Uuid,
            _horizon: DateTime<Utc>,
            _exclude: Option<Uuid>,
        ) -> AppResult<i64> {
            Ok(*self.consumed.lock().unwrap())
        }
    }

    #[test]
    fn check_capacity_rejections() {
        assert_eq!(check_capacity(10, 0, 2, 10), Ok(10));
        assert_eq!(check_capacity(10, 10, 1, 10), Err(CapacityError::SoldOut));
        assert_eq!(
            check_capacity(10, 8, 3, 10),
            Err(CapacityError::InsufficientCapacity {
                requested: 3,
                remaining: 2
            })
        );
        assert_eq!(
            check_capacity(100, 0, 11, 10),
            Err(CapacityError::OverPerOrderLimit { limit: 10 })
        );
    }

    #[test]
    fn over_committed_event_reads_as_sold_out() {
        // Capacity lowered below already-confirmed quantity.
        assert_eq!(check_capacity(5, 8, 1, 10), Err(CapacityError::SoldOut));
    }

    #[tokio::test]
    async fn two_racers_for_the_last_spot_one_wins() {
        let store = MemStore::new(1);
        let ledger = Arc::new(AvailabilityLedger::new(store.clone(), 10, 30));
        let event_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let ledger = ledger.clone();
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                match ledger.reserve(event_id, 1).await {
                    Ok(guard) => {
                        // Record the hold while serialized, like the
                        // orchestrator's PENDING insert.
                        store.record_hold(1);
                        drop(guard);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }));
        }

        let mut wins = 0;
        let mut sold_out = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(AppError::Capacity(CapacityError::SoldOut)) => sold_out += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(sold_out, 1);
    }

    #[tokio::test]
    async fn concurrent_demand_never_oversells() {
        let store = MemStore::new(5);
        let ledger = Arc::new(AvailabilityLedger::new(store.clone(), 10, 30));
        let event_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let ledger = ledger.clone();
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                match ledger.reserve(event_id, 1).await {
                    Ok(guard) => {
                        store.record_hold(1);
                        drop(guard);
                        true
                    }
                    Err(_) => false,
                }
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        assert_eq!(*store.consumed.lock().unwrap(), 5);
    }

    #[tokio::test]
    async fn insufficient_capacity_reports_remaining() {
        let store = MemStore::new(4);
        store.record_hold(3);
        let ledger = AvailabilityLedger::new(store, 10, 30);

        match ledger.reserve(Uuid::new_v4(), 2).await {
            Err(AppError::Capacity(CapacityError::InsufficientCapacity {
                requested,
                remaining,
            })) => {
                assert_eq!(requested, 2);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected insufficient capacity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn per_order_cap_is_enforced_before_locking() {
        let store = MemStore::new(100);
        let ledger = AvailabilityLedger::new(store, 10, 30);

        match ledger.reserve(Uuid::new_v4(), 11).await {
            Err(AppError::Capacity(CapacityError::OverPerOrderLimit { limit })) => {
                assert_eq!(limit, 10)
            }
            other => panic!("expected over-limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirm_lapsed_excludes_own_hold() {
        let store = MemStore::new(2);
        store.record_hold(2);
        let ledger = AvailabilityLedger::new(store, 10, 30);

        // The store reports 2 consumed but the exclusion semantics are the
        // store's concern; here the ledger just re-runs the check. A full
        // lot means the lapsed hold cannot be confirmed.
        match ledger.confirm_lapsed(Uuid::new_v4(), Uuid::new_v4(), 1).await {
            Err(AppError::Capacity(CapacityError::SoldOut)) => {}
            other => panic!("expected sold out, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reserve_parks_only_while_a_confirmation_guard_is_held() {
        let store = MemStore::new(5);
        let ledger = Arc::new(AvailabilityLedger::new(store.clone(), 10, 30));
        let event_id = Uuid::new_v4();

        let guard = ledger
            .confirm_lapsed(event_id, Uuid::new_v4(), 1)
            .await
            .unwrap();

        let racer = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.reserve(event_id, 1).await.map(drop) })
        };

        // Single-threaded test runtime: after yielding, the racer has run
        // up to the event lock and parked there.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(!racer.is_finished());

        // Releasing the guard is all it takes for the racer to proceed.
        drop(guard);
        racer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn snapshot_floors_remaining_at_zero() {
        let store = MemStore::new(3);
        store.record_hold(5);
        let ledger = AvailabilityLedger::new(store, 10, 30);

        let snapshot = ledger.snapshot(Uuid::new_v4()).await.unwrap();
        assert_eq!(snapshot.capacity, 3);
        assert_eq!(snapshot.booked, 5);
        assert_eq!(snapshot.remaining, 0);
    }
}
