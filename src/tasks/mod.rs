//! Background scheduled tasks. Call `spawn_all` once during startup; it
//! detaches the loops via `tokio::spawn` and does not block.

use crate::services::ReservationService;

/// Spawn the hold expiry sweep: every minute, cancel PENDING reservations
/// whose hold TTL has lapsed. The availability queries already ignore
/// lapsed holds, so the sweep tidies order state rather than guarding the
/// oversell invariant.
pub fn spawn_all(reservation_service: ReservationService) {
    tokio::spawn(async move {
        loop {
            match reservation_service.expire_stale_holds().await {
                Ok(n) if n > 0 => log::info!("Expired pending holds released: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to expire pending holds: {e:?}"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    });
}
