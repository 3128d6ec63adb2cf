//! Background tasks for a playback session
//!
//! - The resync handler consumes the engine notification channel (and
//!   favorites changes) and republishes the full engine snapshot.
//! - The position poller publishes the engine position at a fixed cadence,
//!   since engines do not notify on every position change.
//!
//! Both stop when their cancellation token fires.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::session::PlaybackSession;
use crate::engine::EngineEvents;

/// Start the resync handler for connection `connection_id`
///
/// A closed notification channel means the engine is gone; the connection
/// is detached and the handler exits.
pub(crate) fn spawn_resync_handler(
    session: PlaybackSession,
    connection_id: u64,
    mut events: EngineEvents,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut favorites = session.favorites_changes();

    tokio::spawn(async move {
        debug!(connection = connection_id, "Resync handler started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        // Coalesce a burst into one resync
                        let mut coalesced = 0usize;
                        while events.try_recv().is_ok() {
                            coalesced += 1;
                        }
                        trace!(?event, coalesced, "Engine notification");
                        session.resync();
                    }
                    None => {
                        session.detach(connection_id);
                        break;
                    }
                },
                Ok(()) = favorites.changed() => session.refresh_favorite(),
            }
        }

        debug!(connection = connection_id, "Resync handler stopped");
    })
}

/// Start the position polling loop
pub(crate) fn spawn_position_poller(
    session: PlaybackSession,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(period_ms = period.as_millis() as u64, "Position poller started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => session.poll_position(),
            }
        }

        info!("Position poller stopped");
    })
}
