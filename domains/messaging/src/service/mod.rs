//! Realtime core: connection tracking, delivery, seen reconciliation, sessions

pub mod connection;
pub mod gateway;
pub mod locks;
pub mod registry;
pub mod router;
pub mod seen;

pub use connection::{Connection, ConnectionHandle, Outbound};
pub use gateway::{ConnectOptions, Session, SessionGateway};
pub use locks::PairLocks;
pub use registry::ConnectionRegistry;
pub use router::DeliveryRouter;
pub use seen::SeenReconciler;

use crate::domain::entities::{Pair, PairCode};
use crate::domain::errors::DeliveryError;
use crate::repository::PairDirectory;

/// Look a pair up or fail with `UnknownPair`
pub(crate) async fn resolve_pair(
    pairs: &dyn PairDirectory,
    pair_id: &PairCode,
) -> Result<Pair, DeliveryError> {
    pairs
        .find(pair_id)
        .await?
        .ok_or_else(|| DeliveryError::UnknownPair(pair_id.to_string()))
}
