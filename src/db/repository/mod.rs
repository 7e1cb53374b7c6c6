//! Repository trait definitions.
//!
//! Every method accepts the opaque transaction handle produced by the
//! [`TransactionManager`]; there are no auto-commit paths. Methods either
//! succeed atomically or return an error, and callers are expected to roll
//! the enclosing transaction back on failure.

use async_trait::async_trait;

use crate::db::Tx;

pub mod agenda;
pub mod booking;
pub mod collaborators;
mod error;

pub use agenda::AgendaRepository;
pub use booking::BookingRepository;
pub use collaborators::{
    EngagementRepository, HolidayRepository, ListingRepository, ServiceAreaRepository,
    UserRepository,
};
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Hard bounds for retention batch deletes, applied by every backend
/// regardless of service-level configuration.
pub const RETENTION_LIMIT_MAX: usize = 5000;
/// Default retention batch size selected when the caller passes zero.
pub const RETENTION_LIMIT_DEFAULT: usize = 500;

/// Clamp a retention batch limit into `[1, RETENTION_LIMIT_MAX]`, selecting
/// the default for zero.
pub fn clamp_retention_limit(requested: usize) -> usize {
    if requested == 0 {
        RETENTION_LIMIT_DEFAULT
    } else {
        requested.clamp(1, RETENTION_LIMIT_MAX)
    }
}

/// Transaction lifecycle operations.
///
/// Commit and rollback consume the handle, so a transaction cannot be used
/// after it finished.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Start a read-write transaction.
    async fn begin(&self) -> RepositoryResult<Tx>;

    /// Start a read-only transaction. Snapshot-consistent reads; any write
    /// through the handle fails.
    async fn begin_read_only(&self) -> RepositoryResult<Tx>;

    /// Commit the transaction.
    async fn commit(&self, tx: Tx) -> RepositoryResult<()>;

    /// Roll the transaction back, discarding staged changes.
    async fn rollback(&self, tx: Tx) -> RepositoryResult<()>;
}

/// The full persistence surface consumed by the scheduling services.
pub trait FullRepository:
    TransactionManager
    + AgendaRepository
    + BookingRepository
    + ListingRepository
    + UserRepository
    + ServiceAreaRepository
    + HolidayRepository
    + EngagementRepository
{
}

impl<T> FullRepository for T where
    T: TransactionManager
        + AgendaRepository
        + BookingRepository
        + ListingRepository
        + UserRepository
        + ServiceAreaRepository
        + HolidayRepository
        + EngagementRepository
{
}

#[cfg(test)]
mod tests {
    use super::clamp_retention_limit;

    #[test]
    fn retention_clamp_bounds() {
        assert_eq!(clamp_retention_limit(0), 500);
        assert_eq!(clamp_retention_limit(1), 1);
        assert_eq!(clamp_retention_limit(4999), 4999);
        assert_eq!(clamp_retention_limit(1_000_000), 5000);
    }
}
