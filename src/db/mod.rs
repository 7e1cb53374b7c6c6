//! Database module for the scheduling core.
//!
//! This module provides abstractions for database operations via the
//! Repository pattern, allowing different storage backends to be swapped.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Service Layer (services/) - Scheduling Business Logic  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! │  + TransactionManager with an opaque Tx handle          │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────────────────┐
//!     │  Local (in-memory)    Postgres (Diesel/r2d2) │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! Every store method takes the transaction handle explicitly; commit and
//! rollback consume it. The in-memory backend serializes transactions on a
//! single asynchronous lock, which gives it honest (if coarse) pessimistic
//! semantics; the Postgres backend uses row locks and guarded updates.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repositories;
pub mod repository;
mod tx;

#[cfg(feature = "local-repo")]
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::{PostgresConfig, PostgresRepository};

pub use factory::{RepositoryFactory, RepositoryType};
pub use repository::{
    clamp_retention_limit, AgendaRepository, BookingRepository, EngagementRepository,
    ErrorContext, FullRepository, HolidayRepository, ListingRepository, RepositoryError,
    RepositoryResult, ServiceAreaRepository, TransactionManager, UserRepository,
};
pub use tx::Tx;

pub(crate) use tx::TxInner;
