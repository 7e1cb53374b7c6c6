//! Opaque transaction handle threaded into every store call.
//!
//! A `Tx` is obtained from the transaction manager and consumed by
//! `commit`/`rollback`. Store methods borrow it mutably, which statically
//! prevents two concurrent store calls on the same transaction.

#[cfg(feature = "local-repo")]
use crate::db::repositories::local::LocalTx;
#[cfg(feature = "postgres-repo")]
use crate::db::repositories::postgres::PgTx;

/// Backend-erased transaction handle.
pub struct Tx {
    pub(crate) inner: TxInner,
}

pub(crate) enum TxInner {
    #[cfg(feature = "local-repo")]
    Local(Box<LocalTx>),
    #[cfg(feature = "postgres-repo")]
    Postgres(Box<PgTx>),
}

impl Tx {
    /// Whether the transaction was opened read-only. Write operations on a
    /// read-only handle fail with a transaction error.
    pub fn is_read_only(&self) -> bool {
        match &self.inner {
            #[cfg(feature = "local-repo")]
            TxInner::Local(inner) => inner.is_read_only(),
            #[cfg(feature = "postgres-repo")]
            TxInner::Postgres(inner) => inner.is_read_only(),
        }
    }
}

impl std::fmt::Debug for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
