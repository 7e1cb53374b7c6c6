//! Postgres repository implementation using Diesel.
//!
//! Connection pooling with r2d2, embedded migrations, `SELECT … FOR UPDATE`
//! row locks and guarded status updates. Store calls run the synchronous
//! Diesel queries directly on the transaction's pooled connection; the
//! scheduling workload is short transactional statements, so the blocking
//! window per call is small.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::{AnsiTransactionManager, TransactionManager as DieselTransactionManager};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

mod models;
mod schema;

use models::*;
use schema::*;

use crate::api::{
    AgendaEntryId, BookingId, HolidayCalendarId, ListingId, ListingIdentityId, PhotographerId,
    ServiceAreaId, UserId,
};
use crate::db::repository::{
    clamp_retention_limit, AgendaRepository, BookingRepository, EngagementRepository,
    HolidayRepository, ListingRepository, RepositoryError, RepositoryResult,
    ServiceAreaRepository, TransactionManager, UserRepository,
};
use crate::db::{Tx, TxInner};
use crate::models::{
    AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, Booking, BookingDraft,
    BookingStatus, CalendarDatesFilter, CalendarFilter, HolidayCalendar,
    HolidayCalendarAssociation, HolidayDate, Listing, ListingStatus, OwnerResponseMetrics,
    ServiceArea, User,
};

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

diesel::sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let parse = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            database_url,
            max_pool_size: parse("PG_POOL_MAX", 10) as u32,
            min_pool_size: parse("PG_POOL_MIN", 1) as u32,
            connection_timeout_sec: parse("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: parse("PG_IDLE_TIMEOUT_SEC", 600),
        })
    }
}

/// Transaction handle of the Postgres backend: a pooled connection with an
/// open database transaction. Dropping the handle without a commit rolls
/// the transaction back.
pub struct PgTx {
    conn: PgPooled,
    read_only: bool,
    finished: bool,
}

impl PgTx {
    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if !self.finished {
            let _ = AnsiTransactionManager::rollback_transaction(&mut *self.conn);
        }
    }
}

/// Borrow the Postgres transaction out of the erased handle.
fn pg_tx_mut(tx: &mut Tx) -> RepositoryResult<&mut PgTx> {
    match &mut tx.inner {
        TxInner::Postgres(inner) => Ok(inner),
        #[allow(unreachable_patterns)]
        _ => Err(RepositoryError::transaction(
            "transaction handle does not belong to the Postgres backend",
        )),
    }
}

fn ensure_writable(pg: &PgTx) -> RepositoryResult<()> {
    if pg.read_only {
        return Err(RepositoryError::transaction(
            "write attempted on a read-only transaction",
        ));
    }
    Ok(())
}

/// Postgres repository.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Build the pool and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .build(manager)
            .map_err(|e| RepositoryError::connection(e.to_string()))?;

        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| RepositoryError::configuration(format!("migration failure: {e}")))?;

        Ok(Self { pool })
    }

    fn begin_internal(&self, read_only: bool) -> RepositoryResult<Tx> {
        let mut conn = self.pool.get()?;
        AnsiTransactionManager::begin_transaction(&mut *conn)?;
        if read_only {
            diesel::sql_query("SET TRANSACTION READ ONLY").execute(&mut *conn)?;
        }
        Ok(Tx {
            inner: TxInner::Postgres(Box::new(PgTx {
                conn,
                read_only,
                finished: false,
            })),
        })
    }
}

#[async_trait]
impl TransactionManager for PostgresRepository {
    async fn begin(&self) -> RepositoryResult<Tx> {
        self.begin_internal(false)
    }

    async fn begin_read_only(&self) -> RepositoryResult<Tx> {
        self.begin_internal(true)
    }

    async fn commit(&self, tx: Tx) -> RepositoryResult<()> {
        match tx.inner {
            TxInner::Postgres(mut inner) => {
                inner.finished = true;
                AnsiTransactionManager::commit_transaction(&mut *inner.conn)?;
                Ok(())
            }
            #[allow(unreachable_patterns)]
            _ => Err(RepositoryError::transaction(
                "transaction handle does not belong to the Postgres backend",
            )),
        }
    }

    async fn rollback(&self, tx: Tx) -> RepositoryResult<()> {
        match tx.inner {
            TxInner::Postgres(mut inner) => {
                inner.finished = true;
                AnsiTransactionManager::rollback_transaction(&mut *inner.conn)?;
                Ok(())
            }
            #[allow(unreachable_patterns)]
            _ => Err(RepositoryError::transaction(
                "transaction handle does not belong to the Postgres backend",
            )),
        }
    }
}

#[async_trait]
impl AgendaRepository for PostgresRepository {
    async fn create_entries(
        &self,
        tx: &mut Tx,
        entries: &[AgendaEntryDraft],
    ) -> RepositoryResult<Vec<AgendaEntryId>> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;

        let mut ids = Vec::with_capacity(entries.len());
        for draft in entries {
            if !draft.is_well_formed() {
                return Err(RepositoryError::validation(
                    "agenda entry interval is empty or inverted",
                ));
            }

            if draft.blocking {
                // FOR UPDATE disallows aggregates; lock the ids and count here.
                let clash: Vec<i64> = t::photographer_agenda_entries
                    .filter(t::photographer_user_id.eq(draft.photographer_id.value()))
                    .filter(t::blocking.eq(true))
                    .filter(t::ends_at.gt(draft.starts_at))
                    .filter(t::starts_at.lt(draft.ends_at))
                    .select(t::id)
                    .for_update()
                    .load(pg.conn())?;
                if !clash.is_empty() {
                    return Err(RepositoryError::conflict("blocking agenda entries overlap"));
                }
            }

            let id: i64 = diesel::insert_into(t::photographer_agenda_entries)
                .values(NewAgendaEntryRow::from_draft(draft))
                .returning(t::id)
                .get_result(pg.conn())?;
            ids.push(AgendaEntryId(id));
        }

        Ok(ids)
    }

    async fn list_entries_by_range(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        entry_type: Option<AgendaEntryType>,
    ) -> RepositoryResult<Vec<AgendaEntry>> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        let mut query = t::photographer_agenda_entries
            .filter(t::photographer_user_id.eq(photographer_id.value()))
            .filter(t::ends_at.gt(from))
            .filter(t::starts_at.lt(to))
            .into_boxed();
        if let Some(ty) = entry_type {
            query = query.filter(t::entry_type.eq(ty.as_str()));
        }
        let rows: Vec<AgendaEntryRow> = query
            .order((t::starts_at.asc(), t::id.asc()))
            .load(pg.conn())?;
        rows.into_iter().map(AgendaEntryRow::into_domain).collect()
    }

    async fn find_blocking_entries(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AgendaEntry>> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        let rows: Vec<AgendaEntryRow> = t::photographer_agenda_entries
            .filter(t::photographer_user_id.eq(photographer_id.value()))
            .filter(t::blocking.eq(true))
            .filter(t::ends_at.gt(from))
            .filter(t::starts_at.lt(to))
            .order((t::starts_at.asc(), t::id.asc()))
            .load(pg.conn())?;
        rows.into_iter().map(AgendaEntryRow::into_domain).collect()
    }

    async fn get_entry_by_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        let row: AgendaEntryRow = t::photographer_agenda_entries
            .find(entry_id.value())
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn get_entry_by_id_for_update(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let row: AgendaEntryRow = t::photographer_agenda_entries
            .find(entry_id.value())
            .for_update()
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn update_entry(&self, tx: &mut Tx, entry: &AgendaEntry) -> RepositoryResult<()> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::update(t::photographer_agenda_entries.find(entry.id.value()))
            .set((
                t::photographer_user_id.eq(entry.photographer_id.value()),
                t::entry_type.eq(entry.entry_type.as_str()),
                t::source.eq(entry.source.as_str()),
                t::source_id.eq(entry.source_id),
                t::starts_at.eq(entry.starts_at),
                t::ends_at.eq(entry.ends_at),
                t::blocking.eq(entry.blocking),
                t::reason.eq(entry.reason.clone()),
                t::timezone.eq(entry.timezone.clone()),
            ))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("agenda entry not found"));
        }
        Ok(())
    }

    async fn update_entry_source_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
        source_id: i64,
    ) -> RepositoryResult<()> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::update(t::photographer_agenda_entries.find(entry_id.value()))
            .set(t::source_id.eq(Some(source_id)))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("agenda entry not found"));
        }
        Ok(())
    }

    async fn delete_entry_by_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<()> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::delete(t::photographer_agenda_entries.find(entry_id.value()))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("agenda entry not found"));
        }
        Ok(())
    }

    async fn delete_entries_by_source(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        entry_type: AgendaEntryType,
        source: AgendaEntrySource,
        source_id: Option<i64>,
    ) -> RepositoryResult<u64> {
        use photographer_agenda_entries::dsl as t;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let mut query = diesel::delete(
            t::photographer_agenda_entries
                .filter(t::photographer_user_id.eq(photographer_id.value()))
                .filter(t::entry_type.eq(entry_type.as_str()))
                .filter(t::source.eq(source.as_str())),
        )
        .into_boxed();
        if let Some(sid) = source_id {
            query = query.filter(t::source_id.eq(sid));
        }
        let affected = query.execute(pg.conn())?;
        Ok(affected as u64)
    }

    async fn delete_old_agenda_entries(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64> {
        use photo_session_bookings::dsl as b;
        use photographer_agenda_entries::dsl as t;

        let limit = clamp_retention_limit(limit) as i64;
        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;

        let doomed = t::photographer_agenda_entries
            .select(t::id)
            .filter(t::ends_at.lt(cutoff))
            .filter(
                t::id.ne_all(b::photo_session_bookings.select(b::agenda_entry_id)),
            )
            .order(t::id.asc())
            .limit(limit);
        let affected = diesel::delete(t::photographer_agenda_entries.filter(t::id.eq_any(doomed)))
            .execute(pg.conn())?;
        Ok(affected as u64)
    }
}

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn create_booking(
        &self,
        tx: &mut Tx,
        booking: &BookingDraft,
    ) -> RepositoryResult<BookingId> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;

        if booking.status.is_open() {
            let open_statuses = ["PENDING_APPROVAL", "ACCEPTED", "ACTIVE"];
            let clash: Vec<i64> = b::photo_session_bookings
                .filter(b::listing_identity_id.eq(booking.listing_identity_id.value()))
                .filter(b::status.eq_any(open_statuses))
                .select(b::id)
                .for_update()
                .load(pg.conn())?;
            if !clash.is_empty() {
                return Err(RepositoryError::conflict(
                    "listing identity already has a non-terminal booking",
                ));
            }
        }

        let id: i64 = diesel::insert_into(b::photo_session_bookings)
            .values(NewBookingRow::from_draft(booking))
            .returning(b::id)
            .get_result(pg.conn())?;
        Ok(BookingId(id))
    }

    async fn update_booking(&self, tx: &mut Tx, booking: &Booking) -> RepositoryResult<()> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::update(b::photo_session_bookings.find(booking.id.value()))
            .set((
                b::agenda_entry_id.eq(booking.agenda_entry_id.value()),
                b::photographer_user_id.eq(booking.photographer_id.value()),
                b::listing_identity_id.eq(booking.listing_identity_id.value()),
                b::starts_at.eq(booking.starts_at),
                b::ends_at.eq(booking.ends_at),
                b::status.eq(booking.status.as_str()),
                b::reason.eq(booking.reason.clone()),
                b::reservation_token.eq(booking.reservation_token.clone()),
                b::reserved_until.eq(booking.reserved_until),
            ))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("booking not found"));
        }
        Ok(())
    }

    async fn update_booking_status(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<()> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;

        let row: BookingRow = b::photo_session_bookings
            .find(booking_id.value())
            .for_update()
            .first(pg.conn())?;
        let current = row.into_domain()?;
        if !current.status.can_transition_to(status) {
            return Err(RepositoryError::conflict(format!(
                "session not in transitionable state ({} -> {})",
                current.status, status
            )));
        }

        diesel::update(b::photo_session_bookings.find(booking_id.value()))
            .set(b::status.eq(status.as_str()))
            .execute(pg.conn())?;
        Ok(())
    }

    async fn get_booking_by_id(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
    ) -> RepositoryResult<Booking> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        let row: BookingRow = b::photo_session_bookings
            .find(booking_id.value())
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn get_booking_by_id_for_update(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
    ) -> RepositoryResult<Booking> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let row: BookingRow = b::photo_session_bookings
            .find(booking_id.value())
            .for_update()
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn find_booking_by_agenda_entry(
        &self,
        tx: &mut Tx,
        agenda_entry_id: AgendaEntryId,
    ) -> RepositoryResult<Booking> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        let row: BookingRow = b::photo_session_bookings
            .filter(b::agenda_entry_id.eq(agenda_entry_id.value()))
            .order(b::id.desc())
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn get_active_booking_by_listing_identity(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
    ) -> RepositoryResult<Booking> {
        use photo_session_bookings::dsl as b;

        let pg = pg_tx_mut(tx)?;
        let open_statuses = ["PENDING_APPROVAL", "ACCEPTED", "ACTIVE"];
        let row: BookingRow = b::photo_session_bookings
            .filter(b::listing_identity_id.eq(listing_identity_id.value()))
            .filter(b::status.eq_any(open_statuses))
            .order(b::id.desc())
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn delete_old_bookings(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64> {
        use photo_session_bookings::dsl as b;

        let limit = clamp_retention_limit(limit) as i64;
        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;

        let terminal = ["CANCELLED", "REJECTED", "DONE"];
        let doomed = b::photo_session_bookings
            .select(b::id)
            .filter(b::status.eq_any(terminal))
            .filter(b::ends_at.lt(cutoff))
            .order(b::id.asc())
            .limit(limit);
        let affected = diesel::delete(b::photo_session_bookings.filter(b::id.eq_any(doomed)))
            .execute(pg.conn())?;
        Ok(affected as u64)
    }
}

#[async_trait]
impl ListingRepository for PostgresRepository {
    async fn get_active_listing_version(
        &self,
        tx: &mut Tx,
        identity_id: ListingIdentityId,
    ) -> RepositoryResult<Listing> {
        use listings::dsl as l;

        let pg = pg_tx_mut(tx)?;
        let row: ListingRow = l::listings
            .filter(l::identity_id.eq(identity_id.value()))
            .filter(l::deleted.eq(false))
            .order(l::id.desc())
            .first(pg.conn())?;
        row.into_domain()
    }

    async fn get_listing_by_id(
        &self,
        tx: &mut Tx,
        listing_id: ListingId,
    ) -> RepositoryResult<Listing> {
        use listings::dsl as l;

        let pg = pg_tx_mut(tx)?;
        let row: ListingRow = l::listings.find(listing_id.value()).first(pg.conn())?;
        row.into_domain()
    }

    async fn update_listing_status(
        &self,
        tx: &mut Tx,
        listing_id: ListingId,
        new_status: ListingStatus,
        expected: ListingStatus,
    ) -> RepositoryResult<()> {
        use listings::dsl as l;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::update(
            l::listings
                .find(listing_id.value())
                .filter(l::status.eq(expected.as_str())),
        )
        .set(l::status.eq(new_status.as_str()))
        .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("listing not in expected status"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn get_user_by_id(&self, tx: &mut Tx, user_id: UserId) -> RepositoryResult<User> {
        use users::dsl as u;

        let pg = pg_tx_mut(tx)?;
        let row: UserRow = u::users.find(user_id.value()).first(pg.conn())?;
        Ok(row.into_domain())
    }

    async fn list_photographer_ids(&self, tx: &mut Tx) -> RepositoryResult<Vec<PhotographerId>> {
        use users::dsl as u;

        let pg = pg_tx_mut(tx)?;
        let ids: Vec<i64> = u::users
            .filter(u::photographer.eq(true))
            .select(u::id)
            .order(u::id.asc())
            .load(pg.conn())?;
        Ok(ids.into_iter().map(PhotographerId).collect())
    }

    async fn list_device_tokens_by_user_if_opted_in(
        &self,
        tx: &mut Tx,
        user_id: UserId,
    ) -> RepositoryResult<Vec<String>> {
        use user_device_tokens::dsl as d;

        let pg = pg_tx_mut(tx)?;
        let tokens: Vec<String> = d::user_device_tokens
            .filter(d::user_id.eq(user_id.value()))
            .filter(d::opted_in.eq(true))
            .select(d::token)
            .load(pg.conn())?;
        Ok(tokens)
    }
}

#[async_trait]
impl ServiceAreaRepository for PostgresRepository {
    async fn create_service_area(
        &self,
        tx: &mut Tx,
        area: &ServiceArea,
    ) -> RepositoryResult<ServiceAreaId> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        // Uniqueness is also enforced by a functional index on
        // (photographer_user_id, lower(city), lower(state)).
        let id: i64 = diesel::insert_into(a::photographer_service_areas)
            .values(NewServiceAreaRow {
                photographer_user_id: area.photographer_id.value(),
                city: area.city.clone(),
                state: area.state.clone(),
            })
            .returning(a::id)
            .get_result(pg.conn())?;
        Ok(ServiceAreaId(id))
    }

    async fn update_service_area(&self, tx: &mut Tx, area: &ServiceArea) -> RepositoryResult<()> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::update(a::photographer_service_areas.find(area.id.value()))
            .set((a::city.eq(area.city.clone()), a::state.eq(area.state.clone())))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("service area not found"));
        }
        Ok(())
    }

    async fn delete_service_area(
        &self,
        tx: &mut Tx,
        area_id: ServiceAreaId,
    ) -> RepositoryResult<()> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let affected = diesel::delete(a::photographer_service_areas.find(area_id.value()))
            .execute(pg.conn())?;
        if affected == 0 {
            return Err(RepositoryError::not_found("service area not found"));
        }
        Ok(())
    }

    async fn get_service_area_by_id(
        &self,
        tx: &mut Tx,
        area_id: ServiceAreaId,
    ) -> RepositoryResult<ServiceArea> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        let row: ServiceAreaRow = a::photographer_service_areas
            .find(area_id.value())
            .first(pg.conn())?;
        Ok(row.into_domain())
    }

    async fn list_service_areas_by_photographer(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<ServiceArea>> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        let rows: Vec<ServiceAreaRow> = a::photographer_service_areas
            .filter(a::photographer_user_id.eq(photographer_id.value()))
            .order(a::id.asc())
            .load(pg.conn())?;
        Ok(rows.into_iter().map(ServiceAreaRow::into_domain).collect())
    }

    async fn list_photographer_ids_by_location(
        &self,
        tx: &mut Tx,
        city: &str,
        state: &str,
    ) -> RepositoryResult<Vec<PhotographerId>> {
        use photographer_service_areas::dsl as a;

        let pg = pg_tx_mut(tx)?;
        let rows: Vec<i64> = a::photographer_service_areas
            .filter(lower(a::city).eq(city.trim().to_lowercase()))
            .filter(lower(a::state).eq(state.trim().to_lowercase()))
            .select(a::photographer_user_id)
            .distinct()
            .order(a::photographer_user_id.asc())
            .load(pg.conn())?;
        Ok(rows.into_iter().map(PhotographerId).collect())
    }
}

#[async_trait]
impl HolidayRepository for PostgresRepository {
    async fn list_calendars(
        &self,
        tx: &mut Tx,
        filter: &CalendarFilter,
    ) -> RepositoryResult<Vec<HolidayCalendar>> {
        use holiday_calendars::dsl as c;

        let pg = pg_tx_mut(tx)?;
        let page = filter.page.max(1) as i64;
        let limit = filter.limit.max(1) as i64;

        let mut query = c::holiday_calendars.into_boxed();
        if filter.only_active {
            query = query.filter(c::active.eq(true));
        }
        if let Some(scope) = filter.scope {
            query = query.filter(c::scope.eq(scope.as_str()));
        }
        if let Some(ref state) = filter.state {
            query = query.filter(c::state.eq(state.clone()));
        }
        if let Some(ref city) = filter.city {
            query = query.filter(c::city.eq(city.clone()));
        }

        let rows: Vec<HolidayCalendarRow> = query
            .order(c::id.asc())
            .offset((page - 1) * limit)
            .limit(limit)
            .load(pg.conn())?;
        rows.into_iter().map(HolidayCalendarRow::into_domain).collect()
    }

    async fn list_calendar_dates(
        &self,
        tx: &mut Tx,
        filter: &CalendarDatesFilter,
    ) -> RepositoryResult<Vec<HolidayDate>> {
        use holiday_calendar_dates::dsl as d;

        let pg = pg_tx_mut(tx)?;
        let page = filter.page.max(1) as i64;
        let limit = filter.limit.max(1) as i64;

        let rows: Vec<HolidayDateRow> = d::holiday_calendar_dates
            .filter(d::calendar_id.eq(filter.calendar_id.value()))
            .filter(d::holiday_date.ge(filter.from))
            .filter(d::holiday_date.le(filter.to))
            .order(d::holiday_date.asc())
            .offset((page - 1) * limit)
            .limit(limit)
            .load(pg.conn())?;
        Ok(rows.into_iter().map(HolidayDateRow::into_domain).collect())
    }

    async fn replace_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        calendar_ids: &[HolidayCalendarId],
    ) -> RepositoryResult<()> {
        use photographer_holiday_calendars::dsl as h;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        diesel::delete(
            h::photographer_holiday_calendars
                .filter(h::photographer_user_id.eq(photographer_id.value())),
        )
        .execute(pg.conn())?;
        for calendar_id in calendar_ids {
            diesel::insert_into(h::photographer_holiday_calendars)
                .values((
                    h::photographer_user_id.eq(photographer_id.value()),
                    h::calendar_id.eq(calendar_id.value()),
                ))
                .on_conflict_do_nothing()
                .execute(pg.conn())?;
        }
        Ok(())
    }

    async fn list_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<HolidayCalendarAssociation>> {
        use photographer_holiday_calendars::dsl as h;

        let pg = pg_tx_mut(tx)?;
        let rows: Vec<i64> = h::photographer_holiday_calendars
            .filter(h::photographer_user_id.eq(photographer_id.value()))
            .select(h::calendar_id)
            .order(h::calendar_id.asc())
            .load(pg.conn())?;
        Ok(rows
            .into_iter()
            .map(|calendar_id| HolidayCalendarAssociation {
                photographer_id,
                calendar_id: HolidayCalendarId(calendar_id),
            })
            .collect())
    }
}

#[async_trait]
impl EngagementRepository for PostgresRepository {
    async fn get_owner_response_metrics(
        &self,
        tx: &mut Tx,
        owner_id: UserId,
    ) -> RepositoryResult<OwnerResponseMetrics> {
        use owner_response_metrics::dsl as m;

        let pg = pg_tx_mut(tx)?;
        let row: OwnerResponseMetricsRow = m::owner_response_metrics
            .find(owner_id.value())
            .first(pg.conn())?;
        Ok(row.into_domain())
    }

    async fn upsert_owner_response_metrics(
        &self,
        tx: &mut Tx,
        metrics: &OwnerResponseMetrics,
    ) -> RepositoryResult<()> {
        use owner_response_metrics::dsl as m;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        diesel::insert_into(m::owner_response_metrics)
            .values((
                m::owner_id.eq(metrics.owner_id.value()),
                m::visit_avg_seconds.eq(metrics.visit_avg_seconds),
                m::visit_count.eq(metrics.visit_count as i64),
                m::visit_last_at.eq(metrics.visit_last_at),
                m::proposal_avg_seconds.eq(metrics.proposal_avg_seconds),
                m::proposal_count.eq(metrics.proposal_count as i64),
                m::proposal_last_at.eq(metrics.proposal_last_at),
            ))
            .on_conflict(m::owner_id)
            .do_update()
            .set((
                m::visit_avg_seconds.eq(metrics.visit_avg_seconds),
                m::visit_count.eq(metrics.visit_count as i64),
                m::visit_last_at.eq(metrics.visit_last_at),
                m::proposal_avg_seconds.eq(metrics.proposal_avg_seconds),
                m::proposal_count.eq(metrics.proposal_count as i64),
                m::proposal_last_at.eq(metrics.proposal_last_at),
            ))
            .execute(pg.conn())?;
        Ok(())
    }

    async fn increment_and_get_views(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<u64> {
        use listing_view_counters::dsl as v;

        let pg = pg_tx_mut(tx)?;
        ensure_writable(pg)?;
        let views: i64 = diesel::insert_into(v::listing_view_counters)
            .values((
                v::listing_identity_id.eq(listing_identity_id.value()),
                v::views.eq(1i64),
                v::last_view_at.eq(Some(at)),
            ))
            .on_conflict(v::listing_identity_id)
            .do_update()
            .set((v::views.eq(v::views + 1), v::last_view_at.eq(Some(at))))
            .returning(v::views)
            .get_result(pg.conn())?;
        Ok(views.max(0) as u64)
    }
}
