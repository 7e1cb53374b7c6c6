//! # Fotoagenda Backend
//!
//! Photo session scheduling core for a real-estate listing platform.
//!
//! This crate owns the transactional scheduler that reconciles a
//! photographer's working calendar, recurring holidays, explicit time-off
//! windows, in-flight reservations, and the lifecycle of a listing that
//! requires photography before publication. HTTP handlers, identifier
//! validation, media pipelines and message adapters live elsewhere; this
//! crate consumes their interfaces as collaborators (persistence, notifier,
//! clock, holiday catalog).
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier newtypes and shared DTOs crossing layer boundaries
//! - [`models`]: Domain entities (agenda entries, bookings, listings, holidays)
//! - [`db`]: Repository traits, transaction handling, and storage backends
//! - [`services`]: Scheduling business logic (availability, reservation,
//!   retention, notification dispatch)
//! - [`config`]: Immutable runtime configuration, loaded once at startup
//!
//! ## Concurrency model
//!
//! Every write that can change a photographer's occupied set runs inside a
//! single read-write transaction and is serialized per photographer through
//! pessimistic row locks. Listing lifecycle transitions are guarded updates
//! (`UPDATE … WHERE status = expected`), so racing reservations are detected
//! by affected-row count rather than by advisory locking.

pub mod api;
pub mod config;
pub mod error;

pub mod db;
pub mod models;
pub mod services;
