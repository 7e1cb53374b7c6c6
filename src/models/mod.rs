//! Domain entities of the scheduling core.
//!
//! Entities are plain product types; staged construction (insertion before
//! an id exists) goes through explicit draft builders instead of
//! setter-style mutation.

pub mod agenda;
pub mod booking;
pub mod engagement;
pub mod holiday;
pub mod listing;
pub mod service_area;
pub mod slot;
pub mod user;

pub use agenda::{AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType};
pub use booking::{Booking, BookingDraft, BookingStatus};
pub use engagement::{ListingViewCounter, OwnerResponseMetrics, ResponseKind};
pub use holiday::{
    CalendarDatesFilter, CalendarFilter, CalendarScope, HolidayCalendar,
    HolidayCalendarAssociation, HolidayDate,
};
pub use listing::{Listing, ListingStatus};
pub use service_area::ServiceArea;
pub use slot::{synthetic_slot_id, SlotId, SlotPeriod};
pub use user::{DeviceToken, User};
