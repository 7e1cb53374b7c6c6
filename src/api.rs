//! Identifier newtypes and small shared types crossing layer boundaries.
//!
//! All identifiers are opaque positive 64-bit integers. They derive
//! Serialize/Deserialize so DTOs built on top of them stay wire-friendly.

use serde::{Deserialize, Serialize};

/// Photographer identifier (user id of a photographer account).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PhotographerId(pub i64);

/// Listing version identifier (database primary key of one listing version).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub i64);

/// Stable listing identity across versions. Bookings reference the identity,
/// never a specific version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingIdentityId(pub i64);

/// User identifier (listing owner or photographer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Agenda entry identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AgendaEntryId(pub i64);

/// Photo session booking identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BookingId(pub i64);

/// Photographer service area identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAreaId(pub i64);

/// Holiday calendar identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolidayCalendarId(pub i64);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }

            /// Whether the identifier is in the valid (positive) range.
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }
    };
}

impl_id!(PhotographerId);
impl_id!(ListingId);
impl_id!(ListingIdentityId);
impl_id!(UserId);
impl_id!(AgendaEntryId);
impl_id!(BookingId);
impl_id!(ServiceAreaId);
impl_id!(HolidayCalendarId);

/// Pagination envelope shared by listing operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub const DEFAULT_PAGE: usize = 1;
    pub const DEFAULT_SIZE: usize = 20;
    pub const MAX_SIZE: usize = 100;

    /// Normalize a raw page/size pair: page defaults to 1, size defaults to
    /// 20 and is clamped to 100.
    pub fn normalized(page: usize, size: usize) -> Self {
        let page = if page == 0 { Self::DEFAULT_PAGE } else { page };
        let size = if size == 0 {
            Self::DEFAULT_SIZE
        } else {
            size.min(Self::MAX_SIZE)
        };
        PageRequest { page, size }
    }

    /// Slice a fully materialized result set down to this page.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let total = items.len();
        let start = ((self.page - 1) * self.size).min(total);
        let end = (start + self.size).min(total);
        items[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults() {
        let page = PageRequest::normalized(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.size, 20);
    }

    #[test]
    fn page_request_clamps_size() {
        let page = PageRequest::normalized(2, 500);
        assert_eq!(page.page, 2);
        assert_eq!(page.size, 100);
    }

    #[test]
    fn page_request_slices_tail() {
        let items: Vec<i32> = (0..45).collect();
        let page = PageRequest::normalized(3, 20);
        let slice = page.slice(&items);
        assert_eq!(slice, (40..45).collect::<Vec<_>>());
    }

    #[test]
    fn page_request_out_of_range_is_empty() {
        let items: Vec<i32> = (0..5).collect();
        let page = PageRequest::normalized(9, 20);
        assert!(page.slice(&items).is_empty());
    }

    #[test]
    fn ids_validate_positivity() {
        assert!(PhotographerId(7).is_valid());
        assert!(!PhotographerId(0).is_valid());
        assert!(!ListingIdentityId(-3).is_valid());
    }
}
