//! Listing view consumed by the scheduling core.
//!
//! The listing state machine is owned by the listing subsystem; the core
//! only reads the active version and performs guarded status transitions
//! through the listing repository.

use serde::{Deserialize, Serialize};

use crate::api::{ListingId, ListingIdentityId, UserId};

/// Listing lifecycle statuses referenced by the scheduling core. The full
/// listing machine has more states; anything outside the photo pipeline is
/// collapsed into the publication statuses here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Draft,
    PendingPhotoScheduling,
    PendingPhotoConfirmation,
    PhotosScheduled,
    Published,
    Suspended,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "DRAFT",
            ListingStatus::PendingPhotoScheduling => "PENDING_PHOTO_SCHEDULING",
            ListingStatus::PendingPhotoConfirmation => "PENDING_PHOTO_CONFIRMATION",
            ListingStatus::PhotosScheduled => "PHOTOS_SCHEDULED",
            ListingStatus::Published => "PUBLISHED",
            ListingStatus::Suspended => "SUSPENDED",
        }
    }

    /// Whether a photo session may be listed/reserved for a listing in this
    /// status.
    pub fn allows_photo_session(&self) -> bool {
        matches!(
            self,
            ListingStatus::PendingPhotoScheduling
                | ListingStatus::PendingPhotoConfirmation
                | ListingStatus::PhotosScheduled
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read model of one listing version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub identity_id: ListingIdentityId,
    pub user_id: UserId,
    pub status: ListingStatus,
    pub deleted: bool,
    pub city: String,
    pub state: String,
    pub code: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_pipeline_statuses_allow_sessions() {
        assert!(ListingStatus::PendingPhotoScheduling.allows_photo_session());
        assert!(ListingStatus::PendingPhotoConfirmation.allows_photo_session());
        assert!(ListingStatus::PhotosScheduled.allows_photo_session());
        assert!(!ListingStatus::Draft.allows_photo_session());
        assert!(!ListingStatus::Published.allows_photo_session());
    }
}
