//! Photographer service areas.

use serde::{Deserialize, Serialize};

use crate::api::{PhotographerId, ServiceAreaId};

/// A (city, state) pair a photographer serves. The pair is unique per
/// photographer, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: ServiceAreaId,
    pub photographer_id: PhotographerId,
    pub city: String,
    pub state: String,
}

impl ServiceArea {
    /// Case-insensitive uniqueness key for (city, state).
    pub fn location_key(city: &str, state: &str) -> (String, String) {
        (
            city.trim().to_lowercase(),
            state.trim().to_lowercase(),
        )
    }

    pub fn matches_location(&self, city: &str, state: &str) -> bool {
        ServiceArea::location_key(&self.city, &self.state)
            == ServiceArea::location_key(city, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_matching_ignores_case_and_padding() {
        let area = ServiceArea {
            id: ServiceAreaId(1),
            photographer_id: PhotographerId(7),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
        };
        assert!(area.matches_location("são paulo", "sp"));
        assert!(area.matches_location("  São Paulo ", "SP"));
        assert!(!area.matches_location("Campinas", "SP"));
    }
}
