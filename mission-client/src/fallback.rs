//! Last-resort mission list, shown when the proxy cannot be reached.

use mission_common::normalize::normalize_launches;
use mission_common::{NormalizedLaunch, StatusPolicy};

use crate::error::Result;

const FALLBACK_MISSIONS: &str = include_str!("../data/fallback_missions.json");

/// The bundled missions, normalized like a proxy response.
pub fn missions() -> Result<Vec<NormalizedLaunch>> {
    let raw: serde_json::Value = serde_json::from_str(FALLBACK_MISSIONS)?;
    Ok(normalize_launches(&raw, StatusPolicy::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_common::{MissionSuccess, StatusCategory};

    #[test]
    fn test_fallback_missions_are_normalized() {
        let missions = missions().unwrap();
        assert_eq!(missions.len(), 6);

        let artemis = &missions[0];
        assert_eq!(artemis.name, "Artemis III");
        assert_eq!(artemis.agency, "NASA");
        assert_eq!(artemis.status_category, StatusCategory::Scheduled);
        assert_eq!(artemis.launch_date.as_deref(), Some("2025-12-01"));
        assert_eq!(artemis.location, "Unknown");

        let exomars = missions.iter().find(|m| m.name == "ExoMars").unwrap();
        assert_eq!(exomars.agency, "ESA/Roscosmos");
        assert_eq!(exomars.status_category, StatusCategory::Planned);

        let juice = missions.iter().find(|m| m.name == "JUICE").unwrap();
        assert_eq!(juice.status_category, StatusCategory::InProgress);

        let osiris = missions.last().unwrap();
        assert_eq!(osiris.success, MissionSuccess::Success);
    }
}
