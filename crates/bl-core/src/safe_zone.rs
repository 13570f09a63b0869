use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Mall,
    Cafe,
    PoliceStation,
}

impl ZoneKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Mall => "Mall",
            Self::Cafe => "Cafe",
            Self::PoliceStation => "Police Station",
        }
    }
}

/// Public place offered for in-person exchanges
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafeZone {
    pub id: u32,
    pub name: &'static str,
    pub city: &'static str,
    pub kind: ZoneKind,
    pub lat: f64,
    pub lng: f64,
}

const fn zone(
    id: u32,
    name: &'static str,
    city: &'static str,
    kind: ZoneKind,
    lat: f64,
    lng: f64,
) -> SafeZone {
    SafeZone {
        id,
        name,
        city,
        kind,
        lat,
        lng,
    }
}

const SAFE_ZONES: [SafeZone; 8] = [
    zone(1, "Inorbit Mall, Malad", "Mumbai", ZoneKind::Mall, 19.1873, 72.8392),
    zone(2, "Phoenix Marketcity", "Mumbai", ZoneKind::Mall, 19.0863, 72.8903),
    zone(3, "Starbucks, Linking Road", "Mumbai", ZoneKind::Cafe, 19.0654, 72.8323),
    zone(4, "Bandra Police Station", "Mumbai", ZoneKind::PoliceStation, 19.0544, 72.8355),
    zone(5, "Koramangala Police Station", "Bangalore", ZoneKind::PoliceStation, 12.9352, 77.6245),
    zone(6, "Forum Mall", "Bangalore", ZoneKind::Mall, 12.9347, 77.6106),
    zone(7, "Select Citywalk", "Delhi", ZoneKind::Mall, 28.5289, 77.2190),
    zone(8, "Sarojini Nagar Police Station", "Delhi", ZoneKind::PoliceStation, 28.5774, 77.1945),
];

pub fn all() -> &'static [SafeZone] {
    &SAFE_ZONES
}

pub fn find(id: u32) -> Option<&'static SafeZone> {
    SAFE_ZONES.iter().find(|zone| zone.id == id)
}

/// Zones in `city`, compared case-insensitively
pub fn for_city(city: &str) -> impl Iterator<Item = &'static SafeZone> + '_ {
    SAFE_ZONES
        .iter()
        .filter(move |zone| zone.city.eq_ignore_ascii_case(city.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_filter_ignores_case() {
        let ids: Vec<u32> = for_city("bangalore").map(|zone| zone.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(for_city("MUMBAI").count(), 4);
        assert_eq!(for_city("Pune").count(), 0);
    }

    #[test]
    fn test_find() {
        assert_eq!(find(7).map(|zone| zone.name), Some("Select Citywalk"));
        assert!(find(42).is_none());
    }
}
