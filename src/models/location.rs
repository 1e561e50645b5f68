//! Location model for saved places and their display order

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Fresh opaque id for a new location
#[must_use]
pub fn new_location_id() -> String {
    Uuid::new_v4().to_string()
}

/// A user-chosen place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Opaque identity
    pub id: String,
    /// Display name, `None` when the user never named it
    pub name: Option<String>,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Position in the display sequence
    pub order: i64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, lat: f64, lon: f64, order: i64) -> Self {
        Self {
            id: id.into(),
            name,
            lat,
            lon,
            order,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// Label shown in lists; unnamed places fall back to their 1-based position
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Location {}", index + 1),
        }
    }

    fn apply(&mut self, patch: &LocationPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(lat) = patch.lat {
            self.lat = lat;
        }
        if let Some(lon) = patch.lon {
            self.lon = lon;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Partial update for a stored location. `None` leaves a field untouched;
/// in JSON an absent `name` keeps it and `"name": null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl LocationPatch {
    #[must_use]
    pub fn rename(name: Option<String>) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn reorder(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    /// Returns a copy of `location` with this patch applied
    #[must_use]
    pub fn applied_to(&self, location: &Location) -> Location {
        let mut next = location.clone();
        next.apply(self);
        next
    }
}

/// Sorts by `order` (stable, so ties keep their input sequence) and rewrites
/// `order` to the dense index.
#[must_use]
pub fn normalize_order(mut locations: Vec<Location>) -> Vec<Location> {
    locations.sort_by_key(|location| location.order);
    for (index, location) in locations.iter_mut().enumerate() {
        location.order = i64::try_from(index).unwrap_or(i64::MAX);
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn loc(id: &str, order: i64) -> Location {
        Location::new(id, None, 0.0, 0.0, order)
    }

    #[test]
    fn test_normalize_order_is_dense_and_sorted() {
        let normalized = normalize_order(vec![loc("c", 40), loc("a", -3), loc("b", 7)]);
        let ids: Vec<_> = normalized.iter().map(|l| l.id.as_str()).collect();
        let orders: Vec<_> = normalized.iter().map(|l| l.order).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_normalize_order_keeps_ties_stable() {
        let normalized = normalize_order(vec![loc("x", 1), loc("y", 1), loc("z", 0)]);
        let ids: Vec<_> = normalized.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_normalize_order_empty() {
        assert!(normalize_order(Vec::new()).is_empty());
    }

    #[rstest]
    #[case(Some("Lisbon"), 0, "Lisbon")]
    #[case(Some("  Porto  "), 3, "Porto")]
    #[case(Some("   "), 1, "Location 2")]
    #[case(None, 4, "Location 5")]
    fn test_label(#[case] name: Option<&str>, #[case] index: usize, #[case] expected: &str) {
        let location = Location::new("id", name.map(str::to_string), 1.0, 2.0, 0);
        assert_eq!(location.label(index), expected);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let original = Location::new("a", Some("Old".into()), 1.0, 2.0, 5);
        let patched = LocationPatch::rename(None).applied_to(&original);
        assert_eq!(patched.name, None);
        assert_eq!(patched.lat, 1.0);
        assert_eq!(patched.order, 5);

        let moved = LocationPatch::reorder(0).applied_to(&original);
        assert_eq!(moved.order, 0);
        assert_eq!(moved.name.as_deref(), Some("Old"));
    }

    #[test]
    fn test_format_coordinates() {
        let location = Location::new("a", None, 46.818_234, 8.227_456, 0);
        assert_eq!(location.format_coordinates(), "46.8182, 8.2275");
    }

    #[test]
    fn test_patch_json_distinguishes_clear_from_keep() {
        let keep: LocationPatch = serde_json::from_str(r#"{"order":2}"#).unwrap();
        assert_eq!(keep, LocationPatch::reorder(2));

        let clear: LocationPatch = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert_eq!(clear, LocationPatch::rename(None));

        let json = serde_json::to_string(&LocationPatch::rename(None)).unwrap();
        assert_eq!(json, r#"{"name":null}"#);
        let json = serde_json::to_string(&LocationPatch::rename(Some("Home".into()))).unwrap();
        assert_eq!(json, r#"{"name":"Home"}"#);
    }

    #[test]
    fn test_new_location_ids_are_unique() {
        let first = new_location_id();
        assert!(!first.is_empty());
        assert_ne!(first, new_location_id());
    }
}
