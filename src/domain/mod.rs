//! Housing rules that hold independently of storage.
//!
//! [`dormitory`] owns the room-type capacity ceilings and the placeholder
//! attributes used for implicitly created rooms; [`ticket`] owns the repair
//! ticket transition table.

pub mod dormitory;
pub mod ticket;

/// Trims both parts of a building/room pair and returns them only when
/// neither is empty.
#[must_use]
pub fn normalize_location(building: &str, room_number: &str) -> Option<(String, String)> {
    let building = building.trim();
    let room_number = room_number.trim();

    if building.is_empty() || room_number.is_empty() {
        return None;
    }

    Some((building.to_string(), room_number.to_string()))
}

/// Maps a blank optional form field to `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_location() {
        assert_eq!(
            normalize_location(" 2号楼 ", "201 "),
            Some(("2号楼".to_string(), "201".to_string()))
        );
        assert_eq!(normalize_location("2号楼", "  "), None);
        assert_eq!(normalize_location("", "201"), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some(" A1 ")), Some("A1".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
