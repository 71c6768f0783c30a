use serde::{Deserialize, Serialize};

/// Ceiling applied to any room type without a recognized occupancy label.
pub const DEFAULT_CEILING: i32 = 8;

/// Maximum declared capacity for a room type label.
///
/// # Examples
///
/// ```
/// use dormkeep::domain::dormitory::capacity_ceiling;
///
/// assert_eq!(capacity_ceiling("4人间"), 4);
/// assert_eq!(capacity_ceiling("6-person"), 6);
/// assert_eq!(capacity_ceiling("套间"), 8);
/// ```
#[must_use]
pub fn capacity_ceiling(room_type: &str) -> i32 {
    match room_type.trim() {
        "4人间" | "4-person" => 4,
        "6人间" | "6-person" => 6,
        "8人间" | "8-person" => 8,
        _ => DEFAULT_CEILING,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityViolation {
    AboveCeiling { ceiling: i32 },
    BelowMinimum,
}

/// Checks a declared capacity against `1..=capacity_ceiling(room_type)`.
/// The ceiling is checked first.
pub fn check_capacity(room_type: &str, capacity: i32) -> Result<(), CapacityViolation> {
    let ceiling = capacity_ceiling(room_type);

    if capacity > ceiling {
        return Err(CapacityViolation::AboveCeiling { ceiling });
    }

    if capacity < 1 {
        return Err(CapacityViolation::BelowMinimum);
    }

    Ok(())
}

/// Attributes for a dormitory created by resolution rather than by an
/// administrator. Capacity is not checked against the ceiling here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DormitoryDefaults {
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_ceiling() {
        assert_eq!(capacity_ceiling("4人间"), 4);
        assert_eq!(capacity_ceiling("6人间"), 6);
        assert_eq!(capacity_ceiling("8人间"), 8);
        assert_eq!(capacity_ceiling(" 4人间 "), 4);
        assert_eq!(capacity_ceiling("未指定"), DEFAULT_CEILING);
        assert_eq!(capacity_ceiling(""), DEFAULT_CEILING);
    }

    #[test]
    fn test_check_capacity() {
        assert!(check_capacity("4人间", 4).is_ok());
        assert!(check_capacity("4人间", 1).is_ok());
        assert_eq!(
            check_capacity("4人间", 5),
            Err(CapacityViolation::AboveCeiling { ceiling: 4 })
        );
        assert_eq!(
            check_capacity("6人间", 0),
            Err(CapacityViolation::BelowMinimum)
        );
        assert_eq!(
            check_capacity("双人间", 9),
            Err(CapacityViolation::AboveCeiling { ceiling: 8 })
        );
    }
}
