use chrono::NaiveDate;

use crate::error::FieldErrors;

/// Bookings occupy `[start, end)`: a check-out day may be the next check-in day.
pub fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && b_start < a_end
}

/// Checks a requested stay on its own, before it is compared with other bookings.
pub fn validate_stay(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if start < today {
        errors.insert(
            "startDate".to_string(),
            "startDate cannot be in the past".to_string(),
        );
    }
    if end <= start {
        errors.insert(
            "endDate".to_string(),
            "endDate cannot be on or before startDate".to_string(),
        );
    }
    errors
}

/// Field messages describing how a requested stay collides with an existing one.
/// Empty when the ranges don't overlap.
pub fn conflict_errors(
    existing_start: NaiveDate,
    existing_end: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !overlaps(existing_start, existing_end, start, end) {
        return errors;
    }

    let start_inside = existing_start <= start && start < existing_end;
    let end_inside = existing_start < end && end <= existing_end;
    // A request enclosing the existing stay collides on both ends.
    let encloses = !start_inside && !end_inside;

    if start_inside || encloses {
        errors.insert(
            "startDate".to_string(),
            "Start date conflicts with an existing booking".to_string(),
        );
    }
    if end_inside || encloses {
        errors.insert(
            "endDate".to_string(),
            "End date conflicts with an existing booking".to_string(),
        );
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, day).unwrap()
    }

    #[test]
    fn test_adjacent_stays_do_not_overlap() {
        assert!(!overlaps(d(1), d(5), d(5), d(8)));
        assert!(!overlaps(d(5), d(8), d(1), d(5)));
    }

    #[test]
    fn test_overlapping_stays() {
        assert!(overlaps(d(1), d(5), d(4), d(8)));
        assert!(overlaps(d(1), d(10), d(3), d(4)));
    }

    #[test]
    fn test_validate_stay() {
        assert!(validate_stay(d(2), d(4), d(1)).is_empty());
        assert!(validate_stay(d(2), d(2), d(1)).contains_key("endDate"));

        let past = validate_stay(d(1), d(3), d(2));
        assert!(past.contains_key("startDate"));
        assert!(!past.contains_key("endDate"));
    }

    #[test]
    fn test_conflict_fields() {
        let start_only = conflict_errors(d(1), d(5), d(3), d(9));
        assert!(start_only.contains_key("startDate"));
        assert!(!start_only.contains_key("endDate"));

        let end_only = conflict_errors(d(5), d(9), d(2), d(6));
        assert!(end_only.contains_key("endDate"));
        assert!(!end_only.contains_key("startDate"));

        let enclosing = conflict_errors(d(4), d(6), d(1), d(9));
        assert_eq!(enclosing.len(), 2);

        assert!(conflict_errors(d(1), d(5), d(5), d(9)).is_empty());
    }
}
