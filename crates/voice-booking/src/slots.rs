//! Pure slot generation over clinic hours (spec §4.3, §6).
//!
//! Slots run 9:00 AM through 4:30 PM inclusive at :00 and :30, excluding the
//! noon hour (12:00, 12:30) for lunch. Weekends have no slots at all.

use chrono::{Datelike, NaiveDate, Weekday};

/// `"H:MM AM/PM"`: no leading zero on the hour, two-digit minute, single
/// space, uppercase meridian (spec §6).
pub fn format_slot_label(hour_24: u32, minute: u32) -> String {
    let (hour_12, meridian) = match hour_24 {
        0 => (12, "AM"),
        1..=11 => (hour_24, "AM"),
        12 => (12, "PM"),
        13..=23 => (hour_24 - 12, "PM"),
        _ => unreachable!("hour out of range"),
    };
    format!("{hour_12}:{minute:02} {meridian}")
}

/// All bookable half-hour slot labels for a weekday, in natural time order.
/// Returns an empty vector for Saturdays and Sundays.
pub fn slots_for_date(date: NaiveDate) -> Vec<String> {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return Vec::new();
    }

    let mut labels = Vec::new();
    for hour in 9..=16 {
        if hour == 12 {
            continue; // lunch hour excluded entirely
        }
        for minute in [0, 30] {
            labels.push(format_slot_label(hour, minute));
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_tuesday_has_fourteen_slots_bounded_correctly() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(); // Tuesday
        let slots = slots_for_date(date);
        assert_eq!(slots.len(), 14);
        assert_eq!(slots.first().unwrap(), "9:00 AM");
        assert_eq!(slots.last().unwrap(), "4:30 PM");
        assert!(!slots.contains(&"12:00 PM".to_string()));
        assert!(!slots.contains(&"12:30 PM".to_string()));
    }

    #[test]
    fn saturday_has_no_slots() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(); // Saturday
        assert!(slots_for_date(date).is_empty());
    }

    #[test]
    fn sunday_has_no_slots() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(); // Sunday
        assert!(slots_for_date(date).is_empty());
    }

    #[test]
    fn label_format_has_no_leading_zero_on_hour() {
        assert_eq!(format_slot_label(9, 0), "9:00 AM");
        assert_eq!(format_slot_label(13, 30), "1:30 PM");
        assert_eq!(format_slot_label(16, 30), "4:30 PM");
    }
}
