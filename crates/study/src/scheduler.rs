//! Spaced-repetition review schedule

use chrono::{DateTime, Duration, Utc};

/// Days after plan generation at which a review is due
pub const REVIEW_OFFSETS_DAYS: [i64; 3] = [2, 7, 21];

/// Review times for a plan generated at `now`
pub fn review_times(now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    REVIEW_OFFSETS_DAYS
        .iter()
        .map(|days| now + Duration::days(*days))
        .collect()
}

/// Label of the review at `index` within a schedule
pub fn review_label(index: usize) -> String {
    match REVIEW_OFFSETS_DAYS.get(index) {
        Some(days) if index + 1 == REVIEW_OFFSETS_DAYS.len() => {
            format!("Final review ({} days after your plan was created)", days)
        }
        Some(days) => format!("Review #{} ({} days after your plan was created)", index + 1, days),
        None => format!("Review #{}", index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_three_fixed_offsets() {
        let t = Utc.with_ymd_and_hms(2025, 1, 30, 15, 45, 0).unwrap();
        let times = review_times(t);

        assert_eq!(times.len(), 3);
        assert_eq!(times[0], Utc.with_ymd_and_hms(2025, 2, 1, 15, 45, 0).unwrap());
        assert_eq!(times[1], Utc.with_ymd_and_hms(2025, 2, 6, 15, 45, 0).unwrap());
        assert_eq!(times[2], Utc.with_ymd_and_hms(2025, 2, 20, 15, 45, 0).unwrap());
    }

    #[test]
    fn test_labels() {
        assert_eq!(review_label(0), "Review #1 (2 days after your plan was created)");
        assert_eq!(review_label(2), "Final review (21 days after your plan was created)");
        assert_eq!(review_label(5), "Review #6");
    }
}
