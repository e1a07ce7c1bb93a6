use chrono::{DateTime, NaiveDate, Utc};

/// Format a card's age as a human-readable string.
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - created).num_days().max(0) as u64;
    if days == 0 {
        "new".to_string()
    } else if days < 14 {
        format!("{days}d")
    } else if days < 60 {
        format!("{}w", days / 7)
    } else {
        format!("{}mo", days / 30)
    }
}

/// How a due date relates to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    Today,
    Upcoming,
}

pub fn due_status(due: NaiveDate, today: NaiveDate) -> DueStatus {
    match due.cmp(&today) {
        std::cmp::Ordering::Less => DueStatus::Overdue,
        std::cmp::Ordering::Equal => DueStatus::Today,
        std::cmp::Ordering::Greater => DueStatus::Upcoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "new");
        assert_eq!(format_age(now - Duration::days(3), now), "3d");
        assert_eq!(format_age(now - Duration::days(20), now), "2w");
        assert_eq!(format_age(now - Duration::days(90), now), "3mo");
    }

    #[test]
    fn test_future_created_is_new() {
        let now = Utc::now();
        assert_eq!(format_age(now + Duration::days(2), now), "new");
    }

    #[test]
    fn test_due_status() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        assert_eq!(due_status(today.pred_opt().unwrap(), today), DueStatus::Overdue);
        assert_eq!(due_status(today, today), DueStatus::Today);
        assert_eq!(due_status(today.succ_opt().unwrap(), today), DueStatus::Upcoming);
    }
}
