/// Date windows and date parsing in UTC
///
/// Dashboards and default ranges are computed against UTC calendar
/// boundaries.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};

/// Inclusive `[start, end]` time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// The five sales-dashboard windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardWindows {
    pub today: Window,
    pub yesterday: Window,

    /// Today and the six days before it
    pub week: Window,

    pub month: Window,
    pub year: Window,
}

/// Midnight UTC of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// First instant of the UTC calendar month containing `now`
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// First instant of the UTC calendar year containing `now`
pub fn year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Builds today/yesterday/week/month/year windows
///
/// Every window except `yesterday` ends at the last millisecond of today.
/// `yesterday` ends one millisecond before today starts.
pub fn dashboard_windows(now: DateTime<Utc>) -> DashboardWindows {
    let today_start = start_of_day(now);
    let today_end = today_start + Duration::days(1) - Duration::milliseconds(1);
    let yesterday_start = today_start - Duration::days(1);

    DashboardWindows {
        today: Window::new(today_start, today_end),
        yesterday: Window::new(yesterday_start, today_start - Duration::milliseconds(1)),
        week: Window::new(today_start - Duration::days(6), today_end),
        month: Window::new(month_start(now), today_end),
        year: Window::new(year_start(now), today_end),
    }
}

/// `[now - months, now]`, clamping to the end of shorter months
pub fn months_back(now: DateTime<Utc>, months: u32) -> Window {
    let start = now
        .checked_sub_months(Months::new(months))
        .unwrap_or_else(|| now - Duration::days(30 * i64::from(months)));

    Window::new(start, now)
}

/// `[now - days, now]`
pub fn days_back(now: DateTime<Utc>, days: i64) -> Window {
    Window::new(now - Duration::days(days), now)
}

/// Resolves optional query bounds against a default window
pub fn resolve_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    default: Window,
) -> Window {
    Window::new(start.unwrap_or(default.start), end.unwrap_or(default.end))
}

/// Parses an ISO 8601 instant or a bare `YYYY-MM-DD` date (midnight UTC)
///
/// ```
/// use tallybook_shared::domain::period::parse_instant;
///
/// assert!(parse_instant("2025-03-01T10:00:00Z").is_some());
/// assert!(parse_instant("2025-03-01T10:00:00.123-03:00").is_some());
/// assert!(parse_instant("2025-03-01").is_some());
/// assert!(parse_instant("01/03/2025").is_none());
/// ```
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_dashboard_windows() {
        let now = at(2025, 3, 10, 15, 30);
        let w = dashboard_windows(now);

        assert_eq!(w.today.start, at(2025, 3, 10, 0, 0));
        assert_eq!(w.today.end, at(2025, 3, 11, 0, 0) - Duration::milliseconds(1));
        assert_eq!(w.yesterday.start, at(2025, 3, 9, 0, 0));
        assert!(!w.yesterday.contains(at(2025, 3, 10, 0, 0)));
        assert_eq!(w.week.start, at(2025, 3, 4, 0, 0));
        assert_eq!(w.month.start, at(2025, 3, 1, 0, 0));
        assert_eq!(w.year.start, at(2025, 1, 1, 0, 0));
        assert_eq!(w.year.end, w.today.end);
    }

    #[test]
    fn test_week_spans_month_boundary() {
        let w = dashboard_windows(at(2025, 3, 2, 8, 0));
        assert_eq!(w.week.start, at(2025, 2, 24, 0, 0));
        assert_eq!(w.month.start, at(2025, 3, 1, 0, 0));
    }

    #[test]
    fn test_months_back_clamps() {
        let w = months_back(at(2025, 3, 31, 12, 0), 1);
        assert_eq!(w.start, at(2025, 2, 28, 12, 0));
        assert_eq!(w.end, at(2025, 3, 31, 12, 0));
    }

    #[test]
    fn test_resolve_range_uses_defaults() {
        let now = at(2025, 3, 10, 0, 0);
        let default = days_back(now, 30);
        let explicit = at(2025, 1, 1, 0, 0);

        assert_eq!(resolve_range(None, None, default), default);
        let w = resolve_range(Some(explicit), None, default);
        assert_eq!(w.start, explicit);
        assert_eq!(w.end, now);
    }

    #[test]
    fn test_parse_instant_offsets_are_normalized() {
        let parsed = parse_instant("2025-03-01T10:00:00-03:00").unwrap();
        assert_eq!(parsed, at(2025, 3, 1, 13, 0));
        assert_eq!(parse_instant(" 2025-03-01 ").unwrap(), at(2025, 3, 1, 0, 0));
        assert!(parse_instant("").is_none());
    }
}
