//! Database row types — these map directly to SQLite rows.
//! Distinct from the foundnet-types API models to keep the DB layer
//! independent.

use chrono::{DateTime, NaiveDateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub company_id: Option<i64>,
    pub created_at: String,
}

pub struct CompanyRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub valuation: Option<f64>,
    pub created_at: String,
}

pub struct FundingRoundRow {
    pub id: i64,
    pub company_id: i64,
    pub round_type: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub investors: Option<String>,
    pub created_at: String,
}

pub struct ProjectRow {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

pub struct MatchRow {
    pub id: i64,
    pub founder_id: i64,
    pub investor_id: i64,
    pub score: f64,
    pub status: String,
    pub created_at: String,
}

/// Parse a timestamp column into UTC. SQLite's `datetime('now')` stores
/// "YYYY-MM-DD HH:MM:SS" without a timezone; fall back to parsing that as
/// naive UTC when the value is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_datetime() {
        let ts = parse_timestamp("2025-06-01 12:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-06-01T12:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2025-06-01T12:30:00Z").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not a date").is_none());
    }
}
