//! Row -> DTO shaping shared by the user, matchmaking and company handlers.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use foundnet_db::Database;
use foundnet_db::models::{CompanyRow, MessageRow, UserRow, parse_timestamp};
use foundnet_types::api::{CompanySummary, MessageResponse, PublicUser, UserProfile, UserRole};

pub fn company_summary(row: &CompanyRow) -> CompanySummary {
    CompanySummary {
        id: row.id,
        name: row.name.clone(),
        industry: row.industry.clone(),
        funding_stage: row.funding_stage.clone(),
        valuation: row.valuation,
    }
}

pub fn user_role(row: &UserRow) -> Result<UserRole> {
    UserRole::parse(&row.role)
        .ok_or_else(|| anyhow::anyhow!("corrupt role '{}' for user {}", row.role, row.id))
}

fn user_company(db: &Database, row: &UserRow) -> Result<Option<CompanySummary>> {
    let Some(company_id) = row.company_id else {
        return Ok(None);
    };
    Ok(db.get_company(company_id)?.as_ref().map(company_summary))
}

pub fn public_user(db: &Database, row: &UserRow) -> Result<PublicUser> {
    Ok(PublicUser {
        id: row.id,
        name: row.name.clone(),
        role: user_role(row)?,
        bio: row.bio.clone(),
        company: user_company(db, row)?,
    })
}

pub fn user_profile(db: &Database, row: &UserRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: row.id,
        email: row.email.clone(),
        name: row.name.clone(),
        role: user_role(row)?,
        bio: row.bio.clone(),
        company: user_company(db, row)?,
    })
}

/// Timestamps come back from SQLite as text; a corrupt value is logged and
/// replaced with the epoch rather than failing the whole response.
pub fn timestamp_or_default(raw: &str, context: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {}", raw, context);
        DateTime::default()
    })
}

pub fn message_response(row: &MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        content: row.content.clone(),
        created_at: timestamp_or_default(&row.created_at, &format!("message {}", row.id)),
        read: row.read,
    }
}
