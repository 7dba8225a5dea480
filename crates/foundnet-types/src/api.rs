use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between foundnet-api (REST middleware) and
/// foundnet-gateway (WebSocket identify handshake). Canonical definition
/// lives here to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub name: String,
    pub exp: usize,
}

// -- User roles --

/// The two mutually exclusive roles that drive match-direction logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Founder,
    Investor,
}

impl UserRole {
    pub fn opposite(self) -> Self {
        match self {
            Self::Founder => Self::Investor,
            Self::Investor => Self::Founder,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Founder => "founder",
            Self::Investor => "investor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "founder" => Some(Self::Founder),
            "investor" => Some(Self::Investor),
            _ => None,
        }
    }
}

// -- Match status --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Legal transitions: a pending match may be accepted or rejected;
    /// re-asserting the current status is a no-op. Everything else is a
    /// conflict.
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || self == Self::Pending
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub name: String,
    pub role: UserRole,
    pub token: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub valuation: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub company: Option<CompanySummary>,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub company: Option<CompanySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<PublicUser>,
}

// -- Companies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub funding_stage: String,
    #[serde(default)]
    pub valuation: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub valuation: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub valuation: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompanyMember {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct FundingRoundResponse {
    pub id: i64,
    pub round_type: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<chrono::DateTime<chrono::Utc>>,
    pub investors: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyDetailResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub valuation: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub users: Vec<CompanyMember>,
    pub funding_rounds: Vec<FundingRoundResponse>,
    pub projects: Vec<ProjectResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddFundingRoundRequest {
    pub round_type: String,
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub investors: Option<String>,
}

// -- Matchmaking --

#[derive(Debug, Serialize)]
pub struct MatchCandidate {
    pub user: PublicUser,
    pub match_score: f64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub matches: Vec<MatchCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectRequest {
    pub target_user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub id: i64,
    pub founder_id: i64,
    pub investor_id: i64,
    pub match_score: f64,
    pub status: MatchStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMatchStatusRequest {
    pub status: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub read: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<MessageResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_opposite_flips() {
        assert_eq!(UserRole::Founder.opposite(), UserRole::Investor);
        assert_eq!(UserRole::Investor.opposite(), UserRole::Founder);
    }

    #[test]
    fn status_transitions() {
        use MatchStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Accepted.can_transition_to(Accepted));
        assert!(!Accepted.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Pending));
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(MatchStatus::parse("accepted"), Some(MatchStatus::Accepted));
        assert_eq!(MatchStatus::parse("ghosted"), None);
    }
}
