pub mod score;
pub mod similarity;

pub use score::{CompanyProfile, FundingStage, match_score, stage_weight};
pub use similarity::similarity;

/// Candidates scoring at or below this are dropped from recommendations.
pub const SCORE_THRESHOLD: f64 = 0.3;

/// Recommendations are truncated to this many candidates.
pub const MAX_RECOMMENDATIONS: usize = 10;
