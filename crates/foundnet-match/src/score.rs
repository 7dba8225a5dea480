//! Match scoring: text similarity weighted by the founder company's
//! funding stage.

use crate::similarity::similarity;

/// Weight applied when the stage is missing or outside the known vocabulary.
pub const DEFAULT_STAGE_WEIGHT: f64 = 0.5;

/// Fixed funding-stage vocabulary. Parsed case-insensitively; anything else
/// falls back to [`DEFAULT_STAGE_WEIGHT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingStage {
    PreSeed,
    Seed,
    SeriesA,
    SeriesB,
    SeriesC,
    Growth,
}

impl FundingStage {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pre_seed" => Some(Self::PreSeed),
            "seed" => Some(Self::Seed),
            "series_a" => Some(Self::SeriesA),
            "series_b" => Some(Self::SeriesB),
            "series_c" => Some(Self::SeriesC),
            "growth" => Some(Self::Growth),
            _ => None,
        }
    }

    /// Multiplicative weight on the similarity score. Earlier stages rank
    /// higher: seed-stage founders are the platform's core matching pool.
    pub fn weight(self) -> f64 {
        match self {
            Self::Seed => 1.0,
            Self::PreSeed => 0.9,
            Self::SeriesA => 0.8,
            Self::SeriesB => 0.7,
            Self::SeriesC => 0.6,
            Self::Growth => 0.5,
        }
    }
}

pub fn stage_weight(stage: Option<&str>) -> f64 {
    stage
        .and_then(FundingStage::parse)
        .map_or(DEFAULT_STAGE_WEIGHT, FundingStage::weight)
}

/// The company fields that feed the scorer, decoupled from the storage rows.
#[derive(Debug, Clone, Default)]
pub struct CompanyProfile {
    pub description: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
}

impl CompanyProfile {
    /// The single text the vectorizer sees: description then industry tag.
    fn text(&self) -> String {
        let description = self.description.as_deref().unwrap_or("");
        let industry = self.industry.as_deref().unwrap_or("");
        format!("{description} {industry}")
    }
}

/// Score a founder/investor pairing. Either party lacking a company forces
/// the score to 0.0; the stage weight always comes from the founder's side.
pub fn match_score(
    founder_company: Option<&CompanyProfile>,
    investor_company: Option<&CompanyProfile>,
) -> f64 {
    let (Some(founder), Some(investor)) = (founder_company, investor_company) else {
        return 0.0;
    };

    let base = similarity(&founder.text(), &investor.text());
    base * stage_weight(founder.funding_stage.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(description: &str, industry: &str, stage: &str) -> CompanyProfile {
        CompanyProfile {
            description: Some(description.to_string()),
            industry: Some(industry.to_string()),
            funding_stage: Some(stage.to_string()),
        }
    }

    #[test]
    fn stage_weights_match_table() {
        assert_eq!(stage_weight(Some("seed")), 1.0);
        assert_eq!(stage_weight(Some("pre_seed")), 0.9);
        assert_eq!(stage_weight(Some("series_a")), 0.8);
        assert_eq!(stage_weight(Some("series_b")), 0.7);
        assert_eq!(stage_weight(Some("series_c")), 0.6);
        assert_eq!(stage_weight(Some("growth")), 0.5);
    }

    #[test]
    fn stage_parse_is_case_insensitive() {
        assert_eq!(stage_weight(Some("Seed")), 1.0);
        assert_eq!(stage_weight(Some("SERIES_A")), 0.8);
    }

    #[test]
    fn unknown_or_missing_stage_uses_default() {
        assert_eq!(stage_weight(Some("ipo")), DEFAULT_STAGE_WEIGHT);
        assert_eq!(stage_weight(None), DEFAULT_STAGE_WEIGHT);
    }

    #[test]
    fn missing_company_forces_zero() {
        let c = company("AI analytics", "HealthTech", "seed");
        assert_eq!(match_score(None, Some(&c)), 0.0);
        assert_eq!(match_score(Some(&c), None), 0.0);
        assert_eq!(match_score(None, None), 0.0);
    }

    #[test]
    fn identical_seed_companies_score_near_one() {
        let a = company("AI analytics for healthcare", "HealthTech", "seed");
        let b = company("AI analytics for healthcare", "HealthTech", "seed");
        let score = match_score(Some(&a), Some(&b));
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn seed_outranks_growth_at_equal_similarity() {
        let investor = company("AI analytics for healthcare", "HealthTech", "seed");
        let seed = company("AI analytics for healthcare", "HealthTech", "seed");
        let growth = company("AI analytics for healthcare", "HealthTech", "growth");

        let seed_score = match_score(Some(&seed), Some(&investor));
        let growth_score = match_score(Some(&growth), Some(&investor));
        assert!(seed_score > growth_score);
        assert!((growth_score - 0.5).abs() < 1e-9, "got {growth_score}");
    }

    #[test]
    fn empty_descriptions_score_zero() {
        let a = CompanyProfile::default();
        let b = company("AI analytics", "HealthTech", "seed");
        assert_eq!(match_score(Some(&a), Some(&b)), 0.0);
    }
}
