use std::cmp::Ordering;
use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use foundnet_db::Database;
use foundnet_db::models::{MatchRow, UserRow};
use foundnet_match::{CompanyProfile, MAX_RECOMMENDATIONS, SCORE_THRESHOLD, match_score};
use foundnet_types::api::{
    Claims, ConnectRequest, MatchCandidate, MatchResponse, MatchStatus, RecommendationsResponse,
    UpdateMatchStatusRequest, UserRole,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::views;

fn match_response(row: &MatchRow) -> anyhow::Result<MatchResponse> {
    let status = MatchStatus::parse(&row.status)
        .ok_or_else(|| anyhow::anyhow!("corrupt status '{}' on match {}", row.status, row.id))?;
    Ok(MatchResponse {
        id: row.id,
        founder_id: row.founder_id,
        investor_id: row.investor_id,
        match_score: row.score,
        status,
    })
}

fn company_profile(db: &Database, user: &UserRow) -> anyhow::Result<Option<CompanyProfile>> {
    let Some(company_id) = user.company_id else {
        return Ok(None);
    };
    Ok(db.get_company(company_id)?.map(|c| CompanyProfile {
        description: c.description,
        industry: c.industry,
        funding_stage: c.funding_stage,
    }))
}

/// Score a pairing with the founder's company in the founder slot,
/// whichever side the caller is on.
fn score_pair(db: &Database, founder: &UserRow, investor: &UserRow) -> anyhow::Result<f64> {
    let founder_company = company_profile(db, founder)?;
    let investor_company = company_profile(db, investor)?;
    Ok(match_score(
        founder_company.as_ref(),
        investor_company.as_ref(),
    ))
}

/// Enumerate opposite-role candidates, drop anyone already matched with the
/// user, score the rest and keep those above the threshold, sorted by score
/// descending with candidate id ascending as the deterministic tiebreak.
/// Returns at most [`MAX_RECOMMENDATIONS`]. Pure read: nothing is persisted.
pub fn rank_candidates(db: &Database, user: &UserRow) -> anyhow::Result<Vec<(UserRow, f64)>> {
    let role = UserRole::parse(&user.role)
        .ok_or_else(|| anyhow::anyhow!("corrupt role '{}' for user {}", user.role, user.id))?;

    let already_matched: HashSet<i64> = db
        .matches_for_user(user.id)?
        .iter()
        .map(|m| {
            if m.founder_id == user.id {
                m.investor_id
            } else {
                m.founder_id
            }
        })
        .collect();

    let mut scored = Vec::new();
    for candidate in db.users_by_role(role.opposite().as_str())? {
        if candidate.id == user.id || already_matched.contains(&candidate.id) {
            continue;
        }

        let score = match role {
            UserRole::Founder => score_pair(db, user, &candidate)?,
            UserRole::Investor => score_pair(db, &candidate, user)?,
        };

        if score > SCORE_THRESHOLD {
            scored.push((candidate, score));
        }
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.id.cmp(&b.0.id))
    });
    scored.truncate(MAX_RECOMMENDATIONS);
    Ok(scored)
}

pub async fn get_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let matches = blocking(move || {
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;

        let ranked = rank_candidates(&db.db, &user)?;
        let matches = ranked
            .iter()
            .map(|(candidate, score)| {
                Ok(MatchCandidate {
                    user: views::public_user(&db.db, candidate)?,
                    match_score: *score,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(matches)
    })
    .await?;

    Ok(Json(RecommendationsResponse { matches }))
}

pub async fn connect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let db = state.clone();
    let created = blocking(move || {
        let current = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        let target = db
            .db
            .get_user_by_id(req.target_user_id)?
            .ok_or_else(|| ApiError::not_found("target user not found"))?;

        // Slot assignment follows the two roles; a same-role pair cannot
        // fill both slots.
        let (founder, investor) = match (views::user_role(&current)?, views::user_role(&target)?) {
            (UserRole::Founder, UserRole::Investor) => (current, target),
            (UserRole::Investor, UserRole::Founder) => (target, current),
            _ => {
                return Err(ApiError::bad_request(
                    "matches connect a founder with an investor",
                ));
            }
        };

        let score = score_pair(&db.db, &founder, &investor)?;

        // The unique pair index decides; no separate existence check.
        let row = db
            .db
            .create_match(founder.id, investor.id, score)?
            .ok_or_else(|| ApiError::conflict("match already exists"))?;
        Ok(match_response(&row)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_match_status(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<UpdateMatchStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let new_status = MatchStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request("status must be pending, accepted or rejected"))?;

    let db = state.clone();
    let updated = blocking(move || {
        let row = db
            .db
            .get_match(match_id)?
            .ok_or_else(|| ApiError::not_found("match not found"))?;

        if claims.sub != row.founder_id && claims.sub != row.investor_id {
            return Err(ApiError::forbidden("not a participant in this match"));
        }

        let current = MatchStatus::parse(&row.status).ok_or_else(|| {
            anyhow::anyhow!("corrupt status '{}' on match {}", row.status, row.id)
        })?;
        if !current.can_transition_to(new_status) {
            return Err(ApiError::conflict(format!(
                "cannot change a {} match to {}",
                current.as_str(),
                new_status.as_str()
            )));
        }

        db.db.update_match_status(match_id, new_status.as_str())?;
        let row = db
            .db
            .get_match(match_id)?
            .ok_or_else(|| anyhow::anyhow!("match {} vanished after update", match_id))?;
        Ok(match_response(&row)?)
    })
    .await?;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn founder(db: &Database, email: &str, description: &str, stage: &str) -> UserRow {
        let id = db.create_user(email, "hash", email, "founder", None).unwrap();
        db.create_company_for_user(id, email, description, "HealthTech", stage, None)
            .unwrap();
        db.get_user_by_id(id).unwrap().unwrap()
    }

    fn investor(db: &Database, email: &str, description: &str) -> UserRow {
        let id = db.create_user(email, "hash", email, "investor", None).unwrap();
        db.create_company_for_user(id, email, description, "HealthTech", "seed", None)
            .unwrap();
        db.get_user_by_id(id).unwrap().unwrap()
    }

    #[test]
    fn recommends_similar_opposite_role_users() {
        let db = Database::open_in_memory().unwrap();
        let f = founder(&db, "f@x.com", "AI analytics for healthcare", "seed");
        let similar = investor(&db, "i1@x.com", "AI analytics for healthcare");
        let unrelated = investor(&db, "i2@x.com", "deep sea mining ventures");

        let ranked = rank_candidates(&db, &f).unwrap();
        let ids: Vec<i64> = ranked.iter().map(|(u, _)| u.id).collect();
        assert!(ids.contains(&similar.id));
        assert!(!ids.contains(&unrelated.id));
        assert!((ranked[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn excludes_already_matched_candidates() {
        let db = Database::open_in_memory().unwrap();
        let f = founder(&db, "f@x.com", "AI analytics for healthcare", "seed");
        let matched = investor(&db, "i1@x.com", "AI analytics for healthcare");
        let fresh = investor(&db, "i2@x.com", "AI analytics for healthcare");
        db.create_match(f.id, matched.id, 0.9).unwrap();

        let ranked = rank_candidates(&db, &f).unwrap();
        let ids: Vec<i64> = ranked.iter().map(|(u, _)| u.id).collect();
        assert_eq!(ids, vec![fresh.id]);
    }

    #[test]
    fn works_from_the_investor_side() {
        let db = Database::open_in_memory().unwrap();
        let f = founder(&db, "f@x.com", "AI analytics for healthcare", "seed");
        let i = investor(&db, "i@x.com", "AI analytics for healthcare");

        let ranked = rank_candidates(&db, &i).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0.id, f.id);
        // same pair, same score as from the founder side
        let from_founder = rank_candidates(&db, &f).unwrap();
        assert_eq!(ranked[0].1, from_founder[0].1);
    }

    #[test]
    fn candidates_without_companies_never_appear() {
        let db = Database::open_in_memory().unwrap();
        let f = founder(&db, "f@x.com", "AI analytics for healthcare", "seed");
        db.create_user("bare@x.com", "hash", "Bare", "investor", None)
            .unwrap();

        let ranked = rank_candidates(&db, &f).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn founder_without_company_gets_no_recommendations() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_user("f@x.com", "hash", "F", "founder", None)
            .unwrap();
        let f = db.get_user_by_id(id).unwrap().unwrap();
        investor(&db, "i@x.com", "AI analytics for healthcare");

        assert!(rank_candidates(&db, &f).unwrap().is_empty());
    }

    #[test]
    fn output_is_bounded_sorted_and_above_threshold() {
        let db = Database::open_in_memory().unwrap();
        let f = founder(&db, "f@x.com", "AI analytics for healthcare", "seed");
        for i in 0..15 {
            investor(&db, &format!("i{i}@x.com"), "AI analytics for healthcare");
        }

        let ranked = rank_candidates(&db, &f).unwrap();
        assert_eq!(ranked.len(), MAX_RECOMMENDATIONS);
        for window in ranked.windows(2) {
            assert!(window[0].1 >= window[1].1);
            // equal scores fall back to ascending candidate id
            if window[0].1 == window[1].1 {
                assert!(window[0].0.id < window[1].0.id);
            }
        }
        assert!(ranked.iter().all(|(_, s)| *s > SCORE_THRESHOLD));
    }

    #[test]
    fn seed_stage_founder_outranks_growth_stage() {
        let db = Database::open_in_memory().unwrap();
        let i = investor(&db, "i@x.com", "AI analytics for healthcare");
        let seed = founder(&db, "seed@x.com", "AI analytics for healthcare", "seed");
        let growth = founder(&db, "growth@x.com", "AI analytics for healthcare", "growth");

        let ranked = rank_candidates(&db, &i).unwrap();
        let ids: Vec<i64> = ranked.iter().map(|(u, _)| u.id).collect();
        assert_eq!(ids, vec![seed.id, growth.id]);
    }
}
