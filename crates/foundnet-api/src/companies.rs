use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use foundnet_db::models::CompanyRow;
use foundnet_types::api::{
    AddFundingRoundRequest, Claims, CompanyDetailResponse, CompanyMember, CompanyResponse,
    CreateCompanyRequest, FundingRoundResponse, ProjectResponse, UpdateCompanyRequest, UserRole,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::views;

fn company_response(row: &CompanyRow) -> CompanyResponse {
    CompanyResponse {
        id: row.id,
        name: row.name.clone(),
        description: row.description.clone(),
        industry: row.industry.clone(),
        funding_stage: row.funding_stage.clone(),
        valuation: row.valuation,
    }
}

/// Accepts the ISO-8601 shapes the API has historically taken: full RFC 3339,
/// a naive datetime, or a bare date (midnight UTC).
fn parse_iso_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    if let Ok(nd) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(nd.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

pub async fn add_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if req.name.is_empty() || req.description.is_empty() || req.industry.is_empty()
        || req.funding_stage.is_empty()
    {
        return Err(ApiError::bad_request("missing required fields"));
    }

    let db = state.clone();
    let company = blocking(move || {
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        if views::user_role(&user)? != UserRole::Founder {
            return Err(ApiError::forbidden("only founders can add companies"));
        }

        let company_id = db.db.create_company_for_user(
            claims.sub,
            &req.name,
            &req.description,
            &req.industry,
            &req.funding_stage,
            req.valuation,
        )?;
        let row = db
            .db
            .get_company(company_id)?
            .ok_or_else(|| anyhow::anyhow!("company {} vanished after insert", company_id))?;
        Ok(company_response(&row))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let detail = blocking(move || {
        let row = db
            .db
            .get_company(company_id)?
            .ok_or_else(|| ApiError::not_found("company not found"))?;

        let users = db
            .db
            .users_for_company(company_id)?
            .iter()
            .map(|u| {
                Ok(CompanyMember {
                    id: u.id,
                    name: u.name.clone(),
                    role: views::user_role(u)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let funding_rounds = db
            .db
            .funding_rounds_for_company(company_id)?
            .iter()
            .map(|r| FundingRoundResponse {
                id: r.id,
                round_type: r.round_type.clone(),
                amount: r.amount,
                date: r.date.as_deref().and_then(foundnet_db::models::parse_timestamp),
                investors: r.investors.clone(),
            })
            .collect();

        let projects = db
            .db
            .projects_for_company(company_id)?
            .iter()
            .map(|p| ProjectResponse {
                id: p.id,
                title: p.title.clone(),
                description: p.description.clone(),
                status: p.status.clone(),
            })
            .collect();

        Ok(CompanyDetailResponse {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            industry: row.industry.clone(),
            funding_stage: row.funding_stage.clone(),
            valuation: row.valuation,
            created_at: views::timestamp_or_default(
                &row.created_at,
                &format!("company {}", row.id),
            ),
            users,
            funding_rounds,
            projects,
        })
    })
    .await?;

    Ok(Json(detail))
}

pub async fn add_funding_round(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<AddFundingRoundRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let date = parse_iso_datetime(&req.date)
        .ok_or_else(|| ApiError::bad_request("date must be ISO-8601"))?;

    let db = state.clone();
    let round = blocking(move || {
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        if user.company_id != Some(company_id) {
            return Err(ApiError::forbidden("not a member of this company"));
        }

        let round_id = db.db.add_funding_round(
            company_id,
            &req.round_type,
            req.amount,
            &date.to_rfc3339(),
            req.investors.as_deref(),
        )?;

        Ok(FundingRoundResponse {
            id: round_id,
            round_type: Some(req.round_type),
            amount: Some(req.amount),
            date: Some(date),
            investors: req.investors,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(round)))
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let db = state.clone();
    let company = blocking(move || {
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        if user.company_id != Some(company_id) {
            return Err(ApiError::forbidden("not a member of this company"));
        }

        db.db
            .get_company(company_id)?
            .ok_or_else(|| ApiError::not_found("company not found"))?;

        db.db.update_company(
            company_id,
            req.name.as_deref(),
            req.description.as_deref(),
            req.industry.as_deref(),
            req.funding_stage.as_deref(),
            req.valuation,
        )?;

        let row = db
            .db
            .get_company(company_id)?
            .ok_or_else(|| anyhow::anyhow!("company {} vanished after update", company_id))?;
        Ok(company_response(&row))
    })
    .await?;

    Ok(Json(company))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_rfc3339_datetime() {
        let dt = parse_iso_datetime("2024-06-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-15T10:30:00+00:00");
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let dt = parse_iso_datetime("2024-06-15T10:30:00").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.timezone(), Utc);
    }

    #[test]
    fn parses_bare_date_as_midnight_utc() {
        let dt = parse_iso_datetime("2024-06-15").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-15T00:00:00+00:00");
    }

    #[test]
    fn rejects_malformed_dates() {
        for raw in ["", "yesterday", "15/06/2024", "2024-13-40", "2024-06-15T99:00:00"] {
            assert!(parse_iso_datetime(raw).is_none(), "accepted {:?}", raw);
        }
    }
}
