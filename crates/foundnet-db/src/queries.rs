use crate::Database;
use crate::models::{CompanyRow, FundingRoundRow, MatchRow, MessageRow, ProjectRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn user_from_row(row: &Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
        bio: row.get(5)?,
        company_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn company_from_row(row: &Row) -> rusqlite::Result<CompanyRow> {
    Ok(CompanyRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        industry: row.get(3)?,
        funding_stage: row.get(4)?,
        valuation: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn match_from_row(row: &Row) -> rusqlite::Result<MatchRow> {
    Ok(MatchRow {
        id: row.get(0)?,
        founder_id: row.get(1)?,
        investor_id: row.get(2)?,
        score: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn message_from_row(row: &Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, email, password, name, role, bio, company_id, created_at";
const COMPANY_COLUMNS: &str =
    "id, name, description, industry, funding_stage, valuation, created_at";
const MATCH_COLUMNS: &str = "id, founder_id, investor_id, score, status, created_at";
const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, read, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: &str,
        bio: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (email, password, name, role, bio) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![email, password_hash, name, role, bio],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?
                .query_row([email], user_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?
                .query_row([id], user_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Partial profile update: absent fields keep their current value.
    pub fn update_user_profile(
        &self,
        id: i64,
        name: Option<&str>,
        bio: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                    name = COALESCE(?1, name),
                    bio = COALESCE(?2, bio),
                    password = COALESCE(?3, password)
                 WHERE id = ?4",
                params![name, bio, password_hash, id],
            )?;
            Ok(())
        })
    }

    pub fn users_by_role(&self, role: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id"
                ))?
                .query_map([role], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn users_for_company(&self, company_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE company_id = ?1 ORDER BY id"
                ))?
                .query_map([company_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Search other users by name/bio substring, exact role and company
    /// industry. All filters optional; the caller is always excluded.
    pub fn search_users(
        &self,
        exclude_id: i64,
        text: Option<&str>,
        role: Option<&str>,
        industry: Option<&str>,
        limit: u32,
    ) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {} FROM users u",
                USER_COLUMNS
                    .split(", ")
                    .map(|c| format!("u.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if industry.is_some() {
                sql.push_str(" JOIN companies c ON u.company_id = c.id");
            }
            sql.push_str(" WHERE u.id != ?1");

            let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(exclude_id)];

            if let Some(text) = text.filter(|t| !t.is_empty()) {
                let pattern = format!("%{text}%");
                sql.push_str(&format!(
                    " AND (u.name LIKE ?{0} OR u.bio LIKE ?{0})",
                    bindings.len() + 1
                ));
                bindings.push(Box::new(pattern));
            }
            if let Some(role) = role {
                sql.push_str(&format!(" AND u.role = ?{}", bindings.len() + 1));
                bindings.push(Box::new(role.to_string()));
            }
            if let Some(industry) = industry {
                sql.push_str(&format!(" AND c.industry = ?{}", bindings.len() + 1));
                bindings.push(Box::new(industry.to_string()));
            }

            sql.push_str(&format!(" ORDER BY u.id LIMIT ?{}", bindings.len() + 1));
            bindings.push(Box::new(limit));

            let rows = conn
                .prepare(&sql)?
                .query_map(
                    rusqlite::params_from_iter(bindings.iter().map(|b| b.as_ref())),
                    user_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Companies --

    /// Create a company and link the creating user to it, atomically.
    pub fn create_company_for_user(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        industry: &str,
        funding_stage: &str,
        valuation: Option<f64>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO companies (name, description, industry, funding_stage, valuation)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, description, industry, funding_stage, valuation],
            )?;
            let company_id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE users SET company_id = ?1 WHERE id = ?2",
                params![company_id, user_id],
            )?;
            tx.commit()?;
            Ok(company_id)
        })
    }

    pub fn get_company(&self, id: i64) -> Result<Option<CompanyRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(&format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"
                ))?
                .query_row([id], company_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Partial company update: absent fields keep their current value.
    pub fn update_company(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        industry: Option<&str>,
        funding_stage: Option<&str>,
        valuation: Option<f64>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE companies SET
                    name = COALESCE(?1, name),
                    description = COALESCE(?2, description),
                    industry = COALESCE(?3, industry),
                    funding_stage = COALESCE(?4, funding_stage),
                    valuation = COALESCE(?5, valuation)
                 WHERE id = ?6",
                params![name, description, industry, funding_stage, valuation, id],
            )?;
            Ok(())
        })
    }

    pub fn add_funding_round(
        &self,
        company_id: i64,
        round_type: &str,
        amount: f64,
        date: &str,
        investors: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO funding_rounds (company_id, round_type, amount, date, investors)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![company_id, round_type, amount, date, investors],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn funding_rounds_for_company(&self, company_id: i64) -> Result<Vec<FundingRoundRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT id, company_id, round_type, amount, date, investors, created_at
                     FROM funding_rounds WHERE company_id = ?1 ORDER BY date, id",
                )?
                .query_map([company_id], |row| {
                    Ok(FundingRoundRow {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        round_type: row.get(2)?,
                        amount: row.get(3)?,
                        date: row.get(4)?,
                        investors: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn projects_for_company(&self, company_id: i64) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT id, company_id, title, description, status, created_at
                     FROM projects WHERE company_id = ?1 ORDER BY id",
                )?
                .query_map([company_id], |row| {
                    Ok(ProjectRow {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        status: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Matches --

    /// The match linking two users, regardless of slot assignment.
    pub fn find_match_between(&self, user_a: i64, user_b: i64) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches
                     WHERE (founder_id = ?1 AND investor_id = ?2)
                        OR (founder_id = ?2 AND investor_id = ?1)"
                ))?
                .query_row([user_a, user_b], match_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Insert a pending match. Returns `None` when the unordered pair is
    /// already matched — the unique pair index makes this safe under
    /// concurrent inserts, unlike a separate existence check.
    pub fn create_match(
        &self,
        founder_id: i64,
        investor_id: i64,
        score: f64,
    ) -> Result<Option<MatchRow>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO matches (founder_id, investor_id, score, status)
                 VALUES (?1, ?2, ?3, 'pending')",
                params![founder_id, investor_id, score],
            );
            match inserted {
                Ok(_) => {
                    let id = conn.last_insert_rowid();
                    let row = query_match(conn, id)?
                        .ok_or_else(|| anyhow::anyhow!("match {} vanished after insert", id))?;
                    Ok(Some(row))
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_match(&self, id: i64) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| query_match(conn, id))
    }

    /// All matches the user participates in, either slot.
    pub fn matches_for_user(&self, user_id: i64) -> Result<Vec<MatchRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches
                     WHERE founder_id = ?1 OR investor_id = ?1 ORDER BY id"
                ))?
                .query_map([user_id], match_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_match_status(&self, id: i64, status: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE matches SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, content) VALUES (?1, ?2, ?3)",
                params![sender_id, receiver_id, content],
            )?;
            let id = conn.last_insert_rowid();
            let row = conn
                .prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?
                .query_row([id], message_from_row)?;
            Ok(row)
        })
    }

    /// Messages exchanged between two users in both directions, oldest
    /// first. Insertion id breaks same-second timestamp ties.
    pub fn messages_between(&self, user_a: i64, user_b: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE (sender_id = ?1 AND receiver_id = ?2)
                        OR (sender_id = ?2 AND receiver_id = ?1)
                     ORDER BY created_at, id"
                ))?
                .query_map([user_a, user_b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?
                .query_row([id], message_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn mark_message_read(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_match(conn: &Connection, id: i64) -> Result<Option<MatchRow>> {
    let row = conn
        .prepare(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"))?
        .query_row([id], match_from_row)
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, email: &str, name: &str, role: &str) -> i64 {
        db.create_user(email, "hash", name, role, None).unwrap()
    }

    #[test]
    fn user_roundtrip() {
        let db = test_db();
        let id = add_user(&db, "ada@example.com", "Ada", "founder");

        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, "founder");
        assert!(user.company_id.is_none());

        assert!(db.get_user_by_email("ada@example.com").unwrap().is_some());
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = test_db();
        add_user(&db, "ada@example.com", "Ada", "founder");
        assert!(db.create_user("ada@example.com", "h", "Imposter", "investor", None).is_err());
    }

    #[test]
    fn profile_update_is_partial() {
        let db = test_db();
        let id = add_user(&db, "ada@example.com", "Ada", "founder");

        db.update_user_profile(id, None, Some("building things"), None).unwrap();
        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.bio.as_deref(), Some("building things"));
        assert_eq!(user.password, "hash");
    }

    #[test]
    fn company_creation_links_owner() {
        let db = test_db();
        let user_id = add_user(&db, "ada@example.com", "Ada", "founder");
        let company_id = db
            .create_company_for_user(user_id, "Adanalytics", "AI analytics", "HealthTech", "seed", None)
            .unwrap();

        let user = db.get_user_by_id(user_id).unwrap().unwrap();
        assert_eq!(user.company_id, Some(company_id));

        let company = db.get_company(company_id).unwrap().unwrap();
        assert_eq!(company.funding_stage.as_deref(), Some("seed"));
        assert_eq!(db.users_for_company(company_id).unwrap().len(), 1);
    }

    #[test]
    fn company_update_is_partial() {
        let db = test_db();
        let user_id = add_user(&db, "ada@example.com", "Ada", "founder");
        let company_id = db
            .create_company_for_user(user_id, "Adanalytics", "AI analytics", "HealthTech", "seed", None)
            .unwrap();

        db.update_company(company_id, None, None, None, Some("series_a"), Some(2_000_000.0))
            .unwrap();
        let company = db.get_company(company_id).unwrap().unwrap();
        assert_eq!(company.name, "Adanalytics");
        assert_eq!(company.funding_stage.as_deref(), Some("series_a"));
        assert_eq!(company.valuation, Some(2_000_000.0));
    }

    #[test]
    fn search_filters_compose() {
        let db = test_db();
        let ada = add_user(&db, "ada@example.com", "Ada", "founder");
        let bob = add_user(&db, "bob@example.com", "Bob", "investor");
        let eve = add_user(&db, "eve@example.com", "Evelyn", "investor");
        db.create_company_for_user(bob, "Bobcap", "early stage fund", "HealthTech", "seed", None)
            .unwrap();

        // caller always excluded
        let all = db.search_users(ada, None, None, None, 20).unwrap();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![bob, eve]);

        let investors = db.search_users(ada, None, Some("investor"), None, 20).unwrap();
        assert_eq!(investors.len(), 2);

        let by_text = db.search_users(ada, Some("Eve"), None, None, 20).unwrap();
        assert_eq!(by_text.iter().map(|u| u.id).collect::<Vec<_>>(), vec![eve]);

        let by_industry = db
            .search_users(ada, None, None, Some("HealthTech"), 20)
            .unwrap();
        assert_eq!(by_industry.iter().map(|u| u.id).collect::<Vec<_>>(), vec![bob]);

        let limited = db.search_users(ada, None, None, None, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn match_pair_is_unique_in_either_order() {
        let db = test_db();
        let founder = add_user(&db, "f@example.com", "F", "founder");
        let investor = add_user(&db, "i@example.com", "I", "investor");

        let first = db.create_match(founder, investor, 0.8).unwrap();
        assert!(first.is_some());

        // Same pair again, both slot orders: the unique index rejects both.
        assert!(db.create_match(founder, investor, 0.8).unwrap().is_none());
        assert!(db.create_match(investor, founder, 0.8).unwrap().is_none());
    }

    #[test]
    fn find_match_between_ignores_slot_order() {
        let db = test_db();
        let founder = add_user(&db, "f@example.com", "F", "founder");
        let investor = add_user(&db, "i@example.com", "I", "investor");
        db.create_match(founder, investor, 0.5).unwrap();

        assert!(db.find_match_between(founder, investor).unwrap().is_some());
        assert!(db.find_match_between(investor, founder).unwrap().is_some());
        assert!(db.find_match_between(founder, founder).unwrap().is_none());
    }

    #[test]
    fn match_status_update_persists() {
        let db = test_db();
        let founder = add_user(&db, "f@example.com", "F", "founder");
        let investor = add_user(&db, "i@example.com", "I", "investor");
        let m = db.create_match(founder, investor, 0.5).unwrap().unwrap();
        assert_eq!(m.status, "pending");

        db.update_match_status(m.id, "accepted").unwrap();
        assert_eq!(db.get_match(m.id).unwrap().unwrap().status, "accepted");
    }

    #[test]
    fn messages_ordered_and_bidirectional() {
        let db = test_db();
        let a = add_user(&db, "a@example.com", "A", "founder");
        let b = add_user(&db, "b@example.com", "B", "investor");

        let m1 = db.insert_message(a, b, "hello").unwrap();
        let m2 = db.insert_message(b, a, "hi back").unwrap();
        let m3 = db.insert_message(a, b, "pitch deck attached").unwrap();

        let history = db.messages_between(a, b).unwrap();
        assert_eq!(
            history.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![m1.id, m2.id, m3.id]
        );
        // symmetric query
        assert_eq!(db.messages_between(b, a).unwrap().len(), 3);
        // unrelated pair sees nothing
        let c = add_user(&db, "c@example.com", "C", "investor");
        assert!(db.messages_between(a, c).unwrap().is_empty());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let db = test_db();
        let a = add_user(&db, "a@example.com", "A", "founder");
        let b = add_user(&db, "b@example.com", "B", "investor");
        let msg = db.insert_message(a, b, "hello").unwrap();
        assert!(!msg.read);

        db.mark_message_read(msg.id).unwrap();
        assert!(db.get_message(msg.id).unwrap().unwrap().read);

        db.mark_message_read(msg.id).unwrap();
        assert!(db.get_message(msg.id).unwrap().unwrap().read);
    }
}
