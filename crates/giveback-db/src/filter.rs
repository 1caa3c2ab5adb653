//! Filter compilation.
//!
//! Listing endpoints accept a handful of optional, independently set filter
//! dimensions. Each filter type here turns whatever subset is present into a
//! single [`Query`]: one clause per supplied dimension, all joined with AND.
//! Nothing supplied compiles to the match-all query.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::queries::{query_user_by_id, query_user_by_username};
use crate::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    AtLeast,
    AtMost,
}

impl Op {
    fn sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::AtLeast => ">=",
            Op::AtMost => "<=",
        }
    }
}

/// One predicate against a column. Column names only ever come from this
/// crate; values are always bound as parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub column: &'static str,
    pub op: Op,
    pub value: String,
}

/// A conjunction of clauses against one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, column: &'static str, op: Op, value: impl Into<String>) -> Self {
        self.clauses.push(Clause {
            column,
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<String>) -> Self {
        self.and(column, Op::Eq, value)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Renders ` WHERE a = ?1 AND b >= ?2` (leading space included) together
    /// with the values to bind, or an empty string for the match-all query.
    pub fn where_sql(&self) -> (String, Vec<String>) {
        if self.clauses.is_empty() {
            return (String::new(), Vec::new());
        }

        let predicates: Vec<String> = self
            .clauses
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} {} ?{}", c.column, c.op.sql(), i + 1))
            .collect();
        let values = self.clauses.iter().map(|c| c.value.clone()).collect();

        (format!(" WHERE {}", predicates.join(" AND ")), values)
    }
}

/// Blank query parameters mean the client cleared that filter.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A date bound the client left unset arrives as blank or as a literal
/// `null`; anything that does not parse as `YYYY-MM-DD` counts as absent.
fn date_bound(value: &Option<String>) -> Option<NaiveDate> {
    present(value).and_then(|v| v.parse::<NaiveDate>().ok())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// Author username, resolved to an id before filtering.
    pub author: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl RequestFilter {
    /// Fails with [`DbError::NotFound`] when `author` names no known user.
    pub fn compile(&self, conn: &Connection) -> Result<Query> {
        let mut query = Query::all();

        if let Some(username) = present(&self.author) {
            let author = query_user_by_username(conn, username)?
                .ok_or_else(|| DbError::NotFound(format!("user {}", username)))?;
            query = query.eq("author_id", author.id);
        }
        if let Some(color) = present(&self.color) {
            query = query.eq("color", color);
        }
        if let Some(size) = present(&self.size) {
            query = query.eq("size", size);
        }

        Ok(query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Coordinator user id.
    pub coordinator: Option<String>,
    pub location: Option<String>,
    pub start_range: Option<String>,
    pub end_range: Option<String>,
}

impl EventFilter {
    /// The date range is a single dimension: it applies only when both ends
    /// are given, and selects events lying entirely inside it. One end on its
    /// own is dropped, not treated as an open range.
    pub fn compile(&self, conn: &Connection) -> Result<Query> {
        let mut query = Query::all();

        if let Some(coordinator) = present(&self.coordinator) {
            let user = query_user_by_id(conn, coordinator)?
                .ok_or_else(|| DbError::NotFound(format!("coordinator {}", coordinator)))?;
            query = query.eq("coordinator_id", user.id);
        }
        let range = (date_bound(&self.start_range), date_bound(&self.end_range));
        if let (Some(start), Some(end)) = range {
            query = query
                .and("start_date", Op::AtLeast, start.to_string())
                .and("end_date", Op::AtMost, end.to_string());
        }
        if let Some(location) = present(&self.location) {
            query = query.eq("location", location);
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::Database;
    use crate::models::{NewEvent, NewRequest};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn seed_requests(db: &Database) -> (String, String) {
        db.upsert_user("u-alice", "alice").unwrap();
        db.upsert_user("u-bob", "bob").unwrap();

        let base = Utc.with_ymd_and_hms(2022, 11, 1, 12, 0, 0).unwrap();
        let corpus = [
            ("u-alice", "blue", "M"),
            ("u-alice", "blue", "L"),
            ("u-alice", "red", "M"),
            ("u-bob", "blue", "M"),
            ("u-bob", "green", "S"),
        ];
        for (i, (author_id, color, size)) in corpus.into_iter().enumerate() {
            db.insert_request_at(
                NewRequest {
                    author_id,
                    contact: "555-0100",
                    description: "need warm clothes",
                    color,
                    size,
                },
                base + Duration::minutes(i as i64),
            )
            .unwrap();
        }
        ("u-alice".into(), "u-bob".into())
    }

    fn matching(db: &Database, filter: &RequestFilter) -> Vec<(String, String, String)> {
        db.with_conn(|conn| {
            let query = filter.compile(conn)?;
            crate::queries::query_requests(conn, &query)
        })
        .unwrap()
        .into_iter()
        .map(|r| (r.author_id, r.color, r.size))
        .collect()
    }

    #[test]
    fn test_where_sql_numbering() {
        let query = Query::all()
            .eq("color", "blue")
            .and("start_date", Op::AtLeast, "2022-01-01");
        let (sql, values) = query.where_sql();
        assert_eq!(sql, " WHERE color = ?1 AND start_date >= ?2");
        assert_eq!(values, vec!["blue", "2022-01-01"]);

        let (sql, values) = Query::all().where_sql();
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_no_dimensions_matches_all() {
        let db = Database::open_in_memory().unwrap();
        seed_requests(&db);
        let query = db
            .with_conn(|conn| RequestFilter::default().compile(conn))
            .unwrap();
        assert!(query.is_match_all());
        assert_eq!(matching(&db, &RequestFilter::default()).len(), 5);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let db = Database::open_in_memory().unwrap();
        seed_requests(&db);
        let filter = RequestFilter {
            author: some("  "),
            color: some(""),
            size: None,
        };
        let query = db.with_conn(|conn| filter.compile(conn)).unwrap();
        assert!(query.is_match_all());
    }

    #[test]
    fn test_color_size_subsets_are_conjunctive() {
        let db = Database::open_in_memory().unwrap();
        seed_requests(&db);

        let color = RequestFilter {
            color: some("blue"),
            ..Default::default()
        };
        assert_eq!(matching(&db, &color).len(), 3);

        let size = RequestFilter {
            size: some("M"),
            ..Default::default()
        };
        assert_eq!(matching(&db, &size).len(), 3);

        let both = RequestFilter {
            color: some("blue"),
            size: some("M"),
            ..Default::default()
        };
        let hits = matching(&db, &both);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|(_, c, s)| c == "blue" && s == "M"));

        // Matches each dimension individually but never both.
        let none = RequestFilter {
            color: some("green"),
            size: some("M"),
            ..Default::default()
        };
        assert!(matching(&db, &none).is_empty());
    }

    #[test]
    fn test_author_combined_with_other_dimensions() {
        let db = Database::open_in_memory().unwrap();
        let (alice, _) = seed_requests(&db);

        let all_three = RequestFilter {
            author: some("alice"),
            color: some("blue"),
            size: some("M"),
        };
        let hits = matching(&db, &all_three);
        assert_eq!(hits, vec![(alice.clone(), "blue".into(), "M".into())]);

        let author_size = RequestFilter {
            author: some("bob"),
            size: some("M"),
            ..Default::default()
        };
        assert_eq!(matching(&db, &author_size).len(), 1);

        let author_color = RequestFilter {
            author: some("alice"),
            color: some("blue"),
            ..Default::default()
        };
        assert_eq!(matching(&db, &author_color).len(), 2);
    }

    #[test]
    fn test_unknown_author_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        seed_requests(&db);
        let filter = RequestFilter {
            author: some("carol"),
            color: some("blue"),
            ..Default::default()
        };
        let err = db.with_conn(|conn| filter.compile(conn)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    fn seed_events(db: &Database) {
        db.upsert_user("u-coord", "coord").unwrap();
        db.upsert_user("u-other", "other").unwrap();

        let base = Utc.with_ymd_and_hms(2022, 10, 1, 9, 0, 0).unwrap();
        let corpus = [
            ("u-coord", "Boston", "2022-12-02", "2022-12-04"),
            ("u-coord", "Cambridge", "2022-12-10", "2022-12-11"),
            ("u-other", "Boston", "2023-01-05", "2023-01-06"),
            ("u-other", "Boston", "2022-11-28", "2022-12-03"),
        ];
        for (i, (coordinator_id, location, start, end)) in corpus.into_iter().enumerate() {
            db.insert_event_at(
                NewEvent {
                    coordinator_id,
                    description: "coat drive",
                    location,
                    start_date: date(start),
                    end_date: date(end),
                },
                base + Duration::hours(i as i64),
            )
            .unwrap();
        }
    }

    fn event_hits(db: &Database, filter: &EventFilter) -> usize {
        db.with_conn(|conn| {
            let query = filter.compile(conn)?;
            crate::queries::query_events(conn, &query)
        })
        .unwrap()
        .len()
    }

    #[test]
    fn test_date_range_requires_both_ends() {
        let db = Database::open_in_memory().unwrap();
        seed_events(&db);

        let december = EventFilter {
            start_range: some("2022-12-01"),
            end_range: some("2022-12-31"),
            ..Default::default()
        };
        assert_eq!(event_hits(&db, &december), 2);

        let start_only = EventFilter {
            start_range: some("2022-12-01"),
            ..Default::default()
        };
        let query = db.with_conn(|conn| start_only.compile(conn)).unwrap();
        assert!(query.is_match_all());
        assert_eq!(event_hits(&db, &start_only), 4);

        let end_only = EventFilter {
            end_range: some("2022-12-31"),
            ..Default::default()
        };
        assert_eq!(event_hits(&db, &end_only), 4);
    }

    #[test]
    fn test_start_only_still_combines_with_other_dimensions() {
        let db = Database::open_in_memory().unwrap();
        seed_events(&db);

        let filter = EventFilter {
            location: some("Boston"),
            start_range: some("2022-12-01"),
            ..Default::default()
        };
        let query = db.with_conn(|conn| filter.compile(conn)).unwrap();
        assert_eq!(query.clauses().len(), 1);
        assert_eq!(event_hits(&db, &filter), 3);
    }

    #[test]
    fn test_unset_date_bounds_are_absent() {
        let db = Database::open_in_memory().unwrap();
        seed_events(&db);

        for end in ["", "  ", "null", "12/31/2022"] {
            let filter = EventFilter {
                start_range: some("2022-12-01"),
                end_range: some(end),
                ..Default::default()
            };
            let query = db.with_conn(|conn| filter.compile(conn)).unwrap();
            assert!(query.is_match_all(), "end bound {:?}", end);
        }

        let blank_both = EventFilter {
            location: some("Boston"),
            start_range: some(""),
            end_range: some(""),
            ..Default::default()
        };
        assert_eq!(event_hits(&db, &blank_both), 3);
    }

    #[test]
    fn test_event_dimensions_conjunctive() {
        let db = Database::open_in_memory().unwrap();
        seed_events(&db);

        let coordinator = EventFilter {
            coordinator: some("u-coord"),
            ..Default::default()
        };
        assert_eq!(event_hits(&db, &coordinator), 2);

        let everything = EventFilter {
            coordinator: some("u-coord"),
            location: some("Boston"),
            start_range: some("2022-12-01"),
            end_range: some("2022-12-31"),
        };
        assert_eq!(event_hits(&db, &everything), 1);

        let location_range = EventFilter {
            location: some("Boston"),
            start_range: some("2022-12-01"),
            end_range: some("2023-01-31"),
            ..Default::default()
        };
        assert_eq!(event_hits(&db, &location_range), 2);
    }

    #[test]
    fn test_unknown_coordinator_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        seed_events(&db);
        let filter = EventFilter {
            coordinator: some("u-nobody"),
            ..Default::default()
        };
        let err = db.with_conn(|conn| filter.compile(conn)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
