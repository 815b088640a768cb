//! SQLite-backed [`ApplicationRepository`].
//!
//! Status changes are single conditional `UPDATE`s keyed on both the id and the expected
//! status (and, for review edges, the reviewer the caller was checked against). The
//! update, the audit row, any review comment and any committee decision share one
//! transaction, so a losing caller leaves no trace. Votes, decision upserts and document
//! attachments carry their status check inside the `INSERT` itself.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::decisions::{DecisionOutcome, DecisionRecord, MemberVote};
use super::domain::{
    ApplicationId, ApplicationStatus, DocumentCategory, DocumentDescriptor, LoanProfile,
    ReferenceNumber, ReviewComment, Role, StatusChange,
};
use super::repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, Assignment, NewApplication,
    RepositoryError, ReviewerCheck, StatusTransition,
};
use super::transitions::ReviewerSlot;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS loan_applications (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        reference_number TEXT UNIQUE,
        relationship_manager_id TEXT NOT NULL,
        status TEXT NOT NULL,
        analyst_id TEXT,
        supervisor_id TEXT,
        profile_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_loan_applications_status ON loan_applications(status)",
    "CREATE TABLE IF NOT EXISTS application_documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_id TEXT NOT NULL REFERENCES loan_applications(id),
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        storage_key TEXT NOT NULL,
        content_type TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS review_comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_id TEXT NOT NULL REFERENCES loan_applications(id),
        author_id TEXT NOT NULL,
        role TEXT NOT NULL,
        status TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS status_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_id TEXT NOT NULL REFERENCES loan_applications(id),
        from_status TEXT NOT NULL,
        to_status TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        role TEXT NOT NULL,
        changed_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS committee_decisions (
        reference_number TEXT PRIMARY KEY,
        outcome TEXT NOT NULL,
        rationale TEXT NOT NULL,
        decided_by TEXT NOT NULL,
        decided_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS committee_votes (
        reference_number TEXT NOT NULL,
        member_id TEXT NOT NULL,
        vote TEXT NOT NULL,
        rationale TEXT NOT NULL,
        voted_at TEXT NOT NULL,
        PRIMARY KEY (reference_number, member_id)
    )",
];

const APPLICATION_COLUMNS: &str = "id, reference_number, relationship_manager_id, status, \
     analyst_id, supervisor_id, profile_json, created_at, updated_at";

/// Relational store for applications, decisions, and votes.
#[derive(Debug, Clone)]
pub struct SqliteApplicationStore {
    pool: SqlitePool,
}

impl SqliteApplicationStore {
    /// Connect to `database_url`, creating the file and schema when missing.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Transient database for tests and demos. A single connection keeps every query on
    /// the same in-memory database.
    pub async fn open_in_memory() -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, RepositoryError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("loan application schema ready");
        Ok(())
    }

    async fn current_status(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationStatus>, RepositoryError> {
        let row = sqlx::query("SELECT status FROM loan_applications WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<ApplicationStatus, RepositoryError> {
            parse_status(&row.try_get::<String, _>("status")?)
        })
        .transpose()
    }

    async fn status_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<ApplicationStatus>, RepositoryError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM loan_applications WHERE reference_number = ?1")
                .bind(reference.as_str())
                .fetch_optional(&self.pool)
                .await?;

        status.as_deref().map(parse_status).transpose()
    }

    /// Why a guarded write matched no row.
    async fn explain_miss(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        reviewer: Option<&ReviewerCheck>,
    ) -> Result<RepositoryError, RepositoryError> {
        let Some(actual) = self.current_status(id).await? else {
            return Ok(RepositoryError::NotFound);
        };
        let Some(check) = reviewer.filter(|_| actual == expected) else {
            return Ok(RepositoryError::Conflict { expected, actual });
        };

        let query = format!(
            "SELECT {} FROM loan_applications WHERE id = ?1",
            reviewer_column(check.slot)
        );
        let assigned: Option<String> = sqlx::query_scalar(&query)
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(RepositoryError::ReviewerChanged { assigned })
    }

    async fn reference_miss(
        &self,
        reference: &ReferenceNumber,
        expected: ApplicationStatus,
    ) -> Result<RepositoryError, RepositoryError> {
        Ok(match self.status_by_reference(reference).await? {
            Some(actual) => RepositoryError::Conflict { expected, actual },
            None => RepositoryError::NotFound,
        })
    }

    async fn hydrate(&self, row: SqliteRow) -> Result<ApplicationRecord, RepositoryError> {
        let id = ApplicationId(row.try_get("id")?);
        let reference: Option<String> = row.try_get("reference_number")?;
        let reference = reference
            .map(ReferenceNumber)
            .ok_or_else(|| RepositoryError::Corrupt(format!("application {id} has no reference")))?;
        let profile_json: String = row.try_get("profile_json")?;
        let profile: LoanProfile = serde_json::from_str(&profile_json)
            .map_err(|err| RepositoryError::Corrupt(format!("profile for {id}: {err}")))?;

        let documents = self.documents(&id).await?;
        let comments = self.comments(&id).await?;

        Ok(ApplicationRecord {
            reference,
            relationship_manager_id: row.try_get("relationship_manager_id")?,
            status: parse_status(&row.try_get::<String, _>("status")?)?,
            analyst_id: row.try_get("analyst_id")?,
            supervisor_id: row.try_get("supervisor_id")?,
            profile,
            documents,
            comments,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            id,
        })
    }

    async fn documents(&self, id: &ApplicationId) -> Result<Vec<DocumentDescriptor>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, category, storage_key, content_type FROM application_documents \
             WHERE application_id = ?1 ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<DocumentDescriptor, RepositoryError> {
                let category: String = row.try_get("category")?;
                Ok(DocumentDescriptor {
                    name: row.try_get("name")?,
                    category: DocumentCategory::from_str(&category).map_err(RepositoryError::Corrupt)?,
                    storage_key: row.try_get("storage_key")?,
                    content_type: row.try_get("content_type")?,
                })
            })
            .collect()
    }

    async fn comments(&self, id: &ApplicationId) -> Result<Vec<ReviewComment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT author_id, role, status, body, created_at FROM review_comments \
             WHERE application_id = ?1 ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ReviewComment, RepositoryError> {
                Ok(ReviewComment {
                    author_id: row.try_get("author_id")?,
                    role: parse_role(&row.try_get::<String, _>("role")?)?,
                    status: parse_status(&row.try_get::<String, _>("status")?)?,
                    body: row.try_get("body")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ApplicationRepository for SqliteApplicationStore {
    async fn insert(&self, application: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        let profile_json = serde_json::to_string(&application.profile)
            .map_err(|err| RepositoryError::Corrupt(err.to_string()))?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO loan_applications (id, relationship_manager_id, status, profile_json, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(application.id.as_str())
        .bind(&application.relationship_manager_id)
        .bind(ApplicationStatus::Pending.label())
        .bind(&profile_json)
        .bind(application.submitted_at)
        .execute(&mut *tx)
        .await?;

        let sequence = inserted.last_insert_rowid().max(0) as u64;
        let reference = ReferenceNumber::from_sequence(application.submitted_at.year(), sequence);
        sqlx::query("UPDATE loan_applications SET reference_number = ?1 WHERE id = ?2")
            .bind(reference.as_str())
            .bind(application.id.as_str())
            .execute(&mut *tx)
            .await?;

        for document in &application.documents {
            write_document(&mut tx, &application.id, document, application.submitted_at).await?;
        }

        tx.commit().await?;
        debug!(id = %application.id, %reference, "loan application stored");

        self.fetch(&application.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE id = ?1");
        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE reference_number = ?1"
        );
        let row = sqlx::query(&query)
            .bind(reference.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE 1 = 1"
        ));

        if !filter.statuses.is_empty() {
            builder.push(" AND status IN (");
            let mut separated = builder.separated(", ");
            for status in &filter.statuses {
                separated.push_bind(status.label());
            }
            separated.push_unseparated(")");
        }

        if let Some(owner) = &filter.relationship_manager_id {
            builder
                .push(" AND relationship_manager_id = ")
                .push_bind(owner.clone());
        }

        builder.push(" ORDER BY seq");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.hydrate(row).await?);
        }
        Ok(records)
    }

    async fn transition(
        &self,
        id: &ApplicationId,
        transition: StatusTransition,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let StatusTransition {
            expected,
            next,
            actor,
            reviewer,
            fields,
            at,
        } = transition;

        let (analyst_id, supervisor_id) = match fields.assignment {
            Some(Assignment::Analyst(analyst)) => (Some(analyst), None),
            Some(Assignment::Supervisor(supervisor)) => (None, Some(supervisor)),
            None => (None, None),
        };

        let mut tx = self.pool.begin().await?;

        let mut statement = String::from(
            "UPDATE loan_applications SET status = ?1, \
             analyst_id = COALESCE(?2, analyst_id), \
             supervisor_id = COALESCE(?3, supervisor_id), \
             updated_at = ?4 \
             WHERE id = ?5 AND status = ?6",
        );
        if let Some(check) = &reviewer {
            statement.push_str(&format!(" AND {} IS ?7", reviewer_column(check.slot)));
        }

        let mut query = sqlx::query(&statement)
            .bind(next.label())
            .bind(analyst_id)
            .bind(supervisor_id)
            .bind(at)
            .bind(id.as_str())
            .bind(expected.label());
        if let Some(check) = &reviewer {
            query = query.bind(check.assigned.clone());
        }
        let updated = query.execute(&mut *tx).await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.explain_miss(id, expected, reviewer.as_ref()).await?);
        }

        if next == ApplicationStatus::CommitteeReview {
            sqlx::query(
                "DELETE FROM committee_votes WHERE reference_number = \
                 (SELECT reference_number FROM loan_applications WHERE id = ?1)",
            )
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO status_history (application_id, from_status, to_status, actor_id, role, \
             changed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id.as_str())
        .bind(expected.label())
        .bind(next.label())
        .bind(&actor.id)
        .bind(actor.role.label())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        if let Some(body) = fields.comment.filter(|body| !body.trim().is_empty()) {
            sqlx::query(
                "INSERT INTO review_comments (application_id, author_id, role, status, body, \
                 created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(id.as_str())
            .bind(&actor.id)
            .bind(actor.role.label())
            .bind(next.label())
            .bind(body.trim())
            .bind(at)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(decision) = &fields.decision {
            write_decision(&mut tx, decision, next).await?;
        }

        tx.commit().await?;
        debug!(%id, from = %expected, to = %next, "status transition committed");

        self.fetch(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn attach_document(
        &self,
        id: &ApplicationId,
        document: DocumentDescriptor,
    ) -> Result<(), RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO application_documents (application_id, name, category, storage_key, \
             content_type, created_at) \
             SELECT id, ?2, ?3, ?4, ?5, ?6 FROM loan_applications \
             WHERE id = ?1 AND status NOT IN (?7, ?8)",
        )
        .bind(id.as_str())
        .bind(&document.name)
        .bind(document.category.label())
        .bind(&document.storage_key)
        .bind(document.content_type.as_deref())
        .bind(Utc::now())
        .bind(ApplicationStatus::Approved.label())
        .bind(ApplicationStatus::Rejected.label())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return match self.current_status(id).await? {
                Some(status) => Err(RepositoryError::Closed { status }),
                None => Err(RepositoryError::NotFound),
            };
        }
        Ok(())
    }

    async fn history(&self, id: &ApplicationId) -> Result<Vec<StatusChange>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT from_status, to_status, actor_id, role, changed_at FROM status_history \
             WHERE application_id = ?1 ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StatusChange, RepositoryError> {
                Ok(StatusChange {
                    from: parse_status(&row.try_get::<String, _>("from_status")?)?,
                    to: parse_status(&row.try_get::<String, _>("to_status")?)?,
                    actor_id: row.try_get("actor_id")?,
                    role: parse_role(&row.try_get::<String, _>("role")?)?,
                    changed_at: row.try_get("changed_at")?,
                })
            })
            .collect()
    }

    async fn status_counts(&self) -> Result<BTreeMap<ApplicationStatus, u64>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS total FROM loan_applications GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let status = parse_status(&row.try_get::<String, _>("status")?)?;
            let total: i64 = row.try_get("total")?;
            counts.insert(status, total.max(0) as u64);
        }
        Ok(counts)
    }

    async fn upsert_decision(
        &self,
        decision: DecisionRecord,
        expected: ApplicationStatus,
    ) -> Result<DecisionRecord, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        if !write_decision(&mut conn, &decision, expected).await? {
            return Err(self.reference_miss(&decision.reference, expected).await?);
        }
        Ok(decision)
    }

    async fn decision(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<DecisionRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT reference_number, outcome, rationale, decided_by, decided_at \
             FROM committee_decisions WHERE reference_number = ?1",
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<DecisionRecord, RepositoryError> {
            Ok(DecisionRecord {
                reference: ReferenceNumber(row.try_get("reference_number")?),
                outcome: parse_outcome(&row.try_get::<String, _>("outcome")?)?,
                rationale: row.try_get("rationale")?,
                decided_by: row.try_get("decided_by")?,
                decided_at: row.try_get("decided_at")?,
            })
        })
        .transpose()
    }

    async fn record_vote(
        &self,
        vote: MemberVote,
        expected: ApplicationStatus,
    ) -> Result<MemberVote, RepositoryError> {
        let written = sqlx::query(
            "INSERT INTO committee_votes (reference_number, member_id, vote, rationale, voted_at) \
             SELECT ?1, ?2, ?3, ?4, ?5 WHERE EXISTS (SELECT 1 FROM loan_applications \
             WHERE reference_number = ?1 AND status = ?6) \
             ON CONFLICT(reference_number, member_id) DO UPDATE SET \
             vote = excluded.vote, rationale = excluded.rationale, voted_at = excluded.voted_at",
        )
        .bind(vote.reference.as_str())
        .bind(&vote.member_id)
        .bind(vote.vote.label())
        .bind(&vote.rationale)
        .bind(vote.voted_at)
        .bind(expected.label())
        .execute(&self.pool)
        .await?;

        if written.rows_affected() == 0 {
            return Err(self.reference_miss(&vote.reference, expected).await?);
        }
        Ok(vote)
    }

    async fn votes(&self, reference: &ReferenceNumber) -> Result<Vec<MemberVote>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT reference_number, member_id, vote, rationale, voted_at FROM committee_votes \
             WHERE reference_number = ?1 ORDER BY voted_at, member_id",
        )
        .bind(reference.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<MemberVote, RepositoryError> {
                Ok(MemberVote {
                    reference: ReferenceNumber(row.try_get("reference_number")?),
                    member_id: row.try_get("member_id")?,
                    vote: parse_outcome(&row.try_get::<String, _>("vote")?)?,
                    rationale: row.try_get("rationale")?,
                    voted_at: row.try_get("voted_at")?,
                })
            })
            .collect()
    }
}

async fn write_document(
    conn: &mut SqliteConnection,
    id: &ApplicationId,
    document: &DocumentDescriptor,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO application_documents (application_id, name, category, storage_key, \
         content_type, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(id.as_str())
    .bind(&document.name)
    .bind(document.category.label())
    .bind(&document.storage_key)
    .bind(document.content_type.as_deref())
    .bind(at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Returns false when the application is not in `expected`.
async fn write_decision(
    conn: &mut SqliteConnection,
    decision: &DecisionRecord,
    expected: ApplicationStatus,
) -> Result<bool, RepositoryError> {
    let written = sqlx::query(
        "INSERT INTO committee_decisions (reference_number, outcome, rationale, decided_by, \
         decided_at) \
         SELECT ?1, ?2, ?3, ?4, ?5 WHERE EXISTS (SELECT 1 FROM loan_applications \
         WHERE reference_number = ?1 AND status = ?6) \
         ON CONFLICT(reference_number) DO UPDATE SET outcome = excluded.outcome, \
         rationale = excluded.rationale, decided_by = excluded.decided_by, \
         decided_at = excluded.decided_at",
    )
    .bind(decision.reference.as_str())
    .bind(decision.outcome.label())
    .bind(&decision.rationale)
    .bind(&decision.decided_by)
    .bind(decision.decided_at)
    .bind(expected.label())
    .execute(&mut *conn)
    .await?;
    Ok(written.rows_affected() > 0)
}

fn reviewer_column(slot: ReviewerSlot) -> &'static str {
    match slot {
        ReviewerSlot::Analyst => "analyst_id",
        ReviewerSlot::Supervisor => "supervisor_id",
    }
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, RepositoryError> {
    ApplicationStatus::from_str(raw).map_err(|err| RepositoryError::Corrupt(err.to_string()))
}

fn parse_role(raw: &str) -> Result<Role, RepositoryError> {
    Role::from_str(raw).map_err(|err| RepositoryError::Corrupt(err.to_string()))
}

fn parse_outcome(raw: &str) -> Result<DecisionOutcome, RepositoryError> {
    DecisionOutcome::from_str(raw).map_err(RepositoryError::Corrupt)
}

impl From<sqlx::Error> for RepositoryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate,
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}
