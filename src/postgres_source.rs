//! `RelationalSource` over the delivery database's Django-managed `checksums` tables.
//!
//! All queries order by primary key, which is the order the records were created in
//! and the order the table is published in. The pool holds a single connection: the
//! report builder issues one query at a time.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use ci_type_sync_core::contract::RelationalSource;
use ci_type_sync_core::error::SourceError;
use ci_type_sync_core::model::{Group, Inclusion, Member, PatternRule};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, error, info};

const GROUPS_SQL: &str =
    "SELECT id::bigint AS row_id, code, name FROM checksums_citypegroups ORDER BY id";

const MEMBERS_SQL: &str = "SELECT id::bigint AS row_id, code, name, \
     COALESCE(is_standard, '') AS is_standard, \
     COALESCE(is_deliverable, FALSE) AS is_deliverable \
     FROM checksums_citypes ORDER BY id";

const INCLUSIONS_SQL: &str = "SELECT g.code AS group_code, \
     t.id::bigint AS row_id, t.code, t.name, \
     COALESCE(t.is_standard, '') AS is_standard, \
     COALESCE(t.is_deliverable, FALSE) AS is_deliverable \
     FROM checksums_citypeincs i \
     JOIN checksums_citypegroups g ON g.id = i.ci_type_group_id \
     JOIN checksums_citypes t ON t.id = i.ci_type_id";

const LOCATOR_KIND_SQL: &str = "SELECT id::bigint FROM checksums_loctypes WHERE code = $1";

const PATTERN_RULES_SQL: &str = "SELECT t.code AS member_code, l.code AS locator_kind, \
     r.regexp AS pattern \
     FROM checksums_ciregexp r \
     JOIN checksums_loctypes l ON l.id = r.loc_type_id \
     JOIN checksums_citypes t ON t.id = r.ci_type_id \
     WHERE l.id = $1";

/// Connection parameters; the password comes from the environment, never from YAML.
#[derive(Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(sqlx::FromRow)]
struct GroupRecord {
    row_id: i64,
    code: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct MemberRecord {
    row_id: i64,
    code: String,
    name: String,
    is_standard: String,
    is_deliverable: bool,
}

impl From<MemberRecord> for Member {
    fn from(row: MemberRecord) -> Self {
        Self {
            code: row.code,
            name: row.name,
            is_standard: row.is_standard,
            is_deliverable: row.is_deliverable,
            row_id: Some(row.row_id),
        }
    }
}

#[derive(sqlx::FromRow)]
struct InclusionRecord {
    group_code: String,
    #[sqlx(flatten)]
    member: MemberRecord,
}

#[derive(sqlx::FromRow)]
struct PatternRuleRecord {
    member_code: String,
    locator_kind: String,
    pattern: Option<String>,
}

fn backend(err: sqlx::Error) -> SourceError {
    error!(error = ?err, "Delivery database query failed");
    SourceError::Backend(Box::new(err))
}

#[derive(Clone, Copy)]
enum InclusionFilter {
    Group,
    Member,
}

pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, SourceError> {
        let mut options = PgConnectOptions::from_str(&config.url).map_err(backend)?;
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(backend)?;
        info!(
            url = %config.url,
            user = config.user.as_deref().unwrap_or("<from url>"),
            password = if config.password.is_some() { "***" } else { "NOT SET" },
            "Connected to delivery database"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inclusions matching one group or CI type: by primary key when the record came
    /// from this database, otherwise by code.
    async fn inclusions_where(
        &self,
        filter: InclusionFilter,
        row_id: Option<i64>,
        code: &str,
    ) -> Result<Vec<Inclusion>, SourceError> {
        let column = match (filter, row_id) {
            (InclusionFilter::Group, Some(_)) => "i.ci_type_group_id",
            (InclusionFilter::Group, None) => "g.code",
            (InclusionFilter::Member, Some(_)) => "i.ci_type_id",
            (InclusionFilter::Member, None) => "t.code",
        };
        let sql = format!("{INCLUSIONS_SQL} WHERE {column} = $1 ORDER BY i.id");
        let query = sqlx::query_as::<_, InclusionRecord>(&sql);
        let query = match row_id {
            Some(id) => query.bind(id),
            None => query.bind(code.to_string()),
        };
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;
        debug!(filter = column, code, count = rows.len(), "Fetched inclusions");
        Ok(rows
            .into_iter()
            .map(|row| Inclusion {
                group_code: row.group_code,
                member: row.member.into(),
            })
            .collect())
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    async fn groups(&self) -> Result<Vec<Group>, SourceError> {
        let rows: Vec<GroupRecord> = sqlx::query_as(GROUPS_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|row| Group {
                code: row.code,
                name: row.name,
                row_id: Some(row.row_id),
            })
            .collect())
    }

    async fn members(&self) -> Result<Vec<Member>, SourceError> {
        let rows: Vec<MemberRecord> = sqlx::query_as(MEMBERS_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn inclusions_by_group(&self, group: &Group) -> Result<Vec<Inclusion>, SourceError> {
        self.inclusions_where(InclusionFilter::Group, group.row_id, &group.code)
            .await
    }

    async fn inclusions_by_member(&self, member: &Member) -> Result<Vec<Inclusion>, SourceError> {
        self.inclusions_where(InclusionFilter::Member, member.row_id, &member.code)
            .await
    }

    async fn pattern_rules(
        &self,
        locator_kind: &str,
        member: &Member,
    ) -> Result<Vec<PatternRule>, SourceError> {
        let locator_id: Option<(i64,)> = sqlx::query_as(LOCATOR_KIND_SQL)
            .bind(locator_kind)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        let (locator_id,) = locator_id.ok_or_else(|| {
            error!(locator_kind, "Locator kind missing from delivery database");
            SourceError::UnknownLocatorKind(locator_kind.to_string())
        })?;

        let column = if member.row_id.is_some() { "r.ci_type_id" } else { "t.code" };
        let sql = format!("{PATTERN_RULES_SQL} AND {column} = $2 ORDER BY r.id");
        let query = sqlx::query_as::<_, PatternRuleRecord>(&sql).bind(locator_id);
        let query = match member.row_id {
            Some(id) => query.bind(id),
            None => query.bind(member.code.as_str()),
        };
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|row| PatternRule {
                member_code: row.member_code,
                locator_kind: row.locator_kind,
                pattern: row.pattern,
            })
            .collect())
    }
}
