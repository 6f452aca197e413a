//! SQLite-backed store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    FromRow, SqlitePool,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::{
    Booking, BookingStatus, BookingStore, Listing, ListingStore, Location, PropertyType, Role,
    Store, StoreError, StoreResult, User, UserStore,
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(db_path: &Path) -> StoreResult<Self> {
        info!("Initializing database at {}", db_path.display());

        // WAL for concurrent readers; foreign keys are per connection
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection that never expires
    /// keeps the data alive for the pool's lifetime.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        run_migrations(&pool).await?;
        info!("Database initialized successfully");
        Ok(Self { pool })
    }
}

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> StoreResult<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    info!("Running database migrations...");
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    // Fixed width so lexical order matches time order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

/// Map constraint violations to `Conflict`, everything else passes through.
fn map_insert_error(err: sqlx::Error, conflict_message: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(conflict_message())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Debug, FromRow)]
struct ListingRow {
    id: String,
    title: String,
    description: String,
    property_type: String,
    price: f64,
    city: String,
    suburb: Option<String>,
    country: String,
    amenities: String,
    rating: Option<f64>,
    created_at: String,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let amenities: BTreeSet<String> = serde_json::from_str(&row.amenities)?;
        Ok(Listing {
            id: row.id,
            title: row.title,
            description: row.description,
            property_type: PropertyType::parse(&row.property_type),
            price: row.price,
            location: Location {
                city: row.city,
                suburb: row.suburb,
                country: row.country,
            },
            amenities,
            rating: row.rating,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(StoreError::Corrupt)?;
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct BookingRow {
    id: String,
    property_id: String,
    user_id: String,
    check_in: String,
    check_out: String,
    status: String,
    created_at: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            property_id: row.property_id,
            user_id: row.user_id,
            check_in: row.check_in,
            check_out: row.check_out,
            status: BookingStatus::from(row.status),
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

const LISTING_COLUMNS: &str = "id, title, description, property_type, price, city, suburb, \
                               country, amenities, rating, created_at";

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at";

#[async_trait]
impl ListingStore for SqliteStore {
    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let sql = format!("SELECT {} FROM properties ORDER BY seq ASC", LISTING_COLUMNS);
        let rows: Vec<ListingRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn get_listing(&self, id: &str) -> StoreResult<Option<Listing>> {
        let sql = format!("SELECT {} FROM properties WHERE id = ?", LISTING_COLUMNS);
        let row: Option<ListingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Listing::try_from).transpose()
    }

    async fn count_listings(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn insert_listing(&self, listing: Listing) -> StoreResult<()> {
        listing.validate().map_err(StoreError::Invalid)?;
        let amenities = serde_json::to_string(&listing.amenities)?;

        sqlx::query(
            r#"
            INSERT INTO properties (id, title, description, property_type, price, city, suburb, country, amenities, rating, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.property_type.as_str())
        .bind(listing.price)
        .bind(&listing.location.city)
        .bind(&listing.location.suburb)
        .bind(&listing.location.country)
        .bind(&amenities)
        .bind(listing.rating)
        .bind(format_timestamp(&listing.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || format!("Listing {} already exists", listing.id)))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.to_string())
        .bind(format_timestamp(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || "Email already registered".to_string()))?;

        Ok(())
    }

    async fn count_users(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn insert_booking(&self, booking: Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, property_id, user_id, check_in, check_out, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.property_id)
        .bind(&booking.user_id)
        .bind(&booking.check_in)
        .bind(&booking.check_out)
        .bind(booking.status.to_string())
        .bind(format_timestamp(&booking.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            r#"
            SELECT id, property_id, user_id, check_in, check_out, status, created_at
            FROM bookings
            WHERE user_id = ?
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}

impl Store for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
