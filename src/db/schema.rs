use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// Library tables: book, chapter, scene, character, location, relationship, message
const SCHEMA_001: &str = include_str!("migrations/001_library_schema.surql");

/// Cascade events: book and chapter deletion remove owned records
const SCHEMA_002: &str = include_str!("migrations/002_cascade_events.surql");

/// Apply the database schema to an initialized database connection.
///
/// Migrations are applied in order:
/// - 001: Library tables, typed parent links, timestamp defaults and parent indexes
/// - 002: Cascading delete events (book → owned records, chapter → scenes,
///   character → relationships)
///
/// Every definition uses `IF NOT EXISTS`, so calling this on an already
/// initialized database is a no-op.
///
/// # Example
///
/// ```no_run
/// # use manuscrypt::db::{connection::{init_db, DbConfig}, schema::apply_schema};
/// # use std::path::Path;
/// # async fn example() -> Result<(), manuscrypt::ManuscryptError> {
/// let db = init_db(&DbConfig::Memory, Path::new(".")).await?;
/// apply_schema(&db).await?;
/// # Ok(())
/// # }
/// ```
pub async fn apply_schema(db: &ManuscryptDb) -> Result<(), ManuscryptError> {
    for migration in [SCHEMA_001, SCHEMA_002] {
        db.query(migration).await?.check()?;
    }
    Ok(())
}
