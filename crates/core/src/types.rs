/// Principal ids are PostgreSQL BIGSERIAL keys carried in the JWT subject.
pub type DbId = i64;

/// Provider-assigned run identifier. Opaque to this system.
pub type RunId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
