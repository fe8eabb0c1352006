/// Errors produced by the TOTP core.
///
/// A wrong code is not an error: verification reports it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to generate TOTP secret: {0}")]
    Generation(String),
    #[error("Failed to render enrollment image: {0}")]
    Render(String),
    #[error("Stored TOTP secret is not valid base32")]
    InvalidSecret,
    #[error("TOTP is not enrolled for this user")]
    NotEnrolled,
}

pub type TotpResult<T> = Result<T, TotpError>;
