pub mod engine;
pub mod error;
pub mod service;
pub mod store;

pub use engine::{TotpConfig, TotpEngine, TotpKey};
pub use error::{TotpError, TotpResult};
pub use service::{Enrollment, EnrollmentState, TotpService};
pub use store::{SecretStore, SqliteSecretStore, TotpRecord};
