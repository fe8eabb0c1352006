use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::engine::TotpEngine;
use super::error::{TotpError, TotpResult};
use super::store::SecretStore;

/// Where a user stands in the enrollment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    /// No record: TOTP never configured, or removed.
    Absent,
    /// Secret issued but never confirmed with a valid code.
    Pending,
    /// Confirmed; the second factor is in use.
    Active,
}

/// What a user needs to finish enrolling.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub secret: String,
    pub provisioning_uri: String,
    /// PNG bytes of the QR code.
    pub qr_png: Vec<u8>,
}

/// Drives the enable → verify → active / disable transitions.
#[derive(Clone)]
pub struct TotpService {
    store: Arc<dyn SecretStore>,
    engine: TotpEngine,
}

impl TotpService {
    pub fn new(store: Arc<dyn SecretStore>, engine: TotpEngine) -> Self {
        Self { store, engine }
    }

    pub fn engine(&self) -> &TotpEngine {
        &self.engine
    }

    /// Issue a new secret for `username`, replacing any previous enrollment.
    ///
    /// The user is left pending until a code is verified. Nothing is written
    /// if key generation or image rendering fails.
    pub async fn start_enroll(&self, username: &str) -> TotpResult<Enrollment> {
        let key = self.engine.generate_secret(username)?;
        let qr_png = self.engine.render_enrollment_image(&key)?;

        self.store.put(username, &key.secret, false).await?;
        tracing::info!(username = %username, "TOTP enrollment started");

        Ok(Enrollment {
            provisioning_uri: key.provisioning_uri(),
            secret: key.secret,
            qr_png,
        })
    }

    pub async fn verify(&self, username: &str, code: &str) -> TotpResult<bool> {
        self.verify_at(username, code, Utc::now()).await
    }

    /// Check `code` for `username` as of `now`.
    ///
    /// The first success on a pending enrollment activates it. A wrong code
    /// is `Ok(false)`; a user without a record is `NotEnrolled`.
    pub async fn verify_at(
        &self,
        username: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> TotpResult<bool> {
        let record = self
            .store
            .get(username)
            .await?
            .ok_or(TotpError::NotEnrolled)?;

        if !self.engine.verify(&record.secret, code, now) {
            tracing::info!(username = %username, "TOTP code rejected");
            return Ok(false);
        }

        if !record.enabled {
            // Only the secret that was just checked may be activated.
            if !self.store.activate(username, &record.secret).await? {
                return match self.store.get(username).await? {
                    None => Err(TotpError::NotEnrolled),
                    Some(_) => {
                        tracing::info!(
                            username = %username,
                            "TOTP secret replaced during verification"
                        );
                        Ok(false)
                    }
                };
            }
            tracing::info!(username = %username, "TOTP activated");
        }
        Ok(true)
    }

    pub async fn disable(&self, username: &str) -> TotpResult<()> {
        self.store.delete(username).await?;
        tracing::info!(username = %username, "TOTP disabled");
        Ok(())
    }

    /// Remove another user's enrollment. The caller must already hold admin rights.
    pub async fn admin_disable(&self, username: &str) -> TotpResult<()> {
        self.store.delete(username).await?;
        tracing::warn!(username = %username, "TOTP disabled by administrator");
        Ok(())
    }

    /// Hook for the user-management flow so no record outlives its account.
    pub async fn user_deleted(&self, username: &str) -> TotpResult<()> {
        self.disable(username).await
    }

    /// Return an active enrollment to pending without forgetting its secret.
    pub async fn suspend(&self, username: &str) -> TotpResult<()> {
        if !self.store.set_enabled(username, false).await? {
            return Err(TotpError::NotEnrolled);
        }
        tracing::info!(username = %username, "TOTP suspended");
        Ok(())
    }

    /// `true` only for an active enrollment.
    pub async fn status(&self, username: &str) -> TotpResult<bool> {
        Ok(self.state(username).await? == EnrollmentState::Active)
    }

    pub async fn state(&self, username: &str) -> TotpResult<EnrollmentState> {
        Ok(match self.store.get(username).await? {
            None => EnrollmentState::Absent,
            Some(record) if record.enabled => EnrollmentState::Active,
            Some(_) => EnrollmentState::Pending,
        })
    }
}
