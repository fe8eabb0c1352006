use base32::Alphabet;
use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma};
use oath::{totp_raw_custom_time, HashType};
use qrcode::QrCode;
use rand::rngs::OsRng;
use rand::RngCore;
use std::io::Cursor;

use super::error::{TotpError, TotpResult};

const SECRET_ALPHABET: Alphabet = Alphabet::RFC4648 { padding: false };

/// Parameters shared by every key the engine issues.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// Label shown by authenticator apps next to the account name.
    pub issuer: String,
    pub digits: u32,
    /// Time step in seconds.
    pub step: u64,
    /// Steps accepted on either side of the current one.
    pub skew: u64,
    /// Random bytes per secret.
    pub secret_size: usize,
    /// Width and height of the enrollment PNG in pixels.
    pub image_size: u32,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "ovpn-admin".to_string(),
            digits: 6,
            step: 30,
            skew: 1,
            secret_size: 20,
            image_size: 200,
        }
    }
}

impl TotpConfig {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Default::default()
        }
    }
}

/// A freshly generated secret bound to an issuer and an account.
#[derive(Debug, Clone)]
pub struct TotpKey {
    pub issuer: String,
    pub account_name: String,
    /// Base32 (RFC 4648, unpadded) secret.
    pub secret: String,
    pub digits: u32,
    pub period: u64,
}

impl TotpKey {
    /// `otpauth://` URI understood by authenticator apps.
    pub fn provisioning_uri(&self) -> String {
        let issuer = urlencoding::encode(&self.issuer);
        let account = urlencoding::encode(&self.account_name);
        format!(
            "otpauth://totp/{}:{}?algorithm=SHA1&digits={}&issuer={}&period={}&secret={}",
            issuer, account, self.digits, issuer, self.period, self.secret
        )
    }
}

/// Stateless wrapper around the RFC 6238 primitive.
#[derive(Debug, Clone, Default)]
pub struct TotpEngine {
    config: TotpConfig,
}

impl TotpEngine {
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TotpConfig {
        &self.config
    }

    /// Generate a new random secret for `account_name` under the configured issuer.
    pub fn generate_secret(&self, account_name: &str) -> TotpResult<TotpKey> {
        let mut secret_bytes = vec![0u8; self.config.secret_size];
        OsRng
            .try_fill_bytes(&mut secret_bytes)
            .map_err(|e| TotpError::Generation(e.to_string()))?;

        Ok(TotpKey {
            issuer: self.config.issuer.clone(),
            account_name: account_name.to_string(),
            secret: base32::encode(SECRET_ALPHABET, &secret_bytes),
            digits: self.config.digits,
            period: self.config.step,
        })
    }

    /// Render the key's provisioning URI as a square PNG QR code.
    pub fn render_enrollment_image(&self, key: &TotpKey) -> TotpResult<Vec<u8>> {
        let code = QrCode::new(key.provisioning_uri().as_bytes())
            .map_err(|e| TotpError::Render(e.to_string()))?;

        let size = self.config.image_size;
        let rendered = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .min_dimensions(size, size)
            .build();
        if rendered.width() > size {
            return Err(TotpError::Render(format!(
                "image size {}px is smaller than the {}px symbol",
                size,
                rendered.width()
            )));
        }
        let image = imageops::resize(&rendered, size, size, FilterType::Nearest);

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| TotpError::Render(e.to_string()))?;
        Ok(png)
    }

    /// Check `code` against `secret` at `now`, tolerating `skew` steps of drift.
    pub fn verify(&self, secret: &str, code: &str, now: DateTime<Utc>) -> bool {
        let code: String = code
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if code.len() != self.config.digits as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let Ok(submitted) = code.parse::<u64>() else {
            return false;
        };
        let Some(key) = decode_secret(secret) else {
            tracing::warn!("Stored TOTP secret is not valid base32");
            return false;
        };

        let current = unix_seconds(now) / self.config.step;
        let first = current.saturating_sub(self.config.skew);
        (first..=current + self.config.skew)
            .any(|counter| self.value_at(&key, counter) == submitted)
    }

    /// The zero-padded code for `secret` at time `at`.
    pub fn code_at(&self, secret: &str, at: DateTime<Utc>) -> TotpResult<String> {
        let key = decode_secret(secret).ok_or(TotpError::InvalidSecret)?;
        let value = self.value_at(&key, unix_seconds(at) / self.config.step);
        Ok(format!("{:0width$}", value, width = self.config.digits as usize))
    }

    fn value_at(&self, key: &[u8], counter: u64) -> u64 {
        totp_raw_custom_time(
            key,
            self.config.digits,
            0,
            self.config.step,
            counter * self.config.step,
            &HashType::SHA1,
        )
    }
}

fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let normalized = secret.trim().trim_end_matches('=').to_ascii_uppercase();
    base32::decode(SECRET_ALPHABET, &normalized).filter(|bytes| !bytes.is_empty())
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    at.timestamp().max(0) as u64
}
