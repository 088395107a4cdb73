//! The license engine: activation, validation, deactivation, status.
//!
//! Expected usage: construct the engine once at startup and call
//! [`check_for_existing`](LicenseEngine::check_for_existing). A first-run
//! install has no token, so the host shows an "activate" dialog offering
//! the online flow ([`request_activation`](LicenseEngine::request_activation)
//! drives the user's browser and polls for the issued token) or the
//! offline flow ([`generate_offline_device_token`](LicenseEngine::generate_offline_device_token)
//! writes a request file the user uploads elsewhere; the returned license
//! file comes back in through
//! [`receive_offline_license_file`](LicenseEngine::receive_offline_license_file)).
//!
//! The long-running operations perform blocking I/O and sleep loops inside
//! their futures; run them on a background task, never on the UI thread.
//! [`get_license_status`](LicenseEngine::get_license_status) and
//! [`generate_offline_device_token`](LicenseEngine::generate_offline_device_token)
//! are callable from any thread. The engine does not serialize its own
//! operations: callers must not run two long-running operations
//! concurrently.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::status::{LicenseStatus, StatusFlags, StatusView};
use crate::client::store::TokenStore;
use crate::config::Context;
use crate::errors::{LicenseError, LicenseResult};
use crate::fingerprint::DeviceFingerprint;
use crate::jwt::{self, ActivationMethod, LicenseClaims};

/// HTTP client timeout for licensing server requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// Outcome of the in-browser activation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// A token was issued, verified to decode, and persisted.
    Success,
    /// The poll loop exhausted its budget; prompt the user to retry.
    Timeout,
    /// Anything else went wrong; surface a diagnostic.
    Fail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationRequest {
    device_name: String,
    device_signature: String,
}

/// The two URLs returned by the activation request: one for machine
/// polling, one for the human-visible sign-in page.
#[derive(Debug, Deserialize)]
struct ActivationUrls {
    request: String,
    browser: String,
}

/// Offline activation request payload, conventionally saved with a `.dt`
/// extension (e.g. `OfflineActivationRequest.dt`).
#[derive(Debug, Serialize)]
struct OfflineDeviceToken {
    #[serde(rename = "id")]
    signature: String,
    name: String,
    #[serde(rename = "productId")]
    product_id: String,
    /// License format to request from the service. Always "JWT".
    format: &'static str,
}

/// Coordinates token persistence, the activation exchange, and periodic
/// revalidation for one product.
///
/// The token on disk is the source of truth: the engine reads a fresh copy
/// on every operation and keeps no license state in memory beyond the
/// atomic status flags.
#[derive(Debug)]
pub struct LicenseEngine {
    context: Context,
    fingerprint: DeviceFingerprint,
    store: TokenStore,
    flags: Arc<StatusFlags>,
    http: Client,
    activation_url: String,
    validation_url: String,
    revocation_url: String,
}

impl LicenseEngine {
    /// Build an engine from its context. Probes the device fingerprint
    /// once; the fingerprint is immutable for the engine's lifetime.
    pub fn new(context: Context) -> Self {
        let fingerprint = DeviceFingerprint::collect();
        let store = TokenStore::new(&context.license_dir);
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        let base = &context.api_endpoint_base;
        let product = &context.product_id;
        let activation_url = format!("{base}/api/client/activations/{product}/request");
        let validation_url = format!("{base}/api/client/licenses/{product}/validate");
        let revocation_url = format!("{base}/api/client/licenses/{product}/revoke");

        Self {
            fingerprint,
            store,
            flags: Arc::new(StatusFlags::new()),
            http,
            activation_url,
            validation_url,
            revocation_url,
            context,
        }
    }

    /// Load and check the stored token, if any. Background thread.
    ///
    /// Returns `false` (and stores `active = false`) when no token file
    /// exists or the token no longer passes [`check`](Self::check).
    pub async fn check_for_existing(&self) -> bool {
        let token = match self.store.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.flags.set_active(false);
                return false;
            }
            Err(e) => {
                warn!(error = %e, "could not read stored license");
                self.flags.set_active(false);
                return false;
            }
        };
        let active = self.check(&token).await;
        self.flags.set_active(active);
        active
    }

    /// In-browser activation flow. Background thread.
    ///
    /// Registers this device with the licensing service, opens the user's
    /// browser on the returned sign-in page, then polls the request URL
    /// until the service issues a token. The loop makes
    /// `retry_budget_secs / seconds_between_retries` attempts, so the
    /// total wall-clock budget is roughly `retry_budget_secs` seconds.
    /// An interval of zero is treated as one second.
    pub async fn request_activation(
        &self,
        retry_budget_secs: u64,
        seconds_between_retries: u64,
    ) -> ActivationOutcome {
        match self.run_activation(retry_budget_secs, seconds_between_retries).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "activation failed");
                self.flags.set_active(false);
                ActivationOutcome::Fail
            }
        }
    }

    async fn run_activation(
        &self,
        retry_budget_secs: u64,
        seconds_between_retries: u64,
    ) -> LicenseResult<ActivationOutcome> {
        self.flags.set_offline(false);
        self.flags.set_online_validation_pending(false);
        self.flags.set_offline_grace_period_exceeded(false);
        self.flags.set_trial_days_remaining(-1);

        let request = ActivationRequest {
            device_name: self.fingerprint.device_name.clone(),
            device_signature: self.fingerprint.id_b64.clone(),
        };
        let response = self
            .http
            .post(&self.activation_url)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(LicenseError::Transport {
                status: status.as_u16(),
            });
        }
        let urls: ActivationUrls = response
            .json()
            .await
            .map_err(|e| LicenseError::DecodePayload(format!("activation response: {e}")))?;

        info!(url = %urls.browser, "directing user to activation page");
        open_browser(&urls.browser);

        let interval_secs = seconds_between_retries.max(1);
        let max_attempts = retry_budget_secs / interval_secs;
        let interval = Duration::from_secs(interval_secs);

        let mut token = None;
        let mut attempt = 0;
        while token.is_none() && attempt < max_attempts {
            token = self.poll_request_url(&urls.request).await;
            if token.is_none() {
                tokio::time::sleep(interval).await;
            }
            attempt += 1;
        }

        let Some(token) = token else {
            debug!(attempts = max_attempts, "activation polling exhausted");
            self.flags.set_active(false);
            return Ok(ActivationOutcome::Timeout);
        };

        let jwt = jwt::decode(&token)
            .ok_or_else(|| LicenseError::DecodePayload("issued token is malformed".into()))?;
        let trial = jwt
            .body
            .get("trial")
            .and_then(Value::as_bool)
            .ok_or_else(|| LicenseError::DecodePayload("issued token missing trial claim".into()))?;
        if trial {
            let exp = jwt.body.get("exp").and_then(Value::as_i64).ok_or_else(|| {
                LicenseError::DecodePayload("trial token missing exp claim".into())
            })?;
            self.flags
                .set_trial_days_remaining((exp - Utc::now().timestamp()) / SECONDS_PER_DAY);
        }

        self.store.save(&token).await?;
        self.flags.set_trial(trial);
        self.flags.set_active(true);
        info!(trial, "license activated");
        Ok(ActivationOutcome::Success)
    }

    /// One poll of the activation request URL. `None` means "not yet":
    /// transport failure, 204, or an error status.
    async fn poll_request_url(&self, url: &str) -> Option<String> {
        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "poll attempt did not reach the server");
                return None;
            }
        };
        let status = response.status().as_u16();
        if status == 204 || status >= 400 {
            return None;
        }
        response.text().await.ok()
    }

    /// Revoke this activation with the server and delete the local token.
    /// Background thread.
    ///
    /// Returns `false` when no token exists or the server refuses the
    /// revocation; the local token is only removed after the server
    /// accepts.
    pub async fn deactivate(&self) -> bool {
        match self.run_deactivation().await {
            Ok(revoked) => revoked,
            Err(e) => {
                warn!(error = %e, "deactivation failed");
                false
            }
        }
    }

    async fn run_deactivation(&self) -> LicenseResult<bool> {
        let Some(token) = self.store.load().await? else {
            return Ok(false);
        };
        let response = self
            .http
            .post(&self.revocation_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(token)
            .send()
            .await?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(LicenseError::Transport {
                status: status.as_u16(),
            });
        }
        self.store.remove().await?;
        self.flags.set_active(false);
        info!("license revoked");
        Ok(true)
    }

    /// Write an offline activation request file to `dest`. Any thread.
    ///
    /// The file is base64 over a small JSON payload identifying this
    /// device and product; the user uploads it from a connected machine
    /// and receives a license file back.
    pub fn generate_offline_device_token(&self, dest: &Path) -> bool {
        match self.write_offline_request(dest) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "could not write offline activation request");
                false
            }
        }
    }

    fn write_offline_request(&self, dest: &Path) -> LicenseResult<()> {
        let request = OfflineDeviceToken {
            signature: self.fingerprint.id_b64.clone(),
            name: self.fingerprint.device_name.clone(),
            product_id: self.context.product_id.clone(),
            format: "JWT",
        };
        let json = serde_json::to_string(&request)
            .map_err(|e| LicenseError::DecodePayload(format!("offline request: {e}")))?;
        std::fs::write(dest, BASE64.encode(json))?;
        Ok(())
    }

    /// Install a license file produced by the offline flow, then check it.
    /// Background thread.
    pub async fn receive_offline_license_file(&self, path: &Path) -> bool {
        if let Err(e) = self.store.copy_in(path).await {
            warn!(error = %e, "could not install offline license file");
            self.flags.set_active(false);
            return false;
        }
        self.check_for_existing().await
    }

    /// Install offline license data supplied as bytes (e.g. drag-and-drop
    /// straight into the plugin window), then check it. Background thread.
    ///
    /// Data that does not even decode as a JWT is rejected without
    /// touching the stored token.
    pub async fn receive_offline_license_data(&self, data: &str) -> bool {
        if jwt::decode(data).is_none() {
            debug!("offline license data is not a JWT");
            return false;
        }
        if let Err(e) = self.store.save(data).await {
            warn!(error = %e, "could not install offline license data");
            self.flags.set_active(false);
            return false;
        }
        self.check_for_existing().await
    }

    /// Atomic snapshot of the license state. Any thread.
    pub fn get_license_status(&self) -> LicenseStatus {
        self.flags.snapshot()
    }

    /// A cloneable handle the host UI can poll without holding the engine.
    pub fn status_view(&self) -> StatusView {
        StatusView::new(Arc::clone(&self.flags))
    }

    pub fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    /// Path of the managed token file.
    pub fn token_path(&self) -> &Path {
        self.store.path()
    }

    /// The central predicate: is this token a usable license right now?
    ///
    /// Collapses every failure mode to `false`; the status flags carry
    /// the distinctions the host wants to surface.
    async fn check(&self, token: &str) -> bool {
        match self.evaluate(token).await {
            Ok(usable) => usable,
            Err(e) => {
                debug!(error = %e, "license check failed");
                false
            }
        }
    }

    async fn evaluate(&self, token: &str) -> LicenseResult<bool> {
        let jwt = jwt::decode(token)
            .ok_or_else(|| LicenseError::DecodePayload("stored token is malformed".into()))?;
        if !jwt::verify_signature(&self.context.public_key, &jwt) {
            return Err(LicenseError::BadSignature);
        }
        let claims = LicenseClaims::from_body(&jwt.body).ok_or_else(|| {
            LicenseError::DecodePayload("token claims missing or mistyped".into())
        })?;

        let offline = claims.method == ActivationMethod::Offline;
        self.flags.set_offline(offline);
        self.flags.set_trial(claims.trial);
        self.flags.set_online_validation_pending(false);
        self.flags.set_offline_grace_period_exceeded(false);
        self.flags.set_trial_days_remaining(-1);

        if !self.fingerprint.matches(&claims.sig) {
            return Err(LicenseError::FingerprintMismatch);
        }
        if claims.product_id != self.context.product_id {
            return Err(LicenseError::WrongProduct {
                expected: self.context.product_id.clone(),
                found: claims.product_id,
            });
        }
        if offline {
            // offline licenses are never revalidated and never revoked
            return Ok(true);
        }

        let now = Utc::now().timestamp();
        if claims.trial {
            let exp = claims
                .exp
                .ok_or_else(|| LicenseError::DecodePayload("trial token missing exp".into()))?;
            self.flags
                .set_trial_days_remaining((exp - now) / SECONDS_PER_DAY);
            if exp < now {
                self.flags.set_active(false);
                return Err(LicenseError::Expired);
            }
        }

        let validated = claims.validated.ok_or_else(|| {
            LicenseError::DecodePayload("online token missing validated".into())
        })?;
        // whole-day floor; clock skew into the past counts as recent
        let delta_days = (now - validated).div_euclid(SECONDS_PER_DAY);
        if delta_days <= self.context.thresholds.allowed_days_without_validation {
            return Ok(true);
        }

        debug!(delta_days, "validation window exceeded, revalidating online");
        match self.revalidate(token).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "online revalidation failed");
                let within_grace = delta_days <= self.context.thresholds.grace_period_days;
                self.flags.set_online_validation_pending(true);
                self.flags.set_offline_grace_period_exceeded(!within_grace);
                if within_grace {
                    Ok(true)
                } else {
                    Err(LicenseError::StaleOffline)
                }
            }
        }
    }

    /// POST the token to the validate endpoint; on acceptance the refreshed
    /// token in the response body replaces the stored one.
    async fn revalidate(&self, token: &str) -> LicenseResult<()> {
        let response = self
            .http
            .post(&self.validation_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(token.to_string())
            .send()
            .await?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(LicenseError::Transport {
                status: status.as_u16(),
            });
        }
        let refreshed = response.text().await?;
        self.store.save(&refreshed).await?;
        info!("license revalidated online");
        Ok(())
    }
}

/// Launch the platform's default handler on the activation page.
///
/// Failure is logged and otherwise ignored: the poll loop can still pick
/// up a token if the user reaches the page some other way.
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let spawned = Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let spawned = Command::new("cmd").args(["/C", "start", "", url]).spawn();
    #[cfg(target_os = "linux")]
    let spawned = Command::new("xdg-open").arg(url).spawn();

    if let Err(e) = spawned {
        warn!(error = %e, url, "could not launch browser");
    }
}
