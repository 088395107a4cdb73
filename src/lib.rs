//! Portcullis - client-side licensing for desktop applications
//!
//! Portcullis embeds in a paid end-user product (typically an audio plugin)
//! and handles the full license lifecycle against a remote licensing
//! service: online activation through the user's browser, signed-token
//! verification, periodic revalidation with grace periods, and a fully
//! offline activation handshake for air-gapped studio machines.
//!
//! # Example
//!
//! ```rust,ignore
//! use portcullis::client::engine::{ActivationOutcome, LicenseEngine};
//! use portcullis::config::Context;
//!
//! # async fn startup() {
//! let engine = LicenseEngine::new(Context::new(
//!     "my-plugin",
//!     "https://licenses.example.com",
//!     include_str!("license_authority.pem"),
//!     dirs_path_for_my_plugin(),
//! ));
//!
//! // On a background task: is there a usable license already?
//! if !engine.check_for_existing().await {
//!     // Drive the browser flow; poll for up to two minutes.
//!     match engine.request_activation(120, 3).await {
//!         ActivationOutcome::Success => {}
//!         ActivationOutcome::Timeout => { /* ask the user to retry */ }
//!         ActivationOutcome::Fail => { /* surface a diagnostic */ }
//!     }
//! }
//!
//! // On the UI thread, any time:
//! let status = engine.get_license_status();
//! # }
//! # fn dirs_path_for_my_plugin() -> std::path::PathBuf { unimplemented!() }
//! ```
//!
//! The status flags are independent atomics; a snapshot is cheap and safe
//! from any thread, and a [`StatusView`](client::status::StatusView) handle
//! can be cloned into the UI without holding the engine itself.

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod jwt;

// Client-related modules
pub mod client {
    pub mod engine;
    pub mod status;
    pub mod store;
}

pub use client::engine::{ActivationOutcome, LicenseEngine};
pub use client::status::{LicenseStatus, StatusView};
pub use config::{Context, ValidationThresholds};
pub use errors::{LicenseError, LicenseResult};
pub use fingerprint::DeviceFingerprint;
