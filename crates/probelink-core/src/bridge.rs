// ── Bridge wiring ──
//
// Assembles the production stack (transport, auth client, telemetry
// client, credential store, coordinator) from one `BridgeConfig`. Two
// entry points: first-time setup performs a password login; a restart
// resumes from credentials the host persisted earlier.

use std::sync::Arc;

use chrono::Utc;

use probelink_api::{AuthClient, CloudClient, TlsMode, TransportConfig};

use crate::config::{BridgeConfig, TlsVerification};
use crate::coordinator::Coordinator;
use crate::credentials::{CredentialSink, CredentialStore, Credentials};
use crate::error::CoreError;

/// The fully wired coordinator type against the real vendor cloud.
pub type CloudCoordinator = Coordinator<CloudClient, AuthClient>;

/// First-time setup: exchange the account email/password for a token
/// pair and wire up a coordinator. Does not start polling — call
/// [`Coordinator::start`] when ready.
///
/// Fails with [`CoreError::NeedsReauth`] when the vendor rejects the
/// account credentials.
pub async fn connect(
    config: BridgeConfig,
    sink: Option<Arc<dyn CredentialSink>>,
) -> Result<CloudCoordinator, CoreError> {
    let config = config.validated();
    let transport = transport_config(&config);
    let auth = AuthClient::new(config.base_url.as_str(), &transport)?;
    let grant = auth.login(&config.email, &config.password).await?;
    let credentials = Credentials::from_grant(grant, Utc::now());
    if let Some(ref sink) = sink {
        sink.persist(&credentials);
    }
    assemble(config, auth, credentials, sink, &transport)
}

/// Resume from credentials the host persisted earlier. No login
/// round-trip: an expired pair simply refreshes on the first cycle.
pub fn resume(
    config: BridgeConfig,
    credentials: Credentials,
    sink: Option<Arc<dyn CredentialSink>>,
) -> Result<CloudCoordinator, CoreError> {
    let config = config.validated();
    let transport = transport_config(&config);
    let auth = AuthClient::new(config.base_url.as_str(), &transport)?;
    assemble(config, auth, credentials, sink, &transport)
}

fn assemble(
    config: BridgeConfig,
    auth: AuthClient,
    credentials: Credentials,
    sink: Option<Arc<dyn CredentialSink>>,
    transport: &TransportConfig,
) -> Result<CloudCoordinator, CoreError> {
    let api = CloudClient::new(config.base_url.as_str(), transport)?;
    let mut store = CredentialStore::new(auth, credentials);
    if let Some(sink) = sink {
        store = store.with_sink(sink);
    }
    Ok(Coordinator::new(config, api, store))
}

fn transport_config(config: &BridgeConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.request_timeout,
    }
}
