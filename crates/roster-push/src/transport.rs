use std::time::Duration;

use async_trait::async_trait;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use roster_core::config::PushConfig;
use roster_core::types::PushSubscription;

use crate::error::{PushError, Result};

/// Delivery seam for encrypted push messages.
///
/// Implementations must be `Send + Sync` so the service can fan deliveries
/// out across Tokio tasks. `deliver` takes `&self` — a transport is shared,
/// never locked per send.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver `payload` (already-serialized JSON) to one subscription.
    ///
    /// Any error return means the endpoint should be treated as dead and
    /// pruned by the caller.
    async fn deliver(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()>;
}

/// Production transport: Web Push over HTTP with VAPID authorization and
/// aes128gcm payload encryption, as browsers require.
///
/// The server key pair is configured once at process start; the
/// per-subscription keys (`p256dh`, `auth`) come from each stored row.
pub struct WebPushTransport {
    client: HyperWebPushClient,
    vapid_private_key: String,
    subject: String,
    ttl_secs: u32,
    timeout: Duration,
}

impl WebPushTransport {
    /// Build from config. Fails fast when the VAPID key material is absent —
    /// a misconfigured deployment should die at startup, not at 06:00 when
    /// the cron fires.
    pub fn new(config: &PushConfig) -> Result<Self> {
        if config.vapid_private_key.is_empty() {
            return Err(PushError::Config(
                "push.vapid_private_key is not set".to_string(),
            ));
        }
        if config.subject.is_empty() {
            return Err(PushError::Config(
                "push.subject (mailto: contact) is not set".to_string(),
            ));
        }
        Ok(Self {
            client: HyperWebPushClient::new(),
            vapid_private_key: config.vapid_private_key.clone(),
            subject: config.subject.clone(),
            ttl_secs: config.ttl_secs,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.vapid_private_key, URL_SAFE_NO_PAD, &info)
                .map_err(|e| PushError::MessageBuild(e.to_string()))?;
        signature.add_claim("sub", self.subject.clone());
        let signature = signature
            .build()
            .map_err(|e| PushError::MessageBuild(e.to_string()))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl_secs);
        let message = builder
            .build()
            .map_err(|e| PushError::MessageBuild(e.to_string()))?;

        // Bound each attempt so one unreachable endpoint cannot stall the
        // whole daily run.
        match tokio::time::timeout(self.timeout, self.client.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PushError::Delivery(e.to_string())),
            Err(_) => Err(PushError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
