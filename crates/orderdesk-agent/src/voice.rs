use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// What the web client needs to join a fresh call room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub room_name: String,
    pub participant_name: String,
    pub participant_token: String,
}

/// Issues LiveKit join tokens for the rooms the voice pipeline serves.
#[derive(Debug)]
pub struct VoiceService {
    config: LiveKitConfig,
}

impl VoiceService {
    /// Builds the service, refusing a config without URL, key, and secret.
    pub fn new(config: LiveKitConfig) -> Result<Self, VoiceError> {
        if !config.is_configured() {
            return Err(VoiceError::Config(
                "LiveKit url, api_key and api_secret must all be set".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<String, VoiceError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(VoiceError::LiveKit)
    }

    /// Picks a random room and caller identity and issues a token for them.
    pub fn connection_details(
        &self,
        participant_name: &str,
    ) -> Result<ConnectionDetails, VoiceError> {
        let mut rng = rand::thread_rng();
        let room_name = format!("{}_{}", self.config.room_prefix, rng.gen_range(0..10_000));
        let identity = format!("caller_{}", rng.gen_range(0..10_000));
        let participant_token = self.generate_join_token(&room_name, &identity, participant_name)?;

        tracing::info!(room = %room_name, identity = %identity, "issued LiveKit join token");
        Ok(ConnectionDetails {
            server_url: self.config.url.clone(),
            room_name,
            participant_name: participant_name.to_string(),
            participant_token,
        })
    }
}
