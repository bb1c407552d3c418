use orderdesk_agent::{LiveKitConfig, VoiceError, VoiceService};

const URL: &str = "ws://localhost:7880";
const KEY: &str = "devkey";
const SECRET: &str = "secret-that-is-long-enough-for-hs256";

#[test]
fn unconfigured_livekit_is_rejected() {
    let err = VoiceService::new(LiveKitConfig::default()).expect_err("should refuse");
    assert!(matches!(err, VoiceError::Config(_)));
}

#[test]
fn join_token_grants_room_access() {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde::Deserialize;

    let service = VoiceService::new(LiveKitConfig::new(URL, KEY, SECRET))
        .expect("configured service");
    let token = service
        .generate_join_token("orderdesk_room_42", "caller_7", "Caller")
        .expect("should generate token");

    #[derive(Deserialize)]
    struct Claims {
        sub: String,
        video: VideoClaims,
    }

    #[derive(Deserialize)]
    struct VideoClaims {
        room: String,
        #[serde(rename = "roomJoin")]
        room_join: bool,
        #[serde(rename = "canPublish")]
        can_publish: bool,
        #[serde(rename = "canSubscribe")]
        can_subscribe: bool,
    }

    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(SECRET.as_bytes());
    let data = decode::<Claims>(&token, &key, &validation).expect("should decode token");

    assert_eq!(data.claims.sub, "caller_7");
    assert_eq!(data.claims.video.room, "orderdesk_room_42");
    assert!(data.claims.video.room_join);
    assert!(data.claims.video.can_publish);
    assert!(data.claims.video.can_subscribe);
}

#[test]
fn connection_details_use_room_prefix() {
    let mut config = LiveKitConfig::new(URL, KEY, SECRET);
    config.room_prefix = "desk".to_string();
    let service = VoiceService::new(config).expect("configured service");

    let details = service
        .connection_details("お客様")
        .expect("should issue details");
    assert_eq!(details.server_url, URL);
    assert!(details.room_name.starts_with("desk_"));
    assert_eq!(details.participant_name, "お客様");
    assert!(!details.participant_token.is_empty());

    let json = serde_json::to_value(&details).expect("should serialize");
    assert!(json.get("participantToken").is_some());
    assert!(json.get("serverUrl").is_some());
}
