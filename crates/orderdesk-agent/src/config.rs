//! Agent persona, pipeline settings, and LiveKit credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_SYSTEM_PROMPT: &str = concat!(
    "あなたは音声エージェントです。ユーザーとのインターフェースは音声になります。",
    "文字起こしされた音声があなたに届けられるため、誤字脱字が発生している可能性があります。",
    "必要に応じて文意を推測しながら答えてください。",
    "あなたは、短い簡潔な応答を使用し、発音できない句読点の使用は避けるべきです。",
    "あなたは注文確認のコールセンターのエージェントです。注文の確認・変更・キャンセルを司ります。",
    "それ以外のことはできません。",
    "特に、注文番号・ユーザー番号はともに5桁の数字になります。",
    "それぞれのfunctionを使用する前に、ユーザーから聞いた数字があっているかは必ず確認してください。",
    "聞こえたものが5桁でなかった場合は、聞き取れなかった旨を謝罪しつつ、",
    "もう一度ゆっくり発話してもらうことを促しながら聞いてください。",
);

const DEFAULT_TTS_INSTRUCTIONS: &str = concat!(
    "あなたは注文確認のコールセンターのエージェントです。注文の確認・変更・キャンセルを司ります。",
    "注文番号・ユーザー番号はともに5桁の数字になります。",
    "それらの数字は一文字ずつ読み上げてください。例：01135 -> ぜろ いち いち さん ご ",
    "注文番号は、必ず5桁全てを読み上げてください",
);

/// Persona and pipeline settings handed to the external voice pipeline.
///
/// Every field has a default, so an empty `[agent]` table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// First thing the agent says when the caller joins.
    pub greeting: String,
    /// Said, uninterruptible, when the call ends.
    pub farewell: String,
    pub tts_instructions: String,
    pub stt_model: String,
    pub stt_language: String,
    pub llm_model: String,
    pub tts_model: String,
    /// Seconds to wait once the turn detector thinks the caller is done.
    pub min_endpointing_delay: f64,
    /// Seconds to wait when the turn detector is unsure.
    pub max_endpointing_delay: f64,
    /// Seconds without activity before a live session is closed and its
    /// partial record saved. Zero disables eviction.
    pub session_idle_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: "こんにちは, こちらは楽々ECのコールセンターです。どんなご用件ですか？"
                .to_string(),
            farewell: "ご利用ありがとうございました。またのお電話をお待ちしております。それではさようなら。"
                .to_string(),
            tts_instructions: DEFAULT_TTS_INSTRUCTIONS.to_string(),
            stt_model: "gpt-4o-transcribe".to_string(),
            stt_language: "ja".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            min_endpointing_delay: 0.5,
            max_endpointing_delay: 5.0,
            session_idle_timeout_secs: 600,
        }
    }
}

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_room_prefix() -> String {
    "orderdesk_room".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// Prefix for generated room names.
    #[serde(default = "default_room_prefix")]
    pub room_prefix: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
            room_prefix: default_room_prefix(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("room_prefix", &self.room_prefix)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Self::default()
        }
    }

    /// True when URL, key, and secret are all set.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_agent_table_uses_defaults() {
        let config: AgentConfig = toml::from_str("").expect("should parse empty table");
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.stt_language, "ja");
        assert_eq!(config.min_endpointing_delay, 0.5);
        assert_eq!(config.max_endpointing_delay, 5.0);
        assert_eq!(config.session_idle_timeout_secs, 600);
    }

    #[test]
    fn partial_agent_table_overrides_only_given_fields() {
        let config: AgentConfig =
            toml::from_str("greeting = \"もしもし\"\nllm_model = \"gpt-4o\"\n")
                .expect("should parse");
        assert_eq!(config.greeting, "もしもし");
        assert_eq!(config.llm_model, "gpt-4o");
        assert_eq!(config.farewell, AgentConfig::default().farewell);
    }

    #[test]
    fn livekit_debug_redacts_secret() {
        let config = LiveKitConfig::new("ws://localhost:7880", "key", "super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn livekit_secret_is_never_serialized() {
        let config = LiveKitConfig::new("ws://localhost:7880", "key", "super-secret");
        let json = serde_json::to_string(&config).expect("should serialize");
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn livekit_configured_requires_all_credentials() {
        assert!(!LiveKitConfig::default().is_configured());
        assert!(!LiveKitConfig::new("ws://localhost:7880", "key", "").is_configured());
        assert!(LiveKitConfig::new("ws://localhost:7880", "key", "secret").is_configured());
    }
}
