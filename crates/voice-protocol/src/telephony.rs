//! Telephony Media Stream wire types (spec §6).
//!
//! Subprotocol: JSON text frames. Inbound events the core must accept are
//! decoded into [`TelephonyEvent`]; anything the core doesn't recognize
//! decodes into `Unknown` instead of failing, so unrecognized events are
//! logged and ignored rather than dropping the whole frame parse.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected(ConnectedEvent),
    Start(StartEvent),
    Media(MediaEvent),
    Mark(MarkEvent),
    Stop(StopEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectedEvent {
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartEvent {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    pub start: StartMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartMetadata {
    #[serde(rename = "callSid")]
    pub call_sid: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(rename = "mediaFormat", default)]
    pub media_format: Option<MediaFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaFormat {
    pub encoding: String,
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    pub channels: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEvent {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    pub media: MediaPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded mu-law byte run, ~160 bytes (20ms) at ~50/s.
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkEvent {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(default)]
    pub mark: Option<MarkPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopEvent {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
}

/// Outbound frames the core produces toward the telephony peer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutboundEvent {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMediaPayload,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMediaPayload {
    /// Base64-encoded mu-law byte run.
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_event_parses_custom_parameters_and_media_format() {
        let raw = r#"{
            "event": "start",
            "streamSid": "S1",
            "start": {
                "callSid": "C1",
                "tracks": ["inbound"],
                "customParameters": {"phone": "+15550100"},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            }
        }"#;
        let event: TelephonyEvent = serde_json::from_str(raw).unwrap();
        match event {
            TelephonyEvent::Start(s) => {
                assert_eq!(s.stream_sid, "S1");
                assert_eq!(s.start.call_sid, "C1");
                assert_eq!(s.start.custom_parameters.get("phone").unwrap(), "+15550100");
                assert_eq!(s.start.media_format.unwrap().sample_rate, 8000);
            }
            _ => panic!("expected Start"),
        }
    }

    #[test]
    fn unknown_event_type_does_not_fail_parsing() {
        let raw = r#"{"event": "dtmf", "digit": "5"}"#;
        let event: TelephonyEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, TelephonyEvent::Unknown));
    }

    #[test]
    fn outbound_media_serializes_with_stream_sid() {
        let out = TelephonyOutboundEvent::Media {
            stream_sid: "S1".into(),
            media: OutboundMediaPayload {
                payload: "AAAA".into(),
            },
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["event"], "media");
        assert_eq!(json["streamSid"], "S1");
        assert_eq!(json["media"]["payload"], "AAAA");
    }

    #[test]
    fn clear_event_serializes_minimal() {
        let out = TelephonyOutboundEvent::Clear {
            stream_sid: "S1".into(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["event"], "clear");
        assert_eq!(json["streamSid"], "S1");
    }
}
