use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub(crate) const OP_EVENT: u8 = 0;
pub(crate) const OP_HELLO: u8 = 1;
pub(crate) const OP_SUBSCRIBE: u8 = 2;
pub(crate) const OP_HEARTBEAT: u8 = 3;

#[derive(Debug, Deserialize)]
struct Envelope {
    op: u8,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Value,
}

#[derive(Debug, Deserialize)]
struct HelloData {
    heartbeat_interval: Option<u64>,
}

/// The parts of a presence push the widget cares about. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct PresencePayload {
    #[serde(default)]
    pub(crate) discord_status: Option<String>,
    #[serde(default)]
    pub(crate) spotify: Option<SpotifyPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct SpotifyPayload {
    #[serde(default)]
    pub(crate) song: String,
    #[serde(default)]
    pub(crate) artist: String,
    #[serde(default)]
    pub(crate) album_art_url: Option<String>,
    #[serde(default)]
    pub(crate) timestamps: Option<Timestamps>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Timestamps {
    #[serde(default)]
    pub(crate) start: Option<i64>,
    #[serde(default)]
    pub(crate) end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    /// The interval is `None` when the server omits it or sends zero.
    Hello {
        heartbeat_interval: Option<Duration>,
    },
    /// `INIT_STATE` and `PRESENCE_UPDATE` are handled alike.
    Event {
        kind: Option<String>,
        presence: PresencePayload,
    },
    Other(u8),
}

pub(crate) fn parse_inbound(text: &str) -> Result<Inbound> {
    let env: Envelope = serde_json::from_str(text).context("invalid presence json")?;
    match env.op {
        OP_HELLO => {
            let heartbeat_interval = serde_json::from_value::<HelloData>(env.d)
                .ok()
                .and_then(|h| h.heartbeat_interval)
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis);
            Ok(Inbound::Hello { heartbeat_interval })
        }
        OP_EVENT => {
            let presence = if env.d.is_null() {
                PresencePayload::default()
            } else {
                serde_json::from_value(env.d).context("malformed presence event")?
            };
            Ok(Inbound::Event {
                kind: env.t,
                presence,
            })
        }
        op => Ok(Inbound::Other(op)),
    }
}

#[derive(Serialize)]
struct Outbound<'a> {
    op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<SubscribeData<'a>>,
}

#[derive(Serialize)]
struct SubscribeData<'a> {
    subscribe_to_id: &'a str,
}

pub(crate) fn encode_subscribe(user_id: &str) -> Result<String> {
    let msg = Outbound {
        op: OP_SUBSCRIBE,
        d: Some(SubscribeData {
            subscribe_to_id: user_id,
        }),
    };
    serde_json::to_string(&msg).context("encode subscribe")
}

pub(crate) fn encode_heartbeat() -> Result<String> {
    serde_json::to_string(&Outbound {
        op: OP_HEARTBEAT,
        d: None,
    })
    .context("encode heartbeat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_carries_the_interval() {
        let msg = parse_inbound(r#"{"op":1,"d":{"heartbeat_interval":30000}}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Hello {
                heartbeat_interval: Some(Duration::from_secs(30))
            }
        );
    }

    #[test]
    fn hello_without_a_usable_interval_is_still_a_hello() {
        let bare = Inbound::Hello {
            heartbeat_interval: None,
        };
        assert_eq!(parse_inbound(r#"{"op":1,"d":{}}"#).unwrap(), bare);
        assert_eq!(parse_inbound(r#"{"op":1}"#).unwrap(), bare);
        assert_eq!(parse_inbound(r#"{"op":1,"d":{"heartbeat_interval":0}}"#).unwrap(), bare);
        assert_eq!(
            parse_inbound(r#"{"op":1,"d":{"heartbeat_interval":"soon"}}"#).unwrap(),
            bare
        );
    }

    #[test]
    fn event_with_track_parses_and_ignores_extra_fields() {
        let text = r#"{
            "op": 0,
            "seq": 1,
            "t": "INIT_STATE",
            "d": {
                "discord_status": "dnd",
                "listening_to_spotify": true,
                "spotify": {
                    "song": "Weightless",
                    "artist": "Marconi Union",
                    "album": "Weightless",
                    "album_art_url": "https://i.scdn.co/image/abc",
                    "timestamps": { "start": 1000, "end": 481000 }
                }
            }
        }"#;
        let Inbound::Event { kind, presence } = parse_inbound(text).unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(kind.as_deref(), Some("INIT_STATE"));
        assert_eq!(presence.discord_status.as_deref(), Some("dnd"));
        let track = presence.spotify.unwrap();
        assert_eq!(track.song, "Weightless");
        assert_eq!(
            track.timestamps,
            Some(Timestamps {
                start: Some(1000),
                end: Some(481000)
            })
        );
    }

    #[test]
    fn event_with_null_track() {
        let text = r#"{"op":0,"t":"PRESENCE_UPDATE","d":{"discord_status":"online","spotify":null}}"#;
        let Inbound::Event { presence, .. } = parse_inbound(text).unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(presence.spotify, None);
    }

    #[test]
    fn unknown_ops_and_garbage() {
        assert_eq!(parse_inbound(r#"{"op":7}"#).unwrap(), Inbound::Other(7));
        assert!(parse_inbound("not json").is_err());
        assert!(parse_inbound(r#"{"d":{}}"#).is_err());
    }

    #[test]
    fn outbound_messages() {
        assert_eq!(
            encode_subscribe("1186375223583440967").unwrap(),
            r#"{"op":2,"d":{"subscribe_to_id":"1186375223583440967"}}"#
        );
        assert_eq!(encode_heartbeat().unwrap(), r#"{"op":3}"#);
    }
}
