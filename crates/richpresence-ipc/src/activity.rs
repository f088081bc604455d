//! Activity value and the `SET_ACTIVITY` command payload.

use serde::Serialize;

use crate::error::Result;

/// One presence update as shown by the desktop client.
///
/// Blank strings count as absent; they are dropped when the command payload
/// is built. Party size/max are only sent when `max >= size > 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub details: Option<String>,
    pub state: Option<String>,
    pub large_image_key: Option<String>,
    pub large_image_text: Option<String>,
    pub small_image_key: Option<String>,
    pub small_image_text: Option<String>,
    pub party_id: Option<String>,
    pub party_size: u32,
    pub party_max: u32,
    pub join_secret: Option<String>,
    /// Epoch seconds; 0 means unset.
    pub start_timestamp: u64,
}

impl Activity {
    /// An activity with every field unset; sending it clears the presence.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Whether nothing would be serialized for this activity.
    pub fn is_empty(&self) -> bool {
        SetActivity::body(self) == ActivityBody::default()
    }
}

/// Full `SET_ACTIVITY` command.
///
/// ```text
/// {"cmd":"SET_ACTIVITY","args":{"pid":<int>,"activity":{...}},"nonce":"<uuid>"}
/// ```
#[derive(Debug, Serialize)]
pub struct SetActivity<'a> {
    cmd: &'static str,
    args: SetActivityArgs<'a>,
    nonce: String,
}

#[derive(Debug, Serialize)]
struct SetActivityArgs<'a> {
    pid: u32,
    activity: ActivityBody<'a>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct ActivityBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamps: Option<Timestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets: Option<Assets<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    party: Option<Party<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secrets: Option<Secrets<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<bool>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Timestamps {
    start: u64,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct Assets<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    large_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    large_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    small_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    small_text: Option<&'a str>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct Party<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<u32>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Secrets<'a> {
    join: &'a str,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl<'a> SetActivity<'a> {
    /// Build the command for `activity` on behalf of process `pid`.
    pub fn new(activity: &'a Activity, pid: u32, nonce: impl Into<String>) -> Self {
        Self {
            cmd: "SET_ACTIVITY",
            args: SetActivityArgs {
                pid,
                activity: Self::body(activity),
            },
            nonce: nonce.into(),
        }
    }

    /// Build the command for the current process with a fresh random nonce.
    pub fn for_current_process(activity: &'a Activity) -> Self {
        Self::new(activity, std::process::id(), uuid::Uuid::new_v4().to_string())
    }

    /// Serialize to the JSON text sent in a `Message` frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn body(activity: &'a Activity) -> ActivityBody<'a> {
        let timestamps = (activity.start_timestamp > 0).then_some(Timestamps {
            start: activity.start_timestamp,
        });

        let assets = Assets {
            large_image: present(&activity.large_image_key),
            large_text: present(&activity.large_image_text),
            small_image: present(&activity.small_image_key),
            small_text: present(&activity.small_image_text),
        };

        let counts_valid = activity.party_size > 0 && activity.party_max >= activity.party_size;
        let party = Party {
            id: present(&activity.party_id),
            size: counts_valid.then_some(activity.party_size),
            max: counts_valid.then_some(activity.party_max),
        };

        let secrets = present(&activity.join_secret).map(|join| Secrets { join });
        let instance = secrets.as_ref().map(|_| true);

        ActivityBody {
            state: present(&activity.state),
            details: present(&activity.details),
            timestamps,
            assets: (assets != Assets::default()).then_some(assets),
            party: (party != Party::default()).then_some(party),
            secrets,
            instance,
        }
    }
}
