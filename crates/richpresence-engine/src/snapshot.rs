use richpresence_ipc::Activity;

/// What the presence would show right now.
///
/// Two snapshots compare equal iff every field is equal; the service only
/// sends when the freshly sampled snapshot differs from the last one sent.
/// Party counts use the same `max >= size > 0` rule as [`Activity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PresenceSnapshot {
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
}

impl PresenceSnapshot {
    /// The activity to send for this snapshot, started at `start_timestamp`
    /// (epoch seconds).
    pub fn to_activity(&self, start_timestamp: u64) -> Activity {
        Activity {
            details: self.details.clone(),
            state: self.state.clone(),
            large_image_key: self.large_image_key.clone(),
            large_image_text: self.large_image_text.clone(),
            small_image_key: self.small_image_key.clone(),
            small_image_text: self.small_image_text.clone(),
            party_id: self.party_id.clone(),
            party_size: self.party_size,
            party_max: self.party_max,
            join_secret: self.join_secret.clone(),
            start_timestamp,
        }
    }
}
