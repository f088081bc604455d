//! Host state → [`PresenceSnapshot`].
//!
//! The host hands over a plain [`HostState`] value describing where the
//! player is; the capture rules below decide what the presence shows for it.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::identity::{collapse_whitespace, resolve_display_name, resolve_host, resolve_icon_key};
use crate::snapshot::PresenceSnapshot;

static PLAYER_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("player count pattern is valid"));
static MODE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mode|game|map|server|lobby)\s*:\s*").expect("mode prefix pattern is valid")
});

const HYPIXEL: &str = "Hypixel";

/// Produces a snapshot from the current host state.
///
/// Called on every tick that passes the interval gate, so it must be cheap
/// and free of side effects.
pub trait StateSampler {
    fn sample(&self, config: &Config) -> PresenceSnapshot;
}

impl<F> StateSampler for F
where
    F: Fn(&Config) -> PresenceSnapshot,
{
    fn sample(&self, config: &Config) -> PresenceSnapshot {
        self(config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dimension {
    #[default]
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Overworld => "Overworld",
            Dimension::Nether => "Nether",
            Dimension::End => "End",
        }
    }

    fn large_image(self, config: &Config) -> Option<String> {
        let key = match self {
            Dimension::Overworld => &config.large_image_overworld,
            Dimension::Nether => &config.large_image_nether,
            Dimension::End => &config.large_image_end,
        };
        non_blank(key)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown dimension '{0}' (expected overworld, nether or end)")]
pub struct UnknownDimension(String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    /// Accepts plain names and namespaced world ids (`minecraft:the_nether`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let id = lower.strip_prefix("minecraft:").unwrap_or(lower.as_str());
        match id.strip_prefix("the_").unwrap_or(id) {
            "overworld" => Ok(Dimension::Overworld),
            "nether" => Ok(Dimension::Nether),
            "end" => Ok(Dimension::End),
            _ => Err(UnknownDimension(s.to_string())),
        }
    }
}

/// A scoreboard team as seen by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Team {
    /// Formatting color name; empty or `RESET` means uncolored.
    pub color: String,
    pub members: u32,
}

impl Team {
    fn is_colored(&self) -> bool {
        let color = self.color.trim();
        !color.is_empty() && !color.eq_ignore_ascii_case("reset")
    }
}

/// Everything known about the current multiplayer connection.
///
/// Text fields are raw as received; empty means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSession {
    /// Address as typed in the server list, possibly with a port.
    pub address: String,
    /// Server list MOTD.
    pub motd: String,
    pub dimension: Dimension,
    /// Sidebar objective title.
    pub sidebar_title: String,
    /// Color of the player's own team.
    pub own_team_color: String,
    /// Server list player count, e.g. `"12/100"`.
    pub player_count_label: String,
    /// Tab list header and footer joined with a space.
    pub tab_header_footer: String,
    /// Entries in the tab list; 0 when unknown.
    pub online_players: u32,
    pub teams: Vec<Team>,
}

impl ServerSession {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

/// Where the player currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostState {
    #[default]
    Menu,
    Singleplayer {
        dimension: Dimension,
    },
    Multiplayer(ServerSession),
}

impl StateSampler for HostState {
    fn sample(&self, config: &Config) -> PresenceSnapshot {
        match self {
            HostState::Menu => menu(config),
            HostState::Singleplayer { dimension } => singleplayer(*dimension, config),
            HostState::Multiplayer(session) => multiplayer(session, config),
        }
    }
}

fn menu(config: &Config) -> PresenceSnapshot {
    PresenceSnapshot {
        details: normalize_details(&config.menu_details),
        state: Some("In the menus".to_string()),
        large_image_key: non_blank(&config.large_image_menu),
        large_image_text: non_blank(&config.large_image_text),
        ..PresenceSnapshot::default()
    }
}

fn singleplayer(dimension: Dimension, config: &Config) -> PresenceSnapshot {
    let mut state = config.singleplayer_state.clone();
    if config.show_dimension {
        state = format!("{state} | {dimension}");
    }

    PresenceSnapshot {
        details: Some("Singleplayer".to_string()),
        state: Some(state),
        large_image_key: dimension.large_image(config),
        large_image_text: non_blank(&config.large_image_text),
        ..PresenceSnapshot::default()
    }
}

fn multiplayer(session: &ServerSession, config: &Config) -> PresenceSnapshot {
    let public = !config.private_server_mode;
    let address = session.address.trim();
    let motd = collapse_whitespace(&session.motd);
    let server = resolve_display_name(&motd, address);
    let on_hypixel = server.eq_ignore_ascii_case(HYPIXEL);
    let mode = mode_from_sidebar(&session.sidebar_title);
    let (count_size, count_max) = player_counts(session);

    let mut state = "Playing multiplayer".to_string();
    if !public {
        state = config.private_server_state.clone();
    } else {
        if config.show_server_name && !server.is_empty() {
            state = format!("Playing on {server}");
        }
        if config.show_server_address && !address.is_empty() {
            state = format!("{state} ({address})");
        }
        if config.show_player_count {
            if let Some(counts) = format_counts(count_size, count_max) {
                state = format!("{state} ({counts})");
            }
        }
        let variant = with_team_variant(&mode, &session.teams);
        if on_hypixel && !variant.is_empty() {
            state = format!("{state} | Playing {variant}");
        }
    }

    let mut details = None;
    if public && !mode.is_empty() {
        let color = session.own_team_color.trim().to_uppercase();
        details = match (on_hypixel, color.is_empty()) {
            (true, true) => None,
            (true, false) => Some(format!("Team {color}")),
            (false, true) => Some(format!("Playing {mode}")),
            (false, false) => Some(format!("Playing {mode} [{color}]")),
        };
    }
    if details.is_none() && public && config.show_motd && !motd.is_empty() {
        details = Some(motd);
    }
    if details.is_none() {
        details = normalize_details(&config.menu_details).or_else(|| {
            config
                .show_dimension
                .then(|| format!("In the {}", session.dimension.name().to_lowercase()))
        });
    }

    let mut snapshot = PresenceSnapshot {
        details,
        state: Some(state),
        large_image_key: session.dimension.large_image(config),
        large_image_text: non_blank(&config.large_image_text),
        ..PresenceSnapshot::default()
    };

    if public && config.show_server_icon {
        snapshot.small_image_key = non_blank(&resolve_icon_key(address, &config.small_image_fallback));
        snapshot.small_image_text = (!server.is_empty()).then(|| server.clone());
    }

    if public && config.enable_join_invites && !address.is_empty() {
        let host = resolve_host(address);
        let party_host = if host.is_empty() {
            address.to_lowercase()
        } else {
            host
        };
        snapshot.party_id = Some(format!("server:{party_host}"));
        snapshot.party_size = count_size;
        snapshot.party_max = count_max;
        snapshot.join_secret = Some(address.to_string());
    }

    snapshot
}

/// Sidebar title without its `mode:`-style prefix, underscores as spaces.
fn mode_from_sidebar(title: &str) -> String {
    let title = collapse_whitespace(title);
    if title.is_empty() {
        return title;
    }
    MODE_PREFIX.replace(&title, "").replace('_', " ")
}

/// BedWars modes get a `2v2v2v2`-style suffix built from the populated
/// colored teams, when there are at least two.
fn with_team_variant(mode: &str, teams: &[Team]) -> String {
    let mode = collapse_whitespace(mode);
    let lower = mode.to_lowercase();
    if mode.is_empty() || !(lower.contains("bedwars") || lower.contains("bed wars")) {
        return mode;
    }

    let sizes: Vec<String> = teams
        .iter()
        .filter(|team| team.is_colored() && team.members > 0)
        .map(|team| team.members.to_string())
        .collect();
    if sizes.len() < 2 {
        return mode;
    }
    format!("{mode} {}", sizes.join("v"))
}

/// `(size, max)` from the server list label, then the tab header/footer,
/// then the tab list length (max unknown).
fn player_counts(session: &ServerSession) -> (u32, u32) {
    let from_label = parse_counts(&session.player_count_label);
    if from_label.0 > 0 && from_label.1 > 0 {
        return from_label;
    }

    let from_tab = parse_counts(&collapse_whitespace(&session.tab_header_footer));
    if from_tab.0 > 0 && from_tab.1 > 0 {
        return from_tab;
    }

    (session.online_players, 0)
}

fn parse_counts(raw: &str) -> (u32, u32) {
    let Some(caps) = PLAYER_COUNT.captures(raw) else {
        return (0, 0);
    };
    match (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
        (Ok(size), Ok(max)) => (size, max),
        _ => (0, 0),
    }
}

fn format_counts(size: u32, max: u32) -> Option<String> {
    match (size, max) {
        (0, _) => None,
        (size, max) if max >= size => Some(format!("{size}/{max}")),
        (size, _) => Some(size.to_string()),
    }
}

/// Collapsed menu details; the stock "Playing Minecraft" counts as unset.
fn normalize_details(value: &str) -> Option<String> {
    let cleaned = collapse_whitespace(value);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("playing minecraft") {
        return None;
    }
    Some(cleaned)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
