//! Server identity: canonical display names and icon keys for well-known
//! networks, derived from the connection address and the server MOTD.
//!
//! Everything here is pure. Tables are scanned in declaration order and the
//! first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

/// Host suffix → display name.
const KNOWN_HOSTS: [(&str, &str); 6] = [
    ("hypixel.net", "Hypixel"),
    ("minemen.club", "Minemen Club"),
    ("cubecraft.net", "CubeCraft"),
    ("mineplex.com", "Mineplex"),
    ("play.hivemc.com", "The Hive"),
    ("hivemc.com", "The Hive"),
];

/// Host suffix → presence asset key (uploaded to the application, not a
/// server favicon).
const KNOWN_ICON_KEYS: [(&str, &str); 6] = [
    ("hypixel.net", "hypixel_net"),
    ("minemen.club", "minemen"),
    ("cubecraft.net", "cubecraft"),
    ("mineplex.com", "mineplex"),
    ("play.hivemc.com", "hive"),
    ("hivemc.com", "hive"),
];

/// Lower-case MOTD substring → display name.
const MOTD_BRANDS: [(&str, &str); 5] = [
    ("hypixel", "Hypixel"),
    ("mineplex", "Mineplex"),
    ("cubecraft", "CubeCraft"),
    ("hive", "The Hive"),
    ("minemen", "Minemen Club"),
];

static COLOR_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{a7}.").expect("color code pattern is valid"));
static BRACKET_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]").expect("bracket tag pattern is valid"));

/// Host part of a server address, lower-cased.
///
/// `host:port` loses its port; `[v6]:port` loses brackets and port. A bare
/// IPv6 address (several colons, no brackets) is kept whole.
pub fn resolve_host(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(close) = rest.find(']').filter(|&close| close > 0) {
            return normalize_host(&rest[..close]);
        }
    }

    match trimmed.rfind(':') {
        Some(colon) if colon > 0 && trimmed.find(':') == Some(colon) => {
            normalize_host(&trimmed[..colon])
        }
        _ => normalize_host(trimmed),
    }
}

/// Display name for a server: MOTD brand first, then the host table, then
/// the host itself. Empty when the address has no host.
pub fn resolve_display_name(motd: &str, address: &str) -> String {
    if let Some(brand) = brand_from_motd(motd) {
        return brand.to_string();
    }

    let host = resolve_host(address);
    match lookup(&KNOWN_HOSTS, &host) {
        Some(name) => name.to_string(),
        None => host,
    }
}

/// Asset key for the small image: the host table, else `fallback` trimmed.
pub fn resolve_icon_key(address: &str, fallback: &str) -> String {
    let host = resolve_host(address);
    lookup(&KNOWN_ICON_KEYS, &host)
        .unwrap_or_else(|| fallback.trim())
        .to_string()
}

/// MOTD text with color codes, `|` separators and `[tags]` removed and
/// whitespace collapsed.
pub fn clean_motd(motd: &str) -> String {
    let text = COLOR_CODE.replace_all(motd, "");
    let text = text.replace('|', " ");
    let text = BRACKET_TAG.replace_all(&text, " ");
    collapse_whitespace(&text)
}

/// Runs of whitespace become one space; ends are trimmed.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn brand_from_motd(motd: &str) -> Option<&'static str> {
    if motd.trim().is_empty() {
        return None;
    }
    let lower = clean_motd(motd).to_lowercase();
    if lower.is_empty() {
        return None;
    }
    MOTD_BRANDS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|&(_, brand)| brand)
}

fn lookup(table: &[(&'static str, &'static str)], host: &str) -> Option<&'static str> {
    if host.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(known, _)| {
            host == *known
                || host
                    .strip_suffix(known)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|&(_, value)| value)
}

fn normalize_host(host: &str) -> String {
    host.trim().to_lowercase()
}
