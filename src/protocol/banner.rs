//! CONNECT banner grammar.
//!
//! A banner is the text payload of a CNXN packet:
//!
//! ```text
//! <role>:<serial>:<body>
//! host::features=shell_v2,cmd
//! device:emu-1:ro.product.name=x;ro.product.model=y;ro.product.device=z;features=cmd;
//! ```
//!
//! The feature list is found by searching the whole text for the `features=` marker,
//! not by walking the `;`-separated body, so a banner without the `<role>:<serial>:`
//! prefix still yields its features.

use crate::config::DeviceProperties;

pub const FEATURES_MARKER: &str = "features=";

/// Substituted for product properties the device does not define.
pub const UNKNOWN: &str = "unknown";

/// A banner split at its two leading `:` separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner<'a> {
    pub role: &'a str,
    pub serial: &'a str,
    pub body: &'a str,
}

impl<'a> Banner<'a> {
    /// Split `<role>:<serial>:<body>`. Returns `None` if either separator is missing.
    /// A trailing NUL terminator, which some peers send, is dropped first.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim_end_matches('\0');
        let (role, rest) = text.split_once(':')?;
        let (serial, body) = rest.split_once(':')?;
        Some(Self { role, serial, body })
    }

    /// `key=value` pairs of the body, in order. Entries without `=` are skipped.
    pub fn properties(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.body
            .split(';')
            .filter_map(|entry| entry.split_once('='))
    }

    pub fn property(&self, key: &str) -> Option<&'a str> {
        self.properties().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Text following the features marker, ended by the first NUL and then cut at the first `;`.
fn feature_segment(text: &str) -> Option<&str> {
    let start = text.find(FEATURES_MARKER)? + FEATURES_MARKER.len();
    let rest = &text[start..];
    let rest = rest.find('\0').map_or(rest, |end| &rest[..end]);
    Some(rest.find(';').map_or(rest, |end| &rest[..end]))
}

/// Features requested in `text`, in order and without deduplication.
///
/// Tokens are split on `,`, trimmed, and empty tokens are dropped. A banner without
/// the marker requests nothing.
pub fn parse_features(text: &str) -> Vec<String> {
    let Some(segment) = feature_segment(text) else {
        return Vec::new();
    };

    segment
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Render a device banner advertising `features`.
pub fn render_device_banner<S: AsRef<str>>(props: &DeviceProperties, features: &[S]) -> String {
    let mut out = String::with_capacity(128);

    out.push_str("device:");
    out.push_str(props.serialno.as_deref().unwrap_or(""));
    out.push(':');

    for (key, value) in [
        ("ro.product.name", &props.name),
        ("ro.product.model", &props.model),
        ("ro.product.device", &props.device),
    ] {
        out.push_str(key);
        out.push('=');
        out.push_str(value.as_deref().unwrap_or(UNKNOWN));
        out.push(';');
    }

    if !features.is_empty() {
        out.push_str(FEATURES_MARKER);
        out.push_str(&join(features));
        out.push(';');
    }

    out
}

/// Render a host banner requesting `features`.
pub fn render_host_banner<S: AsRef<str>>(features: &[S]) -> String {
    format!("host::{FEATURES_MARKER}{}", join(features))
}

/// Banner of a device advertising its complete feature list, outside any handshake.
pub fn device_banner(props: &DeviceProperties) -> String {
    render_device_banner(props, props.features.as_slice())
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}
