//! Compose `ports` entry shapes.
//!
//! A service's `ports` sequence mixes two syntaxes: short strings like
//! `"8080:80"` and long mappings with `target`/`published` keys. Both are
//! resolved once at parse time into an optional host port; nothing
//! downstream sees the raw YAML shape.

use serde::Deserialize;

/// One entry in a service's `ports` sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// Long syntax: `{ target: 80, published: 8080, protocol: tcp, mode: host }`
    Long(LongPort),
    /// Short syntax: `"8080:80"`, `"8080:80/udp"`, or a bare `8080`
    Short(ShortPort),
}

/// Long-syntax port mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct LongPort {
    #[serde(default)]
    pub target: Option<u32>,

    /// Host port. Entries without it are container-internal.
    #[serde(default)]
    pub published: Option<PortNumber>,

    #[serde(default)]
    pub protocol: Option<String>,

    #[serde(default)]
    pub mode: Option<String>,
}

/// Short-syntax entry; YAML may carry it as a string or a bare integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ShortPort {
    Number(u32),
    Text(String),
}

/// Compose accepts `published: 8080` and `published: "8080"` alike.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortNumber {
    Number(u32),
    Text(String),
}

impl PortNumber {
    fn as_u16(&self) -> Option<u16> {
        match self {
            PortNumber::Number(n) => u16::try_from(*n).ok(),
            PortNumber::Text(s) => s.parse::<u16>().ok(),
        }
    }
}

impl PortSpec {
    /// Resolve the host-published port, if any.
    ///
    /// Bare ports (`8080`, `"8080"`) denote container-only exposure and
    /// resolve to `None`, as do long entries lacking `published` and short
    /// entries whose host token is not numeric (e.g. an IP prefix).
    pub fn host_port(&self) -> Option<u16> {
        match self {
            PortSpec::Long(long) => long.published.as_ref().and_then(PortNumber::as_u16),
            PortSpec::Short(ShortPort::Number(_)) => None,
            PortSpec::Short(ShortPort::Text(text)) => {
                let (host_token, rest) = text.split_once(':')?;
                if rest.is_empty() {
                    return None;
                }
                host_token.parse::<u16>().ok().filter(|p| *p != 0)
            }
        }
    }
}
