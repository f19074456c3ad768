//! Social share links.

use std::fmt;
use std::str::FromStr;

use crate::export::encode_uri_component;

/// Networks the page has share buttons for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareNetwork {
    Twitter,
    LinkedIn,
}

impl ShareNetwork {
    /// Value of the button's `data-network` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::LinkedIn => "linkedin",
        }
    }

    /// Share URL for `page_url`. LinkedIn ignores `text`.
    #[must_use]
    pub fn share_url(self, page_url: &str, text: &str) -> String {
        match self {
            Self::Twitter => format!(
                "https://twitter.com/intent/tweet?url={}&text={}",
                encode_uri_component(page_url),
                encode_uri_component(text)
            ),
            Self::LinkedIn => format!(
                "https://www.linkedin.com/sharing/share-offsite/?url={}",
                encode_uri_component(page_url)
            ),
        }
    }
}

impl fmt::Display for ShareNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a share button names a network without a link format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNetwork(pub String);

impl fmt::Display for UnknownNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown share network: {}", self.0)
    }
}

impl std::error::Error for UnknownNetwork {}

impl FromStr for ShareNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(Self::Twitter),
            "linkedin" => Ok(Self::LinkedIn),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

/// Text shared alongside the link: the page heading plus a fixed suffix.
#[must_use]
pub fn share_text(heading: &str, suffix: &str) -> String {
    format!("{heading}{suffix}")
}
