//! Video URL classification and embed resolution.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:youtube\.com/watch\?v=|youtu\.be/)").expect("valid regex")
});

static VIMEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vimeo\.com/").expect("valid regex"));

static MP4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.mp4(?:\?|$)").expect("valid regex"));

static YOUTUBE_QUERY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]v=([^&]+)").expect("valid regex"));

static YOUTUBE_SHORT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([^?&]+)").expect("valid regex"));

static VIMEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("valid regex"));

/// `allow` policy for YouTube frames.
pub const YOUTUBE_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// `allow` policy for Vimeo frames.
pub const VIMEO_ALLOW: &str = "autoplay; fullscreen; picture-in-picture";

/// `allow` policy for frames around unrecognized links.
pub const FALLBACK_ALLOW: &str = "autoplay; fullscreen";

/// Placeholder shown in a section without a video.
pub const EMPTY_PLACEHOLDER: &str = "Sin vídeo";

/// Hosting platform a pasted video link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VideoKind {
    YouTube,
    Vimeo,
    Mp4,
    Unknown,
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::YouTube => "YouTube",
            Self::Vimeo => "Vimeo",
            Self::Mp4 => "MP4",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Classifies a video link. YouTube wins over Vimeo, Vimeo over MP4.
#[must_use]
pub fn classify(url: &str) -> VideoKind {
    if YOUTUBE_RE.is_match(url) {
        VideoKind::YouTube
    } else if VIMEO_RE.is_match(url) {
        VideoKind::Vimeo
    } else if MP4_RE.is_match(url) {
        VideoKind::Mp4
    } else {
        VideoKind::Unknown
    }
}

/// Rewrites a link into the platform's embeddable player URL.
///
/// Returns `None` when the kind has no player URL or the video ID cannot be
/// pulled out of the link.
#[must_use]
pub fn to_embed_url(url: &str, kind: VideoKind) -> Option<String> {
    match kind {
        VideoKind::YouTube => YOUTUBE_QUERY_ID_RE
            .captures(url)
            .or_else(|| YOUTUBE_SHORT_ID_RE.captures(url))
            .and_then(|c| c.get(1))
            .map(|id| format!("https://www.youtube.com/embed/{}", id.as_str())),
        VideoKind::Vimeo => VIMEO_ID_RE
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|id| format!("https://player.vimeo.com/video/{}", id.as_str())),
        VideoKind::Mp4 | VideoKind::Unknown => None,
    }
}

/// What a video container should display for a stored link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedPlan {
    /// No link stored; show the placeholder.
    Empty { placeholder: &'static str },
    /// An `<iframe>` player.
    Frame {
        src: String,
        allow: &'static str,
        allow_fullscreen: bool,
    },
    /// A native `<video controls>` element.
    Video { src: String },
}

/// Decides how to render a stored link.
///
/// When the player URL cannot be derived the raw link is framed as-is. That
/// may not play for every link shape.
#[must_use]
pub fn render_plan(url: &str) -> EmbedPlan {
    if url.is_empty() {
        return EmbedPlan::Empty {
            placeholder: EMPTY_PLACEHOLDER,
        };
    }

    let kind = classify(url);
    let src = || to_embed_url(url, kind).unwrap_or_else(|| url.to_string());
    match kind {
        VideoKind::YouTube => EmbedPlan::Frame {
            src: src(),
            allow: YOUTUBE_ALLOW,
            allow_fullscreen: true,
        },
        VideoKind::Vimeo => EmbedPlan::Frame {
            src: src(),
            allow: VIMEO_ALLOW,
            allow_fullscreen: true,
        },
        VideoKind::Mp4 => EmbedPlan::Video {
            src: url.to_string(),
        },
        VideoKind::Unknown => EmbedPlan::Frame {
            src: url.to_string(),
            allow: FALLBACK_ALLOW,
            allow_fullscreen: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- classify ---

    #[test]
    fn classify_youtube_watch_url() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            VideoKind::YouTube
        );
    }

    #[test]
    fn classify_youtube_short_url() {
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), VideoKind::YouTube);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify("HTTPS://YOUTU.BE/abc"), VideoKind::YouTube);
        assert_eq!(classify("https://VIMEO.com/1"), VideoKind::Vimeo);
        assert_eq!(classify("https://cdn.test/clip.MP4"), VideoKind::Mp4);
    }

    #[test]
    fn classify_vimeo() {
        assert_eq!(classify("https://vimeo.com/123456"), VideoKind::Vimeo);
    }

    #[test]
    fn classify_vimeo_without_id_is_still_vimeo() {
        assert_eq!(classify("https://vimeo.com/channels/staff"), VideoKind::Vimeo);
    }

    #[test]
    fn classify_mp4_with_and_without_query() {
        assert_eq!(classify("https://cdn.test/a.mp4"), VideoKind::Mp4);
        assert_eq!(classify("https://cdn.test/a.mp4?token=1"), VideoKind::Mp4);
    }

    #[test]
    fn classify_mp4_in_middle_of_path_is_unknown() {
        assert_eq!(classify("https://cdn.test/a.mp4/page"), VideoKind::Unknown);
    }

    #[test]
    fn classify_unknown() {
        assert_eq!(classify("https://example.com/video"), VideoKind::Unknown);
        assert_eq!(classify(""), VideoKind::Unknown);
    }

    // --- to_embed_url ---

    #[test]
    fn youtube_watch_to_embed() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42";
        assert_eq!(
            to_embed_url(url, classify(url)).as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn youtube_short_to_embed() {
        let url = "https://youtu.be/dQw4w9WgXcQ?si=tracking";
        assert_eq!(
            to_embed_url(url, VideoKind::YouTube).as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn vimeo_to_embed() {
        let url = "https://vimeo.com/123456";
        assert_eq!(classify(url), VideoKind::Vimeo);
        assert_eq!(
            to_embed_url(url, VideoKind::Vimeo).as_deref(),
            Some("https://player.vimeo.com/video/123456")
        );
    }

    #[test]
    fn vimeo_without_numeric_id_has_no_embed() {
        assert_eq!(
            to_embed_url("https://vimeo.com/channels/staff", VideoKind::Vimeo),
            None
        );
    }

    #[test]
    fn mp4_and_unknown_have_no_embed() {
        assert_eq!(to_embed_url("https://cdn.test/a.mp4", VideoKind::Mp4), None);
        assert_eq!(to_embed_url("https://x.test", VideoKind::Unknown), None);
    }

    // --- render_plan ---

    #[test]
    fn render_empty_shows_placeholder() {
        assert_eq!(
            render_plan(""),
            EmbedPlan::Empty {
                placeholder: "Sin vídeo"
            }
        );
    }

    #[test]
    fn render_youtube_frame() {
        let plan = render_plan("https://youtu.be/abc");
        assert_eq!(
            plan,
            EmbedPlan::Frame {
                src: "https://www.youtube.com/embed/abc".to_string(),
                allow: YOUTUBE_ALLOW,
                allow_fullscreen: true,
            }
        );
    }

    #[test]
    fn render_vimeo_falls_back_to_raw_url() {
        let url = "https://vimeo.com/channels/staff";
        let EmbedPlan::Frame { src, allow, .. } = render_plan(url) else {
            panic!("expected frame");
        };
        assert_eq!(src, url);
        assert_eq!(allow, VIMEO_ALLOW);
    }

    #[test]
    fn render_mp4_uses_video_element() {
        assert_eq!(
            render_plan("https://cdn.test/a.mp4"),
            EmbedPlan::Video {
                src: "https://cdn.test/a.mp4".to_string()
            }
        );
    }

    #[test]
    fn render_unknown_frames_raw_link_without_fullscreen() {
        assert_eq!(
            render_plan("https://example.com/player"),
            EmbedPlan::Frame {
                src: "https://example.com/player".to_string(),
                allow: FALLBACK_ALLOW,
                allow_fullscreen: false,
            }
        );
    }

    #[test]
    fn render_plan_serializes_with_type_tag() {
        let json = serde_json::to_value(render_plan("https://cdn.test/a.mp4")).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["src"], "https://cdn.test/a.mp4");
    }
}
