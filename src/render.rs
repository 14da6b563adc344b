//! HTML fragments for the carousel, grids, dropdowns and overlay.
//!
//! Every piece of catalog text is escaped before it reaches markup; the host
//! page only ever receives complete fragments.

use crate::config::SkateConfig;
use crate::player::{embed_url, PlayerSlot};
use crate::types::Video;

pub const EMPTY_CAROUSEL: &str = "No featured videos available";
pub const EMPTY_GRID: &str = "No tricks in this category yet";
pub const PLACEHOLDER_TEXT: &str = "Video coming soon!";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn empty_state(message: &str) -> String {
    format!("<div class=\"empty-state\"><p>{}</p></div>", escape_html(message))
}

/// Static artwork for a trick without footage, picked by its first type.
pub fn trick_image(cfg: &SkateConfig, video: &Video) -> String {
    format!(
        "<div class=\"card-img-wrapper\"><img src=\"{}\" class=\"card-img-top\" alt=\"{}\"></div>",
        escape_html(cfg.default_images.for_type(video.primary_type())),
        escape_html(&video.title)
    )
}

fn iframe(cfg: &SkateConfig, video: &Video, slot: PlayerSlot, style: &str) -> String {
    format!(
        "<iframe src=\"{}\" allowfullscreen frameborder=\"0\" loading=\"lazy\" id=\"{}\" style=\"{}\"></iframe>",
        escape_html(&embed_url(&cfg.youtube_base_url, &video.path, false)),
        escape_html(&slot.element_id(&video.path)),
        style
    )
}

pub fn carousel_item(cfg: &SkateConfig, video: &Video, active: bool) -> String {
    let body = if video.has_video() {
        iframe(cfg, video, PlayerSlot::Carousel, "width: 100%; height: 100%;")
    } else {
        trick_image(cfg, video)
    };
    format!(
        "<div class=\"carousel-item{}\" data-video-title=\"{}\" data-video-id=\"{}\">{}</div>",
        if active { " active" } else { "" },
        escape_html(&video.title),
        escape_html(&video.path),
        body
    )
}

pub fn carousel(cfg: &SkateConfig, featured: &[Video]) -> String {
    if featured.is_empty() {
        return empty_state(EMPTY_CAROUSEL);
    }
    featured.iter().enumerate().map(|(i, v)| carousel_item(cfg, v, i == 0)).collect()
}

pub fn video_card(cfg: &SkateConfig, video: &Video) -> String {
    let playable = video.has_video();
    let media = if playable {
        iframe(cfg, video, PlayerSlot::Card, "width: 100%; height: 250px;")
    } else {
        trick_image(cfg, video)
    };
    format!(
        "<div class=\"col\"><div class=\"card video-card h-100\" data-video-id=\"{}\"{}>{}<div class=\"card-body\"><h5 class=\"card-title\">{}</h5><p class=\"card-text\">{}</p></div></div></div>",
        escape_html(&video.path),
        if playable { " data-has-video=\"true\"" } else { "" },
        media,
        escape_html(&video.title),
        escape_html(&video.description())
    )
}

pub fn grid(cfg: &SkateConfig, videos: &[Video]) -> String {
    if videos.is_empty() {
        return empty_state(EMPTY_GRID);
    }
    videos.iter().map(|v| video_card(cfg, v)).collect()
}

pub fn dropdown(videos: &[Video]) -> String {
    videos
        .iter()
        .map(|v| {
            format!(
                "<li><button class=\"dropdown-item\" data-video-id=\"{}\">{}</button></li>",
                escape_html(&v.path),
                escape_html(&v.title)
            )
        })
        .collect()
}

/// Shown in the overlay when the trick has not been filmed yet.
pub fn placeholder(cfg: &SkateConfig, video: &Video) -> String {
    format!(
        "<div class=\"video-placeholder\"><img src=\"{}\" alt=\"{}\" class=\"placeholder-image\"><div class=\"placeholder-text\"><h3>{}</h3><p>{}</p></div></div>",
        escape_html(cfg.default_images.for_type(video.primary_type())),
        escape_html(&video.title),
        escape_html(&video.title),
        PLACEHOLDER_TEXT
    )
}

pub fn overlay_player(cfg: &SkateConfig, video: &Video) -> String {
    format!(
        "<iframe src=\"{}\" allowfullscreen frameborder=\"0\" allow=\"autoplay; encrypted-media\" id=\"{}\" style=\"width: 100%; height: 100%;\"></iframe>",
        escape_html(&embed_url(&cfg.youtube_base_url, &video.path, true)),
        escape_html(&PlayerSlot::Overlay.element_id(&video.path))
    )
}

/// `<link rel="preload">` tags for the fallback artwork.
pub fn preload_links(cfg: &SkateConfig) -> String {
    cfg.default_images
        .all()
        .map(|src| format!("<link rel=\"preload\" as=\"image\" href=\"{}\">", escape_html(src)))
        .collect()
}
