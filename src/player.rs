use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

const BASE_QUERY: &str = "enablejsapi=1&rel=0&modestbranding=1";
const AUTOPLAY_QUERY: &str = "enablejsapi=1&autoplay=1&rel=0&modestbranding=1";

/// Embed URL for a YouTube id. The autoplay flag is the only thing that
/// distinguishes a playing iframe from an idle one.
pub fn embed_url(base: &str, video_id: &str, autoplay: bool) -> String {
    let id: String = url::form_urlencoded::byte_serialize(video_id.trim().as_bytes()).collect();
    format!("{}{}?{}", base, id, if autoplay { AUTOPLAY_QUERY } else { BASE_QUERY })
}

/// Commands understood by the YouTube iframe API over postMessage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedCommand {
    Pause,
    Stop,
}

impl EmbedCommand {
    pub fn message(self) -> &'static str {
        match self {
            EmbedCommand::Pause => r#"{"event":"command","func":"pauseVideo","args":""}"#,
            EmbedCommand::Stop => r#"{"event":"command","func":"stopVideo","args":""}"#,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    Card,
    Carousel,
    Overlay,
}

impl PlayerSlot {
    /// DOM id of the iframe. Unique per slot, so a featured video's carousel
    /// and card players never share an id.
    pub fn element_id(self, video_id: &str) -> String {
        let video_id = video_id.trim();
        match self {
            PlayerSlot::Card => format!("youtube-{}", video_id),
            PlayerSlot::Carousel => format!("carousel-youtube-{}", video_id),
            PlayerSlot::Overlay => format!("overlay-youtube-{}", video_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub slot: PlayerSlot,
    pub video_id: String,
}

impl PlayerKey {
    pub fn new(slot: PlayerSlot, video_id: impl Into<String>) -> Self { Self { slot, video_id: video_id.into() } }
    pub fn element_id(&self) -> String { self.slot.element_id(&self.video_id) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerCommand {
    PostMessage { element_id: String, message: String },
    SetSrc { element_id: String, src: String },
    /// Toggle the `video-playing` class on a grid card.
    SetPlaying { video_id: String, playing: bool },
    /// Create the overlay iframe for a video.
    MountOverlay { video_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingStart {
    key: PlayerKey,
    due_ms: u64,
}

/// Tracks every embedded player on the page and keeps at most one autoplaying.
#[derive(Debug, Clone)]
pub struct PlayerBoard {
    base_url: String,
    /// Current iframe src per player.
    players: BTreeMap<PlayerKey, String>,
    playing_cards: BTreeSet<String>,
    intentional: BTreeSet<PlayerKey>,
    pending: Option<PendingStart>,
}

impl PlayerBoard {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), players: BTreeMap::new(), playing_cards: BTreeSet::new(), intentional: BTreeSet::new(), pending: None }
    }

    pub fn register(&mut self, key: PlayerKey) {
        let src = embed_url(&self.base_url, &key.video_id, false);
        self.players.insert(key, src);
    }

    /// Forget every player in a slot, e.g. when its grid is rebuilt.
    pub fn clear_slot(&mut self, slot: PlayerSlot) {
        self.players.retain(|k, _| k.slot != slot);
        self.intentional.retain(|k| k.slot != slot);
        if slot == PlayerSlot::Card { self.playing_cards.clear(); }
        if self.pending.as_ref().is_some_and(|p| p.key.slot == slot) { self.pending = None; }
    }

    pub fn src(&self, key: &PlayerKey) -> Option<&str> { self.players.get(key).map(String::as_str) }

    pub fn is_autoplaying(&self, key: &PlayerKey) -> bool {
        self.players.get(key).is_some_and(|s| s.contains("autoplay=1"))
    }

    pub fn autoplaying(&self) -> impl Iterator<Item = &PlayerKey> {
        self.players.iter().filter(|(_, s)| s.contains("autoplay=1")).map(|(k, _)| k)
    }

    pub fn is_card_playing(&self, video_id: &str) -> bool { self.playing_cards.contains(video_id) }
    pub fn intentionally_playing(&self) -> impl Iterator<Item = &PlayerKey> { self.intentional.iter() }

    /// Pause and stop every player except `keep`, resetting autoplaying ones to the idle URL.
    pub fn stop_all_except(&mut self, keep: Option<&PlayerKey>) -> Vec<PlayerCommand> {
        tracing::debug!(keep = ?keep, "stopping players");
        if self.pending.as_ref().is_some_and(|p| Some(&p.key) != keep) { self.pending = None; }

        let mut out = Vec::new();
        let idle_base = self.base_url.clone();
        for (key, src) in self.players.iter_mut() {
            if Some(key) == keep { continue; }
            let element_id = key.element_id();
            for cmd in [EmbedCommand::Pause, EmbedCommand::Stop] {
                out.push(PlayerCommand::PostMessage { element_id: element_id.clone(), message: cmd.message().to_string() });
            }
            if src.contains("autoplay=1") {
                *src = embed_url(&idle_base, &key.video_id, false);
                out.push(PlayerCommand::SetSrc { element_id, src: src.clone() });
            }
        }

        let keep_card = keep.filter(|k| k.slot == PlayerSlot::Card).map(|k| k.video_id.as_str());
        let unmark: Vec<String> = self.playing_cards.iter().filter(|id| Some(id.as_str()) != keep_card).cloned().collect();
        for video_id in unmark {
            self.playing_cards.remove(&video_id);
            out.push(PlayerCommand::SetPlaying { video_id, playing: false });
        }

        self.intentional.retain(|k| Some(k) == keep);
        out
    }

    /// Double-click on a card: start it (after `delay_ms`) or stop it if it is already playing.
    pub fn toggle_card(&mut self, video_id: &str, now_ms: u64, delay_ms: u64) -> Vec<PlayerCommand> {
        let key = PlayerKey::new(PlayerSlot::Card, video_id);
        let starting = self.pending.as_ref().is_some_and(|p| p.key == key);
        if self.intentional.contains(&key) || starting {
            self.pending = None;
            self.intentional.remove(&key);
            let src = embed_url(&self.base_url, video_id, false);
            self.players.insert(key.clone(), src.clone());
            self.playing_cards.remove(video_id);
            return vec![
                PlayerCommand::SetSrc { element_id: key.element_id(), src },
                PlayerCommand::SetPlaying { video_id: video_id.to_string(), playing: false },
            ];
        }
        let out = self.stop_all_except(Some(&key));
        self.pending = Some(PendingStart { key, due_ms: now_ms.saturating_add(delay_ms) });
        out
    }

    /// Stop everything else and mount the overlay player after `delay_ms`.
    pub fn open_overlay(&mut self, video_id: &str, now_ms: u64, delay_ms: u64) -> Vec<PlayerCommand> {
        let key = PlayerKey::new(PlayerSlot::Overlay, video_id);
        let mut out = self.close_overlay();
        out.extend(self.stop_all_except(Some(&key)));
        self.pending = Some(PendingStart { key, due_ms: now_ms.saturating_add(delay_ms) });
        out
    }

    /// Stop and drop the overlay player, if any.
    pub fn close_overlay(&mut self) -> Vec<PlayerCommand> {
        if self.pending.as_ref().is_some_and(|p| p.key.slot == PlayerSlot::Overlay) { self.pending = None; }
        let keys: Vec<PlayerKey> = self.players.keys().filter(|k| k.slot == PlayerSlot::Overlay).cloned().collect();
        let mut out = Vec::new();
        for key in keys {
            self.players.remove(&key);
            self.intentional.remove(&key);
            out.push(PlayerCommand::PostMessage { element_id: key.element_id(), message: EmbedCommand::Stop.message().to_string() });
        }
        out
    }

    /// Fire a pending start once its delay has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Vec<PlayerCommand> {
        let due = self.pending.as_ref().is_some_and(|p| p.due_ms <= now_ms);
        if !due { return Vec::new(); }
        let Some(PendingStart { key, .. }) = self.pending.take() else { return Vec::new() };

        // Anything that began autoplaying meanwhile (e.g. a carousel slide) yields to the new player.
        let mut out = self.stop_all_except(Some(&key));
        let src = embed_url(&self.base_url, &key.video_id, true);
        self.players.insert(key.clone(), src.clone());
        self.intentional.insert(key.clone());
        match key.slot {
            PlayerSlot::Overlay => out.push(PlayerCommand::MountOverlay { video_id: key.video_id }),
            PlayerSlot::Card => {
                self.playing_cards.insert(key.video_id.clone());
                out.push(PlayerCommand::SetSrc { element_id: key.element_id(), src });
                out.push(PlayerCommand::SetPlaying { video_id: key.video_id, playing: true });
            }
            PlayerSlot::Carousel => out.push(PlayerCommand::SetSrc { element_id: key.element_id(), src }),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.youtube.com/embed/";

    fn board(ids: &[&str]) -> PlayerBoard {
        let mut b = PlayerBoard::new(BASE);
        for id in ids {
            b.register(PlayerKey::new(PlayerSlot::Card, *id));
        }
        b
    }

    #[test]
    fn embed_urls() {
        assert_eq!(embed_url(BASE, "abc", false), "https://www.youtube.com/embed/abc?enablejsapi=1&rel=0&modestbranding=1");
        assert_eq!(embed_url(BASE, "abc", true), "https://www.youtube.com/embed/abc?enablejsapi=1&autoplay=1&rel=0&modestbranding=1");
    }

    #[test]
    fn element_ids_follow_slot() {
        assert_eq!(PlayerSlot::Card.element_id("x"), "youtube-x");
        assert_eq!(PlayerSlot::Carousel.element_id("x"), "carousel-youtube-x");
        assert_eq!(PlayerSlot::Overlay.element_id("x"), "overlay-youtube-x");
        assert_eq!(PlayerSlot::Card.element_id(" x "), "youtube-x");
    }

    #[test]
    fn toggle_starts_after_delay_then_stops() {
        let mut b = board(&["a", "b"]);
        let cmds = b.toggle_card("a", 0, 50);
        // only "b" receives pause/stop
        assert_eq!(cmds.len(), 2);
        assert!(b.poll(10).is_empty());
        let cmds = b.poll(50);
        assert!(cmds.contains(&PlayerCommand::SetPlaying { video_id: "a".into(), playing: true }));
        assert!(b.is_card_playing("a"));
        assert_eq!(b.autoplaying().count(), 1);

        let cmds = b.toggle_card("a", 100, 50);
        assert_eq!(cmds[1], PlayerCommand::SetPlaying { video_id: "a".into(), playing: false });
        assert_eq!(b.autoplaying().count(), 0);
        assert_eq!(b.intentionally_playing().count(), 0);
    }

    #[test]
    fn starting_another_card_resets_the_first() {
        let mut b = board(&["a", "b"]);
        b.toggle_card("a", 0, 50);
        b.poll(50);
        let cmds = b.toggle_card("b", 100, 50);
        assert!(cmds.contains(&PlayerCommand::SetSrc { element_id: "youtube-a".into(), src: embed_url(BASE, "a", false) }));
        assert!(cmds.contains(&PlayerCommand::SetPlaying { video_id: "a".into(), playing: false }));
        b.poll(150);
        let playing: Vec<_> = b.autoplaying().cloned().collect();
        assert_eq!(playing, vec![PlayerKey::new(PlayerSlot::Card, "b")]);
    }

    #[test]
    fn stop_all_cancels_pending_start() {
        let mut b = board(&["a"]);
        b.toggle_card("a", 0, 50);
        b.stop_all_except(None);
        assert!(b.poll(100).is_empty());
        assert_eq!(b.autoplaying().count(), 0);
    }

    #[test]
    fn overlay_takes_over_from_playing_card() {
        let mut b = board(&["a"]);
        b.toggle_card("a", 0, 50);
        b.poll(50);
        b.open_overlay("a", 60, 50);
        assert!(!b.is_card_playing("a"));
        let cmds = b.poll(110);
        assert!(cmds.contains(&PlayerCommand::MountOverlay { video_id: "a".into() }));
        let playing: Vec<_> = b.autoplaying().cloned().collect();
        assert_eq!(playing, vec![PlayerKey::new(PlayerSlot::Overlay, "a")]);

        let cmds = b.close_overlay();
        assert_eq!(cmds, vec![PlayerCommand::PostMessage { element_id: "overlay-youtube-a".into(), message: EmbedCommand::Stop.message().into() }]);
        assert_eq!(b.autoplaying().count(), 0);
    }

    #[test]
    fn never_more_than_one_autoplaying() {
        let mut b = board(&["a", "b", "c"]);
        b.register(PlayerKey::new(PlayerSlot::Carousel, "a"));
        let mut now = 0;
        for id in ["a", "b", "c", "b", "a"] {
            b.toggle_card(id, now, 50);
            now += 30;
            b.open_overlay(id, now, 50);
            now += 60;
            b.poll(now);
            assert!(b.autoplaying().count() <= 1);
            b.toggle_card(id, now, 50);
            now += 60;
            b.poll(now);
            assert!(b.autoplaying().count() <= 1);
        }
    }

    #[test]
    fn clearing_cards_forgets_their_state() {
        let mut b = board(&["a"]);
        b.toggle_card("a", 0, 0);
        b.poll(0);
        b.clear_slot(PlayerSlot::Card);
        assert!(b.src(&PlayerKey::new(PlayerSlot::Card, "a")).is_none());
        assert!(!b.is_card_playing("a"));
        assert_eq!(b.intentionally_playing().count(), 0);
    }
}
