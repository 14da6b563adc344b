//! Page view state.
//!
//! `ViewState` is driven by [`ViewEvent`]s and answers with [`Effect`]s for
//! the host to apply to the DOM. Time is milliseconds since page load and is
//! passed in by the host, so every timer (search debounce, single-click
//! detection, delayed player start, overlay teardown) is checked on each call.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Categories, Category, Navigation};
use crate::config::SkateConfig;
use crate::player::{PlayerBoard, PlayerCommand, PlayerKey, PlayerSlot};
use crate::render;
use crate::source::{LoadError, BANNER_MESSAGE};
use crate::types::Video;

pub const CAROUSEL_CONTENT: &str = "carousel-content";
pub const CAROUSEL_TITLE: &str = "carousel-title";
pub const DROPDOWN_DONE: &str = "dropdown-done";
pub const DROPDOWN_TODO: &str = "dropdown-todo";
pub const DONE_TITLE: &str = "trickDoneTitle";
pub const TODO_TITLE: &str = "trickTodoTitle";
pub const OVERLAY_BODY: &str = "video-overlay-video-container";
pub const HEAD: &str = "head";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropdownList {
    Done,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// A keystroke in the search bar; `value` is the whole input.
    SearchInput { value: String },
    /// No user input; lets due timers fire.
    Tick,
    CarouselSlide { to: usize },
    CarouselSlid,
    CardClick { video_id: String },
    CardDoubleClick { video_id: String },
    DropdownSelect { list: DropdownList, index: usize },
    OverlayBackdropClick,
    OverlayCloseButton,
    KeyDown { key: String },
    VisibilityChanged { hidden: bool },
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Effect {
    SetHtml { target: String, html: String },
    SetText { target: String, text: String },
    AppendHtml { target: String, html: String },
    FadeOut { target: String },
    FadeIn { target: String, text: String },
    Player(PlayerCommand),
    ShowOverlay { title: String, description: String },
    HideOverlay,
    CloseSidebar,
    ScrollToCard { video_id: String },
    Highlight { video_id: String, on: bool },
    ShowBanner { message: String },
    HideBanner,
    /// Apply `effect` after `after_ms`; purely cosmetic, never changes state.
    Delayed { after_ms: u64, effect: Box<Effect> },
}

impl Effect {
    fn html(target: &str, html: String) -> Self { Effect::SetHtml { target: target.to_string(), html } }
    fn text(target: &str, text: String) -> Self { Effect::SetText { target: target.to_string(), text } }
    fn later(after_ms: u64, effect: Effect) -> Self { Effect::Delayed { after_ms, effect: Box::new(effect) } }
}

/// Trailing-edge debounce: the last value wins once the input has been quiet for `wait_ms`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait_ms: u64,
    pending: Option<(String, u64)>,
}

impl Debouncer {
    pub fn new(wait_ms: u64) -> Self { Self { wait_ms, pending: None } }

    pub fn push(&mut self, value: String, now_ms: u64) { self.pending = Some((value, now_ms.saturating_add(self.wait_ms))); }

    pub fn poll(&mut self, now_ms: u64) -> Option<String> {
        match &self.pending {
            Some((_, due)) if *due <= now_ms => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

pub struct ViewState {
    cfg: SkateConfig,
    catalog: Catalog,
    players: PlayerBoard,
    featured: Vec<Video>,
    active_slide: usize,
    grids: Categories,
    navigation: Navigation,
    overlay: Option<Video>,
    search: Debouncer,
    query: String,
    pending_click: Option<(String, u64)>,
    pending_clear: Option<u64>,
}

impl ViewState {
    /// Build the page from a loaded catalog and return the initial render.
    pub fn new(cfg: SkateConfig, catalog: Catalog) -> (Self, Vec<Effect>) {
        let featured = catalog.featured(cfg.carousel_featured_count);
        let grids = catalog.categorize();
        let navigation = catalog.navigation();
        let mut state = Self {
            players: PlayerBoard::new(cfg.youtube_base_url.clone()),
            search: Debouncer::new(cfg.timings.search_debounce_ms),
            cfg,
            catalog,
            featured,
            active_slide: 0,
            grids,
            navigation,
            overlay: None,
            query: String::new(),
            pending_click: None,
            pending_clear: None,
        };
        let effects = state.render_all();
        (state, effects)
    }

    /// Effects for a page whose data could not be loaded.
    pub fn failed(cfg: &SkateConfig, err: &LoadError) -> Vec<Effect> {
        tracing::error!(error = %err, "failed to initialize application");
        vec![
            Effect::ShowBanner { message: BANNER_MESSAGE.to_string() },
            Effect::later(cfg.timings.banner_ms, Effect::HideBanner),
        ]
    }

    pub fn catalog(&self) -> &Catalog { &self.catalog }
    pub fn featured(&self) -> &[Video] { &self.featured }
    pub fn active_slide(&self) -> usize { self.active_slide }
    pub fn grids(&self) -> &Categories { &self.grids }
    pub fn navigation(&self) -> &Navigation { &self.navigation }
    pub fn overlay(&self) -> Option<&Video> { self.overlay.as_ref() }
    pub fn query(&self) -> &str { &self.query }
    pub fn players(&self) -> &PlayerBoard { &self.players }

    /// Fire due timers, then apply `event`.
    pub fn handle(&mut self, event: ViewEvent, now_ms: u64) -> Vec<Effect> {
        let mut out = self.tick(now_ms);
        match event {
            ViewEvent::SearchInput { value } => self.search.push(value, now_ms),
            ViewEvent::Tick => {}
            ViewEvent::CarouselSlide { to } => {
                out.extend(self.stop_all());
                if to < self.featured.len() {
                    self.active_slide = to;
                    out.extend(self.fade_title());
                }
            }
            ViewEvent::CarouselSlid => out.extend(self.stop_all()),
            ViewEvent::CardClick { video_id } => {
                if self.is_playable_card(&video_id) {
                    self.pending_click = Some((video_id, now_ms.saturating_add(self.cfg.timings.single_click_ms)));
                }
            }
            ViewEvent::CardDoubleClick { video_id } => {
                self.pending_click = None;
                if self.is_playable_card(&video_id) {
                    let cmds = self.players.toggle_card(&video_id, now_ms, self.cfg.timings.player_start_ms);
                    out.extend(self.player_effects(cmds));
                }
            }
            ViewEvent::DropdownSelect { list, index } => {
                let picked = match list {
                    DropdownList::Done => self.navigation.done.get(index),
                    DropdownList::Todo => self.navigation.todo.get(index),
                }
                .cloned();
                match picked {
                    Some(video) => out.extend(self.select_from_dropdown(video, now_ms)),
                    None => tracing::warn!(?list, index, "dropdown selection out of range"),
                }
            }
            ViewEvent::OverlayBackdropClick | ViewEvent::OverlayCloseButton => out.extend(self.close_overlay(now_ms)),
            ViewEvent::KeyDown { key } => {
                if key == "Escape" && self.overlay.is_some() {
                    out.extend(self.close_overlay(now_ms));
                }
            }
            ViewEvent::VisibilityChanged { hidden } => {
                if hidden { out.extend(self.stop_all()); }
            }
            ViewEvent::Unload => out.extend(self.stop_all()),
        }
        out
    }

    /// Fire every timer due at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Effect> {
        let mut out = Vec::new();
        if let Some(query) = self.search.poll(now_ms) {
            out.extend(self.apply_search(&query));
        }
        if let Some((video_id, due)) = self.pending_click.clone() {
            if due <= now_ms {
                self.pending_click = None;
                if let Some(video) = self.catalog.find_by_path(&video_id).cloned() {
                    out.extend(self.open_overlay(video, now_ms));
                }
            }
        }
        if self.pending_clear.is_some_and(|due| due <= now_ms) {
            self.pending_clear = None;
            out.push(Effect::html(OVERLAY_BODY, String::new()));
        }
        let cmds = self.players.poll(now_ms);
        out.extend(self.player_effects(cmds));
        out
    }

    fn render_all(&mut self) -> Vec<Effect> {
        let mut out = vec![Effect::html(CAROUSEL_CONTENT, render::carousel(&self.cfg, &self.featured))];
        for v in self.featured.iter().filter(|v| v.has_video()) {
            self.players.register(PlayerKey::new(PlayerSlot::Carousel, v.path.clone()));
        }
        out.extend(self.fade_title());
        out.extend(self.render_grids());
        out.push(Effect::html(DROPDOWN_DONE, render::dropdown(&self.navigation.done)));
        out.push(Effect::html(DROPDOWN_TODO, render::dropdown(&self.navigation.todo)));
        out.push(Effect::text(DONE_TITLE, self.navigation.done_title()));
        out.push(Effect::text(TODO_TITLE, self.navigation.todo_title()));
        out.push(Effect::AppendHtml { target: HEAD.to_string(), html: render::preload_links(&self.cfg) });
        out
    }

    fn render_grids(&mut self) -> Vec<Effect> {
        self.players.clear_slot(PlayerSlot::Card);
        let mut out = Vec::with_capacity(Category::ALL.len());
        for c in Category::ALL {
            let videos = self.grids.get(c);
            for v in videos.iter().filter(|v| v.has_video()) {
                self.players.register(PlayerKey::new(PlayerSlot::Card, v.path.clone()));
            }
            out.push(Effect::html(c.grid_id(), render::grid(&self.cfg, videos)));
        }
        out
    }

    fn apply_search(&mut self, raw: &str) -> Vec<Effect> {
        self.query = raw.trim().to_lowercase();
        self.grids = self.catalog.search(&self.query);
        tracing::debug!(query = %self.query, hits = self.grids.len(), "search applied");
        self.render_grids()
    }

    fn fade_title(&self) -> Vec<Effect> {
        let Some(video) = self.featured.get(self.active_slide) else { return Vec::new() };
        vec![
            Effect::FadeOut { target: CAROUSEL_TITLE.to_string() },
            Effect::later(self.cfg.timings.title_fade_ms, Effect::FadeIn { target: CAROUSEL_TITLE.to_string(), text: video.title.clone() }),
        ]
    }

    fn is_playable_card(&self, video_id: &str) -> bool {
        !video_id.trim().is_empty() && self.grids.iter().any(|v| v.path == video_id)
    }

    fn select_from_dropdown(&mut self, video: Video, now_ms: u64) -> Vec<Effect> {
        let mut out = self.open_overlay(video.clone(), now_ms);
        if video.has_video() && self.grids.iter().any(|v| v.path == video.path) {
            let t = &self.cfg.timings;
            out.push(Effect::later(t.scroll_delay_ms, Effect::ScrollToCard { video_id: video.path.clone() }));
            out.push(Effect::later(t.scroll_delay_ms, Effect::Highlight { video_id: video.path.clone(), on: true }));
            out.push(Effect::later(t.scroll_delay_ms.saturating_add(t.highlight_ms), Effect::Highlight { video_id: video.path, on: false }));
        }
        out
    }

    fn open_overlay(&mut self, video: Video, now_ms: u64) -> Vec<Effect> {
        tracing::debug!(title = %video.title, path = %video.path, "opening video overlay");
        self.pending_clear = None;
        let mut out = vec![
            Effect::ShowOverlay { title: video.title.clone(), description: video.description() },
            Effect::html(OVERLAY_BODY, String::new()),
        ];
        let cmds = if video.has_video() {
            self.players.open_overlay(&video.path, now_ms, self.cfg.timings.player_start_ms)
        } else {
            let mut cmds = self.players.close_overlay();
            cmds.extend(self.players.stop_all_except(None));
            out.push(Effect::html(OVERLAY_BODY, render::placeholder(&self.cfg, &video)));
            cmds
        };
        self.overlay = Some(video);
        out.extend(self.player_effects(cmds));
        out.push(Effect::CloseSidebar);
        out
    }

    fn close_overlay(&mut self, now_ms: u64) -> Vec<Effect> {
        let cmds = self.players.close_overlay();
        let mut out = self.player_effects(cmds);
        out.push(Effect::HideOverlay);
        self.overlay = None;
        self.pending_clear = Some(now_ms.saturating_add(self.cfg.timings.overlay_animation_ms));
        out
    }

    fn stop_all(&mut self) -> Vec<Effect> {
        let cmds = self.players.stop_all_except(None);
        self.player_effects(cmds)
    }

    fn player_effects(&self, cmds: Vec<PlayerCommand>) -> Vec<Effect> {
        cmds.into_iter()
            .filter_map(|cmd| match cmd {
                PlayerCommand::MountOverlay { video_id } => {
                    let video = self.overlay.as_ref().filter(|v| v.path == video_id)?;
                    Some(Effect::html(OVERLAY_BODY, render::overlay_player(&self.cfg, video)))
                }
                other => Some(Effect::Player(other)),
            })
            .collect()
    }
}
