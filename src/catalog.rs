use serde::Serialize;

use crate::types::{TodoTrick, Video};

/// The three grids on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    FlatTricks,
    Grinds,
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::FlatTricks, Category::Grinds, Category::Other];

    /// DOM id of the grid container this category renders into.
    pub fn grid_id(self) -> &'static str {
        match self {
            Category::FlatTricks => "flatTricksGrid",
            Category::Grinds => "grindsGrid",
            Category::Other => "otherGrid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::FlatTricks => "Flat tricks",
            Category::Grinds => "Grinds",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Categories {
    pub flat_tricks: Vec<Video>,
    pub grinds: Vec<Video>,
    pub other: Vec<Video>,
}

impl Categories {
    pub fn get(&self, c: Category) -> &[Video] {
        match c {
            Category::FlatTricks => &self.flat_tricks,
            Category::Grinds => &self.grinds,
            Category::Other => &self.other,
        }
    }

    pub fn len(&self) -> usize { self.flat_tricks.len() + self.grinds.len() + self.other.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn iter(&self) -> impl Iterator<Item = &Video> {
        self.flat_tricks.iter().chain(self.grinds.iter()).chain(self.other.iter())
    }

    fn sorted(mut self) -> Self {
        sort_playable_first(&mut self.flat_tricks);
        sort_playable_first(&mut self.grinds);
        sort_playable_first(&mut self.other);
        self
    }
}

/// Navigation dropdown contents: filmed tricks and tricks still to film.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub done: Vec<Video>,
    pub todo: Vec<Video>,
}

impl Navigation {
    pub fn done_title(&self) -> String { format!("Tricks Done ({})", self.done.len()) }
    pub fn todo_title(&self) -> String { format!("Tricks Todo ({})", self.todo.len()) }
}

/// In-memory video catalog. Loaded once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    videos: Vec<Video>,
    todo: Vec<TodoTrick>,
    grinds: Option<Vec<Video>>,
    other: Option<Vec<Video>>,
}

impl Catalog {
    pub fn new(videos: Vec<Video>, todo: Vec<TodoTrick>, grinds: Option<Vec<Video>>, other: Option<Vec<Video>>) -> Self {
        Self { videos, todo, grinds, other }
    }

    pub fn videos(&self) -> &[Video] { &self.videos }
    pub fn todo_tricks(&self) -> &[TodoTrick] { &self.todo }

    /// Whether grinds and other tricks come from their own files.
    pub fn has_dedicated_lists(&self) -> bool { self.grinds.is_some() || self.other.is_some() }

    /// Every video on the page: main list, then grinds, then other.
    pub fn combined(&self) -> impl Iterator<Item = &Video> {
        self.videos
            .iter()
            .chain(self.grinds.iter().flatten())
            .chain(self.other.iter().flatten())
    }

    /// Grids for the unfiltered page.
    pub fn categorize(&self) -> Categories {
        if !self.has_dedicated_lists() {
            return categorize_videos(&self.videos);
        }
        Categories {
            flat_tricks: self.videos.iter().filter(|v| v.is_flat_trick()).cloned().collect(),
            grinds: self.grinds.clone().unwrap_or_default(),
            other: self.other.clone().unwrap_or_default(),
        }
        .sorted()
    }

    /// Substring search over titles and trick types. A blank query yields the unfiltered grids.
    pub fn search(&self, query: &str) -> Categories {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.categorize();
        }
        let hits: Vec<Video> = self.combined().filter(|v| v.matches(&needle)).cloned().collect();
        categorize_videos(&hits)
    }

    /// The first `count` playable videos of the main list, in file order.
    pub fn featured(&self, count: usize) -> Vec<Video> {
        self.videos.iter().filter(|v| v.has_video()).take(count).cloned().collect()
    }

    pub fn navigation(&self) -> Navigation {
        let (done, todo) = self.combined().cloned().partition(Video::has_video);
        Navigation { done, todo }
    }

    pub fn find_by_path(&self, path: &str) -> Option<&Video> {
        self.combined().find(|v| v.path == path)
    }
}

/// Put each video in exactly one bucket: flat trick, else grind, else other.
pub fn categorize_videos(videos: &[Video]) -> Categories {
    let mut out = Categories::default();
    for v in videos {
        if v.is_flat_trick() {
            out.flat_tricks.push(v.clone());
        } else if v.is_grind() {
            out.grinds.push(v.clone());
        } else {
            out.other.push(v.clone());
        }
    }
    out.sorted()
}

/// Stable: playable videos first, file order kept within each group.
pub fn sort_playable_first(videos: &mut [Video]) {
    videos.sort_by_key(|v| !v.has_video());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(title: &str, path: &str, types: &[&str]) -> Video { Video::new(title, path, types) }

    fn sample() -> Catalog {
        Catalog::new(
            vec![
                v("Ollie", "", &["NORMAL"]),
                v("Kickflip", "kf", &["NORMAL", "FLIPTRICK"]),
                v("Boardslide", "bs", &["NORMAL", "GRIND"]),
                v("Shuvit", "", &["NOLLIE", "PIVOT"]),
                v("Heelflip", "hf", &["FAKIE", "FLIPTRICK"]),
                v("Manual", "mn", &["MANUAL"]),
            ],
            vec![TodoTrick { name: "Hardflip".into() }],
            Some(vec![v("50-50", "", &["GRIND"]), v("5-0", "fo", &["GRIND"])]),
            Some(vec![v("Boneless", "bl", &["OTHER"])]),
        )
    }

    fn titles(vs: &[Video]) -> Vec<&str> { vs.iter().map(|v| v.title.as_str()).collect() }

    #[test]
    fn initial_grids_use_dedicated_lists() {
        let cats = sample().categorize();
        assert_eq!(titles(&cats.flat_tricks), ["Kickflip", "Heelflip", "Ollie", "Shuvit"]);
        assert_eq!(titles(&cats.grinds), ["5-0", "50-50"]);
        assert_eq!(titles(&cats.other), ["Boneless"]);
    }

    #[test]
    fn grid_card_count_matches_with_and_without_paths() {
        let vids = vec![v("a", "", &["NORMAL"]), v("b", "x", &["NORMAL"]), v("c", "", &["NORMAL"]), v("d", "y", &["NORMAL"])];
        let cats = categorize_videos(&vids);
        assert_eq!(cats.flat_tricks.len(), 4);
        assert_eq!(titles(&cats.flat_tricks), ["b", "d", "a", "c"]);
    }

    #[test]
    fn single_file_mode_buckets_main_list() {
        let cat = Catalog::new(vec![v("Boardslide", "bs", &["NORMAL", "GRIND"]), v("Manual", "", &["MANUAL"])], vec![], None, None);
        let cats = cat.categorize();
        assert_eq!(titles(&cats.grinds), ["Boardslide"]);
        assert_eq!(titles(&cats.other), ["Manual"]);
    }

    #[test]
    fn search_covers_all_lists_and_rebuckets() {
        let cat = sample();
        let cats = cat.search("  GRIND ");
        assert_eq!(titles(&cats.grinds), ["Boardslide", "5-0", "50-50"]);
        assert!(cats.flat_tricks.is_empty());

        let cats = cat.search("flip");
        assert_eq!(titles(&cats.flat_tricks), ["Kickflip", "Heelflip"]);
        assert_eq!(cat.search("zzz").len(), 0);
    }

    #[test]
    fn blank_search_restores_initial_grids() {
        let cat = sample();
        assert_eq!(cat.search("   "), cat.categorize());
    }

    #[test]
    fn featured_takes_playable_in_order() {
        let cat = sample();
        assert_eq!(titles(&cat.featured(5)), ["Kickflip", "Boardslide", "Heelflip", "Manual"]);
        assert_eq!(titles(&cat.featured(2)), ["Kickflip", "Boardslide"]);
        assert!(Catalog::default().featured(5).is_empty());
    }

    #[test]
    fn navigation_splits_done_and_todo() {
        let nav = sample().navigation();
        assert_eq!(nav.done.len(), 6);
        assert_eq!(nav.todo.len(), 3);
        assert_eq!(nav.done_title(), "Tricks Done (6)");
        assert_eq!(nav.todo_title(), "Tricks Todo (3)");
    }

    #[test]
    fn find_by_path_searches_every_list() {
        let cat = sample();
        assert_eq!(cat.find_by_path("fo").map(|v| v.title.as_str()), Some("5-0"));
        assert!(cat.find_by_path("nope").is_none());
    }
}
