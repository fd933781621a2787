use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Clicking a word glyph toggles it as the selected word.
    #[default]
    WordSearch,
    /// Clicking a region drills into it.
    RegionSelect,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::WordSearch => Mode::RegionSelect,
            Mode::RegionSelect => Mode::WordSearch,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::WordSearch => "word search",
            Mode::RegionSelect => "region select",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoomRequest {
    Region(String),
    Overview,
}

/// Notifications for collaborators, in the order the changes were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    WordSelected(Option<String>),
    RegionHovered(Option<String>),
    RegionActivated(Option<String>),
    ModeToggled(Mode),
    CrossHighlightChanged,
}

/// What an action changed, and the zoom it asks the navigation controller for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub events: Vec<SelectionEvent>,
    pub zoom: Option<ZoomRequest>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.zoom.is_none()
    }

    fn merge(&mut self, other: Outcome) {
        self.events.extend(other.events);
        if other.zoom.is_some() {
            self.zoom = other.zoom;
        }
    }
}

/// The single interaction state shared by every layer and panel.
///
/// `region` is `None` in the overview and names the drilled-into prefecture
/// otherwise. Word and region selection are independent of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub word: Option<String>,
    pub hovered: Option<String>,
    pub region: Option<String>,
    pub mode: Mode,
    /// Regions sharing the selected word and `cross_word`.
    pub cross_highlight: BTreeSet<String>,
    pub cross_word: Option<String>,
}

impl SelectionState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_drilled_in(&self) -> bool {
        self.region.is_some()
    }

    /// Select `word`, or clear the selection when it is already selected.
    pub fn toggle_word(&mut self, word: &str) -> Outcome {
        if self.word.as_deref() == Some(word) {
            self.set_word(None)
        } else {
            self.set_word(Some(word.to_string()))
        }
    }

    pub fn set_word(&mut self, word: Option<String>) -> Outcome {
        if self.word == word {
            return Outcome::default();
        }
        let mut out = Outcome::default();
        if !self.cross_highlight.is_empty() || self.cross_word.is_some() {
            self.cross_highlight.clear();
            self.cross_word = None;
            out.events.push(SelectionEvent::CrossHighlightChanged);
        }
        self.word = word.clone();
        out.events.push(SelectionEvent::WordSelected(word));
        out
    }

    pub fn hover_region(&mut self, name: Option<&str>) -> Outcome {
        if self.hovered.as_deref() == name {
            return Outcome::default();
        }
        self.hovered = name.map(str::to_string);
        Outcome {
            events: vec![SelectionEvent::RegionHovered(self.hovered.clone())],
            zoom: None,
        }
    }

    /// Pointer left `name`. A no-op when another region has already taken the hover.
    pub fn leave_region(&mut self, name: &str) -> Outcome {
        if self.hovered.as_deref() != Some(name) {
            return Outcome::default();
        }
        self.hover_region(None)
    }

    /// Click on a region's background. Uses the clicked region, never the hovered one.
    pub fn click_region(&mut self, name: &str) -> Outcome {
        match self.mode {
            Mode::RegionSelect => self.activate(name),
            Mode::WordSearch => Outcome::default(),
        }
    }

    /// Click on a word glyph drawn inside `region`.
    pub fn click_word(&mut self, word: &str, region: &str) -> Outcome {
        match self.mode {
            Mode::WordSearch => self.toggle_word(word),
            Mode::RegionSelect => self.activate(region),
        }
    }

    /// Click inside the detail layer, on a municipality outline (`word` is `None`)
    /// or one of its glyphs. Municipalities are never activated.
    pub fn click_detail(&mut self, word: Option<&str>) -> Outcome {
        match (self.mode, word) {
            (Mode::WordSearch, Some(word)) => self.toggle_word(word),
            _ => Outcome::default(),
        }
    }

    /// Drill into `name`. Hover is cleared first so no stale highlight survives the zoom.
    pub fn activate(&mut self, name: &str) -> Outcome {
        if self.region.as_deref() == Some(name) {
            return Outcome::default();
        }
        let mut out = self.hover_region(None);
        self.region = Some(name.to_string());
        out.events
            .push(SelectionEvent::RegionActivated(self.region.clone()));
        out.zoom = Some(ZoomRequest::Region(name.to_string()));
        out
    }

    /// Return to the overview.
    pub fn deactivate(&mut self) -> Outcome {
        if self.region.is_none() {
            return Outcome::default();
        }
        let mut out = self.hover_region(None);
        self.region = None;
        out.events.push(SelectionEvent::RegionActivated(None));
        out.zoom = Some(ZoomRequest::Overview);
        out
    }

    /// Region picker control. Picking a region also enters region-select mode;
    /// clearing the picker returns to the overview.
    pub fn pick_region(&mut self, name: Option<&str>) -> Outcome {
        match name {
            Some(name) => {
                let mut out = Outcome::default();
                if self.mode != Mode::RegionSelect {
                    self.mode = Mode::RegionSelect;
                    out.events.push(SelectionEvent::ModeToggled(self.mode));
                }
                out.merge(self.activate(name));
                out
            }
            None => self.deactivate(),
        }
    }

    /// Leaving region-select while drilled in also returns to the overview.
    pub fn toggle_mode(&mut self) -> Outcome {
        let mut out = Outcome::default();
        if self.mode == Mode::RegionSelect {
            out.merge(self.deactivate());
        }
        self.mode = self.mode.toggled();
        out.events.push(SelectionEvent::ModeToggled(self.mode));
        out
    }

    /// Highlight `regions` as the places `word` co-occurs with the selected word.
    /// Toggling the same word again clears the highlight.
    pub fn toggle_cross_highlight(&mut self, word: &str, regions: BTreeSet<String>) -> Outcome {
        if self.cross_word.as_deref() == Some(word) {
            self.cross_word = None;
            self.cross_highlight.clear();
        } else {
            self.cross_word = Some(word.to_string());
            self.cross_highlight = regions;
        }
        Outcome {
            events: vec![SelectionEvent::CrossHighlightChanged],
            zoom: None,
        }
    }

    /// Back action: clear hover, then leave the drilled-in view.
    pub fn back(&mut self) -> Outcome {
        let mut out = self.hover_region(None);
        out.merge(self.deactivate());
        out
    }

    pub fn is_cross_highlighted(&self, region: &str) -> bool {
        self.cross_highlight.contains(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_overview_with_nothing_selected() {
        let s = SelectionState::default();
        assert_eq!(s.word, None);
        assert_eq!(s.hovered, None);
        assert_eq!(s.region, None);
        assert_eq!(s.mode, Mode::WordSearch);
    }

    #[test]
    fn clicking_the_same_word_twice_clears_it() {
        let mut s = SelectionState::default();
        s.toggle_word("温泉");
        assert_eq!(s.word.as_deref(), Some("温泉"));
        s.toggle_word("ラーメン");
        assert_eq!(s.word.as_deref(), Some("ラーメン"));
        let out = s.toggle_word("ラーメン");
        assert_eq!(s.word, None);
        assert_eq!(out.events, vec![SelectionEvent::WordSelected(None)]);
    }

    #[test]
    fn activate_then_deactivate_zooms_back_to_overview() {
        let mut s = SelectionState::new(Mode::RegionSelect);
        let out = s.click_region("京都府");
        assert_eq!(s.region.as_deref(), Some("京都府"));
        assert_eq!(out.zoom, Some(ZoomRequest::Region("京都府".into())));

        let out = s.deactivate();
        assert_eq!(s.region, None);
        assert_eq!(out.zoom, Some(ZoomRequest::Overview));
        assert!(s.deactivate().is_empty());
    }

    #[test]
    fn region_click_uses_the_clicked_region_and_clears_hover_first() {
        let mut s = SelectionState::new(Mode::RegionSelect);
        s.hover_region(Some("滋賀県"));
        let out = s.click_region("京都府");
        assert_eq!(s.region.as_deref(), Some("京都府"));
        assert_eq!(s.hovered, None);
        assert_eq!(
            out.events,
            vec![
                SelectionEvent::RegionHovered(None),
                SelectionEvent::RegionActivated(Some("京都府".into())),
            ]
        );
    }

    #[test]
    fn clicks_are_mode_gated() {
        let mut s = SelectionState::default();
        assert!(s.click_region("京都府").is_empty());
        s.click_word("抹茶", "京都府");
        assert_eq!(s.word.as_deref(), Some("抹茶"));
        assert_eq!(s.region, None);

        s.toggle_mode();
        s.click_word("抹茶", "京都府");
        assert_eq!(s.word.as_deref(), Some("抹茶"));
        assert_eq!(s.region.as_deref(), Some("京都府"));
    }

    #[test]
    fn clicks_inside_the_detail_layer_keep_the_prefecture() {
        let mut s = SelectionState::new(Mode::RegionSelect);
        s.activate("京都府");
        s.hover_region(Some("京都市"));

        let out = s.click_detail(None);
        assert!(out.is_empty());
        let out = s.click_detail(Some("抹茶"));
        assert!(out.is_empty());
        assert_eq!(s.region.as_deref(), Some("京都府"));
        assert_eq!(s.word, None);

        let mut s = SelectionState::default();
        let out = s.click_detail(Some("抹茶"));
        assert_eq!(out.zoom, None);
        assert_eq!(s.word.as_deref(), Some("抹茶"));
        assert_eq!(s.region, None);
    }

    #[test]
    fn leaving_a_region_only_clears_its_own_hover() {
        let mut s = SelectionState::default();
        s.hover_region(Some("滋賀県"));
        s.hover_region(Some("京都府"));
        assert!(s.leave_region("滋賀県").is_empty());
        assert_eq!(s.hovered.as_deref(), Some("京都府"));

        let out = s.leave_region("京都府");
        assert_eq!(s.hovered, None);
        assert_eq!(out.events, vec![SelectionEvent::RegionHovered(None)]);
    }

    #[test]
    fn leaving_region_select_while_drilled_in_returns_to_overview() {
        let mut s = SelectionState::new(Mode::RegionSelect);
        s.toggle_word("牛タン");
        s.click_region("宮城県");
        let out = s.toggle_mode();
        assert_eq!(s.mode, Mode::WordSearch);
        assert_eq!(s.region, None);
        assert_eq!(s.word.as_deref(), Some("牛タン"));
        assert_eq!(out.zoom, Some(ZoomRequest::Overview));
        assert_eq!(
            out.events.last(),
            Some(&SelectionEvent::ModeToggled(Mode::WordSearch))
        );
    }

    #[test]
    fn word_and_region_are_independent() {
        let mut s = SelectionState::new(Mode::RegionSelect);
        s.activate("沖縄県");
        s.toggle_word("海");
        assert_eq!(s.region.as_deref(), Some("沖縄県"));
        s.deactivate();
        assert_eq!(s.word.as_deref(), Some("海"));
    }

    #[test]
    fn picking_a_region_enters_region_select() {
        let mut s = SelectionState::default();
        let out = s.pick_region(Some("北海道"));
        assert_eq!(s.mode, Mode::RegionSelect);
        assert_eq!(s.region.as_deref(), Some("北海道"));
        assert_eq!(out.events[0], SelectionEvent::ModeToggled(Mode::RegionSelect));
        assert_eq!(out.zoom, Some(ZoomRequest::Region("北海道".into())));

        let out = s.pick_region(None);
        assert_eq!(s.region, None);
        assert_eq!(out.zoom, Some(ZoomRequest::Overview));
    }

    #[test]
    fn cross_highlight_toggles_and_clears_on_word_change() {
        let mut s = SelectionState::default();
        s.toggle_word("雪");
        let both: BTreeSet<String> = ["北海道", "新潟県"].iter().map(|s| s.to_string()).collect();
        s.toggle_cross_highlight("スキー", both.clone());
        assert!(s.is_cross_highlighted("新潟県"));

        s.toggle_cross_highlight("スキー", both.clone());
        assert!(s.cross_highlight.is_empty());

        s.toggle_cross_highlight("スキー", both);
        let out = s.toggle_word("海");
        assert!(s.cross_highlight.is_empty());
        assert_eq!(s.cross_word, None);
        assert_eq!(out.events[0], SelectionEvent::CrossHighlightChanged);
    }

    #[test]
    fn back_clears_hover_even_in_overview() {
        let mut s = SelectionState::default();
        s.hover_region(Some("奈良県"));
        let out = s.back();
        assert_eq!(s.hovered, None);
        assert_eq!(out.zoom, None);
    }
}
