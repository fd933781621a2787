use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::layout::LayoutDataset;

/// Region → word → TF-IDF score. Also the shape of the `word_lists/*.json` files.
pub type ScoreTable = BTreeMap<String, BTreeMap<String, f64>>;

pub fn score_table(dataset: &LayoutDataset) -> ScoreTable {
    dataset
        .groups
        .iter()
        .map(|g| {
            let words = g
                .words
                .iter()
                .map(|w| (w.word.clone(), w.tfidf_score))
                .collect();
            (g.name.trim().to_string(), words)
        })
        .collect()
}

pub fn word_list_from_json(json: &str) -> Result<ScoreTable, LoadError> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub label: String,
    pub value: f64,
}

fn by_value_desc(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.value
        .partial_cmp(&a.value)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.label.cmp(&b.label))
}

/// Every region's score for `word`, ×100, highest first. Regions without the word score 0.
pub fn word_ranking(table: &ScoreTable, word: &str) -> Vec<RankedEntry> {
    let mut rows: Vec<RankedEntry> = table
        .iter()
        .map(|(region, words)| RankedEntry {
            label: region.clone(),
            value: words.get(word).copied().unwrap_or(0.0) * 100.0,
        })
        .collect();
    rows.sort_by(by_value_desc);
    rows
}

/// Words of one region, ×100, highest first.
pub fn region_ranking(table: &ScoreTable, region: &str) -> Vec<RankedEntry> {
    let Some(words) = table.get(region) else {
        return Vec::new();
    };
    let mut rows: Vec<RankedEntry> = words
        .iter()
        .map(|(word, score)| RankedEntry {
            label: word.clone(),
            value: score * 100.0,
        })
        .collect();
    rows.sort_by(by_value_desc);
    rows
}

/// Number of regions where `word` has a positive score.
pub fn region_count(table: &ScoreTable, word: &str) -> usize {
    table
        .values()
        .filter(|words| words.get(word).is_some_and(|s| *s > 0.0))
        .count()
}

/// Regions where both words have a positive score.
pub fn regions_with_both(table: &ScoreTable, a: &str, b: &str) -> BTreeSet<String> {
    table
        .iter()
        .filter(|(_, words)| {
            words.get(a).is_some_and(|s| *s > 0.0) && words.get(b).is_some_and(|s| *s > 0.0)
        })
        .map(|(region, _)| region.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CooccurrenceError {
    UnknownWord(String),
}

impl std::fmt::Display for CooccurrenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CooccurrenceError::UnknownWord(w) => {
                write!(f, "word {w:?} is not in the co-occurrence vocabulary")
            }
        }
    }
}

impl std::error::Error for CooccurrenceError {}

/// Square word × word co-occurrence counts over `vocab`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceMatrix {
    pub vocab: Vec<String>,
    pub cooccurrence_matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cooccurrence {
    pub word: String,
    pub count: f64,
}

impl CooccurrenceMatrix {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Words co-occurring with `word`, most frequent first. Missing cells of a
    /// short row count as zero.
    pub fn ranked(&self, word: &str) -> Result<Vec<Cooccurrence>, CooccurrenceError> {
        let index = self
            .vocab
            .iter()
            .position(|w| w == word)
            .ok_or_else(|| CooccurrenceError::UnknownWord(word.to_string()))?;
        let row = self
            .cooccurrence_matrix
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut out: Vec<Cooccurrence> = self
            .vocab
            .iter()
            .enumerate()
            .filter(|(i, w)| *i != index && w.as_str() != word)
            .filter_map(|(i, w)| {
                let count = row.get(i).copied().unwrap_or(0.0);
                (count > 0.0).then(|| Cooccurrence {
                    word: w.clone(),
                    count,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.count
                .partial_cmp(&a.count)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        Ok(out)
    }
}

pub const BAR_HEIGHT: f64 = 20.0;
pub const BAR_GAP: f64 = 8.0;
pub const BAR_HEADER: f64 = 30.0;
pub const BAR_LABEL_WIDTH: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub label: String,
    pub value: f64,
    pub y: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartLayout {
    pub rows: Vec<BarRow>,
    pub height: f64,
    pub max_value: f64,
}

/// Horizontal bar geometry: bars start after the label column and scale linearly
/// from 0 to the largest value. Non-positive rows are left out.
pub fn bar_chart(entries: &[RankedEntry], width: f64) -> BarChartLayout {
    let max_value = entries.iter().map(|e| e.value).fold(0.0, f64::max);
    let span = (width - BAR_LABEL_WIDTH).max(0.0);
    let rows: Vec<BarRow> = entries
        .iter()
        .filter(|e| e.value > 0.0)
        .enumerate()
        .map(|(i, e)| BarRow {
            label: e.label.clone(),
            value: e.value,
            y: BAR_HEADER + i as f64 * (BAR_HEIGHT + BAR_GAP),
            width: if max_value > 0.0 {
                e.value / max_value * span
            } else {
                0.0
            },
        })
        .collect();
    let n = rows.len() as f64;
    let height = if rows.is_empty() {
        BAR_HEADER
    } else {
        n * BAR_HEIGHT + (n - 1.0) * BAR_GAP + BAR_HEADER
    };
    BarChartLayout {
        rows,
        height,
        max_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn table() -> ScoreTable {
        word_list_from_json(
            &json!({
                "北海道": { "雪": 0.5, "海": 0.2 },
                "新潟県": { "雪": 0.3, "米": 0.6 },
                "沖縄県": { "海": 0.7, "雪": 0.0 }
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn word_ranking_scales_and_sorts() {
        let ranking = word_ranking(&table(), "雪");
        let labels: Vec<_> = ranking.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["北海道", "新潟県", "沖縄県"]);
        assert_close(ranking[0].value, 50.0);
        assert_eq!(ranking[2].value, 0.0);
    }

    #[test]
    fn region_ranking_of_unknown_region_is_empty() {
        assert!(region_ranking(&table(), "大阪府").is_empty());
        let r = region_ranking(&table(), "新潟県");
        assert_eq!(r[0].label, "米");
    }

    #[test]
    fn counts_and_cross_regions_ignore_zero_scores() {
        let t = table();
        assert_eq!(region_count(&t, "雪"), 2);
        let both = regions_with_both(&t, "雪", "海");
        assert_eq!(both.into_iter().collect::<Vec<_>>(), vec!["北海道".to_string()]);
    }

    #[test]
    fn score_table_from_layout() {
        let ds = LayoutDataset::from_json(
            &json!([{ "name": " 京都府", "data": [
                { "word": "抹茶", "tfidf_score": 0.4, "font_size": 2, "norm_x": 0, "norm_y": 0 }
            ]}])
            .to_string(),
            None,
        )
        .unwrap();
        let t = score_table(&ds);
        assert_eq!(t["京都府"]["抹茶"], 0.4);
    }

    #[test]
    fn cooccurrence_ranks_positive_others_and_tolerates_ragged_rows() {
        let m = CooccurrenceMatrix::from_json(
            &json!({
                "vocab": ["雪", "スキー", "温泉", "海"],
                "cooccurrence_matrix": [[9, 4, 6], [4, 5, 1, 0]]
            })
            .to_string(),
        )
        .unwrap();
        let ranked = m.ranked("雪").unwrap();
        let words: Vec<_> = ranked.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, vec!["温泉", "スキー"]);

        assert!(m.ranked("温泉").unwrap().is_empty());
        assert_eq!(
            m.ranked("砂漠"),
            Err(CooccurrenceError::UnknownWord("砂漠".into()))
        );
    }

    #[test]
    fn bar_chart_skips_zero_rows() {
        let entries = vec![
            RankedEntry { label: "a".into(), value: 40.0 },
            RankedEntry { label: "b".into(), value: 10.0 },
            RankedEntry { label: "c".into(), value: 0.0 },
        ];
        let layout = bar_chart(&entries, 320.0);
        assert_eq!(layout.rows.len(), 2);
        assert_eq!(layout.rows[0].width, 200.0);
        assert_eq!(layout.rows[1].width, 50.0);
        assert_eq!(layout.rows[1].y, 58.0);
        assert_eq!(layout.height, 2.0 * 20.0 + 8.0 + 30.0);

        assert_eq!(bar_chart(&[], 320.0).height, BAR_HEADER);
    }
}
