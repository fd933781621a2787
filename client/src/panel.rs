use std::sync::Arc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wordmap_shared::SelectionState;
use wordmap_shared::stats::{
    BAR_HEIGHT, BAR_LABEL_WIDTH, BarChartLayout, ScoreTable, bar_chart, region_count,
    region_ranking, regions_with_both, score_table, word_ranking,
};

use crate::app::{ColorByTemperature, PANEL_WIDTH, Selection, dispatch};
use crate::loader::{AssetState, MapData};

const CHART_WIDTH: f64 = PANEL_WIDTH - 48.0;
const TOP_COOCCURRENCES: usize = 10;

/// Scores behind the panel. The precomputed word list wins; the layout's own
/// scores stand in while it loads or when it is missing.
fn score_state(data: MapData, drilled_in: bool) -> AssetState<ScoreTable> {
    let listed = data
        .word_list
        .with(|slot| slot.as_ref().map(|(_, state)| state.clone()));
    if let Some(AssetState::Ready(table)) = listed {
        return AssetState::Ready(table);
    }
    let layout = if drilled_in {
        data.detail_layout
            .with(|slot| slot.as_ref().map(|(_, state)| state.clone()))
            .unwrap_or(AssetState::Loading)
    } else {
        data.national_layout.get()
    };
    match (listed, layout) {
        (_, AssetState::Ready(layout)) => AssetState::Ready(Arc::new(score_table(&layout))),
        (Some(AssetState::Failed(e)), _) | (None, AssetState::Failed(e)) => AssetState::Failed(e),
        _ => AssetState::Loading,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum BarTarget {
    /// Bars are regions; hovering one hovers it on the map.
    Region,
    /// Bars are words; clicking one selects it.
    Word,
}

#[component]
pub fn Panel() -> impl IntoView {
    let Selection(selection) = expect_context();
    let ColorByTemperature(color_by_temperature) = expect_context();
    let data: MapData = expect_context();

    let drilled_in = Memo::new(move |_| selection.with(SelectionState::is_drilled_in));
    let table = Memo::new(move |_| score_state(data, drilled_in.get()));

    view! {
        <aside
            class="scrollbar-thin"
            style={format!(
                "width: {PANEL_WIDTH}px; height: 100%; flex-shrink: 0; overflow-y: auto; background: #ffffff; border-left: 1px solid #c9ced6; font-family: 'Inter', system-ui, sans-serif; color: #1f2430;"
            )}
        >
            <PanelHeader />
            <Ranking table=table />
            <Cooccurrences table=table />
            <SectionHeader title="Settings" />
            <ToggleRow label="Colour by temperature" active=color_by_temperature />
        </aside>
    }
}

#[component]
fn PanelHeader() -> impl IntoView {
    let Selection(selection) = expect_context();
    let data: MapData = expect_context();

    let title = move || {
        selection
            .with(|s| s.region.clone())
            .unwrap_or_else(|| "全国".to_string())
    };
    let mode = move || selection.with(|s| s.mode.label());

    view! {
        <div style="padding: 20px 24px 14px; border-bottom: 1px solid #e3e6eb;">
            <div style="display: flex; align-items: center; gap: 10px;">
                {move || selection.with(SelectionState::is_drilled_in).then(|| view! {
                    <button
                        title="Back to the overview (Esc)"
                        style="background: none; border: 1px solid #c9ced6; border-radius: 4px; cursor: pointer; padding: 2px 8px; color: #3c4350;"
                        on:click=move |_| dispatch(selection, data, SelectionState::back)
                    >
                        "\u{2190}"
                    </button>
                })}
                <div style="font-size: 1.2rem; font-weight: 700;">{title}</div>
            </div>
            <div style="font-size: 0.72rem; color: #5a6270; margin-top: 4px;">
                "Mode: " {mode} " (m)"
            </div>
        </div>
    }
}

#[component]
fn SectionHeader(title: &'static str) -> impl IntoView {
    view! {
        <div style="padding: 14px 24px 4px; font-family: 'JetBrains Mono', monospace; font-size: 0.62rem; text-transform: uppercase; letter-spacing: 0.12em; color: #5a6270;">
            {title}
        </div>
    }
}

#[component]
fn SectionNote(text: String) -> impl IntoView {
    view! {
        <div style="padding: 4px 24px 8px; font-size: 0.8rem; color: #5a6270;">{text}</div>
    }
}

fn state_note<T>(state: &AssetState<T>) -> String {
    match state.error() {
        Some(e) => format!("Unavailable: {e}"),
        None if matches!(state, AssetState::Loading) => "Loading\u{2026}".to_string(),
        None => String::new(),
    }
}

/// Per-region scores of the selected word, or the words of the hovered or
/// drilled-into region when no word is selected.
#[component]
fn Ranking(table: Memo<AssetState<ScoreTable>>) -> impl IntoView {
    let Selection(selection) = expect_context();

    let chart = Memo::new(move |_| {
        let (word, focus) = selection.with(|s| {
            (
                s.word.clone(),
                s.hovered.clone().or_else(|| s.region.clone()),
            )
        });
        table.with(|state| {
            let table = state.ready()?;
            match (word, focus) {
                (Some(word), _) => {
                    let title = format!("「{word}」 by region");
                    let layout = bar_chart(&word_ranking(&table, &word), CHART_WIDTH);
                    Some((title, layout, BarTarget::Region))
                }
                (None, Some(region)) => {
                    let title = format!("Top words in {region}");
                    let layout = bar_chart(&region_ranking(&table, &region), CHART_WIDTH);
                    Some((title, layout, BarTarget::Word))
                }
                (None, None) => None,
            }
        })
    });

    view! {
        <SectionHeader title="Ranking" />
        {move || {
            if let Some(note) = table.with(|state| state.ready().is_none().then(|| state_note(state))) {
                return view! { <SectionNote text=note /> }.into_any();
            }
            match chart.get() {
                Some((title, layout, target)) => view! {
                    <div style="padding: 0 24px 8px;">
                        <BarChart title=title layout=layout target=target />
                    </div>
                }
                .into_any(),
                None => view! {
                    <SectionNote text="Select a word or hover a region.".to_string() />
                }
                .into_any(),
            }
        }}
    }
}

#[component]
fn BarChart(title: String, layout: BarChartLayout, target: BarTarget) -> impl IntoView {
    let Selection(selection) = expect_context();
    let data: MapData = expect_context();

    let rows = layout
        .rows
        .into_iter()
        .map(|row| {
            let label_y = row.y + BAR_HEIGHT / 2.0;
            let hover_label = row.label.clone();
            let click_label = row.label.clone();
            let on_enter = move |_| {
                if target == BarTarget::Region {
                    dispatch(selection, data, |s| s.hover_region(Some(&hover_label)));
                }
            };
            let on_leave = move |_| {
                if target == BarTarget::Region {
                    dispatch(selection, data, |s| s.hover_region(None));
                }
            };
            let on_click = move |_| {
                if target == BarTarget::Word {
                    dispatch(selection, data, |s| s.toggle_word(&click_label));
                }
            };
            view! {
                <g style="cursor: pointer;" on:mouseenter=on_enter on:mouseleave=on_leave on:click=on_click>
                    <text
                        x=(BAR_LABEL_WIDTH - 6.0).to_string()
                        y=label_y.to_string()
                        text-anchor="end"
                        dominant-baseline="central"
                        font-size="12"
                        fill="#1f2430"
                    >
                        {row.label}
                    </text>
                    <rect
                        x=BAR_LABEL_WIDTH.to_string()
                        y=row.y.to_string()
                        width=row.width.to_string()
                        height=BAR_HEIGHT.to_string()
                        rx="2"
                        fill="#4a7bd0"
                    />
                    <text
                        x=(BAR_LABEL_WIDTH + row.width + 4.0).to_string()
                        y=label_y.to_string()
                        dominant-baseline="central"
                        font-size="11"
                        fill="#5a6270"
                    >
                        {format!("{:.1}", row.value)}
                    </text>
                </g>
            }
        })
        .collect_view();

    view! {
        <svg width=CHART_WIDTH.to_string() height=layout.height.to_string() style="display: block;">
            <text x="0" y="16" font-size="13" font-weight="700" fill="#1f2430">{title}</text>
            {rows}
        </svg>
    }
}

/// Words most often appearing with the selected word. Clicking one marks the
/// regions that carry both.
#[component]
fn Cooccurrences(table: Memo<AssetState<ScoreTable>>) -> impl IntoView {
    let Selection(selection) = expect_context();
    let data: MapData = expect_context();

    let entries = move || {
        let word = selection.with(|s| s.word.clone())?;
        let matrix = match data.cooccurrence.get() {
            AssetState::Ready(matrix) => matrix,
            other => return Some(Err(state_note(&other))),
        };
        let ranked = match matrix.ranked(&word) {
            Ok(ranked) => ranked,
            Err(e) => return Some(Err(e.to_string())),
        };
        let denominator = table.with(|state| {
            state
                .ready()
                .map_or(0, |table| region_count(&table, &word))
        });
        Some(Ok((word, ranked, denominator)))
    };

    view! {
        {move || match entries() {
            None => ().into_any(),
            Some(Err(note)) => view! {
                <SectionHeader title="Co-occurrence" />
                <SectionNote text=note />
            }
            .into_any(),
            Some(Ok((word, ranked, denominator))) => {
                let items = ranked
                    .into_iter()
                    .take(TOP_COOCCURRENCES)
                    .map(|entry| {
                        let other = entry.word.clone();
                        let selected_word = word.clone();
                        let is_active = {
                            let other = other.clone();
                            move || selection.with(|s| s.cross_word.as_deref() == Some(other.as_str()))
                        };
                        let on_click = move |_| {
                            let regions = table.with_untracked(|state| {
                                state
                                    .ready()
                                    .map(|table| regions_with_both(&table, &selected_word, &other))
                                    .unwrap_or_default()
                            });
                            dispatch(selection, data, |s| s.toggle_cross_highlight(&other, regions));
                        };
                        view! {
                            <li
                                style="display: flex; justify-content: space-between; padding: 5px 8px; border-radius: 4px; cursor: pointer;"
                                style:background=move || if is_active() { "#e4ecfa" } else { "transparent" }
                                on:click=on_click
                                on:mouseenter=|e| {
                                    if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                                        el.style().set_property("outline", "1px solid #c9ced6").ok();
                                    }
                                }
                                on:mouseleave=|e| {
                                    if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                                        el.style().set_property("outline", "none").ok();
                                    }
                                }
                            >
                                <span style="font-size: 0.85rem;">{entry.word}</span>
                                <span style="font-family: 'JetBrains Mono', monospace; font-size: 0.75rem; color: #5a6270;">
                                    {format!("{} / {denominator}", entry.count)}
                                </span>
                            </li>
                        }
                    })
                    .collect_view();
                view! {
                    <SectionHeader title="Co-occurrence" />
                    <ul style="list-style: none; margin: 0; padding: 0 16px 8px;">{items}</ul>
                }
                .into_any()
            }
        }}
    }
}

#[component]
fn ToggleRow(label: &'static str, active: RwSignal<bool>) -> impl IntoView {
    let on_click = move |_| {
        active.update(|v| *v = !*v);
    };

    view! {
        <div
            style="display: flex; align-items: center; justify-content: space-between; padding: 9px 24px; cursor: pointer; transition: background 0.15s;"
            on:click=on_click
            on:mouseenter=|e| {
                if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                    el.style().set_property("background", "#f1f3f6").ok();
                }
            }
            on:mouseleave=|e| {
                if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                    el.style().set_property("background", "transparent").ok();
                }
            }
        >
            <span style="font-size: 0.88rem;">{label}</span>
            <span style=move || {
                if active.get() {
                    "display: inline-block; width: 8px; height: 8px; border-radius: 50%; background: #2e8b57; flex-shrink: 0;"
                } else {
                    "display: inline-block; width: 8px; height: 8px; border-radius: 50%; background: #c9ced6; flex-shrink: 0;"
                }
            } />
        </div>
    }
}
