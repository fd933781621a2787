use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wordmap_shared::SelectionState;

use crate::app::{Selection, dispatch};
use crate::loader::{AssetState, MapData};

const WORD_OPTIONS_ID: &str = "word-options";

fn event_value(e: &leptos::ev::Event) -> Option<String> {
    let target = e.target()?;
    if let Some(input) = target.dyn_ref::<web_sys::HtmlInputElement>() {
        return Some(input.value());
    }
    target
        .dyn_ref::<web_sys::HtmlSelectElement>()
        .map(|select| select.value())
}

/// Word search with autocomplete, the mode switch and a prefecture picker,
/// floating over the top-left of the map.
#[component]
pub fn SearchBar() -> impl IntoView {
    let Selection(selection) = expect_context();
    let data: MapData = expect_context();

    let words = Memo::new(move |_| {
        let active = data.detail_layout.with(|slot| {
            slot.as_ref()
                .and_then(|(_, state)| state.ready())
                .filter(|_| selection.with(SelectionState::is_drilled_in))
        });
        active
            .or_else(|| data.national_layout.with(AssetState::ready))
            .map(|layout| layout.unique_words())
            .unwrap_or_default()
    });
    let prefectures = Memo::new(move |_| {
        data.bounds
            .with(AssetState::ready)
            .map(|bounds| bounds.names().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default()
    });

    // Committed on change so partial typing never clears the selection mid-word.
    let on_word_change = move |e: leptos::ev::Event| {
        let Some(value) = event_value(&e) else {
            return;
        };
        let value = value.trim().to_string();
        let known = value.is_empty() || words.with_untracked(|w| w.binary_search(&value).is_ok());
        if !known {
            return;
        }
        dispatch(selection, data, |s| {
            s.set_word((!value.is_empty()).then_some(value))
        });
    };

    let on_region_change = move |e: leptos::ev::Event| {
        let Some(value) = event_value(&e) else {
            return;
        };
        let name = (!value.is_empty()).then_some(value);
        dispatch(selection, data, |s| s.pick_region(name.as_deref()));
    };

    view! {
        <div style="position: absolute; top: 16px; left: 16px; z-index: 10; display: flex; gap: 8px; align-items: center; font-family: 'Inter', system-ui, sans-serif;">
            <div style="position: relative;">
                <input
                    data-search-input=""
                    type="search"
                    list=WORD_OPTIONS_ID
                    placeholder="Search words..."
                    style="width: 220px; padding: 8px 28px 8px 12px; background: #ffffff; border: 1px solid #c9ced6; border-radius: 6px; color: #1f2430; font-size: 0.9rem; outline: none;"
                    prop:value=move || selection.with(|s| s.word.clone()).unwrap_or_default()
                    on:change=on_word_change
                />
                // Keyboard hint
                <div style="position: absolute; right: 8px; top: 50%; transform: translateY(-50%); font-family: 'JetBrains Mono', monospace; font-size: 0.62rem; color: #8a919c; border: 1px solid #c9ced6; padding: 0 4px; border-radius: 3px; pointer-events: none;">
                    "/"
                </div>
                <datalist id=WORD_OPTIONS_ID>
                    {move || {
                        words
                            .get()
                            .into_iter()
                            .map(|word| view! { <option value=word /> })
                            .collect_view()
                    }}
                </datalist>
            </div>
            <button
                title="Toggle mode (m)"
                style="padding: 8px 12px; background: #ffffff; border: 1px solid #c9ced6; border-radius: 6px; cursor: pointer; color: #3c4350; font-size: 0.8rem;"
                on:click=move |_| dispatch(selection, data, SelectionState::toggle_mode)
            >
                {move || selection.with(|s| s.mode.label())}
            </button>
            <select
                style="padding: 8px; background: #ffffff; border: 1px solid #c9ced6; border-radius: 6px; color: #1f2430; font-size: 0.85rem;"
                prop:value=move || selection.with(|s| s.region.clone()).unwrap_or_default()
                on:change=on_region_change
            >
                <option value="">"全国"</option>
                {move || {
                    prefectures
                        .get()
                        .into_iter()
                        .map(|name| {
                            let value = name.clone();
                            view! { <option value=value>{name}</option> }
                        })
                        .collect_view()
                }}
            </select>
        </div>
    }
}
