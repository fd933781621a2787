use std::cell::RefCell;
use std::sync::Arc;

use gloo_storage::Storage;
use leptos::prelude::*;
use wordmap_shared::{MapConfig, Mode, SelectionState, ZoomTransform};

use crate::loader::{self, AssetState, MapData};
use crate::map_view::MapView;
use crate::navigation;
use crate::panel::Panel;
use crate::search::SearchBar;

pub(crate) const PANEL_WIDTH: f64 = 360.0;
const SETTINGS_KEY: &str = "wordmap_settings";

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// Newtype wrappers so each signal gets a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct Selection(pub RwSignal<SelectionState>);
#[derive(Clone, Copy)]
pub(crate) struct ZoomView(pub RwSignal<ZoomTransform>);
#[derive(Clone, Copy)]
pub(crate) struct ColorByTemperature(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct PanelOpen(pub RwSignal<bool>);
/// Last pointer position in client coordinates, for the tooltip.
#[derive(Clone, Copy)]
pub(crate) struct PointerPos(pub RwSignal<(f64, f64)>);
#[derive(Clone)]
pub(crate) struct Config(pub Arc<MapConfig>);

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    color_by_temperature: bool,
    show_panel: bool,
    last_mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_by_temperature: true,
            show_panel: true,
            last_mode: Mode::default(),
        }
    }
}

/// Run a selection action with whatever bounds have loaded so far.
pub(crate) fn dispatch(
    selection: RwSignal<SelectionState>,
    data: MapData,
    action: impl FnOnce(&mut SelectionState) -> wordmap_shared::Outcome,
) {
    let bounds = data.bounds_ready();
    navigation::dispatch(selection, bounds.as_deref(), action);
}

#[component]
pub fn App() -> impl IntoView {
    let config = Arc::new(MapConfig::default());
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let selection = RwSignal::new(SelectionState::new(saved.last_mode));
    let zoom = RwSignal::new(ZoomTransform::IDENTITY);
    let color_by_temperature = RwSignal::new(saved.color_by_temperature);
    let panel_open = RwSignal::new(saved.show_panel);
    let pointer = RwSignal::new((0.0, 0.0));
    let data = MapData::new();

    provide_context(Selection(selection));
    provide_context(ZoomView(zoom));
    provide_context(ColorByTemperature(color_by_temperature));
    provide_context(PanelOpen(panel_open));
    provide_context(PointerPos(pointer));
    provide_context(Config(Arc::clone(&config)));
    provide_context(data);

    navigation::install(&config, zoom);
    loader::load_overview(data, &config);
    loader::pin_national_word_list(&config);

    let mode = Memo::new(move |_| selection.with(|s| s.mode));
    Effect::new(move || {
        let settings = Settings {
            color_by_temperature: color_by_temperature.get(),
            show_panel: panel_open.get(),
            last_mode: mode.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Per-prefecture assets follow the drilled-into region.
    let region = Memo::new(move |_| selection.with(|s| s.region.clone()));
    Effect::new({
        let config = Arc::clone(&config);
        move || {
            let region = region.get();
            loader::switch_detail_layout(data, &config, region.as_deref());
            loader::switch_word_list(data, &config, region.as_deref());
            if region.is_some() {
                loader::ensure_municipalities(data, &config);
            }
        }
    });

    // Global keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();

                // Don't intercept when typing in an input
                if matches!(target_tag.as_str(), "INPUT" | "TEXTAREA" | "SELECT") {
                    if key == "Escape"
                        && let Some(el) = e
                            .target()
                            .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    {
                        el.blur().ok();
                    }
                    return;
                }

                match key.as_str() {
                    "Escape" => {
                        dispatch(selection, data, |s| {
                            let mut outcome = s.back();
                            outcome.events.extend(s.hover_region(None).events);
                            outcome
                        });
                    }
                    "m" => {
                        dispatch(selection, data, SelectionState::toggle_mode);
                    }
                    "/" => {
                        e.prevent_default();
                        let Some(window) = web_sys::window() else {
                            return;
                        };
                        let Some(doc) = window.document() else {
                            return;
                        };
                        if let Some(el) = doc.query_selector("[data-search-input]").ok().flatten()
                            && let Ok(input) = el.dyn_into::<web_sys::HtmlElement>()
                        {
                            input.focus().ok();
                        }
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; display: flex;">
            <div style="flex: 1; height: 100%; position: relative; overflow: hidden; background: #eef1f4;">
                <MapView />
                <SearchBar />
                <LoadBanner />
            </div>
            <PanelToggle />
            {move || panel_open.get().then(|| view! { <Panel /> })}
        </div>
        <Tooltip />
    }
}

/// Shown until the bounds arrive, or in their place when they fail; nothing
/// can be drawn without them.
#[component]
fn LoadBanner() -> impl IntoView {
    let data: MapData = expect_context();

    view! {
        {move || {
            data.bounds.with(|state| match state {
                AssetState::Loading => Some(("Loading map\u{2026}".to_string(), "#5a6270")),
                AssetState::Failed(e) => Some((format!("Map unavailable: {e}"), "#b3261e")),
                AssetState::Ready(_) => None,
            })
            .map(|(text, color)| view! {
                <div style={format!(
                    "position: absolute; left: 50%; top: 50%; transform: translate(-50%, -50%); color: {color}; font-family: 'Inter', system-ui, sans-serif; font-size: 0.9rem;"
                )}>
                    {text}
                </div>
            })
        }}
    }
}

#[component]
fn PanelToggle() -> impl IntoView {
    let PanelOpen(panel_open) = expect_context();

    view! {
        <button
            title=move || if panel_open.get() { "Hide panel" } else { "Show panel" }
            style="position: absolute; top: 16px; z-index: 11; width: 32px; height: 32px; background: #ffffff; border: 1px solid #c9ced6; border-radius: 6px; cursor: pointer; color: #3c4350; font-size: 1.1rem; line-height: 1;"
            style:right=move || {
                if panel_open.get() { format!("{}px", PANEL_WIDTH + 12.0) } else { "12px".to_string() }
            }
            on:click=move |_| panel_open.update(|v| *v = !*v)
        >
            {move || if panel_open.get() { "\u{00BB}" } else { "\u{00AB}" }}
        </button>
    }
}

/// Name of the hovered region next to the pointer, with the selected word's
/// score there when the word list has one.
#[component]
fn Tooltip() -> impl IntoView {
    let Selection(selection) = expect_context();
    let PointerPos(pointer) = expect_context();
    let data: MapData = expect_context();

    let tooltip_info = Memo::new(move |_| {
        let (hovered, word) = selection.with(|s| (s.hovered.clone(), s.word.clone()));
        let name = hovered?;
        let score = word.and_then(|word| {
            data.word_list.with(|slot| {
                let table = slot.as_ref()?.1.ready()?;
                let score = table.get(&name)?.get(&word).copied()?;
                Some(format!("{word}: {:.2}", score * 100.0))
            })
        });
        Some((name, score))
    });

    view! {
        {move || {
            let Some((name, score)) = tooltip_info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = pointer.get();
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #ffffff; border: 1px solid #c9ced6; border-radius: 6px; padding: 6px 10px; box-shadow: 0 4px 16px rgba(0,0,0,0.15); font-family: 'Inter', system-ui, sans-serif;"
                >
                    <div style="font-size: 0.85rem; font-weight: 700; color: #1f2430;">{name}</div>
                    {score.map(|score| view! {
                        <div style="font-size: 0.72rem; color: #5a6270; margin-top: 2px;">{score}</div>
                    })}
                </div>
            }
            .into_any()
        }}
    }
}
