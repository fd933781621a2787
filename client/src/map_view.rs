use std::sync::Arc;

use leptos::prelude::*;
use web_sys::{MouseEvent, PointerEvent, WheelEvent};
use wordmap_shared::weather::TemperatureScale;
use wordmap_shared::{
    LayerDraw, NationInputs, RegionDraw, RegionKind, SelectionState, WordPlacement, detail_layer,
    nation_layer,
};

use crate::app::{ColorByTemperature, Config, PointerPos, Selection, ZoomView, dispatch};
use crate::loader::{AssetState, MapData};
use crate::navigation;

/// Pointer travel from the drag start under which a release still counts as a click.
const CLICK_THRESHOLD_PX: f64 = 5.0;

const SHADOW_FILTER: &str = r##"<filter id="region-shadow" x="-20%" y="-20%" width="140%" height="140%"><feDropShadow dx="0" dy="2" stdDeviation="3" flood-color="#000000" flood-opacity="0.35"/></filter>"##;

#[derive(Clone, Copy, Default)]
struct DragState {
    active: bool,
    start: (f64, f64),
    last: (f64, f64),
}

type Drag = StoredValue<DragState>;

fn exceeds_click_threshold(start: (f64, f64), end: (f64, f64)) -> bool {
    (end.0 - start.0).abs() >= CLICK_THRESHOLD_PX || (end.1 - start.1).abs() >= CLICK_THRESHOLD_PX
}

fn moved_beyond_click(drag: Drag, e: &MouseEvent) -> bool {
    exceeds_click_threshold(
        drag.get_value().start,
        (e.client_x() as f64, e.client_y() as f64),
    )
}

/// Log skipped regions and dropped glyphs once per distinct layer, not per frame.
fn log_layer_problems(layer: &str, draw: &LayerDraw) {
    for skipped in &draw.skipped {
        web_sys::console::warn_1(
            &format!("{layer}: skipped region {}: {}", skipped.name, skipped.reason).into(),
        );
    }
    if let Some(first) = draw.dropped.first() {
        web_sys::console::warn_1(
            &format!(
                "{layer}: dropped {} glyphs, first {} in {}: {}",
                draw.dropped.len(),
                first.word,
                first.region,
                first.error
            )
            .into(),
        );
    }
}

fn measure_viewport(container: NodeRef<leptos::html::Div>) {
    if let Some(el) = container.get_untracked() {
        let rect = el.get_bounding_client_rect();
        navigation::set_viewport(rect.width(), rect.height());
    }
}

#[component]
pub fn MapView() -> impl IntoView {
    let Selection(selection) = expect_context();
    let ZoomView(zoom) = expect_context();
    let ColorByTemperature(color_by_temperature) = expect_context();
    let PointerPos(pointer) = expect_context();
    let Config(config) = expect_context();
    let data: MapData = expect_context();
    let container = NodeRef::<leptos::html::Div>::new();

    let fills = Memo::new(move |_| {
        if !color_by_temperature.get() {
            return None;
        }
        let weather = data.weather.with(AssetState::ready)?;
        let scale = TemperatureScale::from_data(&weather)?;
        Some(Arc::new(scale.fills(&weather)))
    });

    let nation = Memo::new({
        let config = Arc::clone(&config);
        move |_| {
            let bounds = data.bounds.with(AssetState::ready)?;
            let boundaries = data.prefectures.with(AssetState::ready)?;
            let layout = data.national_layout.with(AssetState::ready);
            let fills = fills.get();
            let inputs = NationInputs {
                bounds: &bounds,
                boundaries: &boundaries,
                layout: layout.as_deref(),
                fills: fills.as_deref(),
            };
            Some(selection.with(|sel| nation_layer(inputs, sel, &config)))
        }
    });

    let detail = Memo::new({
        let config = Arc::clone(&config);
        move |_| {
            let prefecture = selection.with(|s| s.region.clone())?;
            let bounds = data.bounds.with(AssetState::ready)?;
            let municipalities = data.municipalities.with(AssetState::ready)?;
            let expected = config.assets.detail_layout_for(&prefecture);
            let layout = data.detail_layout.with(|slot| match slot {
                Some((key, state)) if *key == expected => state.ready(),
                _ => None,
            });
            Some(selection.with(|sel| {
                detail_layer(
                    &prefecture,
                    &bounds,
                    &municipalities,
                    layout.as_deref(),
                    sel,
                    &config,
                )
            }))
        }
    });

    Effect::new(move |prev: Option<(usize, usize)>| {
        let key = nation.with(|draw| {
            draw.as_ref()
                .map_or((0, 0), |d| (d.skipped.len(), d.dropped.len()))
        });
        if prev != Some(key) {
            nation.with_untracked(|draw| {
                if let Some(draw) = draw {
                    log_layer_problems("nation", draw);
                }
            });
        }
        key
    });

    Effect::new(move |prev: Option<Option<String>>| {
        let key = detail.with(|draw| {
            draw.as_ref().map(|d| {
                format!(
                    "{}:{}:{}",
                    selection.with_untracked(|s| s.region.clone()).unwrap_or_default(),
                    d.skipped.len(),
                    d.dropped.len()
                )
            })
        });
        if prev.as_ref() != Some(&key) {
            detail.with_untracked(|draw| {
                if let Some(draw) = draw {
                    log_layer_problems("detail", draw);
                }
            });
        }
        key
    });

    Effect::new(move || {
        if container.get().is_some() {
            measure_viewport(container);
        }
    });
    let _resize = window_event_listener(leptos::ev::resize, move |_| measure_viewport(container));

    let drag: Drag = StoredValue::new(DragState::default());

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let Some(el) = container.get_untracked() else {
            return;
        };
        let rect = el.get_bounding_client_rect();
        navigation::zoom_at(
            e.delta_y(),
            e.client_x() as f64 - rect.left(),
            e.client_y() as f64 - rect.top(),
        );
    };

    let on_pointer_down = move |e: PointerEvent| {
        let at = (e.client_x() as f64, e.client_y() as f64);
        drag.set_value(DragState {
            active: true,
            start: at,
            last: at,
        });
    };

    let on_pointer_move = move |e: PointerEvent| {
        let at = (e.client_x() as f64, e.client_y() as f64);
        pointer.set(at);
        let state = drag.get_value();
        if !state.active {
            return;
        }
        drag.update_value(|d| d.last = at);
        navigation::pan(at.0 - state.last.0, at.1 - state.last.1);
    };

    let on_pointer_up = move |_: PointerEvent| drag.update_value(|d| d.active = false);

    let on_pointer_leave = move |_: PointerEvent| {
        drag.update_value(|d| d.active = false);
        dispatch(selection, data, |s| s.hover_region(None));
    };

    let layer_view = move |memo: Memo<Option<LayerDraw>>| {
        move || {
            memo.get().map(|draw| {
                draw.regions
                    .into_iter()
                    .map(|region| region_view(region, selection, data, drag))
                    .collect_view()
            })
        }
    };

    view! {
        <div
            node_ref=container
            style="width: 100%; height: 100%; cursor: grab; touch-action: none;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
        >
            <svg width="100%" height="100%" style="display: block; user-select: none;">
                <defs inner_html=SHADOW_FILTER />
                <g transform=move || zoom.get().to_svg()>
                    <g class="nation-layer">{layer_view(nation)}</g>
                    <g class="detail-layer">{layer_view(detail)}</g>
                </g>
            </svg>
        </div>
    }
}

fn region_view(
    region: RegionDraw,
    selection: RwSignal<SelectionState>,
    data: MapData,
    drag: Drag,
) -> impl IntoView {
    let RegionDraw {
        name,
        kind,
        path,
        fill,
        stroke_width,
        opacity,
        shadow,
        hover,
        words,
        ..
    } = region;

    let on_enter = {
        let name = name.clone();
        move |_: MouseEvent| dispatch(selection, data, |s| s.hover_region(Some(&name)))
    };
    let on_leave = {
        let name = name.clone();
        move |_: MouseEvent| dispatch(selection, data, |s| s.leave_region(&name))
    };
    let on_click = {
        let name = name.clone();
        move |e: MouseEvent| {
            if moved_beyond_click(drag, &e) {
                return;
            }
            dispatch(selection, data, |s| match kind {
                RegionKind::Prefecture => s.click_region(&name),
                RegionKind::Municipality => s.click_detail(None),
            });
        }
    };

    let glyphs = words
        .into_iter()
        .map(|glyph| {
            let p = glyph.placement;
            let word = glyph.word.clone();
            let region = name.clone();
            let on_glyph_click = move |e: MouseEvent| {
                e.stop_propagation();
                if moved_beyond_click(drag, &e) {
                    return;
                }
                dispatch(selection, data, |s| match kind {
                    RegionKind::Prefecture => s.click_word(&word, &region),
                    RegionKind::Municipality => s.click_detail(Some(&word)),
                });
            };
            view! {
                <text
                    x=p.x.to_string()
                    y=p.text_y().to_string()
                    font-size=p.font_size.to_string()
                    fill=glyph.color
                    opacity=glyph.opacity.to_string()
                    text-anchor=WordPlacement::TEXT_ANCHOR
                    dominant-baseline=p.baseline.as_css()
                    transform=p.transform()
                    font-weight=if glyph.emphasized { "bold" } else { "normal" }
                    style="cursor: pointer;"
                    on:click=on_glyph_click
                >
                    {glyph.word}
                </text>
            }
        })
        .collect_view();

    view! {
        <g
            class="region"
            transform=hover.map(|h| h.to_svg())
            on:mouseenter=on_enter
            on:mouseleave=on_leave
            on:click=on_click
        >
            <path
                d=path
                fill=fill
                stroke="#3c4350"
                stroke-width=stroke_width.to_string()
                stroke-linejoin="round"
                opacity=opacity.to_string()
                filter=shadow.then_some("url(#region-shadow)")
            />
            {glyphs}
        </g>
    }
}
