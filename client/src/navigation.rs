use std::cell::RefCell;

use leptos::prelude::*;
use wordmap_shared::{
    BoundsMap, MapConfig, Outcome, SelectionState, Viewport, ZoomController, ZoomRequest,
    ZoomTransform,
};

use crate::render_loop::RenderScheduler;

struct Navigation {
    controller: ZoomController,
    transform: RwSignal<ZoomTransform>,
}

thread_local! {
    static NAVIGATION: RefCell<Option<Navigation>> = const { RefCell::new(None) };
    static SCHEDULER: RefCell<Option<RenderScheduler>> = const { RefCell::new(None) };
}

/// Milliseconds on the same clock as `requestAnimationFrame` timestamps.
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Install the zoom controller and its frame loop. `transform` mirrors the
/// controller's transform after every change.
pub fn install(config: &MapConfig, transform: RwSignal<ZoomTransform>) {
    NAVIGATION.with(|slot| {
        *slot.borrow_mut() = Some(Navigation {
            controller: ZoomController::new(config),
            transform,
        });
    });
    let scheduler = RenderScheduler::new(|now| {
        with_navigation(|nav| {
            let more = nav.controller.tick(now);
            nav.transform.set(nav.controller.transform);
            more
        })
        .unwrap_or(false)
    });
    SCHEDULER.with(|slot| {
        let _old = slot.borrow_mut().replace(scheduler);
    });
}

fn with_navigation<R>(f: impl FnOnce(&mut Navigation) -> R) -> Option<R> {
    NAVIGATION.with(|slot| slot.borrow_mut().as_mut().map(f))
}

fn mark_dirty() {
    SCHEDULER.with(|slot| {
        if let Some(scheduler) = slot.borrow().as_ref() {
            scheduler.mark_dirty();
        }
    });
}

pub fn set_viewport(width: f64, height: f64) {
    with_navigation(|nav| nav.controller.set_viewport(Viewport::new(width, height)));
}

pub fn request(request: &ZoomRequest, bounds: &BoundsMap) {
    let started =
        with_navigation(|nav| nav.controller.request(request, bounds, now())).unwrap_or(false);
    if started {
        mark_dirty();
    } else if let ZoomRequest::Region(name) = request {
        web_sys::console::warn_1(&format!("no zoom target for region {name:?}").into());
    }
}

pub fn zoom_at(delta: f64, screen_x: f64, screen_y: f64) {
    with_navigation(|nav| {
        nav.controller.zoom_at(delta, screen_x, screen_y);
        nav.transform.set(nav.controller.transform);
    });
}

pub fn pan(dx: f64, dy: f64) {
    with_navigation(|nav| {
        nav.controller.pan(dx, dy);
        nav.transform.set(nav.controller.transform);
    });
}

/// Run a state machine action, publish the new state if anything changed and
/// forward the requested zoom to the controller.
pub fn dispatch(
    selection: RwSignal<SelectionState>,
    bounds: Option<&BoundsMap>,
    action: impl FnOnce(&mut SelectionState) -> Outcome,
) {
    let mut next = selection.get_untracked();
    let outcome = action(&mut next);
    if outcome.is_empty() {
        return;
    }
    if !outcome.events.is_empty() {
        selection.set(next);
    }
    if let Some(zoom) = outcome.zoom {
        match bounds {
            Some(bounds) => request(&zoom, bounds),
            None => request(&zoom, &BoundsMap::default()),
        }
    }
}
