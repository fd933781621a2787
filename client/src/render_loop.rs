use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Drives per-frame work through `requestAnimationFrame`.
///
/// `mark_dirty()` requests one frame; repeated calls before it fires are
/// coalesced. The frame callback receives the rAF timestamp and returns `true`
/// while it wants another frame, e.g. during a zoom transition.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

type FrameFn = Closure<dyn FnMut(f64)>;

struct Inner {
    window: Option<web_sys::Window>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<FrameFn>>,
}

impl Inner {
    fn request_frame(&self) {
        if self.scheduled.replace(true) {
            return;
        }
        let requested = match (self.window.as_ref(), self.callback.borrow().as_ref()) {
            (Some(window), Some(cb)) => window.request_animation_frame(cb.as_ref().unchecked_ref()),
            _ => {
                self.scheduled.set(false);
                return;
            }
        };
        match requested {
            Ok(id) => self.raf_id.set(Some(id)),
            Err(_) => self.scheduled.set(false),
        }
    }
}

impl RenderScheduler {
    pub fn new(mut frame_fn: impl FnMut(f64) -> bool + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut(f64)>::new(move |now: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.scheduled.set(false);
            inner.raf_id.set(None);
            if frame_fn(now) {
                inner.request_frame();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn mark_dirty(&self) {
        self.inner.request_frame();
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
        self.inner.callback.borrow_mut().take();
    }
}
