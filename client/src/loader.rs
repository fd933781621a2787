use std::cell::RefCell;
use std::sync::Arc;
use std::thread::LocalKey;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;
use wordmap_shared::cache::{Acquire, RecentKeys, ResourceCache};
use wordmap_shared::request::RequestGuard;
use wordmap_shared::stats::{CooccurrenceMatrix, ScoreTable, word_list_from_json};
use wordmap_shared::weather::{WeatherData, weather_from_json};
use wordmap_shared::{BoundarySet, BoundsMap, LayoutDataset, LoadError, MapConfig};

/// Load state of one asset. Each panel renders its own failure.
#[derive(Debug, PartialEq)]
pub enum AssetState<T> {
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

impl<T> Clone for AssetState<T> {
    fn clone(&self) -> Self {
        match self {
            AssetState::Loading => AssetState::Loading,
            AssetState::Ready(v) => AssetState::Ready(Arc::clone(v)),
            AssetState::Failed(e) => AssetState::Failed(e.clone()),
        }
    }
}

impl<T> AssetState<T> {
    pub fn ready(&self) -> Option<Arc<T>> {
        match self {
            AssetState::Ready(v) => Some(Arc::clone(v)),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AssetState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// An asset whose URL follows the current selection, tagged with the key it was loaded for.
pub type KeyedAsset<T> = Option<(String, AssetState<T>)>;

#[derive(Clone, Copy)]
pub struct MapData {
    pub bounds: RwSignal<AssetState<BoundsMap>>,
    pub prefectures: RwSignal<AssetState<BoundarySet>>,
    pub municipalities: RwSignal<AssetState<BoundarySet>>,
    pub national_layout: RwSignal<AssetState<LayoutDataset>>,
    pub weather: RwSignal<AssetState<WeatherData>>,
    pub cooccurrence: RwSignal<AssetState<CooccurrenceMatrix>>,
    /// Detail layout of the drilled-into prefecture.
    pub detail_layout: RwSignal<KeyedAsset<LayoutDataset>>,
    /// Word list of the drilled-into prefecture, or the national one.
    pub word_list: RwSignal<KeyedAsset<ScoreTable>>,
}

impl MapData {
    pub fn new() -> Self {
        Self {
            bounds: RwSignal::new(AssetState::Loading),
            prefectures: RwSignal::new(AssetState::Loading),
            municipalities: RwSignal::new(AssetState::Loading),
            national_layout: RwSignal::new(AssetState::Loading),
            weather: RwSignal::new(AssetState::Loading),
            cooccurrence: RwSignal::new(AssetState::Loading),
            detail_layout: RwSignal::new(None),
            word_list: RwSignal::new(None),
        }
    }

    pub fn bounds_ready(&self) -> Option<Arc<BoundsMap>> {
        self.bounds.with_untracked(AssetState::ready)
    }
}

pub async fn fetch_text(url: &str) -> Result<String, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.text().await.map_err(|e| format!("fetch error: {e}"))
}

async fn fetch_parsed<T>(
    url: &str,
    parse: impl FnOnce(&str) -> Result<T, LoadError>,
) -> Result<T, String> {
    let text = fetch_text(url).await?;
    parse(&text).map_err(|e| format!("parse error: {e}"))
}

fn load_into<T, P>(url: String, signal: RwSignal<AssetState<T>>, parse: P)
where
    T: Send + Sync + 'static,
    P: FnOnce(&str) -> Result<T, LoadError> + 'static,
{
    signal.set(AssetState::Loading);
    spawn_local(async move {
        match fetch_parsed(&url, parse).await {
            Ok(value) => signal.set(AssetState::Ready(Arc::new(value))),
            Err(e) => {
                web_sys::console::warn_1(&format!("{url}: {e}").into());
                signal.set(AssetState::Failed(e));
            }
        }
    });
}

/// Start every fetch the overview needs. Each asset settles independently.
pub fn load_overview(data: MapData, config: &MapConfig) {
    let assets = &config.assets;
    load_into(assets.pixel_bounds.clone(), data.bounds, |json| {
        let bounds = BoundsMap::from_json(json)?;
        if !bounds.rejected.is_empty() {
            web_sys::console::warn_1(
                &format!("dropped invalid pixel bounds: {:?}", bounds.rejected).into(),
            );
        }
        Ok(bounds)
    });
    let prefecture_config = config.clone();
    load_into(
        assets.prefecture_boundaries.clone(),
        data.prefectures,
        move |json| {
            let set = BoundarySet::prefectures_from_geojson(json, &prefecture_config)?;
            log_rejected_features("prefecture", &set);
            Ok(set)
        },
    );
    load_into(assets.national_layout.clone(), data.national_layout, |json| {
        LayoutDataset::from_json(json, None)
    });
    load_into(assets.weather.clone(), data.weather, weather_from_json);
    load_into(
        assets.cooccurrence.clone(),
        data.cooccurrence,
        CooccurrenceMatrix::from_json,
    );
}

/// The municipality outlines are large; they are fetched on the first drill-in only.
pub fn ensure_municipalities(data: MapData, config: &MapConfig) {
    let started = MUNICIPALITIES_REQUESTED.with(|flag| flag.replace(true));
    if started {
        return;
    }
    let municipality_config = config.clone();
    load_into(
        config.assets.municipality_boundaries.clone(),
        data.municipalities,
        move |json| {
            let set = BoundarySet::municipalities_from_geojson(json, &municipality_config)?;
            log_rejected_features("municipality", &set);
            Ok(set)
        },
    );
}

fn log_rejected_features(kind: &str, set: &BoundarySet) {
    if set.rejected.is_empty() {
        return;
    }
    web_sys::console::warn_1(
        &format!("{} {kind} features rejected, first: {}", set.rejected.len(), set.rejected[0])
            .into(),
    );
}

/// Prefectures whose detail layout and word list stay cached after switching away.
const RETAINED_PREFECTURES: usize = 4;

/// Per-key assets shared through a reference-counted cache. `current` is the
/// key this store holds and `guard` discards responses for keys no longer current.
/// Recently shown keys outlive `current` through `recent`.
struct KeyedStore<T> {
    cache: ResourceCache<Arc<T>>,
    guard: RequestGuard,
    current: Option<String>,
    recent: RecentKeys,
}

impl<T> Default for KeyedStore<T> {
    fn default() -> Self {
        Self {
            cache: ResourceCache::new(),
            guard: RequestGuard::new(),
            current: None,
            recent: RecentKeys::new(RETAINED_PREFECTURES),
        }
    }
}

thread_local! {
    static MUNICIPALITIES_REQUESTED: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
    static DETAIL_LAYOUTS: RefCell<KeyedStore<LayoutDataset>> = RefCell::new(KeyedStore::default());
    static WORD_LISTS: RefCell<KeyedStore<ScoreTable>> = RefCell::new(KeyedStore::default());
}

/// Point `signal` at the asset behind `url`, releasing whatever it held before.
fn switch_keyed<T>(
    store: &'static LocalKey<RefCell<KeyedStore<T>>>,
    signal: RwSignal<KeyedAsset<T>>,
    url: Option<String>,
    parse: fn(&str) -> Result<T, LoadError>,
) where
    T: Send + Sync + 'static,
{
    enum Next<T> {
        Unchanged,
        Cleared,
        Cached(String, Arc<T>),
        Fetch(String, wordmap_shared::request::Ticket),
    }

    let next = store.with(|store| {
        let mut store = store.borrow_mut();
        if store.current == url {
            return Next::Unchanged;
        }
        if let Some(previous) = store.current.take() {
            let _ = store.cache.release(&previous);
        }
        let Some(key) = url else {
            store.guard.cancel();
            return Next::Cleared;
        };
        store.current = Some(key.clone());
        let ticket = store.guard.begin(&key);
        let acquired = store.cache.acquire(&key);
        let KeyedStore { cache, recent, .. } = &mut *store;
        recent.touch(cache, &key);
        match acquired {
            Acquire::Ready(value) => Next::Cached(key, Arc::clone(&value)),
            // The guard drops the earlier response for a pending key, so it is
            // fetched again under the new ticket.
            Acquire::Fetch | Acquire::Pending => Next::Fetch(key, ticket),
        }
    });

    match next {
        Next::Unchanged => {}
        Next::Cleared => signal.set(None),
        Next::Cached(key, value) => signal.set(Some((key, AssetState::Ready(value)))),
        Next::Fetch(key, ticket) => {
            signal.set(Some((key.clone(), AssetState::Loading)));
            spawn_local(async move {
                let result = fetch_parsed(&key, parse).await;
                let (current, state) = store.with(|store| {
                    let mut store = store.borrow_mut();
                    let state = match result {
                        Ok(value) => match store.cache.complete(&key, Arc::new(value)) {
                            Ok(value) => AssetState::Ready(Arc::clone(&value)),
                            Err(_) => AssetState::Loading,
                        },
                        Err(e) => {
                            let _ = store.cache.fail(&key, e.clone());
                            AssetState::Failed(e)
                        }
                    };
                    (store.guard.is_current(&ticket), state)
                });
                if !current {
                    web_sys::console::info_1(&format!("discarded stale response for {key}").into());
                    return;
                }
                if let AssetState::Failed(e) = &state {
                    web_sys::console::warn_1(&format!("{key}: {e}").into());
                }
                signal.set(Some((key, state)));
            });
        }
    }
}

pub fn switch_detail_layout(data: MapData, config: &MapConfig, prefecture: Option<&str>) {
    let url = prefecture.map(|p| config.assets.detail_layout_for(p));
    switch_keyed(&DETAIL_LAYOUTS, data.detail_layout, url, |json| {
        LayoutDataset::from_json(json, None)
    });
}

pub fn switch_word_list(data: MapData, config: &MapConfig, prefecture: Option<&str>) {
    let url = Some(config.assets.word_list_for(prefecture));
    switch_keyed(&WORD_LISTS, data.word_list, url, word_list_from_json);
}

/// Keep the national word list cached for the whole session so returning to
/// the overview never refetches it.
pub fn pin_national_word_list(config: &MapConfig) {
    let key = config.assets.word_list_for(None);
    WORD_LISTS.with(|store| {
        let mut store = store.borrow_mut();
        if store.cache.holders(&key) == 0 {
            let _ = store.cache.acquire(&key);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_state_accessors() {
        let ready = AssetState::Ready(Arc::new(3));
        assert_eq!(ready.ready().as_deref(), Some(&3));
        assert_eq!(ready.error(), None);

        let failed: AssetState<i32> = AssetState::Failed("HTTP 404".to_string());
        assert_eq!(failed.ready(), None);
        assert_eq!(failed.error(), Some("HTTP 404"));

        let loading: AssetState<i32> = AssetState::Loading;
        assert_eq!(loading.clone(), AssetState::Loading);
    }
}
