pub mod boundary;
pub mod bounds;
pub mod cache;
pub mod colors;
pub mod config;
pub mod error;
pub mod layers;
pub mod layout;
pub mod placement;
pub mod projector;
pub mod request;
pub mod selection;
pub mod stats;
pub mod weather;
pub mod zoom;

pub use boundary::{BoundarySet, RegionBoundary, RegionKind};
pub use bounds::{BoundsMap, PixelBounds, Rect};
pub use config::{AssetPaths, FontSizing, MapConfig};
pub use error::{LoadError, PlacementError, SkipReason};
pub use layers::{LayerDraw, NationInputs, RegionDraw, detail_layer, nation_layer};
pub use layout::{LayoutConvention, LayoutDataset, Orientation, WordLayoutEntry};
pub use placement::{WordPlacement, place};
pub use projector::{FitMode, GeoProjector};
pub use selection::{Mode, Outcome, SelectionEvent, SelectionState, ZoomRequest};
pub use zoom::{Viewport, ZoomController, ZoomTransform};
