pub mod classify;
pub mod css;
pub mod document;
pub mod geom;
pub mod layout;
pub mod metadata;
pub mod path;

pub use classify::{GroupLikeKind, classify};
pub use css::{CssNumber, CssPosition, CssUnit, FlexDirection, LayoutSystem, PinProp};
pub use document::{Document, DocumentError, DocumentPatch, DocumentPatchSink, PropertyPath};
pub use geom::{Point, Rect};
pub use layout::{ElementsToRerender, LayoutMeasurer, MetadataProvider, Viewport};
pub use metadata::{AllElementProps, ElementInstanceMetadata, ElementInstanceMetadataMap};
pub use path::{ElementPath, Uid};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
