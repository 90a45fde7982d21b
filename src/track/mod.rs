//! Track descriptors, collection references and per-run track state

pub mod descriptor;
pub mod reference;
pub mod state;

pub use descriptor::TrackDescriptor;
pub use reference::{CollectionReference, ReferenceKind};
pub use state::{RunLedger, Settlement, TrackCounts, TrackState};
