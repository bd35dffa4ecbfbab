mod compose;
pub mod registry;
pub mod wms;

pub use compose::{Group, GroupNode, Layer, LayerId, MapModel};
pub use registry::{GroupMember, GroupSpec, LayerSource, LayerSpec, Registry};
