//! Identity handles for scene components.
//!
//! The engine never looks inside the scene graph; it compares these ids to
//! decide whether a drawable must be re-classified and whether consecutive
//! draws can skip rebinding.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw id value
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a drawable (entity/mesh pair)
    DrawableId
);
define_id!(
    /// Identity of a geometry component
    GeometryId
);
define_id!(
    /// Identity of a material component
    MaterialId
);
define_id!(
    /// Identity of a transform component
    TransformId
);
define_id!(
    /// Handle to a GPU texture owned by the texture layer
    TextureId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_raw_value() {
        assert!(MaterialId(1) < MaterialId(2));
        assert_eq!(GeometryId(7).raw(), 7);
    }

    #[test]
    fn test_display_names_the_kind() {
        assert_eq!(TransformId(3).to_string(), "TransformId#3");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&TextureId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
