//! Index types for mesh elements.
//!
//! Elements live in `Vec` arenas owned by [`Mesh`](super::Mesh); these
//! wrappers keep node, edge, face and zone indices from being mixed up.

use std::fmt::{self, Debug};

/// Sentinel raw value for an invalid/null index.
const INVALID: u32 = u32::MAX;

/// A type-safe node index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

/// A type-safe edge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

/// A type-safe face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

/// A type-safe zone index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ZoneId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < INVALID as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(INVALID)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(NodeId, "N");
impl_index_type!(EdgeId, "E");
impl_index_type!(FaceId, "F");
impl_index_type!(ZoneId, "Z");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let n = NodeId::new(42);
        assert_eq!(n.index(), 42);
        assert!(n.is_valid());
        assert!(!NodeId::invalid().is_valid());
        assert_eq!(NodeId::default(), NodeId::invalid());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", NodeId::new(42)), "N(42)");
        assert_eq!(format!("{:?}", EdgeId::new(1)), "E(1)");
        assert_eq!(format!("{:?}", FaceId::new(0)), "F(0)");
        assert_eq!(format!("{:?}", FaceId::invalid()), "F(INVALID)");
    }
}
