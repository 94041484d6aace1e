//! Mesh processing algorithms.
//!
//! - **Transfer**: moving face fields between meshes that share a surface
//! - **Smoothing**: Laplacian, Taubin, NullSpace, fuzzy vector median and
//!   their composite
//! - **Quality**: connected components, triangle quality, Euler check

pub mod progress;
pub mod quality;
pub mod smooth;
pub mod transfer;

pub use progress::Progress;
