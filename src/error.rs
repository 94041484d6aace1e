//! Error types for rimemesh.
//!
//! Every error is terminal for the run that produced it: there is no retry
//! or partial-result path. Variants carry the offending element (rendered as
//! `N(12)`, `E(7)`, `F(3)`) or coordinates so the failure can be located.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh construction, field transfer or smoothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A linking call would break a cardinality invariant.
    #[error("topology violation at {element}: {details}")]
    TopologyViolation {
        /// The element whose bound would be exceeded.
        element: String,
        /// Description of the violated bound.
        details: String,
    },

    /// A coordinate already present was inserted into an exact-mode spatial index.
    #[error("spatial index already contains a key at ({x}, {y}, {z})")]
    DuplicateKey {
        /// X coordinate of the rejected key.
        x: f64,
        /// Y coordinate of the rejected key.
        y: f64,
        /// Z coordinate of the rejected key.
        z: f64,
    },

    /// An element has empty adjacency where an average over it is required.
    #[error("invalid topology at {element}: {details}")]
    InvalidTopology {
        /// The offending element.
        element: String,
        /// What is missing.
        details: String,
    },

    /// A numerical consistency check failed.
    #[error("numerical error at {element}: {details}")]
    NumericalError {
        /// The element being processed.
        element: String,
        /// Description of the failed check.
        details: String,
    },

    /// Unknown configuration value (fixation mode, field name, strategy).
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A triangle references a node index outside the coordinate array.
    #[error("face {face} references invalid node index {node}")]
    InvalidNodeIndex {
        /// The face index.
        face: usize,
        /// The invalid node index.
        node: usize,
    },

    /// A triangle repeats a node index.
    #[error("face {face} is degenerate (has duplicate nodes)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn topology<E: std::fmt::Debug>(element: E, details: impl Into<String>) -> Self {
        MeshError::TopologyViolation {
            element: format!("{:?}", element),
            details: details.into(),
        }
    }

    pub(crate) fn invalid_topology<E: std::fmt::Debug>(
        element: E,
        details: impl Into<String>,
    ) -> Self {
        MeshError::InvalidTopology {
            element: format!("{:?}", element),
            details: details.into(),
        }
    }

    pub(crate) fn numerical<E: std::fmt::Debug>(element: E, details: impl Into<String>) -> Self {
        MeshError::NumericalError {
            element: format!("{:?}", element),
            details: details.into(),
        }
    }
}
