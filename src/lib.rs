//! Adaptive sparse grids: hash-indexed point storage, hierarchisation and
//! dehierarchisation sweeps, regular/full/clique generators, and
//! functor-driven refinement and coarsening.
//!
//! The usual flow is: build a [`grids::linear_grid::LinearGrid`], set the
//! nodal values, `hierarchize`, then interpolate, integrate, or adapt the
//! grid with `refine`/`coarsen`.

pub mod algorithms;
pub mod basis;
pub mod errors;
pub mod generators;
pub mod grids;
pub mod iterators;
pub mod refinement;
pub mod serialization;
pub mod storage;
pub mod stretching;

pub use errors::GridError;
pub use grids::linear_grid::LinearGrid;
pub use grids::modlinear_grid::ModLinearGrid;
pub use grids::sparse_grid::SparseGridBase;
pub use storage::{BoundingBox, GridPoint, GridStorage};
