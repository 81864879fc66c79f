use serde::{Deserialize, Serialize};

use crate::algorithms::coarsening::CoarseningOptions;
use crate::algorithms::hierarchisation::ModifiedLinearHierarchisationOperation;
use crate::algorithms::refinement::{RefinementFunctor, RefinementOptions};
use crate::basis::modlinear::ModifiedLinearBasis;
use crate::errors::GridError;
use crate::generators::RegularGenerator;
use crate::grids::sparse_grid::SparseGridBase;
use crate::storage::PointIterator;

///
/// Sparse grid on the modified linear basis. The edge functions extrapolate
/// towards the boundary, so the grid carries no boundary points and still
/// represents functions that do not vanish there.
///
#[derive(Serialize, Deserialize, Clone)]
pub struct ModLinearGrid(pub(crate) SparseGridBase);

impl ModLinearGrid
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        Self(SparseGridBase::new(num_inputs, num_outputs))
    }

    pub fn base(&self) -> &SparseGridBase
    {
        &self.0
    }

    pub fn base_mut(&mut self) -> &mut SparseGridBase
    {
        &mut self.0
    }

    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    pub fn points(&self) -> PointIterator<'_>
    {
        self.0.points()
    }

    pub fn values(&self) -> &[f64]
    {
        self.0.values()
    }

    pub fn set_values(&mut self, values: Vec<f64>) -> Result<(), GridError>
    {
        self.0.set_values(values)
    }

    pub fn update_values<EF: Fn(&[f64]) -> Vec<f64>>(&mut self, eval_fun: &EF)
    {
        self.0.update_values(eval_fun)
    }

    pub fn alpha(&self) -> &[f64]
    {
        self.0.alpha()
    }

    pub fn sparse_grid(&mut self, levels: &[usize]) -> Result<(), GridError>
    {
        self.0.sparse_grid(levels, &RegularGenerator)
    }

    pub fn full_grid(&mut self, level: usize) -> Result<(), GridError>
    {
        self.0.full_grid(level, &RegularGenerator)
    }

    pub fn hierarchize(&mut self) -> Result<(), GridError>
    {
        self.0.hierarchize(&ModifiedLinearHierarchisationOperation)
    }

    pub fn dehierarchize(&mut self) -> Result<(), GridError>
    {
        self.0.dehierarchize(&ModifiedLinearHierarchisationOperation)
    }

    pub fn interpolate(&self, x: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        self.0.interpolate_with(x, ModifiedLinearBasis, result)
    }

    pub fn refine<F: RefinementFunctor, EF: Fn(&[f64]) -> Vec<f64>>(&mut self, functor: &F, eval_fun: &EF,
        options: &RefinementOptions, max_iterations: usize) -> Result<(), GridError>
    {
        self.0.refine(functor, eval_fun, &ModifiedLinearHierarchisationOperation, options, max_iterations)
    }

    pub fn coarsen(&mut self, functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<usize, GridError>
    {
        self.0.coarsen(functor, options)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn nodal_values_reproduced_without_boundary_points()
    {
        // a plane does not vanish on the boundary; the modified basis
        // represents it without boundary points
        let mut grid = ModLinearGrid::new(2, 1);
        grid.sparse_grid(&[4, 4]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| 1.0 + p[0] + 2.0 * p[1]).collect();
        grid.set_values(values.clone()).unwrap();
        grid.hierarchize().unwrap();
        let mut result = [0.0];
        for (point, expected) in grid.points().zip(values.iter())
        {
            grid.interpolate(&point, &mut result).unwrap();
            assert!((result[0] - expected).abs() < 1e-12, "{} != {} at {:?}", result[0], expected, point);
        }
    }

    #[test]
    fn round_trip_matches_input()
    {
        let mut grid = ModLinearGrid::new(2, 1);
        grid.sparse_grid(&[5, 5]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| (3.0 * p[0]).sin() + p[1]).collect();
        grid.set_values(values.clone()).unwrap();
        grid.hierarchize().unwrap();
        grid.dehierarchize().unwrap();
        for (a, b) in grid.values().iter().zip(values.iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
