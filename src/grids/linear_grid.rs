use serde::{Deserialize, Serialize};

use crate::algorithms::coarsening::CoarseningOptions;
use crate::algorithms::hierarchisation::{LinearBoundaryHierarchisationOperation, LinearHierarchisationOperation};
use crate::algorithms::refinement::{RefinementFunctor, RefinementOptions};
use crate::errors::GridError;
use crate::generators::RegularGenerator;
use crate::grids::sparse_grid::SparseGridBase;
use crate::storage::PointIterator;

///
/// Sparse grid with the piecewise linear basis, with or without boundary
/// points. The hierarchisation pair is chosen per grid from the boundary
/// flag.
///
#[derive(Serialize, Deserialize, Clone)]
pub struct LinearGrid(pub(crate) SparseGridBase);

impl LinearGrid
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

    pub fn has_boundary(&self) -> bool
    {
        self.0.has_boundary()
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

    pub fn sparse_grid_with_boundaries(&mut self, levels: &[usize]) -> Result<(), GridError>
    {
        self.0.sparse_grid_with_boundaries(levels, &RegularGenerator)
    }

    pub fn full_grid(&mut self, level: usize) -> Result<(), GridError>
    {
        self.0.full_grid(level, &RegularGenerator)
    }

    pub fn full_grid_with_boundaries(&mut self, level: usize) -> Result<(), GridError>
    {
        self.0.full_grid_with_boundaries(level, &RegularGenerator)
    }

    pub fn hierarchize(&mut self) -> Result<(), GridError>
    {
        if self.has_boundary()
        {
            self.0.hierarchize(&LinearBoundaryHierarchisationOperation)
        }
        else
        {
            self.0.hierarchize(&LinearHierarchisationOperation)
        }
    }

    pub fn dehierarchize(&mut self) -> Result<(), GridError>
    {
        if self.has_boundary()
        {
            self.0.dehierarchize(&LinearBoundaryHierarchisationOperation)
        }
        else
        {
            self.0.dehierarchize(&LinearHierarchisationOperation)
        }
    }

    pub fn interpolate(&self, x: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        self.0.interpolate(x, result)
    }

    #[cfg(feature = "rayon")]
    pub fn interpolate_batch(&self, x: &[f64]) -> Result<Vec<f64>, GridError>
    {
        self.0.interpolate_batch(x)
    }

    pub fn integrate_isotropic(&self) -> Vec<f64>
    {
        self.0.integrate_isotropic()
    }

    ///
    /// Adaptive refinement loop with nodal values supplied by `eval_fun`.
    ///
    pub fn refine<F: RefinementFunctor, EF: Fn(&[f64]) -> Vec<f64>>(&mut self, functor: &F, eval_fun: &EF,
        options: &RefinementOptions, max_iterations: usize) -> Result<(), GridError>
    {
        if self.has_boundary()
        {
            self.0.refine(functor, eval_fun, &LinearBoundaryHierarchisationOperation, options, max_iterations)
        }
        else
        {
            self.0.refine(functor, eval_fun, &LinearHierarchisationOperation, options, max_iterations)
        }
    }

    pub fn refine_iteration(&mut self, functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<f64>, GridError>
    {
        self.0.refine_iteration(functor, options)
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
    use crate::refinement::surplus::SurplusRefinement;
    use crate::storage::BoundingBox;

    #[test]
    fn interpolation_reproduces_nodal_values()
    {
        let mut grid = LinearGrid::new(2, 1);
        grid.sparse_grid(&[4, 4]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| p[0] * p[0] + p[1]).collect();
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
    fn interpolation_error_is_small_between_nodes()
    {
        let mut grid = LinearGrid::new(2, 1);
        grid.sparse_grid(&[6, 6]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| p[0] * p[0] + p[1] * p[1]).collect();
        grid.set_values(values).unwrap();
        grid.hierarchize().unwrap();
        let mut result = [0.0];
        grid.interpolate(&[0.2, 0.2], &mut result).unwrap();
        assert!((result[0] - 0.08).abs() < 1e-2);
    }

    #[test]
    fn boundary_grid_reproduces_values_on_the_edge()
    {
        let mut grid = LinearGrid::new(2, 1);
        grid.sparse_grid_with_boundaries(&[3, 3]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| 1.0 + p[0] + 2.0 * p[1]).collect();
        grid.set_values(values.clone()).unwrap();
        grid.hierarchize().unwrap();
        let mut result = [0.0];
        for (point, expected) in grid.points().zip(values.iter())
        {
            grid.interpolate(&point, &mut result).unwrap();
            assert!((result[0] - expected).abs() < 1e-12);
        }
        // a plane is reproduced exactly everywhere on a boundary grid
        grid.interpolate(&[0.0, 0.7], &mut result).unwrap();
        assert!((result[0] - 2.4).abs() < 1e-12);
    }

    #[test]
    fn bounding_box_scales_coordinates()
    {
        let mut grid = LinearGrid::new(1, 1);
        *grid.base_mut().bounding_box_mut() = BoundingBox::new(&[2.0], &[4.0]);
        grid.sparse_grid(&[3]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| p[0]).collect();
        grid.set_values(values).unwrap();
        grid.hierarchize().unwrap();
        let mut result = [0.0];
        grid.interpolate(&[3.0], &mut result).unwrap();
        assert!((result[0] - 3.0).abs() < 1e-12);
        assert_eq!(grid.interpolate(&[5.0], &mut result), Err(GridError::OutOfDomain));
    }

    #[test]
    fn adaptive_refinement_tracks_a_peak()
    {
        let peak = |x: &[f64]| vec![(-((x[0] - 0.3) * (x[0] - 0.3) + (x[1] - 0.7) * (x[1] - 0.7)) * 40.0).exp()];
        let mut grid = LinearGrid::new(2, 1);
        grid.sparse_grid(&[3, 3]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| peak(&p)[0]).collect();
        grid.set_values(values).unwrap();
        grid.hierarchize().unwrap();
        let before = grid.len();
        let functor = SurplusRefinement::new(2, 1);
        grid.refine(&functor, &peak, &RefinementOptions::new(1e-3), 4).unwrap();
        assert!(grid.len() > before);
        // refined grid still reproduces its own nodal values
        let mut result = [0.0];
        for (point, expected) in grid.points().zip(grid.values().iter())
        {
            grid.interpolate(&point, &mut result).unwrap();
            assert!((result[0] - expected).abs() < 1e-12);
        }
        // and the ancestor invariant survived
        let storage = grid.base().storage();
        for seq in 0..storage.len()
        {
            let point = storage.point(seq);
            for d in 0..2
            {
                if point.level[d] > 1
                {
                    assert!(storage.contains(&point.parent(d)));
                }
            }
        }
    }

    #[test]
    fn coarsening_after_refinement_shrinks_the_grid()
    {
        let peak = |x: &[f64]| vec![(-((x[0] - 0.5) * (x[0] - 0.5)) * 30.0).exp()];
        let mut grid = LinearGrid::new(1, 1);
        grid.sparse_grid(&[5]).unwrap();
        let values: Vec<f64> = grid.points().map(|p| peak(&p)[0]).collect();
        grid.set_values(values).unwrap();
        grid.hierarchize().unwrap();
        let before = grid.len();
        let functor = SurplusRefinement::new(1, 1);
        let removed = grid.coarsen(&functor, &CoarseningOptions::new(1e-3)).unwrap();
        assert!(removed > 0);
        assert_eq!(grid.len(), before - removed);
        assert_eq!(grid.values().len(), grid.len());
        assert_eq!(grid.alpha().len(), grid.len());
    }
}
