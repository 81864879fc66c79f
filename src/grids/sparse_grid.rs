use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::algorithms::basis_evaluation::BasisEvaluation;
use crate::algorithms::coarsening::{self, CoarseningOptions};
use crate::algorithms::hierarchisation::HierarchisationOperation;
use crate::algorithms::interpolation::InterpolationOperation;
use crate::algorithms::refinement::{BaseRefinement, RefinementFunctor, RefinementOptions};
use crate::algorithms::integration;
use crate::basis::base::Basis;
use crate::basis::linear::LinearBasis;
use crate::errors::GridError;
use crate::generators::Generator;
use crate::iterators::grid_iterator::HashGridIterator;
use crate::storage::{BoundingBox, GridStorage, PointIterator};

///
/// Storage plus the two caller-facing vectors: nodal `values` and surplus
/// coefficients `alpha`, both interleaved with `num_outputs` stride and
/// indexed by sequence number. Mutating the grid (refine/coarsen) keeps the
/// vectors sized to the storage; representation changes go through
/// `hierarchize`/`dehierarchize`.
///
#[derive(Serialize, Deserialize, Clone)]
pub struct SparseGridBase
{
    pub(crate) storage: GridStorage,
    pub(crate) alpha: Vec<f64>,
    pub(crate) values: Vec<f64>,
}

impl SparseGridBase
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        SparseGridBase { storage: GridStorage::new(num_inputs, num_outputs), alpha: Vec::new(), values: Vec::new() }
    }

    pub fn alpha(&self) -> &[f64]
    {
        &self.alpha
    }

    pub fn alpha_mut(&mut self) -> &mut [f64]
    {
        &mut self.alpha
    }

    pub fn values(&self) -> &[f64]
    {
        &self.values
    }

    pub fn set_values(&mut self, values: Vec<f64>) -> Result<(), GridError>
    {
        if values.len() != self.len() * self.storage.num_outputs()
        {
            Err(GridError::NumberOfPointsAndValuesMismatch)
        }
        else
        {
            self.values = values;
            Ok(())
        }
    }

    ///
    /// Fills the nodal values by evaluating `eval_fun` at every grid point
    /// (real coordinates).
    ///
    pub fn update_values<EF: Fn(&[f64]) -> Vec<f64>>(&mut self, eval_fun: &EF)
    {
        let mut values = Vec::with_capacity(self.len() * self.storage.num_outputs());
        for point in self.storage.points()
        {
            values.extend(eval_fun(&point));
        }
        self.values = values;
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        self.storage.bounding_box()
    }

    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        self.storage.bounding_box_mut()
    }

    pub fn is_empty(&self) -> bool
    {
        self.storage.is_empty()
    }

    pub fn len(&self) -> usize
    {
        self.storage.len()
    }

    pub fn has_boundary(&self) -> bool
    {
        self.storage.has_boundary()
    }

    pub fn storage(&self) -> &GridStorage
    {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut GridStorage
    {
        &mut self.storage
    }

    pub fn points(&self) -> PointIterator<'_>
    {
        self.storage.points()
    }

    pub fn sparse_grid<G: Generator>(&mut self, levels: &[usize], generator: &G) -> Result<(), GridError>
    {
        generator.regular(&mut self.storage, levels, None)?;
        self.sort();
        Ok(())
    }

    pub fn full_grid<G: Generator>(&mut self, level: usize, generator: &G) -> Result<(), GridError>
    {
        generator.full(&mut self.storage, level)?;
        self.sort();
        Ok(())
    }

    pub fn sparse_grid_with_boundaries<G: Generator>(&mut self, levels: &[usize], generator: &G) -> Result<(), GridError>
    {
        generator.regular_with_boundaries(&mut self.storage, levels, Some(1), None)?;
        self.sort();
        Ok(())
    }

    pub fn full_grid_with_boundaries<G: Generator>(&mut self, level: usize, generator: &G) -> Result<(), GridError>
    {
        generator.full_with_boundaries(&mut self.storage, level)?;
        self.sort();
        Ok(())
    }

    ///
    /// Computes the surpluses from the nodal values.
    ///
    pub fn hierarchize<OP: HierarchisationOperation>(&mut self, op: &OP) -> Result<(), GridError>
    {
        if self.values.len() != self.len() * self.storage.num_outputs()
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        self.alpha.clone_from(&self.values);
        op.hierarchize(&mut self.alpha, &self.storage)
    }

    ///
    /// Reconstructs the nodal values from the surpluses.
    ///
    pub fn dehierarchize<OP: HierarchisationOperation>(&mut self, op: &OP) -> Result<(), GridError>
    {
        if self.alpha.len() != self.len() * self.storage.num_outputs()
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        self.values.clone_from(&self.alpha);
        op.dehierarchize(&mut self.values, &self.storage)
    }

    fn argsort<T: Ord>(data: &[T]) -> Vec<usize>
    {
        let mut indices = (0..data.len()).collect::<Vec<_>>();
        indices.sort_by_key(|&i| &data[i]);
        indices
    }

    ///
    /// Brings the storage into canonical (level-major, then index) order,
    /// permuting the coefficient vectors along with it.
    ///
    pub(crate) fn sort(&mut self)
    {
        let num_outputs = self.storage.num_outputs();
        let node_vec: Vec<_> = self.storage.nodes().map(|n| (n.level.to_vec(), n.index.to_vec())).collect();
        let order = Self::argsort(&node_vec);
        if order.iter().enumerate().all(|(i, &o)| i == o)
        {
            self.storage.recalc_leaf_property();
            return;
        }
        let keep: Vec<usize> = order;
        let permute = |data: &[f64]| -> Vec<f64>
        {
            let mut out = Vec::with_capacity(data.len());
            for &old in &keep
            {
                out.extend_from_slice(&data[old * num_outputs..(old + 1) * num_outputs]);
            }
            out
        };
        if self.alpha.len() == self.len() * num_outputs
        {
            self.alpha = permute(&self.alpha);
        }
        if self.values.len() == self.len() * num_outputs
        {
            self.values = permute(&self.values);
        }
        self.storage.keep_points(&keep);
    }

    #[inline]
    pub fn interpolate(&self, x: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        self.interpolate_with(x, LinearBasis, result)
    }

    ///
    /// Interpolation with an explicit basis family; the family must match
    /// the one the surpluses were hierarchised with.
    ///
    #[inline]
    pub fn interpolate_with<B: Basis>(&self, x: &[f64], basis: B, result: &mut [f64]) -> Result<(), GridError>
    {
        if self.alpha.len() != self.len() * self.storage.num_outputs()
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        let iterator = &mut HashGridIterator::new(&self.storage);
        let op = InterpolationOperation(self.storage.has_boundary(), BasisEvaluation { storage: &self.storage, basis });
        op.interpolate(x, &self.alpha, iterator, result)
    }

    #[cfg(feature = "rayon")]
    #[inline]
    pub fn interpolate_batch(&self, x: &[f64]) -> Result<Vec<f64>, GridError>
    {
        use rayon::iter::{IndexedParallelIterator, ParallelIterator};
        use rayon::slice::{ParallelSlice, ParallelSliceMut};
        let num_inputs = self.storage.num_inputs();
        let num_outputs = self.storage.num_outputs();
        let mut results = vec![0.0; x.len() / num_inputs * num_outputs];
        x.par_chunks_exact(num_inputs).zip(results.par_chunks_exact_mut(num_outputs)).try_for_each(
            |(x, y)|
            {
                let iterator = &mut HashGridIterator::new(&self.storage);
                let op = InterpolationOperation(self.storage.has_boundary(), BasisEvaluation { storage: &self.storage, basis: LinearBasis });
                op.interpolate(x, &self.alpha, iterator, y)
            }
        )?;
        Ok(results)
    }

    pub fn integrate_isotropic(&self) -> Vec<f64>
    {
        let mut result = vec![0.0; self.storage.num_outputs()];
        integration::integrate_isotropic(&self.storage, &LinearBasis, &self.alpha, &mut result);
        result
    }

    pub fn get_num_refinable_points(&self) -> Result<usize, GridError>
    {
        BaseRefinement(self.storage.has_boundary()).get_num_refinable_points(&self.storage, &None)
    }

    pub fn get_num_removable_points(&self) -> usize
    {
        coarsening::get_num_removable_points(&self.storage, 0)
    }

    ///
    /// One refinement pass. New points get zero-filled value slots; returns
    /// their real coordinates so the caller can evaluate and re-hierarchise.
    ///
    pub fn refine_iteration(&mut self, functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<f64>, GridError>
    {
        let ref_op = BaseRefinement(self.storage.has_boundary());
        let indices = ref_op.refine(&mut self.storage, &self.alpha, &self.values, functor, options)?;
        let num_outputs = self.storage.num_outputs();
        self.values.resize(self.len() * num_outputs, 0.0);
        self.alpha.resize(self.len() * num_outputs, 0.0);
        let mut points = Vec::with_capacity(indices.len() * self.storage.num_inputs());
        for &i in &indices
        {
            let mut point = self.storage.unit_coordinate(i);
            self.storage.bounding_box().to_real_coordinate_in_place(&mut point);
            points.extend(point);
        }
        Ok(points)
    }

    ///
    /// Adaptive refinement driven by an evaluation callback: refine, fill
    /// the new nodal values from `eval_fun`, re-hierarchise, and repeat
    /// until no candidate is left or `max_iterations` is reached.
    ///
    pub fn refine<F: RefinementFunctor, OP: HierarchisationOperation, EF: Fn(&[f64]) -> Vec<f64>>(&mut self, functor: &F,
        eval_fun: &EF, op: &OP, options: &RefinementOptions, max_iterations: usize) -> Result<(), GridError>
    {
        let ref_op = BaseRefinement(self.storage.has_boundary());
        let mut iteration = 1;
        loop
        {
            let indices = ref_op.refine(&mut self.storage, &self.alpha, &self.values, functor, options)?;
            if indices.is_empty()
            {
                break;
            }
            self.values.reserve(indices.len() * self.storage.num_outputs());
            for &i in &indices
            {
                let mut point = self.storage.unit_coordinate(i);
                self.storage.bounding_box().to_real_coordinate_in_place(&mut point);
                self.values.extend(eval_fun(&point));
            }
            self.hierarchize(op)?;
            iteration += 1;
            if iteration == max_iterations
            {
                break;
            }
        }
        self.sort();
        Ok(())
    }

    ///
    /// Coarsening loop: keeps removing below-threshold leaves (and
    /// compacting the coefficient vectors) until a pass removes nothing.
    /// Returns the total number of removed points.
    ///
    pub fn coarsen(&mut self, functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<usize, GridError>
    {
        let mut total_num_removed = 0;
        loop
        {
            let last_num_removed = self.coarsen_iteration(functor, options)?;
            total_num_removed += last_num_removed;
            if last_num_removed == 0
            {
                break;
            }
        }
        Ok(total_num_removed)
    }

    fn coarsen_iteration(&mut self, functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<usize, GridError>
    {
        let num_outputs = self.storage.num_outputs();
        let kept = coarsening::coarsen(&mut self.storage, functor, &self.alpha, &self.values, options)?;
        let mut removed = 0;
        if kept.len() * num_outputs != self.alpha.len()
        {
            let mut new_alpha = Vec::with_capacity(kept.len() * num_outputs);
            let mut new_values = Vec::with_capacity(kept.len() * num_outputs);
            for &i in &kept
            {
                new_alpha.extend_from_slice(&self.alpha[i * num_outputs..(i + 1) * num_outputs]);
                new_values.extend_from_slice(&self.values[i * num_outputs..(i + 1) * num_outputs]);
            }
            removed = (self.alpha.len() - new_alpha.len()) / num_outputs;
            self.alpha = new_alpha;
            self.values = new_values;
        }
        Ok(removed)
    }

    ///
    /// Writes the full grid (storage, values, surpluses) in the chosen
    /// format.
    ///
    pub fn write(&self, path: &str, format: crate::serialization::SerializationFormat) -> Result<(), GridError>
    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_| GridError::FileIOError)?);
        let buffer = crate::serialization::serialize(self, format)?;
        file.write_all(&buffer).map_err(|_| GridError::WriteBufferFailed)?;
        Ok(())
    }

    pub fn read_buffer(buffer: &[u8], format: crate::serialization::SerializationFormat) -> Result<Self, GridError>
    {
        crate::serialization::deserialize(buffer, format)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader, format: crate::serialization::SerializationFormat) -> Result<Self, GridError>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|_| GridError::ReadBufferFailed)?;
        Self::read_buffer(&bytes, format)
    }
}
