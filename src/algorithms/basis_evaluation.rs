use num_traits::Float;

use crate::basis::base::Basis;
use crate::errors::GridError;
use crate::iterators::grid_iterator::GridIterator;
use crate::storage::GridStorage;

///
/// Descent-based evaluation of the sparse-grid interpolant: per dimension,
/// walk down the 1D hierarchy towards the evaluation point, multiplying the
/// basis values along the path. Only the basis functions whose support
/// contains the point contribute, so the work per dimension is bounded by
/// the maximum level instead of the number of grid points.
///
pub struct BasisEvaluation<'a, B: Basis>
{
    pub storage: &'a GridStorage,
    pub basis: B,
}

impl<B: Basis> BasisEvaluation<'_, B>
{
    fn recursive_eval<It: GridIterator, T: Float + std::ops::AddAssign>(&self, x: &[f64], current_dim: usize,
        value: T, iterator: &mut It, alpha: &[T], result: &mut [T]) -> Result<(), GridError>
    {
        let ndim = self.storage.num_inputs();
        let num_outputs = self.storage.num_outputs();
        let mut level = 1u32;
        loop
        {
            let work_index = iterator.point_index(current_dim);
            let val = T::from(self.basis.eval(level, work_index, x[current_dim])).ok_or(GridError::InvalidIteratorSequence)? * value;
            if current_dim == ndim - 1
            {
                let node_index = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
                #[allow(clippy::needless_range_loop)]
                for i in 0..num_outputs
                {
                    result[i] += alpha[node_index * num_outputs + i] * val;
                }
            }
            else
            {
                self.recursive_eval(x, current_dim + 1, val, iterator, alpha, result)?;
            }
            if iterator.is_leaf()
            {
                break;
            }
            // descend towards the evaluation point; an exact hit on the
            // node means no deeper function is non-zero
            let x_coord = work_index as f64 / (1u64 << level) as f64;
            if (x[current_dim] - x_coord).abs() < 1e-15
            {
                break;
            }
            if x[current_dim] > x_coord
            {
                if !iterator.right_child(current_dim)
                {
                    break;
                }
            }
            else if !iterator.left_child(current_dim)
            {
                break;
            }
            level += 1;
        }
        iterator.reset_to_level_one(current_dim);
        Ok(())
    }

    ///
    /// Evaluates `sum_i alpha_i phi_i(x)` at a real-coordinate point, for
    /// grids without boundary points.
    ///
    pub fn eval<It: GridIterator, T: Float + std::ops::AddAssign>(&self, x: &[f64], alpha: &[T],
        iterator: &mut It, result: &mut [T]) -> Result<(), GridError>
    {
        if !self.storage.bounding_box.contains(x)
        {
            return Err(GridError::OutOfDomain);
        }
        let unit = self.storage.bounding_box.to_unit_coordinate(x);
        for r in result.iter_mut()
        {
            *r = T::zero();
        }
        for d in 0..self.storage.num_inputs()
        {
            iterator.reset_to_level_one(d);
        }
        self.recursive_eval(&unit, 0, T::one(), iterator, alpha, result)
    }

    ///
    /// Boundary-aware evaluation: level 0 contributes the two boundary
    /// functions of each axis before the interior descent.
    ///
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn eval_boundary<It: GridIterator, T: Float + std::ops::AddAssign>(&self, x: &[f64], dim: usize,
        value: T, iterator: &mut It, alpha: &[T], result: &mut [T]) -> Result<(), GridError>
    {
        let ndim = self.storage.num_inputs();
        let num_outputs = self.storage.num_outputs();
        let mut level = 0u32;
        loop
        {
            if level > 0
            {
                let work_index = iterator.point_index(dim);
                let new_value = T::from(self.basis.eval(level, work_index, x[dim])).ok_or(GridError::InvalidIteratorSequence)?;
                if dim == ndim - 1
                {
                    let node_index = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
                    #[allow(clippy::needless_range_loop)]
                    for i in 0..num_outputs
                    {
                        result[i] += alpha[node_index * num_outputs + i] * value * new_value;
                    }
                }
                else
                {
                    self.eval_boundary(x, dim + 1, value * new_value, iterator, alpha, result)?;
                }
            }
            else
            {
                // coarsening may have removed a boundary node, so both
                // resets check for existence
                if iterator.reset_to_left_level_zero(dim)
                {
                    let seq_l = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
                    let new_value = T::from(self.basis.eval(0, 0, x[dim])).ok_or(GridError::InvalidIteratorSequence)?;
                    if dim == ndim - 1
                    {
                        #[allow(clippy::needless_range_loop)]
                        for i in 0..num_outputs
                        {
                            result[i] += alpha[seq_l * num_outputs + i] * value * new_value;
                        }
                    }
                    else
                    {
                        self.eval_boundary(x, dim + 1, value * new_value, iterator, alpha, result)?;
                    }
                }
                if iterator.reset_to_right_level_zero(dim)
                {
                    let seq_r = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
                    let new_value = T::from(self.basis.eval(0, 1, x[dim])).ok_or(GridError::InvalidIteratorSequence)?;
                    if dim == ndim - 1
                    {
                        #[allow(clippy::needless_range_loop)]
                        for i in 0..num_outputs
                        {
                            result[i] += alpha[seq_r * num_outputs + i] * value * new_value;
                        }
                    }
                    else
                    {
                        self.eval_boundary(x, dim + 1, value * new_value, iterator, alpha, result)?;
                    }
                }
            }
            if iterator.is_leaf()
            {
                break;
            }
            if level > 0
            {
                let work_index = iterator.point_index(dim);
                let x_coord = work_index as f64 / (1u64 << level) as f64;
                if (x[dim] - x_coord).abs() < 1e-15
                {
                    break;
                }
                if x[dim] > x_coord
                {
                    if !iterator.right_child(dim)
                    {
                        break;
                    }
                }
                else if !iterator.left_child(dim)
                {
                    break;
                }
            }
            else
            {
                if x[dim].abs() < 1e-15 || (x[dim] - 1.0).abs() < 1e-15
                {
                    break;
                }
                if !iterator.reset_to_level_one(dim)
                {
                    break;
                }
            }
            level += 1;
        }
        iterator.reset_to_left_level_zero(dim);
        Ok(())
    }
}
