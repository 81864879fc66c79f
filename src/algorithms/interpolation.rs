use num_traits::Float;

use crate::basis::base::Basis;
use crate::errors::GridError;
use crate::iterators::grid_iterator::GridIterator;

use super::basis_evaluation::BasisEvaluation;

///
/// Routes evaluation through the boundary-aware or interior descent,
/// depending on whether the grid carries level-0 points.
///
pub(crate) struct InterpolationOperation<'a, B: Basis>(pub bool, pub BasisEvaluation<'a, B>);

impl<B: Basis> InterpolationOperation<'_, B>
{
    #[inline]
    pub(crate) fn interpolate<T: Float + std::ops::AddAssign, It: GridIterator>(&self, x: &[f64], alpha: &[T], iterator: &mut It, result: &mut [T]) -> Result<(), GridError>
    {
        if self.0
        {
            if !self.1.storage.bounding_box.contains(x)
            {
                return Err(GridError::OutOfDomain);
            }
            iterator.reset_to_level_zero();
            let unit = self.1.storage.bounding_box.to_unit_coordinate(x);
            for r in result.iter_mut()
            {
                *r = T::zero();
            }
            self.1.eval_boundary(&unit, 0, T::one(), iterator, alpha, result)
        }
        else
        {
            self.1.eval(x, alpha, iterator, result)
        }
    }
}
