use crate::basis::base::Basis;
use crate::errors::GridError;
use crate::storage::GridStorage;

///
/// Brute-force dataset evaluation: `mult` applies the sparse-grid operator
/// to a coefficient vector, `mult_transpose` its exact adjoint. Both walk
/// every (dataset row, grid point) pair and share one per-dimension basis
/// evaluation, so the pair stays a true matrix transpose — conjugate
/// gradient solvers built on top rely on that. Cost is O(m * n * d).
///
pub struct MultipleEvalOperation<'a, B: Basis>
{
    pub storage: &'a GridStorage,
    pub basis: B,
}

impl<'a, B: Basis + Sync> MultipleEvalOperation<'a, B>
{
    pub fn new(storage: &'a GridStorage, basis: B) -> Self
    {
        Self { storage, basis }
    }

    ///
    /// Tensor-product basis value of grid point `seq` at the unit
    /// coordinate `x`. Zero outside the support.
    ///
    #[inline]
    fn basis_product(&self, seq: usize, x: &[f64]) -> f64
    {
        let mut product = 1.0;
        for d in 0..self.storage.num_inputs()
        {
            product *= self.basis.eval(self.storage.level(seq, d) as u32, self.storage.index(seq, d), x[d]);
            if product == 0.0
            {
                return 0.0;
            }
        }
        product
    }

    fn check_dataset(&self, dataset: &[f64]) -> Result<usize, GridError>
    {
        if self.storage.num_inputs() == 0 || dataset.len() % self.storage.num_inputs() != 0
        {
            return Err(GridError::InvalidIndex);
        }
        Ok(dataset.len() / self.storage.num_inputs())
    }

    ///
    /// `result[j] = sum_i alpha[i] * phi_i(x_j)` for every dataset row `j`.
    /// `dataset` is row-major with `num_inputs` stride (real coordinates);
    /// `result` has `num_outputs` stride per row.
    ///
    pub fn mult(&self, alpha: &[f64], dataset: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        let rows = self.check_dataset(dataset)?;
        let n = self.storage.len();
        let num_outputs = self.storage.num_outputs();
        if alpha.len() != n * num_outputs || result.len() != rows * num_outputs
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        let row_eval = |x: &[f64], out: &mut [f64]|
        {
            let unit = self.storage.bounding_box.to_unit_coordinate(x);
            out.fill(0.0);
            for seq in 0..n
            {
                let phi = self.basis_product(seq, &unit);
                if phi != 0.0
                {
                    #[allow(clippy::needless_range_loop)]
                    for o in 0..num_outputs
                    {
                        out[o] += alpha[seq * num_outputs + o] * phi;
                    }
                }
            }
        };
        #[cfg(feature = "rayon")]
        {
            use rayon::iter::{IndexedParallelIterator, ParallelIterator};
            use rayon::slice::{ParallelSlice, ParallelSliceMut};
            dataset.par_chunks_exact(self.storage.num_inputs())
                .zip(result.par_chunks_exact_mut(num_outputs))
                .for_each(|(x, out)| row_eval(x, out));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (x, out) in dataset.chunks_exact(self.storage.num_inputs()).zip(result.chunks_exact_mut(num_outputs))
            {
                row_eval(x, out);
            }
        }
        Ok(())
    }

    ///
    /// Adjoint accumulation into coefficient space:
    /// `result[i] = sum_j source[j] * phi_i(x_j)`.
    ///
    pub fn mult_transpose(&self, source: &[f64], dataset: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        let rows = self.check_dataset(dataset)?;
        let n = self.storage.len();
        let num_outputs = self.storage.num_outputs();
        if source.len() != rows * num_outputs || result.len() != n * num_outputs
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        let units: Vec<f64> = dataset.chunks_exact(self.storage.num_inputs())
            .flat_map(|x| self.storage.bounding_box.to_unit_coordinate(x))
            .collect();
        let point_eval = |seq: usize, out: &mut [f64]|
        {
            out.fill(0.0);
            for (j, x) in units.chunks_exact(self.storage.num_inputs()).enumerate()
            {
                let phi = self.basis_product(seq, x);
                if phi != 0.0
                {
                    #[allow(clippy::needless_range_loop)]
                    for o in 0..num_outputs
                    {
                        out[o] += source[j * num_outputs + o] * phi;
                    }
                }
            }
        };
        #[cfg(feature = "rayon")]
        {
            use rayon::iter::{IndexedParallelIterator, ParallelIterator};
            use rayon::slice::ParallelSliceMut;
            result.par_chunks_exact_mut(num_outputs)
                .enumerate()
                .for_each(|(seq, out)| point_eval(seq, out));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (seq, out) in result.chunks_exact_mut(num_outputs).enumerate()
            {
                point_eval(seq, out);
            }
        }
        Ok(())
    }

    ///
    /// Single-point evaluation through the same basis product as `mult`.
    ///
    pub fn eval(&self, alpha: &[f64], x: &[f64], result: &mut [f64]) -> Result<(), GridError>
    {
        self.mult(alpha, x, result)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::basis::linear::LinearBasis;

    fn dot(a: &[f64], b: &[f64]) -> f64
    {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    ///
    /// Deterministic pseudo-random values, good enough for adjointness.
    ///
    fn pseudo_random(n: usize, seed: u64) -> Vec<f64>
    {
        let mut state = seed;
        (0..n).map(|_|
        {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        }).collect()
    }

    #[test]
    fn mult_and_transpose_are_adjoint()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[4, 4], None).unwrap();
        let n = storage.len();
        let m = 23;
        let dataset: Vec<f64> = pseudo_random(m * 2, 7).iter().map(|v| v + 0.5).collect();
        let alpha = pseudo_random(n, 11);
        let beta = pseudo_random(m, 13);
        let op = MultipleEvalOperation::new(&storage, LinearBasis);
        let mut ax = vec![0.0; m];
        op.mult(&alpha, &dataset, &mut ax).unwrap();
        let mut aty = vec![0.0; n];
        op.mult_transpose(&beta, &dataset, &mut aty).unwrap();
        let lhs = dot(&ax, &beta);
        let rhs = dot(&alpha, &aty);
        assert!((lhs - rhs).abs() < 1e-12 * (1.0 + lhs.abs()), "{} != {}", lhs, rhs);
    }

    #[test]
    fn mult_matches_descent_interpolation()
    {
        use crate::algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation};
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[5, 5], None).unwrap();
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq|
        {
            let p = storage.unit_coordinate(seq);
            libm::erf(2.0 * (p[0] - 0.5)) + p[1]
        }).collect();
        let nodal = alpha.clone();
        LinearHierarchisationOperation.hierarchize(&mut alpha, &storage).unwrap();
        let op = MultipleEvalOperation::new(&storage, LinearBasis);
        // brute-force eval reproduces the nodal values at the grid points
        let dataset: Vec<f64> = (0..storage.len()).flat_map(|seq| storage.unit_coordinate(seq)).collect();
        let mut result = vec![0.0; storage.len()];
        op.mult(&alpha, &dataset, &mut result).unwrap();
        for (a, b) in result.iter().zip(nodal.iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
        // and agrees with the descent-based evaluation off the nodes
        use crate::algorithms::basis_evaluation::BasisEvaluation;
        use crate::iterators::grid_iterator::HashGridIterator;
        let eval = BasisEvaluation { storage: &storage, basis: LinearBasis };
        for x in [[0.21, 0.83], [0.5, 0.125], [0.999, 0.001]]
        {
            let mut brute = [0.0];
            op.mult(&alpha, &x, &mut brute).unwrap();
            let mut descent = [0.0];
            let mut iterator = HashGridIterator::new(&storage);
            eval.eval(&x, &alpha, &mut iterator, &mut descent).unwrap();
            assert!((brute[0] - descent[0]).abs() < 1e-12, "{} != {}", brute[0], descent[0]);
        }
    }

    #[test]
    fn mult_rejects_mismatched_shapes()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[2, 2], None).unwrap();
        let op = MultipleEvalOperation::new(&storage, LinearBasis);
        let alpha = vec![0.0; storage.len() + 1];
        let dataset = vec![0.5, 0.5];
        let mut result = vec![0.0; 1];
        assert_eq!(op.mult(&alpha, &dataset, &mut result), Err(GridError::NumberOfPointsAndValuesMismatch));
    }
}
