use crate::algorithms::sweep::{self, SweepFunction};
use crate::errors::GridError;
use crate::iterators::grid_iterator::{GridIterator, HashGridIterator};
use crate::storage::GridStorage;

///
/// Transform between the nodal representation (function values) and the
/// hierarchical representation (surplus coefficients), applied axis by axis
/// over the storage's algorithmic dimensions. Both directions run in place
/// on one interleaved buffer.
///
pub trait HierarchisationOperation: Copy
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage) -> Result<(), GridError>;
    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage) -> Result<(), GridError>;
}

///
/// Linear no-boundary hierarchisation: the surplus is the nodal value minus
/// the midpoint of the two inherited interval end values.
///
pub struct LinearHierarchisation;

impl LinearHierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let fm = values[seq * n..(seq + 1) * n].to_vec();
            if !iterator.is_leaf()
            {
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, fl, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fm, fr);
                }
                iterator.up(dim);
            }
            for i in 0..n
            {
                values[seq * n + i] = fm[i] - 0.5 * (fl[i] + fr[i]);
            }
        }
    }
}

impl SweepFunction for LinearHierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let left = vec![0.0; storage.num_outputs()];
        let right = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, dim_sweep, &left, &right);
        Ok(())
    }
}

pub struct LinearDehierarchisation;

impl LinearDehierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let mut fm = values[seq * n..(seq + 1) * n].to_vec();
            for i in 0..n
            {
                fm[i] += 0.5 * (fl[i] + fr[i]);
            }
            values[seq * n..(seq + 1) * n].copy_from_slice(&fm);
            if !iterator.is_leaf()
            {
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, fl, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fm, fr);
                }
                iterator.up(dim);
            }
        }
    }
}

impl SweepFunction for LinearDehierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let zero = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, dim_sweep, &zero, &zero);
        Ok(())
    }
}

///
/// Boundary variant: the level-0 values bound the interior recursion. The
/// boundary points themselves carry their nodal values as surpluses.
///
pub struct LinearBoundaryHierarchisation;

impl SweepFunction for LinearBoundaryHierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let n = storage.num_outputs();
        iterator.reset_to_left_level_zero(dim_sweep);
        let seq_left = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
        let left_boundary = values[seq_left * n..(seq_left + 1) * n].to_vec();
        iterator.reset_to_right_level_zero(dim_sweep);
        let seq_right = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
        let right_boundary = values[seq_right * n..(seq_right + 1) * n].to_vec();
        if !iterator.is_leaf()
        {
            iterator.reset_to_level_one(dim_sweep);
            if iterator.seq().is_some()
            {
                LinearHierarchisation::recurse(values, iterator, dim_sweep, &left_boundary, &right_boundary);
            }
            iterator.reset_to_left_level_zero(dim_sweep);
        }
        Ok(())
    }
}

pub struct LinearBoundaryDehierarchisation;

impl SweepFunction for LinearBoundaryDehierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let n = storage.num_outputs();
        iterator.reset_to_left_level_zero(dim_sweep);
        let seq_left = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
        let left_boundary = values[seq_left * n..(seq_left + 1) * n].to_vec();
        iterator.reset_to_right_level_zero(dim_sweep);
        let seq_right = iterator.seq().ok_or(GridError::InvalidIteratorSequence)?;
        let right_boundary = values[seq_right * n..(seq_right + 1) * n].to_vec();
        if !iterator.is_leaf()
        {
            iterator.reset_to_level_one(dim_sweep);
            if iterator.seq().is_some()
            {
                LinearDehierarchisation::recurse(values, iterator, dim_sweep, &left_boundary, &right_boundary);
            }
            iterator.reset_to_left_level_zero(dim_sweep);
        }
        Ok(())
    }
}

///
/// Modified-linear recurrence. Interior nodes hierarchise like the plain
/// hat functions; the leftmost/rightmost node of each level extrapolates,
/// so the interval end value handed to an edge child accumulates twice the
/// edge surplus (the modified edge function has value 2 at the boundary),
/// and the level-1 constant propagates its nodal value to both ends.
///
pub struct ModifiedLinearHierarchisation;

impl ModifiedLinearHierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let level = iterator.point().level[dim];
            let index = iterator.point().index[dim];
            let fm = values[seq * n..(seq + 1) * n].to_vec();
            let mut alpha = vec![0.0; n];
            for i in 0..n
            {
                alpha[i] = if level == 1 { fm[i] } else { fm[i] - 0.5 * (fl[i] + fr[i]) };
            }
            if !iterator.is_leaf()
            {
                let mut fl_down = fl.to_vec();
                let mut fr_down = fr.to_vec();
                if level == 1
                {
                    fl_down.copy_from_slice(&fm);
                    fr_down.copy_from_slice(&fm);
                }
                else if index == 1
                {
                    for i in 0..n
                    {
                        fl_down[i] += 2.0 * alpha[i];
                    }
                }
                else if index == (1u32 << level) - 1
                {
                    for i in 0..n
                    {
                        fr_down[i] += 2.0 * alpha[i];
                    }
                }
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fl_down, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fm, &fr_down);
                }
                iterator.up(dim);
            }
            values[seq * n..(seq + 1) * n].copy_from_slice(&alpha);
        }
    }
}

impl SweepFunction for ModifiedLinearHierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let left = vec![0.0; storage.num_outputs()];
        let right = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, dim_sweep, &left, &right);
        Ok(())
    }
}

pub struct ModifiedLinearDehierarchisation;

impl ModifiedLinearDehierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let level = iterator.point().level[dim];
            let index = iterator.point().index[dim];
            let alpha = values[seq * n..(seq + 1) * n].to_vec();
            let mut fm = vec![0.0; n];
            for i in 0..n
            {
                fm[i] = if level == 1 { alpha[i] } else { alpha[i] + 0.5 * (fl[i] + fr[i]) };
            }
            values[seq * n..(seq + 1) * n].copy_from_slice(&fm);
            if !iterator.is_leaf()
            {
                let mut fl_down = fl.to_vec();
                let mut fr_down = fr.to_vec();
                if level == 1
                {
                    fl_down.copy_from_slice(&fm);
                    fr_down.copy_from_slice(&fm);
                }
                else if index == 1
                {
                    for i in 0..n
                    {
                        fl_down[i] += 2.0 * alpha[i];
                    }
                }
                else if index == (1u32 << level) - 1
                {
                    for i in 0..n
                    {
                        fr_down[i] += 2.0 * alpha[i];
                    }
                }
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fl_down, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, dim, &fm, &fr_down);
                }
                iterator.up(dim);
            }
        }
    }
}

impl SweepFunction for ModifiedLinearDehierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let zero = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, dim_sweep, &zero, &zero);
        Ok(())
    }
}

///
/// Stretched-grid recurrence: the dyadic midpoint rule is replaced by the
/// position-weighted interpolation between the bounding ancestors, with
/// positions taken from the stretching transform.
///
pub struct StretchedLinearHierarchisation;

impl StretchedLinearHierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, stretching: &crate::stretching::Stretching, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let level = iterator.point().level[dim] as i32;
            let index = iterator.point().index[dim];
            let fm = values[seq * n..(seq + 1) * n].to_vec();
            if !iterator.is_leaf()
            {
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, stretching, dim, fl, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, stretching, dim, &fm, fr);
                }
                iterator.up(dim);
            }
            let (posc, posl, posr) = stretching.adjacent_positions(level, index, dim);
            let weight = (posc - posl) / (posr - posl);
            for i in 0..n
            {
                values[seq * n + i] = fm[i] - (fl[i] + (fr[i] - fl[i]) * weight);
            }
        }
    }
}

impl SweepFunction for StretchedLinearHierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let stretching = storage.stretching().ok_or(GridError::UnsupportedOperation)?;
        let left = vec![0.0; storage.num_outputs()];
        let right = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, stretching, dim_sweep, &left, &right);
        Ok(())
    }
}

pub struct StretchedLinearDehierarchisation;

impl StretchedLinearDehierarchisation
{
    fn recurse(values: &mut [f64], iterator: &mut HashGridIterator, stretching: &crate::stretching::Stretching, dim: usize, fl: &[f64], fr: &[f64])
    {
        if let Some(seq) = iterator.seq()
        {
            let n = fl.len();
            let level = iterator.point().level[dim] as i32;
            let index = iterator.point().index[dim];
            let (posc, posl, posr) = stretching.adjacent_positions(level, index, dim);
            let weight = (posc - posl) / (posr - posl);
            let mut fm = values[seq * n..(seq + 1) * n].to_vec();
            for i in 0..n
            {
                fm[i] += fl[i] + (fr[i] - fl[i]) * weight;
            }
            values[seq * n..(seq + 1) * n].copy_from_slice(&fm);
            if !iterator.is_leaf()
            {
                iterator.left_child(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, stretching, dim, fl, &fm);
                }
                iterator.step_right(dim);
                if iterator.seq().is_some()
                {
                    Self::recurse(values, iterator, stretching, dim, &fm, fr);
                }
                iterator.up(dim);
            }
        }
    }
}

impl SweepFunction for StretchedLinearDehierarchisation
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError> {
        let stretching = storage.stretching().ok_or(GridError::UnsupportedOperation)?;
        let zero = vec![0.0; storage.num_outputs()];
        Self::recurse(values, iterator, stretching, dim_sweep, &zero, &zero);
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct LinearHierarchisationOperation;

impl HierarchisationOperation for LinearHierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = LinearHierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, node_values, d)?;
        }
        Ok(())
    }

    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = LinearDehierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, alpha, d)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct LinearBoundaryHierarchisationOperation;

impl HierarchisationOperation for LinearBoundaryHierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = LinearBoundaryHierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d_boundary(&mut func, storage, node_values, d)?;
        }
        Ok(())
    }

    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = LinearBoundaryDehierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d_boundary(&mut func, storage, alpha, d)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct ModifiedLinearHierarchisationOperation;

impl HierarchisationOperation for ModifiedLinearHierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = ModifiedLinearHierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, node_values, d)?;
        }
        Ok(())
    }

    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = ModifiedLinearDehierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, alpha, d)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct StretchedLinearHierarchisationOperation;

impl HierarchisationOperation for StretchedLinearHierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = StretchedLinearHierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, node_values, d)?;
        }
        Ok(())
    }

    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage) -> Result<(), GridError> {
        let mut func = StretchedLinearDehierarchisation;
        for d in storage.algorithmic_dimensions().to_vec()
        {
            sweep::sweep_1d(&mut func, storage, alpha, d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::GridPoint;
    use crate::stretching::{Stretching, Stretching1D};

    ///
    /// 1D, level 2, no boundary: three points at 0.5, 0.25, 0.75.
    /// Hierarchising the constant 1 leaves all weight on the root.
    ///
    #[test]
    fn surpluses_of_the_level_two_line()
    {
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[2], None).unwrap();
        assert_eq!(storage.len(), 3);
        let root = storage.sequence_number(&GridPoint::new(&[1], &[1], false)).unwrap();
        let left = storage.sequence_number(&GridPoint::new(&[2], &[1], false)).unwrap();
        let right = storage.sequence_number(&GridPoint::new(&[2], &[3], false)).unwrap();
        let mut values = vec![0.0; 3];
        values[root] = 1.0;
        values[left] = 0.5;
        values[right] = 0.5;
        LinearHierarchisationOperation.hierarchize(&mut values, &storage).unwrap();
        assert_eq!(values[root], 1.0);
        assert_eq!(values[left], 0.0);
        assert_eq!(values[right], 0.0);
    }

    fn test_function(p: &[f64]) -> f64
    {
        let mut v = 1.0;
        for (d, x) in p.iter().enumerate()
        {
            v *= (x + 0.3).sin() + 0.1 * (d as f64 + 1.0) * x;
        }
        v
    }

    fn round_trip<OP: HierarchisationOperation>(storage: &GridStorage, op: OP)
    {
        let nodal: Vec<f64> = (0..storage.len()).flat_map(|seq|
        {
            let p = storage.unit_coordinate(seq);
            vec![test_function(&p), 2.0 * test_function(&p) - 0.25]
        }).collect();
        let mut buffer = nodal.clone();
        op.hierarchize(&mut buffer, storage).unwrap();
        op.dehierarchize(&mut buffer, storage).unwrap();
        for (a, b) in buffer.iter().zip(nodal.iter())
        {
            assert!((a - b).abs() <= 1e-12 * (1.0 + b.abs()), "{} != {}", a, b);
        }
    }

    #[test]
    fn linear_round_trip()
    {
        let mut storage = GridStorage::new(3, 2);
        crate::generators::regular(&mut storage, &[4, 4, 4], None).unwrap();
        round_trip(&storage, LinearHierarchisationOperation);
    }

    #[test]
    fn linear_boundary_round_trip()
    {
        let mut storage = GridStorage::new(2, 2);
        crate::generators::regular_with_boundaries(&mut storage, &[4, 4], Some(1), None).unwrap();
        round_trip(&storage, LinearBoundaryHierarchisationOperation);
    }

    #[test]
    fn modified_linear_round_trip()
    {
        let mut storage = GridStorage::new(2, 2);
        crate::generators::regular(&mut storage, &[5, 5], None).unwrap();
        round_trip(&storage, ModifiedLinearHierarchisationOperation);
    }

    #[test]
    fn stretched_round_trip()
    {
        let mut storage = GridStorage::new(2, 2);
        crate::generators::regular(&mut storage, &[4, 4], None).unwrap();
        let stretching = Stretching::new(vec![
            Stretching1D::log(1.0, 10.0),
            Stretching1D::sinh(0.0, 1.0, 0.4, 4.0),
        ]).unwrap();
        storage.set_stretching(stretching);
        round_trip(&storage, StretchedLinearHierarchisationOperation);
    }

    #[test]
    fn stretched_op_requires_stretching()
    {
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[2], None).unwrap();
        let mut values = vec![1.0; 3];
        assert_eq!(StretchedLinearHierarchisationOperation.hierarchize(&mut values, &storage), Err(GridError::UnsupportedOperation));
    }

    ///
    /// On a uniform axis the stretched recurrence reduces to the dyadic
    /// midpoint rule.
    ///
    #[test]
    fn stretched_id_matches_linear()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[4, 4], None).unwrap();
        let nodal: Vec<f64> = (0..storage.len()).map(|seq| test_function(&storage.unit_coordinate(seq))).collect();
        let mut linear = nodal.clone();
        LinearHierarchisationOperation.hierarchize(&mut linear, &storage).unwrap();
        let mut stretched_storage = storage.clone();
        stretched_storage.set_stretching(Stretching::new(vec![Stretching1D::id(0.0, 1.0); 2]).unwrap());
        let mut stretched = nodal.clone();
        StretchedLinearHierarchisationOperation.hierarchize(&mut stretched, &stretched_storage).unwrap();
        for (a, b) in stretched.iter().zip(linear.iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
    }

    ///
    /// The per-axis sweeps commute: hierarchising is independent of the
    /// dimension order.
    ///
    #[test]
    fn sweep_order_does_not_matter()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[4, 4], None).unwrap();
        let nodal: Vec<f64> = (0..storage.len()).map(|seq| test_function(&storage.unit_coordinate(seq))).collect();
        let mut forward = nodal.clone();
        LinearHierarchisationOperation.hierarchize(&mut forward, &storage).unwrap();
        let mut reversed_storage = storage.clone();
        reversed_storage.set_algorithmic_dimensions(vec![1, 0]);
        let mut reversed = nodal.clone();
        LinearHierarchisationOperation.hierarchize(&mut reversed, &reversed_storage).unwrap();
        for (a, b) in forward.iter().zip(reversed.iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
