use crate::errors::GridError;
use crate::iterators::grid_iterator::{GridIterator, HashGridIterator};
use crate::storage::GridStorage;

///
/// A 1D transform applied along a single axis. `execute` runs the full
/// recursion along `dim_sweep` starting at the iterator's current position;
/// the sweep driver below takes care of visiting every position in the
/// remaining axes. Values are interleaved with `num_outputs` stride.
///
pub trait SweepFunction
{
    fn execute(&mut self, values: &mut [f64], iterator: &mut HashGridIterator, storage: &GridStorage, dim_sweep: usize) -> Result<(), GridError>;
}

///
/// Descends on all axes in `dim_list` besides the sweep axis, executing the
/// functor once per reachable position. Axes at level 0 are not visited
/// (no-boundary skeleton).
///
fn sweep_rec<F: SweepFunction>(function: &mut F, storage: &GridStorage, values: &mut [f64], iterator: &mut HashGridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize) -> Result<(), GridError>
{
    function.execute(values, iterator, storage, dim_sweep)?;
    for d in 0..dim_rem
    {
        let cur_dim = dim_list[d];
        if iterator.is_leaf()
        {
            continue;
        }
        iterator.left_child(cur_dim);
        if iterator.seq().is_some()
        {
            sweep_rec(function, storage, values, iterator, dim_list, d + 1, dim_sweep)?;
        }
        iterator.step_right(cur_dim);
        if iterator.seq().is_some()
        {
            sweep_rec(function, storage, values, iterator, dim_list, d + 1, dim_sweep)?;
        }
        iterator.up(cur_dim);
    }
    Ok(())
}

///
/// Boundary-aware descent: level-0 axes visit the left boundary, the right
/// boundary, and then enter the interior through the level-1 midpoint.
///
fn sweep_boundary_rec<F: SweepFunction>(function: &mut F, storage: &GridStorage, values: &mut [f64], iterator: &mut HashGridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize) -> Result<(), GridError>
{
    if dim_rem == 0
    {
        function.execute(values, iterator, storage, dim_sweep)?;
    }
    else
    {
        let d = dim_list[dim_rem - 1];
        let current_level = iterator.point().level[d];
        if current_level > 0
        {
            sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem - 1, dim_sweep)?;
            if !iterator.is_leaf()
            {
                iterator.left_child(d);
                if iterator.seq().is_some()
                {
                    sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem, dim_sweep)?;
                }
                iterator.step_right(d);
                if iterator.seq().is_some()
                {
                    sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem, dim_sweep)?;
                }
                iterator.up(d);
            }
        }
        else
        {
            sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem - 1, dim_sweep)?;
            iterator.reset_to_right_level_zero(d);
            sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem - 1, dim_sweep)?;
            if !iterator.is_leaf()
            {
                iterator.reset_to_level_one(d);
                if iterator.seq().is_some()
                {
                    sweep_boundary_rec(function, storage, values, iterator, dim_list, dim_rem, dim_sweep)?;
                }
            }
            iterator.reset_to_left_level_zero(d);
        }
    }
    Ok(())
}

///
/// All axes except the sweep axis: the descent must reach every stored
/// position even when only a subset of axes is being transformed.
///
fn dim_list(storage: &GridStorage, dim_sweep: usize) -> Vec<usize>
{
    (0..storage.num_inputs()).filter(|&d| d != dim_sweep).collect()
}

///
/// One full sweep of `function` along `dim_sweep` over the whole grid,
/// without boundaries.
///
pub fn sweep_1d<F: SweepFunction>(function: &mut F, storage: &GridStorage, values: &mut [f64], dim_sweep: usize) -> Result<(), GridError>
{
    let dims = dim_list(storage, dim_sweep);
    let mut iterator = HashGridIterator::new(storage);
    iterator.reset_to_root();
    sweep_rec(function, storage, values, &mut iterator, &dims, dims.len(), dim_sweep)
}

///
/// One full sweep of `function` along `dim_sweep` over the whole grid,
/// visiting boundary points.
///
pub fn sweep_1d_boundary<F: SweepFunction>(function: &mut F, storage: &GridStorage, values: &mut [f64], dim_sweep: usize) -> Result<(), GridError>
{
    let dims = dim_list(storage, dim_sweep);
    let mut iterator = HashGridIterator::new(storage);
    iterator.reset_to_level_zero();
    sweep_boundary_rec(function, storage, values, &mut iterator, &dims, dims.len(), dim_sweep)
}
