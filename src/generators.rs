use crate::errors::GridError;
use crate::storage::{GridPoint, GridStorage};

///
/// Grid construction entry points. Every generator inserts a point's
/// hierarchical ancestors before or together with the point itself, so the
/// ancestor-closure invariant holds after each call; output ordering is
/// deterministic (level-major per axis), which the text serialization and
/// the tests rely on.
///
pub trait Generator: Default
{
    ///
    /// Generates a regular sparse grid of the given levels, without
    /// boundaries. For details about `T`, see pages 8-9 of Griebel and
    /// Knapek's "Optimized Tensor-Product Approximation Spaces".
    ///
    #[allow(non_snake_case)]
    fn regular(&self, storage: &mut GridStorage, levels: &[usize], T: Option<f64>) -> Result<(), GridError>;
    ///
    /// Regular sparse grid where only `clique_size` consecutive dimensions
    /// interact beyond level 1.
    ///
    #[allow(non_snake_case)]
    fn cliques(&self, storage: &mut GridStorage, levels: &[usize], clique_size: usize, T: Option<f64>) -> Result<(), GridError>;
    ///
    /// Full tensor grid of 2^level - 1 points per axis, without boundaries.
    ///
    fn full(&self, storage: &mut GridStorage, level: usize) -> Result<(), GridError>;
    ///
    /// Full tensor grid including the boundary points.
    ///
    fn full_with_boundaries(&self, storage: &mut GridStorage, level: usize) -> Result<(), GridError>;
    ///
    /// Regular sparse grid with boundary points; `boundary_level` truncates
    /// how deep the boundary subgrids are refined.
    ///
    #[allow(non_snake_case)]
    fn regular_with_boundaries(&self, storage: &mut GridStorage, levels: &[usize], boundary_level: Option<usize>, T: Option<f64>) -> Result<(), GridError>;
}

#[derive(Default)]
pub struct RegularGenerator;

impl Generator for RegularGenerator
{
    #[allow(non_snake_case)]
    fn regular(&self, storage: &mut GridStorage, levels: &[usize], T: Option<f64>) -> Result<(), GridError> {
        regular(storage, levels, T)
    }

    #[allow(non_snake_case)]
    fn cliques(&self, storage: &mut GridStorage, levels: &[usize], clique_size: usize, T: Option<f64>) -> Result<(), GridError> {
        cliques(storage, levels, clique_size, T)
    }

    fn full(&self, storage: &mut GridStorage, level: usize) -> Result<(), GridError> {
        full(storage, level)
    }

    fn full_with_boundaries(&self, storage: &mut GridStorage, level: usize) -> Result<(), GridError> {
        full_with_boundaries(storage, level)
    }

    #[allow(non_snake_case)]
    fn regular_with_boundaries(&self, storage: &mut GridStorage, levels: &[usize], boundary_level: Option<usize>, T: Option<f64>) -> Result<(), GridError> {
        regular_with_boundaries(storage, levels, boundary_level, T)
    }
}

///
/// Seeds dimension 0 with the 1D hierarchy up to level `n`.
///
fn seed_first_dimension(storage: &mut GridStorage, n: u32)
{
    let mut point = GridPoint::new(&vec![1; storage.num_inputs()], &vec![1; storage.num_inputs()], false);
    for l in 1..=n
    {
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.level[0] = l as u8;
            point.index[0] = i;
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone());
        }
    }
}

///
/// Generate a regular sparse grid iteratively without boundary points.
/// Dimension 0 is seeded with its full 1D hierarchy; every further
/// dimension extends each existing point with all admissible 1D levels,
/// reusing the point's own slot for the first extension.
///
#[allow(non_snake_case)]
pub fn regular(storage: &mut GridStorage, levels: &[usize], T: Option<f64>) -> Result<(), GridError>
{
    if levels.len() != storage.num_inputs()
    {
        return Err(GridError::LevelLimitsLengthMismatch);
    }
    let t = T.unwrap_or(0.0); // zero gives the standard sparse grid
    seed_first_dimension(storage, levels[0] as u32);
    #[allow(clippy::needless_range_loop)]
    for d in 1..storage.num_inputs()
    {
        let ngrids = storage.len();
        let n = levels[d] as u32;
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            let level_sum = point.level_sum() - 1;
            let level_max = point.level_max() as u32;
            let mut l: u32 = 1;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64
                <= (n + storage.num_inputs() as u32 - 1) as f64 - t * n as f64
                && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.level[d] = l as u8;
                    point.index[d] = i;
                    point.set_is_leaf(l + level_sum == n + storage.num_inputs() as u32 - 1);
                    if !first
                    {
                        storage.insert_point(point.clone());
                    }
                    else
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                }
                l += 1;
            }
        }
    }
    Ok(())
}

///
/// Regular sparse grid restricted so that dimensions of different cliques
/// never interact beyond level 1: when extending dimension `d`, points
/// that already exceed level 1 in a dimension of an earlier clique are
/// skipped.
///
#[allow(non_snake_case)]
pub fn cliques(storage: &mut GridStorage, levels: &[usize], clique_size: usize, T: Option<f64>) -> Result<(), GridError>
{
    if levels.len() != storage.num_inputs()
    {
        return Err(GridError::LevelLimitsLengthMismatch);
    }
    if clique_size == 0
    {
        return Err(GridError::UnsupportedOperation);
    }
    let t = T.unwrap_or(0.0);
    seed_first_dimension(storage, levels[0] as u32);
    #[allow(clippy::needless_range_loop)]
    for d in 1..storage.num_inputs()
    {
        let ngrids = storage.len();
        let n = levels[d] as u32;
        let clique_num = d / clique_size;
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            let outside = (clique_num * clique_size).min(storage.num_inputs());
            if point.level[0..outside].iter().any(|&l| l > 1)
            {
                continue;
            }
            let level_sum = point.level_sum() - 1;
            let level_max = point.level_max() as u32;
            let mut l: u32 = 1;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64
                <= (n + storage.num_inputs() as u32 - 1) as f64 - t * n as f64
                && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.level[d] = l as u8;
                    point.index[d] = i;
                    point.set_is_leaf(l + level_sum == n + storage.num_inputs() as u32 - 1);
                    if !first
                    {
                        storage.insert_point(point.clone());
                    }
                    else
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                }
                l += 1;
            }
        }
    }
    Ok(())
}

///
/// Generate a full tensor grid (exponential in the dimension; intended for
/// small dimensions and testing).
///
pub fn full(storage: &mut GridStorage, level: usize) -> Result<(), GridError>
{
    let n = level as u32;
    seed_first_dimension(storage, n);
    for d in 1..storage.num_inputs()
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            for l in 1..=n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.level[d] = l as u8;
                    point.index[d] = i;
                    point.set_is_leaf(point.level_sum() == n * storage.num_inputs() as u32);
                    if !first
                    {
                        storage.insert_point(point.clone());
                    }
                    else
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                }
            }
        }
    }
    Ok(())
}

pub fn full_with_boundaries(storage: &mut GridStorage, level: usize) -> Result<(), GridError>
{
    let n = level as u32;
    let mut point = GridPoint::new(&vec![1; storage.num_inputs()], &vec![1; storage.num_inputs()], false);
    for l in 1..=n
    {
        if l == 1
        {
            point.level[0] = 0;
            point.index[0] = 0;
            point.set_is_leaf(false);
            storage.insert_point(point.clone());
            point.index[0] = 1;
            storage.insert_point(point.clone());
        }
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.level[0] = l as u8;
            point.index[0] = i;
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone());
        }
    }
    for d in 1..storage.num_inputs()
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            for l in 1..=n
            {
                if l == 1
                {
                    point.level[d] = 0;
                    point.index[d] = 0;
                    point.set_is_leaf(false);
                    storage.update(point.clone(), g)?;
                    point.index[d] = 1;
                    storage.insert_point(point.clone());
                }
                point.level[d] = l as u8;
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.index[d] = i;
                    point.set_is_leaf(point.level_sum() == n * storage.num_inputs() as u32);
                    storage.insert_point(point.clone());
                }
            }
        }
    }
    storage.has_boundary = true;
    Ok(())
}

///
/// Regular sparse grid with boundaries, truncated at `boundary_level`. The
/// admissibility bound for boundary functions shrinks by the number of
/// level-0 components, so deep boundary subgrids only appear when the
/// boundary level allows them.
///
#[allow(non_snake_case)]
pub fn regular_with_boundaries(storage: &mut GridStorage, levels: &[usize], boundary_level: Option<usize>, T: Option<f64>) -> Result<(), GridError>
{
    if levels.len() != storage.num_inputs()
    {
        return Err(GridError::LevelLimitsLengthMismatch);
    }
    let boundary_level = boundary_level.unwrap_or(1) as u32;
    if boundary_level == 0
    {
        return Err(GridError::UnsupportedOperation);
    }
    let t = T.unwrap_or(0.0);
    let n = levels[0] as u32;
    let mut point = GridPoint::new(&vec![1; storage.num_inputs()], &vec![1; storage.num_inputs()], false);

    point.level[0] = 0;
    point.index[0] = 0;
    storage.insert_point(point.clone());
    point.index[0] = 1;
    storage.insert_point(point.clone());
    for l in 1..=n
    {
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.level[0] = l as u8;
            point.index[0] = i;
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone());
        }
    }

    for d in 1..storage.num_inputs()
    {
        let ngrids = storage.len();
        let cur_dim = d as u32 + 1;
        let n = levels[d] as u32;
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            let mut level_sum: u32 = 0;
            let mut num_zero_levels: u32 = 0;
            for j in 0..d
            {
                let lvl = point.level[j] as u32;
                if lvl == 0
                {
                    num_zero_levels += 1;
                }
                level_sum += lvl;
            }

            // boundary functions are admissible while
            // levelSum <= n + curDim - boundaryLevel - (numZeroLevels + 1);
            // the +1 accounts for the new zero entry in dimension d
            let mut first_point = true;
            if level_sum + boundary_level + num_zero_levels < n + cur_dim || num_zero_levels == cur_dim - 1
            {
                point.level[d] = 0;
                point.index[d] = 0;
                point.set_is_leaf(false);
                storage.update(point.clone(), g)?;
                point.index[d] = 1;
                storage.insert_point(point.clone());
                first_point = false;
            }

            let mut upper_bound = if num_zero_levels > 0
            {
                if n + cur_dim < boundary_level + num_zero_levels
                {
                    continue;
                }
                (n + cur_dim - num_zero_levels - boundary_level) as f64
            }
            else
            {
                (n + cur_dim - 1) as f64
            };
            upper_bound -= t * n as f64;

            let level_max = point.level_max() as u32;
            let mut l: u32 = 1;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.level[d] = l as u8;
                    point.index[d] = i;
                    point.set_is_leaf(if l + level_sum == n + storage.num_inputs() as u32 - 1 { num_zero_levels == 0 } else { false });
                    if !first_point
                    {
                        storage.insert_point(point.clone());
                    }
                    else
                    {
                        storage.update(point.clone(), g)?;
                        first_point = false;
                    }
                }
                l += 1;
            }
        }
    }
    storage.has_boundary = true;
    Ok(())
}

#[test]
fn test_regular()
{
    let mut storage = GridStorage::new(2, 1);
    regular(&mut storage, &[3, 3], Some(0.0)).expect("Could not generate grid");
    assert_eq!(storage.len(), 17);
}

#[test]
fn test_regular_1d()
{
    let mut storage = GridStorage::new(1, 1);
    regular(&mut storage, &[2], None).expect("Could not generate grid");
    assert_eq!(storage.len(), 3);
    assert!(storage.contains(&GridPoint::new(&[1], &[1], false)));
    assert!(storage.contains(&GridPoint::new(&[2], &[1], false)));
    assert!(storage.contains(&GridPoint::new(&[2], &[3], false)));
}

#[test]
fn test_regular_counts_match_enumeration()
{
    // brute-force check of the level-sum bound for d=2, level=3:
    // |l|_1 <= level + d - 1 with 2^(l-1) points per 1D level
    let mut count = 0;
    for l0 in 1..=3u32
    {
        for l1 in 1..=3u32
        {
            if l0 + l1 <= 3 + 2 - 1
            {
                count += (1 << (l0 - 1)) * (1 << (l1 - 1));
            }
        }
    }
    let mut storage = GridStorage::new(2, 1);
    regular(&mut storage, &[3, 3], None).unwrap();
    assert_eq!(storage.len(), count);
}

#[test]
fn test_ancestor_invariant_regular()
{
    let mut storage = GridStorage::new(3, 1);
    regular(&mut storage, &[4, 4, 4], None).unwrap();
    for seq in 0..storage.len()
    {
        let point = storage.point(seq);
        for d in 0..3
        {
            if point.level[d] > 1
            {
                assert!(storage.contains(&point.parent(d)), "missing parent of {:?} along {}", point, d);
            }
        }
    }
}

#[test]
fn test_full_grid()
{
    let mut storage = GridStorage::new(2, 1);
    full(&mut storage, 3).unwrap();
    assert_eq!(storage.len(), ((1 << 3) - 1) * ((1 << 3) - 1));
}

#[test]
fn test_truncated_boundaries_1d()
{
    let mut storage = GridStorage::new(1, 1);
    regular_with_boundaries(&mut storage, &[2], Some(1), None).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
}

#[test]
fn test_truncated_boundaries_2d()
{
    let mut storage = GridStorage::new(2, 1);
    regular_with_boundaries(&mut storage, &[2, 2], Some(1), None).expect("Could not generate grid");
    assert_eq!(storage.len(), 21);
    let mut storage2 = GridStorage::new(2, 1);
    regular_with_boundaries(&mut storage2, &[3, 3], Some(1), None).expect("Could not generate grid");
    assert_eq!(storage2.len(), 49);
    assert!(storage2.contains(&GridPoint::new(&[1, 1], &[1, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[1, 2], &[1, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[2, 2], &[3, 1], false)));
    assert!(!storage2.contains(&GridPoint::new(&[3, 2], &[5, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3, 1], &[5, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3, 0], &[5, 0], false)));
    assert!(storage2.contains(&GridPoint::new(&[0, 0], &[0, 0], false)));
}

#[test]
fn test_cliques()
{
    let mut storage = GridStorage::new(4, 1);
    cliques(&mut storage, &[2, 2, 2, 2], 2, None).unwrap();
    // no point may exceed level 1 in dimensions of two different cliques
    for node in storage.nodes()
    {
        let deep_first = node.level[0] > 1 || node.level[1] > 1;
        let deep_second = node.level[2] > 1 || node.level[3] > 1;
        assert!(!(deep_first && deep_second));
    }
}
