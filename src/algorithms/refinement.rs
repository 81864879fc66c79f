use crate::errors::GridError;
use crate::storage::{GridPoint, GridStorage};

#[derive(Default, Debug, Clone)]
pub struct RefinementOptions
{
    /// Scores must reach the threshold for a point to be refined.
    pub threshold: f64,
    /// Per-dimension level caps; dimensions at the cap are not refined.
    pub level_limits: Option<Vec<u8>>,
}

impl RefinementOptions
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold, ..Default::default() }
    }
}

///
/// Scoring strategy for refinement and coarsening. The engine calls `eval`
/// once per call against the pre-mutation sequence numbering and never
/// mutates the functor. A common choice of score is the absolute surplus.
///
pub trait RefinementFunctor: Send + Sync
{
    ///
    /// Error indicator per stored point, indexed by sequence number.
    /// `alpha` holds the surpluses, `values` the nodal values, both with
    /// `num_outputs` stride.
    ///
    fn eval(&self, storage: &GridStorage, alpha: &[f64], values: &[f64]) -> Vec<f64>;

    ///
    /// Upper bound on the number of points refined per call (the top-K
    /// by score). `None` refines every candidate above the threshold.
    ///
    fn max_num_refined(&self) -> Option<usize>
    {
        None
    }

    ///
    /// Upper bound on the number of points removed per coarsening call.
    ///
    fn max_num_removed(&self) -> Option<usize>
    {
        None
    }

    fn num_outputs(&self) -> usize;

    fn num_inputs(&self) -> usize;
}

fn resolve_level_limits(storage: &GridStorage, level_limits: &Option<Vec<u8>>) -> Result<Vec<u8>, GridError>
{
    match level_limits
    {
        Some(limits) =>
        {
            if limits.len() != storage.num_inputs()
            {
                return Err(GridError::LevelLimitsLengthMismatch);
            }
            Ok(limits.clone())
        }
        None => Ok(vec![u8::MAX; storage.num_inputs()]),
    }
}

///
/// Visits every refinable point: a point is refinable iff at least one
/// dimension below its level cap is missing a child in storage.
///
fn iterate_refinable_points<Op: FnMut(usize, &GridPoint)>(storage: &GridStorage, operation: &mut Op, level_limits: &Option<Vec<u8>>) -> Result<(), GridError>
{
    let level_limits = resolve_level_limits(storage, level_limits)?;
    for seq in 0..storage.len()
    {
        let parent = storage.point(seq);
        let mut point = parent.clone();
        for d in 0..storage.num_inputs()
        {
            if point.level[d] >= level_limits[d]
            {
                continue; // this dimension is capped
            }
            let index = point.index[d];
            let level = point.level[d];
            if level == 0
            {
                point.level[d] = 1;
                point.index[d] = 1;
                let missing = !storage.contains(&point);
                point.level[d] = level;
                point.index[d] = index;
                if missing
                {
                    operation(seq, &parent);
                    break;
                }
            }
            else
            {
                point.level[d] = level + 1;
                point.index[d] = 2 * index - 1;
                let left_missing = !storage.contains(&point);
                point.index[d] = 2 * index + 1;
                let right_missing = !storage.contains(&point);
                point.level[d] = level;
                point.index[d] = index;
                if left_missing || right_missing
                {
                    operation(seq, &parent);
                    break;
                }
            }
        }
    }
    Ok(())
}

///
/// Refinement engine. The flag enables boundary handling (grids carrying
/// level-0 points).
///
pub struct BaseRefinement(pub bool);

impl BaseRefinement
{
    ///
    /// Inserts a point together with every missing hierarchical ancestor,
    /// restoring the ancestor-closure invariant within this call.
    ///
    fn create_point(&self, storage: &mut GridStorage, point: GridPoint)
    {
        for dim in 0..storage.num_inputs()
        {
            if !self.0
            {
                self.create_point_1d(point.clone(), storage, dim);
            }
            else
            {
                self.create_point_1d_with_boundary(point.clone(), storage, dim);
            }
        }
        storage.insert_point(point.clone());
        if self.0
        {
            self.create_level_zero_consistency(storage, point);
        }
    }

    ///
    /// A boundary grid must carry both level-0 points of an axis whenever
    /// it carries one of them.
    ///
    fn create_level_zero_consistency(&self, storage: &mut GridStorage, mut point: GridPoint)
    {
        if storage.num_inputs() == 1
        {
            return;
        }
        for dim in 0..storage.num_inputs()
        {
            let level = point.level[dim];
            let index = point.index[dim];
            if level == 0
            {
                for i in 0..2u32
                {
                    point.index[dim] = i;
                    if storage.contains(&point)
                    {
                        let leaf = point.is_leaf();
                        point.index[dim] = 1 - i;
                        if !storage.contains(&point)
                        {
                            let restore = point.is_leaf();
                            point.set_is_leaf(leaf);
                            self.create_point(storage, point.clone());
                            point.set_is_leaf(restore);
                        }
                        else if let Some(stored) = storage.get_mut(&point)
                        {
                            stored.flags.set_is_leaf(leaf);
                        }
                    }
                }
                point.level[dim] = level;
                point.index[dim] = index;
            }
        }
    }

    fn create_point_internal(&self, storage: &mut GridStorage, mut point: GridPoint)
    {
        if let Some(stored) = storage.get_mut(&point)
        {
            stored.flags.set_is_leaf(false);
        }
        else
        {
            point.set_is_leaf(false);
            self.create_point(storage, point);
        }
    }

    fn create_point_1d_with_boundary(&self, mut point: GridPoint, storage: &mut GridStorage, dim: usize)
    {
        let level = point.level[dim];
        let index = point.index[dim];
        if level == 1 && storage.num_inputs() > 1
        {
            // level-1 interior points need both boundary points of the axis
            point.level[dim] = 0;
            point.index[dim] = 0;
            self.create_point_internal(storage, point.clone());
            point.index[dim] = 1;
            self.create_point_internal(storage, point.clone());
            point.level[dim] = level;
            point.index[dim] = index;
        }
        self.create_point_1d(point, storage, dim);
    }

    ///
    /// Walks one step up the dyadic hierarchy in `dim` and ensures the
    /// parent exists; creation recurses, so the whole ancestor chain is
    /// completed transitively.
    ///
    fn create_point_1d(&self, mut point: GridPoint, storage: &mut GridStorage, dim: usize)
    {
        let level = point.level[dim];
        let index = point.index[dim];
        if level > 1
        {
            if ((index + 1) / 2) % 2 == 1
            {
                point.index[dim] = (index + 1) / 2;
            }
            else
            {
                point.index[dim] = (index - 1) / 2;
            }
            point.level[dim] = level - 1;
            self.create_point_internal(storage, point.clone());
            point.level[dim] = level;
            point.index[dim] = index;
        }
    }

    fn refine_gridpoint(&self, storage: &mut GridStorage, seq: usize, level_limits: &[u8])
    {
        let point = storage.point(seq);
        storage.set_is_leaf(seq, false);
        for dim in 0..storage.num_inputs()
        {
            if point.level[dim] >= level_limits[dim]
            {
                continue;
            }
            self.refine_1d(storage, point.clone(), dim);
        }
    }

    ///
    /// Creates the missing children of a grid point along one direction.
    ///
    pub fn refine_1d(&self, storage: &mut GridStorage, mut point: GridPoint, dim: usize)
    {
        let index = point.index[dim];
        let level = point.level[dim];
        if level == 0
        {
            point.level[dim] = 1;
            point.index[dim] = 1;
            if !storage.contains(&point)
            {
                point.set_is_leaf(true);
                self.create_point(storage, point.clone());
            }
        }
        else
        {
            point.level[dim] = level + 1;
            point.index[dim] = 2 * index - 1;
            if !storage.contains(&point)
            {
                point.set_is_leaf(true);
                self.create_point(storage, point.clone());
            }
            point.level[dim] = level + 1;
            point.index[dim] = 2 * index + 1;
            if !storage.contains(&point)
            {
                point.set_is_leaf(true);
                self.create_point(storage, point.clone());
            }
        }
    }

    ///
    /// Scores every stored point, selects the refinable candidates above
    /// the threshold (bounded to the functor's top-K, ties broken by
    /// sequence number), and creates their missing children plus ancestors.
    /// Returns the sequence numbers of the newly created points; the caller
    /// resizes its coefficient vectors accordingly.
    ///
    pub fn refine(&self, storage: &mut GridStorage, alpha: &[f64], values: &[f64], functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<usize>, GridError>
    {
        let original_number = storage.len();
        let level_limits = resolve_level_limits(storage, &options.level_limits)?;
        let scores = functor.eval(storage, alpha, values);
        if scores.len() != storage.len()
        {
            return Err(GridError::NumberOfPointsAndValuesMismatch);
        }
        let mut candidates: Vec<(usize, f64)> = Vec::new();
        iterate_refinable_points(storage, &mut |seq, _point|
        {
            if scores[seq] > options.threshold
            {
                candidates.push((seq, scores[seq]));
            }
        }, &options.level_limits)?;

        if let Some(k) = functor.max_num_refined()
        {
            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
            candidates.truncate(k);
        }
        for (seq, _score) in candidates
        {
            self.refine_gridpoint(storage, seq, &level_limits);
        }
        Ok((original_number..storage.len()).collect())
    }

    ///
    /// Number of points the next `refine` call may select from.
    ///
    pub fn get_num_refinable_points(&self, storage: &GridStorage, level_limits: &Option<Vec<u8>>) -> Result<usize, GridError>
    {
        let mut count = 0;
        iterate_refinable_points(storage, &mut |_seq, _point| { count += 1; }, level_limits)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::refinement::surplus::SurplusRefinement;

    #[test]
    fn refinable_points_of_regular_grid()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[2, 2], None).unwrap();
        assert_eq!(storage.len(), 5);
        // the root has all four children; the level-2 points miss theirs
        let refinement = BaseRefinement(false);
        assert_eq!(refinement.get_num_refinable_points(&storage, &None).unwrap(), 4);
    }

    #[test]
    fn level_limit_mismatch_fails_fast()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[2, 2], None).unwrap();
        let refinement = BaseRefinement(false);
        let functor = SurplusRefinement { num_inputs: 2, num_outputs: 1, max_refinements: None };
        let options = RefinementOptions { threshold: 0.0, level_limits: Some(vec![3]) };
        let alpha = vec![1.0; storage.len()];
        let values = vec![1.0; storage.len()];
        assert_eq!(refinement.refine(&mut storage, &alpha, &values, &functor, &options), Err(GridError::LevelLimitsLengthMismatch));
    }

    #[test]
    fn top_k_selects_largest_surplus()
    {
        // 1D level-2 grid: surpluses [1.0, 0.0, 0.0] after hierarchising a
        // constant; only (1,1) is selected with K = 1
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[2], None).unwrap();
        let alpha = vec![1.0, 0.0, 0.0];
        let values = vec![1.0, 0.5, 0.5];
        let refinement = BaseRefinement(false);
        let functor = SurplusRefinement { num_inputs: 1, num_outputs: 1, max_refinements: Some(1) };
        let options = RefinementOptions::new(0.0);
        let created = refinement.refine(&mut storage, &alpha, &values, &functor, &options).unwrap();
        // the only point above the threshold, (1,1), already has both
        // children and is not refinable; nothing is inserted
        assert!(created.is_empty());
        assert_eq!(storage.len(), 3);
        // refining with K = 3 grows the leaves to level 3
        let functor = SurplusRefinement { num_inputs: 1, num_outputs: 1, max_refinements: Some(3) };
        let alpha = vec![1.0, 0.5, 0.5];
        let created = refinement.refine(&mut storage, &alpha, &values, &functor, &options).unwrap();
        assert_eq!(created.len(), 4);
        assert_eq!(storage.len(), 7);
    }

    #[test]
    fn refinement_restores_ancestor_closure()
    {
        let mut storage = GridStorage::new(2, 1);
        crate::generators::regular(&mut storage, &[2, 2], None).unwrap();
        let n = storage.len();
        let refinement = BaseRefinement(false);
        let functor = SurplusRefinement { num_inputs: 2, num_outputs: 1, max_refinements: None };
        let alpha: Vec<f64> = (0..n).map(|i| (i + 1) as f64).collect();
        let values = alpha.clone();
        refinement.refine(&mut storage, &alpha, &values, &functor, &RefinementOptions::new(0.0)).unwrap();
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
}
