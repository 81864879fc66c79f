use indexmap::IndexSet;

use crate::errors::GridError;
use crate::storage::GridStorage;

use super::refinement::RefinementFunctor;

#[derive(Default, Debug, Clone)]
pub struct CoarseningOptions
{
    /// Leaves scoring below the threshold are removed.
    pub threshold: f64,
    /// The first N inserted points (typically the regular base grid) are
    /// never removed.
    pub protected_points: usize,
}

impl CoarseningOptions
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold, ..Default::default() }
    }
}

///
/// Removes leaves whose score falls below the threshold. Scoring runs
/// against the pre-mutation numbering; deletion happens afterwards as one
/// stable compaction pass, so surviving points keep their relative order
/// and sequence numbers stay dense. Returns the kept points by their old
/// sequence numbers (in new order), for compacting coefficient vectors.
///
pub(crate) fn coarsen(storage: &mut GridStorage, functor: &dyn RefinementFunctor, alpha: &[f64], values: &[f64], options: &CoarseningOptions) -> Result<IndexSet<usize>, GridError>
{
    let scores = functor.eval(storage, alpha, values);
    if scores.len() != storage.len()
    {
        return Err(GridError::NumberOfPointsAndValuesMismatch);
    }
    let mut removable: Vec<(usize, f64)> = Vec::new();
    for seq in 0..storage.len()
    {
        if storage.is_leaf(seq) && seq >= options.protected_points && scores[seq] < options.threshold
        {
            removable.push((seq, scores[seq]));
        }
    }
    if let Some(k) = functor.max_num_removed()
    {
        // keep the K smallest scores, ties broken by sequence number
        removable.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        removable.truncate(k);
    }
    let removed: IndexSet<usize> = removable.iter().map(|&(seq, _)| seq).collect();
    let mut kept = IndexSet::with_capacity(storage.len() - removed.len());
    for seq in 0..storage.len()
    {
        if !removed.contains(&seq)
        {
            kept.insert(seq);
        }
    }
    let keep: Vec<usize> = kept.iter().copied().collect();
    storage.keep_points(&keep);
    Ok(kept)
}

///
/// Number of points the next coarsening call may remove.
///
pub fn get_num_removable_points(storage: &GridStorage, protected_points: usize) -> usize
{
    (protected_points..storage.len()).filter(|&seq| storage.is_leaf(seq)).count()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::refinement::surplus::SurplusRefinement;
    use crate::storage::GridPoint;

    #[test]
    fn coarsen_removes_small_leaves_and_renumbers()
    {
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[3], None).unwrap();
        assert_eq!(storage.len(), 7);
        // level-3 points are the leaves; drop the ones with zero surplus
        let mut alpha = vec![0.0; 7];
        alpha[storage.sequence_number(&GridPoint::new(&[1], &[1], false)).unwrap()] = 1.0;
        alpha[storage.sequence_number(&GridPoint::new(&[3], &[1], false)).unwrap()] = 0.5;
        let values = alpha.clone();
        let functor = SurplusRefinement { num_inputs: 1, num_outputs: 1, max_refinements: None };
        let kept = coarsen(&mut storage, &functor, &alpha, &values, &CoarseningOptions::new(0.25)).unwrap();
        // (3,1) survives on score, the other level-3 leaves go
        assert_eq!(storage.len(), 4);
        assert_eq!(kept.len(), 4);
        assert!(storage.contains(&GridPoint::new(&[3], &[1], false)));
        assert!(!storage.contains(&GridPoint::new(&[3], &[3], false)));
        // dense renumbering
        for seq in 0..storage.len()
        {
            assert_eq!(storage.sequence_number(&storage.point(seq)), Some(seq));
        }
        // former interior points whose children all vanished are leaves now
        let seq = storage.sequence_number(&GridPoint::new(&[2], &[3], false)).unwrap();
        assert!(storage.is_leaf(seq));
        // only leaves were removed, so every parent is still present
        for seq in 0..storage.len()
        {
            let point = storage.point(seq);
            if point.level[0] > 1
            {
                assert!(storage.contains(&point.parent(0)));
            }
        }
    }

    #[test]
    fn protected_points_survive()
    {
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[2], None).unwrap();
        let n = storage.len();
        let alpha = vec![0.0; n];
        let values = vec![0.0; n];
        let functor = SurplusRefinement { num_inputs: 1, num_outputs: 1, max_refinements: None };
        let options = CoarseningOptions { threshold: 1.0, protected_points: n };
        coarsen(&mut storage, &functor, &alpha, &values, &options).unwrap();
        assert_eq!(storage.len(), n);
    }
}
