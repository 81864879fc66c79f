use crate::algorithms::refinement::RefinementFunctor;
use crate::storage::GridStorage;

///
/// Scores each point by `|surplus| * 2^-levelsum`, weighting the surplus by
/// the volume of the basis function's support. Favors coarse-level error
/// over deep spikes.
///
pub struct SurplusVolumeRefinement
{
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub max_refinements: Option<usize>,
}

impl SurplusVolumeRefinement
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        Self { num_inputs, num_outputs, max_refinements: None }
    }
}

impl RefinementFunctor for SurplusVolumeRefinement
{
    fn eval(&self, storage: &GridStorage, alpha: &[f64], _values: &[f64]) -> Vec<f64>
    {
        alpha.chunks_exact(self.num_outputs).enumerate().map(|(seq, alpha_i)|
        {
            let mut max = -1.0_f64;
            alpha_i.iter().for_each(|&val| max = max.max(val.abs()));
            max * 2.0_f64.powi(-(storage.level_sum(seq) as i32))
        }).collect()
    }

    fn max_num_refined(&self) -> Option<usize>
    {
        self.max_refinements
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    #[inline]
    fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}

#[test]
fn volume_weight_decays_with_level()
{
    let mut storage = GridStorage::new(1, 1);
    crate::generators::regular(&mut storage, &[2], None).unwrap();
    let functor = SurplusVolumeRefinement::new(1, 1);
    let alpha = vec![1.0, 1.0, 1.0];
    let scores = functor.eval(&storage, &alpha, &alpha);
    // equal surpluses: the level-1 point outranks the level-2 points
    assert!(scores[0] > scores[1]);
    assert_eq!(scores[1], scores[2]);
    assert_eq!(scores[0], 0.5);
}
