use crate::algorithms::refinement::RefinementFunctor;
use crate::storage::GridStorage;

///
/// Scores each point by the largest absolute surplus over its outputs.
///
pub struct SurplusRefinement
{
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub max_refinements: Option<usize>,
}

impl SurplusRefinement
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        Self { num_inputs, num_outputs, max_refinements: None }
    }
}

impl RefinementFunctor for SurplusRefinement
{
    fn eval(&self, _storage: &GridStorage, alpha: &[f64], _values: &[f64]) -> Vec<f64>
    {
        alpha.chunks_exact(self.num_outputs).map(|alpha_i|
        {
            let mut max = -1.0_f64;
            alpha_i.iter().for_each(|&val| max = max.max(val.abs()));
            max
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
