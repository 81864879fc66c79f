use crate::basis::base::Basis;
use crate::storage::GridStorage;

///
/// Integral of the hierarchical representation over the whole domain: each
/// surplus contributes the tensor product of its 1D basis integrals, scaled
/// by the bounding-box volume.
///
pub fn integrate_isotropic<B: Basis>(storage: &GridStorage, basis: &B, alpha: &[f64], result: &mut [f64])
{
    let volume = storage.bounding_box().volume();
    let num_outputs = storage.num_outputs();
    result.fill(0.0);
    for seq in 0..storage.len()
    {
        let mut weight = 1.0;
        for d in 0..storage.num_inputs()
        {
            weight *= basis.integral(storage.level(seq, d) as u32, storage.index(seq, d));
        }
        #[allow(clippy::needless_range_loop)]
        for o in 0..num_outputs
        {
            result[o] += alpha[seq * num_outputs + o] * weight;
        }
    }
    #[allow(clippy::needless_range_loop)]
    for o in 0..num_outputs
    {
        result[o] *= volume;
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation};
    use crate::basis::linear::LinearBasis;

    #[test]
    fn integral_of_constant_converges()
    {
        // hierarchise f = 1 on a 1D level-4 grid and integrate; the hat
        // interpolant of a constant underestimates near the boundary by
        // exactly the two half-cells
        let mut storage = GridStorage::new(1, 1);
        crate::generators::regular(&mut storage, &[4], None).unwrap();
        let mut values = vec![1.0; storage.len()];
        LinearHierarchisationOperation.hierarchize(&mut values, &storage).unwrap();
        let mut result = vec![0.0];
        integrate_isotropic(&storage, &LinearBasis, &values, &mut result);
        let h = 1.0 / 16.0;
        assert!((result[0] - (1.0 - h)).abs() < 1e-12);
    }
}
