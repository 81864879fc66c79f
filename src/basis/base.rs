use serde::{Deserialize, Serialize};

///
/// 1D basis family contract. The sweep and evaluation machinery is generic
/// over this trait; every concrete family (linear, modified linear, ...)
/// provides the same capability set.
///
pub trait Basis
{
    /// Value of the basis function `(level, index)` at `x` in [0,1].
    fn eval(&self, level: u32, index: u32, x: f64) -> f64;
    /// First derivative at `x`.
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64;
    /// Polynomial degree of the family.
    fn degree(&self) -> usize;
    /// Integral of the basis function over [0,1].
    fn integral(&self, level: u32, index: u32) -> f64;
    /// Position of the node on the unit interval.
    fn node(&self, level: u32, index: u32) -> f64;
    fn basis_type(&self) -> BasisFunction;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasisFunction
{
    Linear = 0,
    ModifiedLinear = 1,
}
