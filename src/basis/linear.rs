use super::base::{Basis, BasisFunction};

///
/// Piecewise linear hat functions on the dyadic grid. Level 0 holds the two
/// boundary functions `1-x` and `x`.
///
#[derive(Copy, Clone, Default)]
pub struct LinearBasis;

impl Basis for LinearBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            if index == 0
            {
                1.0 - x
            }
            else
            {
                x
            }
        }
        else
        {
            0.0_f64.max(1.0 - f64::abs((1 << level) as f64 * x - index as f64))
        }
    }

    #[inline]
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            if index == 0 { -1.0 } else { 1.0 }
        }
        else
        {
            let h = (1 << level) as f64;
            let t = h * x - index as f64;
            if t.abs() >= 1.0
            {
                0.0
            }
            else if t < 0.0
            {
                h
            }
            else
            {
                -h
            }
        }
    }

    fn degree(&self) -> usize {
        1
    }

    #[inline]
    fn integral(&self, level: u32, _index: u32) -> f64 {
        if level == 0
        {
            0.5
        }
        else
        {
            1.0 / (1 << level) as f64
        }
    }

    #[inline]
    fn node(&self, level: u32, index: u32) -> f64
    {
        index as f64 / (1 << level) as f64
    }

    fn basis_type(&self) -> BasisFunction {
        BasisFunction::Linear
    }
}

#[test]
fn check_hat_values()
{
    let basis = LinearBasis;
    assert_eq!(basis.eval(1, 1, 0.5), 1.0);
    assert_eq!(basis.eval(1, 1, 0.0), 0.0);
    assert_eq!(basis.eval(1, 1, 0.25), 0.5);
    assert_eq!(basis.eval(2, 1, 0.25), 1.0);
    assert_eq!(basis.eval(2, 1, 0.5), 0.0);
    assert_eq!(basis.eval(0, 0, 0.25), 0.75);
    assert_eq!(basis.eval(0, 1, 0.25), 0.25);
}

#[test]
fn check_hat_integral()
{
    let basis = LinearBasis;
    assert_eq!(basis.integral(1, 1), 0.5);
    assert_eq!(basis.integral(3, 5), 0.125);
    assert_eq!(basis.integral(0, 0), 0.5);
}
