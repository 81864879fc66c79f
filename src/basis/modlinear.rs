use super::base::{Basis, BasisFunction};

///
/// Modified linear hat functions: the leftmost and rightmost function of
/// every level extrapolate linearly towards the boundary, so grids built on
/// this family need no boundary points. Level 1 is the constant one.
///
#[derive(Copy, Clone, Default)]
pub struct ModifiedLinearBasis;

impl Basis for ModifiedLinearBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 1
        {
            return 1.0;
        }
        let h_inv = (1 << level) as f64;
        if index == 1
        {
            // leftmost: ramp from 2 at x=0 down to 0 at x=2/2^l
            if x <= 2.0 / h_inv
            {
                2.0 - h_inv * x
            }
            else
            {
                0.0
            }
        }
        else if index == (1 << level) - 1
        {
            // rightmost, mirrored
            if x >= 1.0 - 2.0 / h_inv
            {
                h_inv * x - index as f64 + 1.0
            }
            else
            {
                0.0
            }
        }
        else
        {
            0.0_f64.max(1.0 - f64::abs(h_inv * x - index as f64))
        }
    }

    #[inline]
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 1
        {
            return 0.0;
        }
        let h_inv = (1 << level) as f64;
        if index == 1
        {
            if x <= 2.0 / h_inv { -h_inv } else { 0.0 }
        }
        else if index == (1 << level) - 1
        {
            if x >= 1.0 - 2.0 / h_inv { h_inv } else { 0.0 }
        }
        else
        {
            let t = h_inv * x - index as f64;
            if t.abs() >= 1.0
            {
                0.0
            }
            else if t < 0.0
            {
                h_inv
            }
            else
            {
                -h_inv
            }
        }
    }

    fn degree(&self) -> usize {
        1
    }

    #[inline]
    fn integral(&self, level: u32, index: u32) -> f64 {
        if level == 1
        {
            return 1.0;
        }
        if index == 1 || index == (1 << level) - 1
        {
            // ramp over two cells with peak value 2
            2.0 / (1 << level) as f64
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
        BasisFunction::ModifiedLinear
    }
}

#[test]
fn check_modified_values()
{
    let basis = ModifiedLinearBasis;
    assert_eq!(basis.eval(1, 1, 0.123), 1.0);
    assert_eq!(basis.eval(2, 1, 0.0), 2.0);
    assert_eq!(basis.eval(2, 1, 0.25), 1.0);
    assert_eq!(basis.eval(2, 1, 0.5), 0.0);
    assert_eq!(basis.eval(2, 3, 1.0), 2.0);
    assert_eq!(basis.eval(2, 3, 0.75), 1.0);
    assert_eq!(basis.eval(3, 3, 0.375), 1.0);
}

#[test]
fn check_modified_integral()
{
    let basis = ModifiedLinearBasis;
    assert_eq!(basis.integral(1, 1), 1.0);
    assert_eq!(basis.integral(2, 1), 0.5);
    assert_eq!(basis.integral(2, 3), 0.5);
    assert_eq!(basis.integral(3, 3), 0.125);
}
