use serde::{Deserialize, Serialize};

use crate::errors::GridError;

///
/// 1D coordinate transform of a stretched axis. `Id` is the plain affine
/// map onto [left, right]; `Log` spaces nodes uniformly in log space; `Sinh`
/// is the Leentvaar transform concentrating nodes around `x0`. `Discrete`
/// carries an explicit coordinate table for the first `level` levels.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Transform1D
{
    Id,
    Log,
    Sinh { x0: f64, xsi: f64 },
    Discrete { level: u32, coordinates: Vec<f64> },
}

impl Transform1D
{
    fn type_id(&self) -> u32
    {
        match self
        {
            Transform1D::Id => 1,
            Transform1D::Log => 2,
            Transform1D::Sinh { .. } => 3,
            Transform1D::Discrete { .. } => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stretching1D
{
    pub left: f64,
    pub right: f64,
    pub dirichlet_left: bool,
    pub dirichlet_right: bool,
    pub transform: Transform1D,
}

impl Stretching1D
{
    pub fn id(left: f64, right: f64) -> Self
    {
        Self { left, right, dirichlet_left: false, dirichlet_right: false, transform: Transform1D::Id }
    }

    pub fn log(left: f64, right: f64) -> Self
    {
        Self { left, right, dirichlet_left: false, dirichlet_right: false, transform: Transform1D::Log }
    }

    pub fn sinh(left: f64, right: f64, x0: f64, xsi: f64) -> Self
    {
        Self { left, right, dirichlet_left: false, dirichlet_right: false, transform: Transform1D::Sinh { x0, xsi } }
    }

    ///
    /// Coordinate of the node `index / 2^level` on this axis. Level 0 maps
    /// to the two boundaries.
    ///
    pub fn coordinate(&self, level: i32, index: u32) -> f64
    {
        if level == 0
        {
            return if index == 0 { self.left } else { self.right };
        }
        let frac = index as f64 / (1u64 << level) as f64;
        match &self.transform
        {
            Transform1D::Id => self.left + frac * (self.right - self.left),
            Transform1D::Log =>
            {
                let f_a = self.left.ln();
                let f_b = self.right.ln();
                (f_a + frac * (f_b - f_a)).exp()
            }
            Transform1D::Sinh { x0, xsi } =>
            {
                let sa = (self.left - x0) * xsi;
                let sb = (self.right - x0) * xsi;
                let f_a = (sa + (sa * sa + 1.0).sqrt()).ln();
                let f_b = (sb + (sb * sb + 1.0).sqrt()).ln();
                (f_a + frac * (f_b - f_a)).sinh() / xsi + x0
            }
            Transform1D::Discrete { level: max_level, coordinates } =>
            {
                if (level as u32) <= *max_level && index % 2 == 1
                {
                    coordinates[lookup_index(level as u32, index)]
                }
                else
                {
                    // below the table: interpolate between the dyadic
                    // neighbors that are covered
                    let (ll, li, rl, ri) = neighbor_specs(level, index);
                    let posl = self.coordinate(ll, li);
                    let posr = self.coordinate(rl, ri);
                    let span_l = li as f64 / (1u64 << ll) as f64;
                    let span_r = if rl == 0 { 1.0 } else { ri as f64 / (1u64 << rl) as f64 };
                    posl + (posr - posl) * (frac - span_l) / (span_r - span_l)
                }
            }
        }
    }
}

///
/// Nearest dyadic neighbors of `(level, index)`: the hierarchical ancestors
/// bounding the node on either side. Returns (leftLevel, leftIndex,
/// rightLevel, rightIndex); level 0 denotes a boundary.
///
fn neighbor_specs(level: i32, index: u32) -> (i32, u32, i32, u32)
{
    let mut left_index = index as i64 - 1;
    let mut right_index = index as i64 + 1;
    let mut left_level = level;
    let mut right_level = level;
    let mut left_continue = left_index != 0;
    let mut right_continue = right_index != (1i64 << level);
    if !left_continue
    {
        left_level = 0;
    }
    if !right_continue
    {
        right_level = 0;
        right_index = 1;
    }
    while left_continue || right_continue
    {
        if left_continue
        {
            left_index /= 2;
            left_level -= 1;
            if left_index % 2 != 0 || left_level == 0
            {
                if left_level == 0
                {
                    left_index = 0;
                }
                left_continue = false;
            }
        }
        if right_continue
        {
            right_index /= 2;
            right_level -= 1;
            if right_index % 2 == 1 || right_level == 0
            {
                if right_level == 0
                {
                    right_index = 1;
                }
                right_continue = false;
            }
        }
    }
    (left_level, left_index as u32, right_level, right_index as u32)
}

///
/// lookup position for odd indices, level-major: 2^(l-1) - 1 + (i-1)/2
///
fn lookup_index(level: u32, index: u32) -> usize
{
    ((1usize << (level - 1)) - 1) + ((index as usize - 1) / 2)
}

///
/// Non-uniform axis stretching for the whole grid. At most one of bounding
/// box and stretching is active on a storage; the stretching carries its
/// own per-axis boundaries. Transforms must be homogeneously analytic or
/// homogeneously discrete across axes (the text format encodes the mode
/// globally).
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stretching
{
    dims: Vec<Stretching1D>,
}

impl Stretching
{
    pub fn new(dims: Vec<Stretching1D>) -> Result<Self, GridError>
    {
        let discrete = dims.iter().filter(|s| matches!(s.transform, Transform1D::Discrete { .. })).count();
        if discrete != 0 && discrete != dims.len()
        {
            return Err(GridError::UnsupportedOperation);
        }
        Ok(Self { dims })
    }

    pub fn dim(&self) -> usize
    {
        self.dims.len()
    }

    pub fn axis(&self, d: usize) -> &Stretching1D
    {
        &self.dims[d]
    }

    pub fn left_boundaries(&self) -> Vec<f64>
    {
        self.dims.iter().map(|s| s.left).collect()
    }

    pub fn right_boundaries(&self) -> Vec<f64>
    {
        self.dims.iter().map(|s| s.right).collect()
    }

    pub fn coordinate(&self, level: i32, index: u32, d: usize) -> f64
    {
        self.dims[d].coordinate(level, index)
    }

    ///
    /// Positions of the node and its two bounding hierarchical ancestors:
    /// (posc, posl, posr). These are the stretched counterparts of the
    /// midpoint and the interval ends used by the uniform recurrences.
    ///
    pub fn adjacent_positions(&self, level: i32, index: u32, d: usize) -> (f64, f64, f64)
    {
        let (ll, li, rl, ri) = neighbor_specs(level, index);
        let posc = self.coordinate(level, index, d);
        let posl = self.coordinate(ll, li, d);
        let posr = self.coordinate(rl, ri, d);
        (posc, posl, posr)
    }

    fn is_discrete(&self) -> bool
    {
        matches!(self.dims.first().map(|s| &s.transform), Some(Transform1D::Discrete { .. }))
    }

    pub(crate) fn serialize_text(&self, out: &mut String)
    {
        out.push_str(if self.is_discrete() { "2\n" } else { "1\n" });
        for s in &self.dims
        {
            out.push_str(&format!("{:e} {:e} {} {} ", s.left, s.right, s.dirichlet_left as u8, s.dirichlet_right as u8));
        }
        out.push('\n');
        for s in &self.dims
        {
            match &s.transform
            {
                Transform1D::Discrete { level, coordinates } =>
                {
                    out.push_str(&format!("{}\n", level));
                    for c in coordinates
                    {
                        out.push_str(&format!("{:e} ", c));
                    }
                    out.push('\n');
                }
                Transform1D::Sinh { x0, xsi } =>
                {
                    out.push_str(&format!("{} {:e} {:e}\n", s.transform.type_id(), x0, xsi));
                }
                _ =>
                {
                    out.push_str(&format!("{} {:e} {:e}\n", s.transform.type_id(), 0.0, 0.0));
                }
            }
        }
    }

    pub(crate) fn deserialize_text<'a, I: Iterator<Item = &'a str>>(mode: u32, dim: usize, tokens: &mut I) -> Result<Self, GridError>
    {
        use crate::storage::{next_token, parse_token};
        let mut dims = Vec::with_capacity(dim);
        let mut bounds = Vec::with_capacity(dim);
        for _ in 0..dim
        {
            let left: f64 = parse_token(tokens)?;
            let right: f64 = parse_token(tokens)?;
            let dirichlet_left = next_token(tokens)? == "1";
            let dirichlet_right = next_token(tokens)? == "1";
            bounds.push((left, right, dirichlet_left, dirichlet_right));
        }
        for &(left, right, dirichlet_left, dirichlet_right) in &bounds
        {
            let transform = if mode == 2
            {
                let level: u32 = parse_token(tokens)?;
                let count = (1usize << level) - 1;
                let mut coordinates = Vec::with_capacity(count);
                for _ in 0..count
                {
                    coordinates.push(parse_token(tokens)?);
                }
                Transform1D::Discrete { level, coordinates }
            }
            else
            {
                let type_id: u32 = parse_token(tokens)?;
                let x0: f64 = parse_token(tokens)?;
                let xsi: f64 = parse_token(tokens)?;
                match type_id
                {
                    1 => Transform1D::Id,
                    2 => Transform1D::Log,
                    3 => Transform1D::Sinh { x0, xsi },
                    _ => return Err(GridError::InvalidGridFile),
                }
            };
            dims.push(Stretching1D { left, right, dirichlet_left, dirichlet_right, transform });
        }
        Stretching::new(dims)
    }
}

#[test]
fn check_id_coordinates()
{
    let s = Stretching1D::id(0.0, 1.0);
    assert_eq!(s.coordinate(1, 1), 0.5);
    assert_eq!(s.coordinate(2, 1), 0.25);
    assert_eq!(s.coordinate(2, 3), 0.75);
    assert_eq!(s.coordinate(0, 0), 0.0);
    assert_eq!(s.coordinate(0, 1), 1.0);
}

#[test]
fn check_log_coordinates()
{
    let s = Stretching1D::log(1.0, 4.0);
    // midpoint in log space is the geometric mean
    assert!((s.coordinate(1, 1) - 2.0).abs() < 1e-12);
    assert!((s.coordinate(2, 1) - 2.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn check_adjacent_positions()
{
    let s = Stretching::new(vec![Stretching1D::id(0.0, 1.0)]).unwrap();
    // node (2,3) sits between (1,1) and the right boundary
    let (posc, posl, posr) = s.adjacent_positions(2, 3, 0);
    assert_eq!(posc, 0.75);
    assert_eq!(posl, 0.5);
    assert_eq!(posr, 1.0);
    // node (3,3) sits between (2,1) and (1,1)
    let (posc, posl, posr) = s.adjacent_positions(3, 3, 0);
    assert_eq!(posc, 0.375);
    assert_eq!(posl, 0.25);
    assert_eq!(posr, 0.5);
}

#[test]
fn check_neighbor_specs_boundaries()
{
    let (ll, li, rl, ri) = neighbor_specs(1, 1);
    assert_eq!((ll, li), (0, 0));
    assert_eq!((rl, ri), (0, 1));
    let (ll, li, rl, ri) = neighbor_specs(3, 1);
    assert_eq!((ll, li), (0, 0));
    assert_eq!((rl, ri), (2, 1));
}
