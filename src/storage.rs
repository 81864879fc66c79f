use std::hash::{Hash, Hasher};

use bitfield_struct::bitfield;
use nohash_hasher::BuildNoHashHasher;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::errors::GridError;
use crate::stretching::Stretching;

/// Map from a precomputed 64-bit point key to a sequence number. The key is
/// already a hash, so the map itself does not hash again.
pub type FastU64Map<V> = std::collections::HashMap<u64, V, BuildNoHashHasher<u64>>;

const SERIALIZATION_VERSION: u32 = 1;

#[bitfield(u8, new = false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8,
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
    /// keep `is_inner` consistent after a level change
    pub fn update_is_inner(&mut self, level: &[u8])
    {
        self.set_is_inner(!level.contains(&0));
    }
}

///
/// A grid point: one (level, index) pair per dimension. For `level >= 1` the
/// index is odd and the point sits at `index / 2^level`; level 0 carries the
/// two boundary points with indices 0 and 1.
///
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl Default for GridPoint
{
    fn default() -> Self {
        Self { level: vec![], index: vec![], flags: GridPointFlags(0) }
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint {}

impl PartialOrd for GridPoint
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ord::cmp(self, other))
    }
}
impl Ord for GridPoint
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level.cmp(&other.level).then(self.index.cmp(&other.index))
    }
}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32], is_leaf: bool) -> Self
    {
        let flags = GridPointFlags::new(level, is_leaf);
        Self { level: level.to_vec(), index: index.to_vec(), flags }
    }

    pub fn dim(&self) -> usize
    {
        self.level.len()
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn set_is_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// An inner point has no level-0 component.
    ///
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    pub fn left_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if r.index[dim] == 0
        {
            r.index[dim] = u32::MAX;
            return r;
        }
        r.index[dim] = 2 * self.index[dim] - 1;
        r.level[dim] += 1;
        r
    }

    pub fn right_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        r.index[dim] = 2 * self.index[dim] + 1;
        r.level[dim] += 1;
        r
    }

    ///
    /// The direct hierarchical ancestor along `dim`: halve the index and
    /// restore odd parity. Level-0 points have no parent.
    ///
    pub fn parent(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if self.level[dim] == 0
        {
            r.index[dim] = u32::MAX;
            return r;
        }
        r.index[dim] = (self.index[dim] >> 1) | 1;
        r.level[dim] -= 1;
        r
    }

    ///
    /// returns the point moved to level 1, index 1 in direction dim
    ///
    pub fn root(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        r.index[dim] = 1;
        r.level[dim] = 1;
        r
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        let mut coor = vec![0.0; self.index.len()];
        #[allow(clippy::needless_range_loop)]
        for d in 0..self.index.len()
        {
            coor[d] = self.index[d] as f64 / (1 << self.level[d]) as f64;
        }
        coor
    }
}

impl From<&GridPoint> for u64
{
    fn from(val: &GridPoint) -> Self {
        let hasher = &mut FxHasher::default();
        val.hash(hasher);
        hasher.finish()
    }
}
impl From<GridPoint> for u64
{
    fn from(val: GridPoint) -> Self {
        (&val).into()
    }
}

///
/// Borrowed view of a stored point.
///
pub struct GridPointRef<'a> {
    pub index: &'a [u32],
    pub level: &'a [u8],
    pub(crate) flags: &'a GridPointFlags,
}

impl GridPointRef<'_>
{
    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        let mut coor = vec![0.0; self.index.len()];
        #[allow(clippy::needless_range_loop)]
        for d in 0..self.index.len()
        {
            coor[d] = self.index[d] as f64 / (1 << self.level[d]) as f64;
        }
        coor
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
}

impl PartialEq for GridPointRef<'_>
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPointRef<'_> {}

impl PartialOrd for GridPointRef<'_>
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ord::cmp(self, other))
    }
}
impl Ord for GridPointRef<'_>
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level.cmp(other.level).then(self.index.cmp(other.index))
    }
}

impl Hash for GridPointRef<'_>
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl From<GridPointRef<'_>> for u64
{
    fn from(val: GridPointRef<'_>) -> Self {
        let hasher = &mut FxHasher::default();
        val.hash(hasher);
        hasher.finish()
    }
}

impl<'a> From<(&'a [u32], &'a [u8], &'a GridPointFlags)> for GridPointRef<'a>
{
    fn from((index, level, flags): (&'a [u32], &'a [u8], &'a GridPointFlags)) -> Self {
        Self { index, level, flags }
    }
}

impl From<GridPointRef<'_>> for GridPoint
{
    fn from(value: GridPointRef<'_>) -> Self {
        GridPoint { level: value.level.to_owned(), index: value.index.to_owned(), flags: *value.flags }
    }
}

pub struct GridPointMutRef<'a> {
    #[allow(unused)]
    pub(crate) index: &'a mut [u32],
    #[allow(unused)]
    pub(crate) level: &'a mut [u8],
    pub(crate) flags: &'a mut GridPointFlags,
}

///
/// Axis-aligned domain of the grid, with optional Dirichlet flags per side.
///
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub dirichlet_left: Vec<bool>,
    pub dirichlet_right: Vec<bool>,
}

impl BoundingBox
{
    #[inline]
    pub fn new(lower: &[f64], upper: &[f64]) -> Self
    {
        let dim = lower.len();
        Self { lower: lower.to_vec(), upper: upper.to_vec(), dirichlet_left: vec![false; dim], dirichlet_right: vec![false; dim] }
    }

    pub fn unit_cube(dim: usize) -> Self
    {
        Self { lower: vec![0.0; dim], upper: vec![1.0; dim], dirichlet_left: vec![false; dim], dirichlet_right: vec![false; dim] }
    }

    pub fn is_unit_cube(&self) -> bool
    {
        self.lower.iter().all(|&v| v == 0.0) && self.upper.iter().all(|&v| v == 1.0)
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    ///
    /// Volume of the hypercube.
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        let mut volume = 1.0;
        for d in 0..self.lower.len()
        {
            volume *= self.width(d);
        }
        volume
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        let mut r = vec![0.0; point.len()];
        for i in 0..point.len()
        {
            r[i] = (point[i] - self.lower[i]) / (self.upper[i] - self.lower[i]);
        }
        r
    }

    #[inline]
    pub fn to_real_coordinate_in_place(&self, point: &mut [f64])
    {
        for i in 0..point.len()
        {
            point[i] = self.lower[i] + (self.upper[i] - self.lower[i]) * point[i];
        }
    }

    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        let mut r = point.to_vec();
        self.to_real_coordinate_in_place(&mut r);
        r
    }

    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        #[allow(clippy::needless_range_loop)]
        for d in 0..point.len()
        {
            if self.lower[d] > point[d] || self.upper[d] < point[d]
            {
                return false;
            }
        }
        true
    }

    pub fn has_dirichlet_left(&self, dim: usize) -> bool
    {
        self.dirichlet_left[dim]
    }

    pub fn has_dirichlet_right(&self, dim: usize) -> bool
    {
        self.dirichlet_right[dim]
    }
}

///
/// Hash-indexed grid point storage. Points live in structure-of-arrays
/// layout (flat `level`/`index` vectors with `num_inputs` stride); the map
/// takes a point's hash key to its dense sequence number. Sequence numbers
/// are contiguous in `[0, len)` after every completed mutation.
///
#[derive(Clone, Serialize, Deserialize)]
pub struct GridStorage
{
    pub bounding_box: BoundingBox,
    pub(crate) stretching: Option<Stretching>,
    pub(crate) index: Vec<u32>,
    pub(crate) level: Vec<u8>,
    pub(crate) flags: Vec<GridPointFlags>,
    pub(crate) num_inputs: usize,
    pub(crate) num_outputs: usize,
    pub(crate) map: FastU64Map<u32>,
    pub(crate) algo_dims: Vec<usize>,
    pub(crate) has_boundary: bool,
}

impl GridStorage
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        Self
        {
            bounding_box: BoundingBox::unit_cube(num_inputs),
            stretching: None,
            index: Vec::new(),
            level: Vec::new(),
            flags: Vec::new(),
            num_inputs,
            num_outputs,
            map: FastU64Map::default(),
            algo_dims: (0..num_inputs).collect(),
            has_boundary: false,
        }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn num_outputs(&self) -> usize
    {
        self.num_outputs
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.index.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.flags.len()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    ///
    /// The dimensions in which sweeps (and up/down style operators) are
    /// applied. Defaults to all dimensions.
    ///
    pub fn algorithmic_dimensions(&self) -> &[usize]
    {
        &self.algo_dims
    }

    pub fn set_algorithmic_dimensions(&mut self, dims: Vec<usize>)
    {
        self.algo_dims = dims;
    }

    #[inline]
    pub fn point(&self, seq: usize) -> GridPoint
    {
        GridPoint
        {
            level: self.level[seq * self.num_inputs..(seq + 1) * self.num_inputs].to_vec(),
            index: self.index[seq * self.num_inputs..(seq + 1) * self.num_inputs].to_vec(),
            flags: self.flags[seq],
        }
    }

    #[inline]
    pub fn point_ref(&self, seq: usize) -> GridPointRef<'_>
    {
        (&self.index[seq * self.num_inputs..(seq + 1) * self.num_inputs],
         &self.level[seq * self.num_inputs..(seq + 1) * self.num_inputs],
         &self.flags[seq]).into()
    }

    #[inline]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.level[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.index[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.flags[seq].is_leaf()
    }

    #[inline]
    pub fn set_is_leaf(&mut self, seq: usize, value: bool)
    {
        self.flags[seq].set_is_leaf(value);
    }

    #[inline]
    pub fn is_inner_point(&self, seq: usize) -> bool
    {
        self.flags[seq].is_inner()
    }

    #[inline]
    pub fn level_sum(&self, seq: usize) -> u32
    {
        self.level[seq * self.num_inputs..(seq + 1) * self.num_inputs].iter().map(|&l| l as u32).sum()
    }

    pub fn num_inner_points(&self) -> usize
    {
        self.flags.iter().filter(|f| f.is_inner()).count()
    }

    ///
    /// Maximum level over all points and dimensions.
    ///
    pub fn max_level(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    ///
    /// Appends the point and returns its sequence number. Inserting a point
    /// that is already stored returns the existing sequence number instead.
    /// Ancestor closure is the caller's contract (generators and refinement
    /// insert parents first or in the same call).
    ///
    pub fn insert_point(&mut self, mut point: GridPoint) -> usize
    {
        point.flags.update_is_inner(&point.level);
        let key: u64 = (&point).into();
        if let Some(&seq) = self.map.get(&key)
        {
            return seq as usize;
        }
        self.flags.push(point.flags);
        self.index.extend(point.index);
        self.level.extend(point.level);
        self.map.insert(key, self.flags.len() as u32 - 1);
        self.flags.len() - 1
    }

    ///
    /// Overwrites the point stored at `seq`, rehashing the map entry.
    ///
    pub fn update(&mut self, mut point: GridPoint, seq: usize) -> Result<(), GridError>
    {
        point.flags.update_is_inner(&point.level);
        let key: u64 = (&point).into();
        self.map.insert(key, seq as u32);
        self.index.chunks_exact_mut(self.num_inputs).nth(seq).ok_or(GridError::InvalidIndex)?.copy_from_slice(&point.index);
        self.level.chunks_exact_mut(self.num_inputs).nth(seq).ok_or(GridError::InvalidIndex)?.copy_from_slice(&point.level);
        self.flags[seq] = point.flags;
        Ok(())
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.map.contains_key(&point.into())
    }

    ///
    /// Hashed sequence-number lookup; `None` for points not in storage.
    ///
    #[inline]
    pub fn sequence_number(&self, point: &GridPoint) -> Option<usize>
    {
        self.map.get(&point.into()).map(|&v| v as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, point: &GridPoint) -> Option<GridPointMutRef<'_>>
    {
        if let Some(&seq) = self.map.get(&point.into())
        {
            let seq = seq as usize;
            Some(GridPointMutRef
            {
                index: &mut self.index[seq * self.num_inputs..(seq + 1) * self.num_inputs],
                level: &mut self.level[seq * self.num_inputs..(seq + 1) * self.num_inputs],
                flags: &mut self.flags[seq],
            })
        }
        else
        {
            None
        }
    }

    ///
    /// Removes the point appended last.
    ///
    pub fn delete_last(&mut self)
    {
        if self.is_empty()
        {
            return;
        }
        let seq = self.len() - 1;
        let key: u64 = (&self.point(seq)).into();
        self.map.remove(&key);
        self.flags.pop();
        self.index.truncate(seq * self.num_inputs);
        self.level.truncate(seq * self.num_inputs);
    }

    ///
    /// Deletes the given sequence numbers in one stable compaction pass.
    /// Remaining points keep their relative order and are renumbered
    /// densely; leaf flags are recomputed. Returns the old sequence numbers
    /// of the surviving points, in their new order.
    ///
    pub fn delete_points(&mut self, remove: &[usize]) -> Vec<usize>
    {
        let mut removed = vec![false; self.len()];
        for &seq in remove
        {
            removed[seq] = true;
        }
        let mut survivors = Vec::with_capacity(self.len());
        for seq in 0..self.len()
        {
            if !removed[seq]
            {
                survivors.push(seq);
            }
        }
        self.keep_points(&survivors);
        survivors
    }

    ///
    /// Rebuilds the storage onto the given old sequence numbers, in the
    /// given order, renumbering densely.
    ///
    pub(crate) fn keep_points(&mut self, keep: &[usize])
    {
        let mut indices = Vec::with_capacity(keep.len() * self.num_inputs);
        let mut levels = Vec::with_capacity(keep.len() * self.num_inputs);
        let mut flags = Vec::with_capacity(keep.len());
        for &i in keep
        {
            indices.extend(&self.index[i * self.num_inputs..(i + 1) * self.num_inputs]);
            levels.extend(&self.level[i * self.num_inputs..(i + 1) * self.num_inputs]);
            flags.push(self.flags[i]);
        }
        self.index = indices;
        self.level = levels;
        self.flags = flags;
        self.generate_map();
        self.recalc_leaf_property();
    }

    ///
    /// Rebuild the hash index from the stored points.
    ///
    pub fn generate_map(&mut self)
    {
        let mut map = FastU64Map::default();
        for (i, node) in self.nodes().enumerate()
        {
            map.insert(node.into(), i as u32);
        }
        self.map = map;
    }

    ///
    /// Recomputes the leaf flag of every point: a point is a leaf iff none
    /// of its children are stored in any dimension.
    ///
    pub fn recalc_leaf_property(&mut self)
    {
        #[allow(clippy::needless_range_loop)]
        for i in 0..self.len()
        {
            let point = self.point(i);
            let mut is_leaf = true;
            for dim in 0..self.num_inputs
            {
                if point.level[dim] > 0
                {
                    if self.map.contains_key(&point.left_child(dim).into())
                        || self.map.contains_key(&point.right_child(dim).into())
                    {
                        is_leaf = false;
                        break;
                    }
                }
                else
                {
                    // level-0 axis: the child is the level-1 midpoint
                    let mut child = point.clone();
                    child.level[dim] = 1;
                    child.index[dim] = 1;
                    if self.map.contains_key(&child.into())
                    {
                        is_leaf = false;
                        break;
                    }
                }
            }
            self.flags[i].set_is_leaf(is_leaf);
        }
    }

    pub fn nodes(&self) -> NodeIterator<'_>
    {
        NodeIterator::new(self)
    }

    ///
    /// Real coordinates of every node, in storage order.
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator::new(self)
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    #[inline]
    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        &mut self.bounding_box
    }

    ///
    /// Installs a non-uniform stretching. Bounding box and stretching are
    /// mutually exclusive; the stretching carries its own boundaries.
    ///
    pub fn set_stretching(&mut self, stretching: Stretching)
    {
        self.bounding_box = BoundingBox::new(&stretching.left_boundaries(), &stretching.right_boundaries());
        self.stretching = Some(stretching);
    }

    pub fn stretching(&self) -> Option<&Stretching>
    {
        self.stretching.as_ref()
    }

    pub fn uses_stretching(&self) -> bool
    {
        self.stretching.is_some()
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        let mut coor = vec![0.0; self.num_inputs];
        #[allow(clippy::needless_range_loop)]
        for d in 0..self.num_inputs
        {
            coor[d] = self.index[seq * self.num_inputs + d] as f64 / (1 << self.level[seq * self.num_inputs + d]) as f64;
        }
        coor
    }

    ///
    /// Coordinate of a stored point in dimension `d`, honoring stretching or
    /// bounding box.
    ///
    pub fn coordinate(&self, seq: usize, d: usize) -> f64
    {
        let level = self.level(seq, d) as i32;
        let index = self.index(seq, d);
        if let Some(stretching) = &self.stretching
        {
            stretching.coordinate(level, index, d)
        }
        else
        {
            let unit = index as f64 / (1 << level) as f64;
            self.bounding_box.lower[d] + self.bounding_box.width(d) * unit
        }
    }

    ///
    /// Writes the storage in the versioned text format: a header line
    /// `version dim size`, the domain block, then one line per point with
    /// the per-axis `level index` pairs followed by the leaf flag, in
    /// storage order.
    ///
    pub fn serialize_text(&self) -> String
    {
        let mut out = String::new();
        out.push_str(&format!("{} {} {}\n", SERIALIZATION_VERSION, self.num_inputs, self.len()));
        if let Some(stretching) = &self.stretching
        {
            stretching.serialize_text(&mut out);
        }
        else
        {
            out.push_str("0\n");
            for d in 0..self.num_inputs
            {
                out.push_str(&format!("{:e} {:e} {} {} ",
                    self.bounding_box.lower[d], self.bounding_box.upper[d],
                    self.bounding_box.dirichlet_left[d] as u8, self.bounding_box.dirichlet_right[d] as u8));
            }
            out.push('\n');
        }
        for seq in 0..self.len()
        {
            for d in 0..self.num_inputs
            {
                out.push_str(&format!("{} {} ", self.level(seq, d), self.index(seq, d)));
            }
            out.push_str(&format!("{}\n", self.flags[seq].is_leaf() as u8));
        }
        out
    }

    ///
    /// Parses the text format back into a storage with identical sequence
    /// numbering. Algorithmic dimensions are reset to all dimensions.
    ///
    pub fn deserialize_text(input: &str, num_outputs: usize) -> Result<Self, GridError>
    {
        let mut tokens = input.split_ascii_whitespace();
        let version: u32 = parse_token(&mut tokens)?;
        if version != SERIALIZATION_VERSION
        {
            return Err(GridError::UnsupportedSerializationVersion);
        }
        let dim: usize = parse_token(&mut tokens)?;
        let size: usize = parse_token(&mut tokens)?;
        let mode: u32 = parse_token(&mut tokens)?;

        let mut storage = GridStorage::new(dim, num_outputs);
        match mode
        {
            0 =>
            {
                for d in 0..dim
                {
                    storage.bounding_box.lower[d] = parse_token(&mut tokens)?;
                    storage.bounding_box.upper[d] = parse_token(&mut tokens)?;
                    storage.bounding_box.dirichlet_left[d] = next_token(&mut tokens)? == "1";
                    storage.bounding_box.dirichlet_right[d] = next_token(&mut tokens)? == "1";
                }
            }
            1 | 2 =>
            {
                let stretching = Stretching::deserialize_text(mode, dim, &mut tokens)?;
                storage.set_stretching(stretching);
            }
            _ => return Err(GridError::InvalidGridFile),
        }

        let mut level = vec![0u8; dim];
        let mut index = vec![0u32; dim];
        for _ in 0..size
        {
            for d in 0..dim
            {
                level[d] = parse_token(&mut tokens)?;
                index[d] = parse_token(&mut tokens)?;
            }
            let leaf = next_token(&mut tokens)? == "1";
            storage.insert_point(GridPoint::new(&level, &index, leaf));
            if level.contains(&0)
            {
                storage.has_boundary = true;
            }
        }
        if storage.len() != size
        {
            return Err(GridError::InvalidGridFile);
        }
        Ok(storage)
    }
}

pub(crate) fn next_token<'a, I: Iterator<Item = &'a str>>(tokens: &mut I) -> Result<&'a str, GridError>
{
    tokens.next().ok_or(GridError::InvalidGridFile)
}

pub(crate) fn parse_token<'a, T: std::str::FromStr, I: Iterator<Item = &'a str>>(tokens: &mut I) -> Result<T, GridError>
{
    next_token(tokens)?.parse().map_err(|_| GridError::InvalidGridFile)
}

pub struct NodeIterator<'a> {
    storage: &'a GridStorage,
    current_seq: usize,
}

impl<'a> NodeIterator<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = GridPointRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let start = self.current_seq * self.storage.num_inputs;
            let end = start + self.storage.num_inputs;
            self.current_seq += 1;
            Some((&self.storage.index[start..end], &self.storage.level[start..end], &self.storage.flags[self.current_seq - 1]).into())
        } else {
            None
        }
    }
}

pub struct PointIterator<'a> {
    pub storage: &'a GridStorage,
    current_seq: usize,
}

impl<'a> PointIterator<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl<'a> Iterator for PointIterator<'a> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let mut point = vec![0.0; self.storage.num_inputs];
            #[allow(clippy::needless_range_loop)]
            for d in 0..self.storage.num_inputs
            {
                point[d] = self.storage.coordinate(self.current_seq, d);
            }
            self.current_seq += 1;
            Some(point)
        } else {
            None
        }
    }
}

#[test]
fn check_insert_and_lookup()
{
    let mut storage = GridStorage::new(2, 1);
    let a = GridPoint::new(&[1, 1], &[1, 1], false);
    let b = GridPoint::new(&[2, 1], &[1, 1], true);
    assert_eq!(storage.insert_point(a.clone()), 0);
    assert_eq!(storage.insert_point(b.clone()), 1);
    // duplicate insert is a no-op returning the existing sequence number
    assert_eq!(storage.insert_point(a.clone()), 0);
    assert_eq!(storage.len(), 2);
    assert_eq!(storage.sequence_number(&a), Some(0));
    assert_eq!(storage.sequence_number(&b), Some(1));
    assert_eq!(storage.sequence_number(&GridPoint::new(&[2, 2], &[1, 1], false)), None);
}

#[test]
fn check_parent_child_navigation()
{
    let p = GridPoint::new(&[2, 3], &[3, 5], false);
    let left = p.left_child(0);
    assert_eq!(left.level[0], 3);
    assert_eq!(left.index[0], 5);
    let right = p.right_child(0);
    assert_eq!(right.index[0], 7);
    let parent = p.parent(0);
    assert_eq!(parent.level[0], 1);
    assert_eq!(parent.index[0], 1);
    // parent of (3,5) along dim 1 is (2,3)
    let parent1 = p.parent(1);
    assert_eq!(parent1.level[1], 2);
    assert_eq!(parent1.index[1], 3);
}

#[test]
fn check_delete_points_keeps_dense_numbering()
{
    let mut storage = GridStorage::new(1, 1);
    storage.insert_point(GridPoint::new(&[1], &[1], false));
    storage.insert_point(GridPoint::new(&[2], &[1], true));
    storage.insert_point(GridPoint::new(&[2], &[3], true));
    let survivors = storage.delete_points(&[1]);
    assert_eq!(survivors, vec![0, 2]);
    assert_eq!(storage.len(), 2);
    assert_eq!(storage.sequence_number(&GridPoint::new(&[1], &[1], false)), Some(0));
    assert_eq!(storage.sequence_number(&GridPoint::new(&[2], &[3], false)), Some(1));
    // (1,1) still has its right child, so it must not be a leaf
    assert!(!storage.is_leaf(0));
    assert!(storage.is_leaf(1));
}

#[test]
fn check_text_round_trip()
{
    let mut storage = GridStorage::new(2, 1);
    crate::generators::regular(&mut storage, &[3, 3], None).unwrap();
    let text = storage.serialize_text();
    let restored = GridStorage::deserialize_text(&text, 1).unwrap();
    assert_eq!(restored.len(), storage.len());
    for seq in 0..storage.len()
    {
        assert_eq!(restored.point(seq), storage.point(seq));
        assert_eq!(restored.is_leaf(seq), storage.is_leaf(seq));
    }
    // byte-stable round trip
    assert_eq!(restored.serialize_text(), text);
}
