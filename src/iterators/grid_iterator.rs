use crate::storage::{GridPoint, GridStorage};

///
/// Cursor over a grid storage. Navigation is pure (level, index) arithmetic
/// on the current point; only the sequence-number lookup touches the hash
/// index. The current point need not be stored, in which case `seq()` is
/// `None`. Moving the cursor never mutates storage.
///
pub trait GridIterator
{
    fn point(&self) -> &GridPoint;
    fn point_index(&self, dim: usize) -> u32;
    /// Sequence number of the current point, `None` if it is not stored.
    fn seq(&self) -> Option<usize>;
    fn reset_to_level_zero(&mut self) -> bool;
    fn reset_to_left_level_zero(&mut self, dim: usize) -> bool;
    fn reset_to_right_level_zero(&mut self, dim: usize) -> bool;
    fn reset_to_level_one(&mut self, dim: usize) -> bool;
    fn left_child(&mut self, dim: usize) -> bool;
    fn right_child(&mut self, dim: usize) -> bool;
    fn step_left(&mut self, dim: usize) -> bool;
    fn step_right(&mut self, dim: usize) -> bool;
    fn up(&mut self, dim: usize) -> bool;
    fn is_inner_point(&self) -> bool;
    /// Leaf hint used to prune recursion: true when the current point has
    /// no children in storage (or is itself absent).
    fn is_leaf(&self) -> bool;
}

pub struct HashGridIterator<'a>
{
    pub(crate) storage: &'a GridStorage,
    point: GridPoint,
    seq: Option<usize>,
}

impl<'a> HashGridIterator<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        let point = if storage.is_empty()
        {
            GridPoint::new(&vec![1; storage.num_inputs()], &vec![1; storage.num_inputs()], false)
        }
        else
        {
            storage.point(0)
        };
        let seq = storage.sequence_number(&point);
        Self { storage, point, seq }
    }

    pub fn set_point(&mut self, point: GridPoint)
    {
        self.point = point;
        self.seq = self.storage.sequence_number(&self.point);
    }

    ///
    /// Moves to the root (level 1, index 1) in every dimension.
    ///
    pub fn reset_to_root(&mut self) -> bool
    {
        self.point.level.fill(1);
        self.point.index.fill(1);
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }
}

impl GridIterator for HashGridIterator<'_>
{
    #[inline(always)]
    fn point(&self) -> &GridPoint
    {
        &self.point
    }

    fn point_index(&self, dim: usize) -> u32
    {
        self.point.index[dim]
    }

    #[inline(always)]
    fn seq(&self) -> Option<usize>
    {
        self.seq
    }

    fn reset_to_level_zero(&mut self) -> bool
    {
        self.point.index.fill(0);
        self.point.level.fill(0);
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn reset_to_left_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 0;
        self.point.index[dim] = 0;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn reset_to_right_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 0;
        self.point.index[dim] = 1;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn reset_to_level_one(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 1;
        self.point.index[dim] = 1;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn left_child(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        if i == 0
        {
            self.seq = None;
            return false;
        }
        self.point.level[dim] += 1;
        self.point.index[dim] = 2 * i - 1;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn right_child(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        self.point.level[dim] += 1;
        self.point.index[dim] = 2 * i + 1;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    ///
    /// Moves to the left sibling on the same level (index - 2).
    ///
    fn step_left(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        if i < 2
        {
            self.seq = None;
            return false;
        }
        self.point.index[dim] = i - 2;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    ///
    /// Moves to the right sibling on the same level (index + 2).
    ///
    fn step_right(&mut self, dim: usize) -> bool
    {
        self.point.index[dim] += 2;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn up(&mut self, dim: usize) -> bool
    {
        let l = self.point.level[dim];
        if l == 0
        {
            self.seq = None;
            return false;
        }
        let mut i = self.point.index[dim];
        i /= 2;
        i += if i % 2 == 0 { 1 } else { 0 };
        self.point.level[dim] = l - 1;
        self.point.index[dim] = i;
        self.seq = self.storage.sequence_number(&self.point);
        self.seq.is_some()
    }

    fn is_inner_point(&self) -> bool
    {
        self.point.is_inner_point()
    }

    fn is_leaf(&self) -> bool
    {
        if let Some(seq) = self.seq
        {
            self.storage.is_leaf(seq)
        }
        else
        {
            true
        }
    }
}

#[test]
fn check_navigation_matches_point_arithmetic()
{
    let mut storage = GridStorage::new(1, 1);
    crate::generators::regular(&mut storage, &[3], None).unwrap();
    let mut it = HashGridIterator::new(&storage);
    it.reset_to_level_one(0);
    assert_eq!(it.seq(), storage.sequence_number(&GridPoint::new(&[1], &[1], false)));
    assert!(it.left_child(0));
    assert_eq!(it.point().level[0], 2);
    assert_eq!(it.point().index[0], 1);
    assert!(it.step_right(0));
    assert_eq!(it.point().index[0], 3);
    assert!(it.up(0));
    assert_eq!(it.point().level[0], 1);
    assert_eq!(it.point().index[0], 1);
}

#[test]
fn check_seq_is_none_off_grid()
{
    let mut storage = GridStorage::new(1, 1);
    crate::generators::regular(&mut storage, &[2], None).unwrap();
    let mut it = HashGridIterator::new(&storage);
    it.reset_to_level_one(0);
    it.left_child(0);
    // level 3 is not stored
    assert!(!it.left_child(0));
    assert!(it.seq().is_none());
    assert!(it.is_leaf());
}
