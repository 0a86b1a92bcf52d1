/// Integer coordinates `(i, j, k)` of a bin in the spatial grid, each in `[0, 2U)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridCell {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl GridCell {
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.i, self.j, self.k]
    }
}

impl From<[usize; 3]> for GridCell {
    fn from([i, j, k]: [usize; 3]) -> Self {
        Self { i, j, k }
    }
}
