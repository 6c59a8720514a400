use crate::descriptor::AXES;
use crate::error::{MetaError, Result};

/// An axis-aligned block of an image: start index and extent per axis.
///
/// At most five axes (X, Y, Z, T, C). Axes the region does not name are
/// index 0, extent 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    index: Vec<usize>,
    size: Vec<usize>,
}

impl Region {
    pub fn new(index: impl Into<Vec<usize>>, size: impl Into<Vec<usize>>) -> Result<Self> {
        let index = index.into();
        let size = size.into();
        if index.len() != size.len() {
            return Err(MetaError::InvalidRegion(format!(
                "{} start indices for {} extents",
                index.len(),
                size.len()
            )));
        }
        if size.len() > AXES {
            return Err(MetaError::InvalidRegion(format!(
                "{} dimensions requested, at most {AXES} supported",
                size.len()
            )));
        }
        Ok(Self { index, size })
    }

    /// A region starting at the origin.
    pub fn from_size(size: impl Into<Vec<usize>>) -> Result<Self> {
        let size = size.into();
        Self::new(vec![0; size.len()], size)
    }

    /// A full five-axis region. Cannot fail.
    pub fn from_axes(index: [usize; AXES], size: [usize; AXES]) -> Self {
        Self {
            index: index.to_vec(),
            size: size.to_vec(),
        }
    }

    /// Number of axes the region was declared with.
    pub fn dimension(&self) -> usize {
        self.size.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn size(&self) -> &[usize] {
        &self.size
    }

    /// Start indices padded to five axes with 0.
    pub fn padded_index(&self) -> [usize; AXES] {
        let mut padded = [0; AXES];
        padded[..self.index.len()].copy_from_slice(&self.index);
        padded
    }

    /// Extents padded to five axes with 1.
    pub fn padded_size(&self) -> [usize; AXES] {
        let mut padded = [1; AXES];
        padded[..self.size.len()].copy_from_slice(&self.size);
        padded
    }

    /// Total number of pixels covered, `None` if it overflows `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        checked_product(&self.size)
    }

    /// Number of XY planes covered: the product of the extents beyond Y.
    pub fn plane_count(&self) -> Option<usize> {
        checked_product(self.size.get(2..).unwrap_or(&[]))
    }
}

fn checked_product(extents: &[usize]) -> Option<usize> {
    extents.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}
