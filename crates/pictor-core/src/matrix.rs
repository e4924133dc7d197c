//! Dense 2-D matrix used as scratch storage
//!
//! Backs the projection accumulator of the skew estimator and the label
//! table of the connected-components pass. Elements are stored row-major.

use crate::error::{Error, Result};

/// Dense `columns` x `rows` matrix.
#[derive(Debug, Clone)]
pub struct Matrix<T> {
    columns: usize,
    rows: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Allocate a matrix filled with the default element.
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidDimension {
                width: columns,
                height: rows,
            });
        }
        Ok(Matrix {
            columns,
            rows,
            data: vec![T::default(); columns * rows],
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn get(&self, x: usize, y: usize) -> Result<T> {
        if x >= self.columns || y >= self.rows {
            return Err(Error::MatrixOutOfRange {
                x,
                y,
                columns: self.columns,
                rows: self.rows,
            });
        }
        Ok(self.data[y * self.columns + x])
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<()> {
        if x >= self.columns || y >= self.rows {
            return Err(Error::MatrixOutOfRange {
                x,
                y,
                columns: self.columns,
                rows: self.rows,
            });
        }
        self.data[y * self.columns + x] = value;
        Ok(())
    }

    /// Unchecked row view, for hot loops that have validated bounds.
    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.columns..(y + 1) * self.columns]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.data[y * self.columns..(y + 1) * self.columns]
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_extent() {
        assert!(Matrix::<u16>::new(0, 4).is_err());
        assert!(Matrix::<u16>::new(4, 0).is_err());
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut m = Matrix::<u16>::new(4, 3).unwrap();
        m.set(2, 1, 42).unwrap();
        assert_eq!(m.get(2, 1).unwrap(), 42);
        assert_eq!(m.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let m = Matrix::<u16>::new(4, 3).unwrap();
        assert!(m.get(4, 0).is_err());
        assert!(m.get(0, 3).is_err());
    }

    #[test]
    fn test_row_views() {
        let mut m = Matrix::<u16>::new(3, 2).unwrap();
        m.row_mut(1).copy_from_slice(&[7, 8, 9]);
        assert_eq!(m.row(1), &[7, 8, 9]);
        assert_eq!(m.row(0), &[0, 0, 0]);
    }
}
