//! A dense, row-major n-dimensional array used to back spectra.

use std::{
    fmt, io,
    ops::{Index, IndexMut},
};

pub mod npy;

/// A dense n-dimensional array in row-major (C) order.
#[derive(Clone, Debug, PartialEq)]
pub struct Array<T> {
    data: Vec<T>,
    shape: Shape,
}

impl<T> Array<T> {
    /// Returns the underlying data as a flat slice in row-major order.
    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Returns the underlying data as a mutable flat slice in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// Returns the number of dimensions of the array.
    pub fn dimensions(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements in the array.
    pub fn elements(&self) -> usize {
        self.data.len()
    }

    /// Creates a new array filled with copies of a single element.
    pub fn from_element<S>(element: T, shape: S) -> Self
    where
        T: Clone,
        Shape: From<S>,
    {
        let shape = Shape::from(shape);
        let elements = shape.elements();

        Self {
            data: vec![element; elements],
            shape,
        }
    }

    /// Returns the element at the index, if it exists.
    pub fn get<I>(&self, index: I) -> Option<&T>
    where
        I: AsRef<[usize]>,
    {
        self.shape
            .flat_index(index.as_ref())
            .and_then(|flat| self.data.get(flat))
    }

    /// Returns a mutable reference to the element at the index, if it exists.
    pub fn get_mut<I>(&mut self, index: I) -> Option<&mut T>
    where
        I: AsRef<[usize]>,
    {
        self.shape
            .flat_index(index.as_ref())
            .and_then(|flat| self.data.get_mut(flat))
    }

    /// Returns an iterator over the elements in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Returns an iterator over the array indices in row-major order.
    pub fn iter_indices(&self) -> IndicesIter<'_> {
        IndicesIter::new(&self.shape)
    }

    /// Returns a mutable iterator over the elements in row-major order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Creates a new array from data and a shape.
    ///
    /// The number of elements in the data must match the number of elements
    /// implied by the shape.
    pub fn new<D, S>(data: D, shape: S) -> Result<Self, ShapeError>
    where
        Vec<T>: From<D>,
        Shape: From<S>,
    {
        let data = Vec::from(data);
        let shape = Shape::from(shape);

        if data.len() == shape.elements() {
            Ok(Self { data, shape })
        } else {
            Err(ShapeError {
                shape,
                n: data.len(),
            })
        }
    }

    /// Returns the shape of the array.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl Array<f64> {
    /// Creates a new array of zeros.
    pub fn from_zeros<S>(shape: S) -> Self
    where
        Shape: From<S>,
    {
        Self::from_element(0.0, shape)
    }

    /// Reads an array from the numpy npy format.
    pub fn read_npy<R>(mut reader: R) -> io::Result<Self>
    where
        R: io::BufRead,
    {
        npy::read_array(&mut reader)
    }

    /// Sums the array over an axis, returning an array with one dimension less.
    pub fn sum_axis(&self, axis: usize) -> Self {
        assert!(axis < self.dimensions(), "axis out of bounds");

        let mut shape = self.shape.0.clone();
        shape.remove(axis);
        let mut out = Array::from_zeros(Shape(shape));

        for (value, mut index) in self.iter().zip(self.iter_indices()) {
            index.remove(axis);
            out[&index] += value;
        }

        out
    }

    /// Writes the array in the numpy npy format.
    pub fn write_npy<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: io::Write,
    {
        npy::write_array(&mut writer, self)
    }
}

impl<T, I> Index<I> for Array<T>
where
    I: AsRef<[usize]>,
{
    type Output = T;

    fn index(&self, index: I) -> &Self::Output {
        self.get(index)
            .expect("index invalid dimension or out of bounds")
    }
}

impl<T, I> IndexMut<I> for Array<T>
where
    I: AsRef<[usize]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        self.get_mut(index)
            .expect("index invalid dimension or out of bounds")
    }
}

/// The shape of an array: the extent of each of its axes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Returns the number of elements implied by the shape.
    pub fn elements(&self) -> usize {
        self.iter().product()
    }

    /// Returns the number of axes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the shape has no axes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the axis extents.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    pub(crate) fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.0.len() {
            return None;
        }

        let mut flat = 0;
        for (&i, &n) in index.iter().zip(self.0.iter()) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }

        Some(flat)
    }

    pub(crate) fn index_from_flat(&self, mut flat: usize) -> Vec<usize> {
        let mut n = self.elements();
        let mut index = vec![0; self.len()];
        for (i, v) in self.iter().enumerate() {
            n /= v;
            index[i] = flat / n;
            flat %= n;
        }
        index
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(shape: [usize; N]) -> Self {
        Self(shape.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(shape: usize) -> Self {
        Self(vec![shape])
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0[0])?;
        for v in self.iter().skip(1) {
            write!(f, "/{v}")?;
        }
        Ok(())
    }
}

/// An iterator over the indices of an array in row-major order.
#[derive(Debug)]
pub struct IndicesIter<'a> {
    shape: &'a Shape,
    index: usize,
    total: usize,
}

impl<'a> IndicesIter<'a> {
    fn new(shape: &'a Shape) -> Self {
        Self {
            shape,
            index: 0,
            total: shape.elements(),
        }
    }
}

impl<'a> Iterator for IndicesIter<'a> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        (self.index < self.total).then(|| {
            self.index += 1;
            self.shape.index_from_flat(self.index - 1)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.total - self.index;
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for IndicesIter<'a> {}

/// An error associated with the construction of an array with mismatching
/// data and shape.
#[derive(Debug)]
pub struct ShapeError {
    shape: Shape,
    n: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ShapeError { shape, n } = self;
        write!(
            f,
            "cannot construct array with shape {shape} from {n} elements"
        )
    }
}

impl std::error::Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index() {
        let shape = Shape(vec![3, 3, 4]);

        assert_eq!(shape.flat_index(&[0, 0, 0]), Some(0));
        assert_eq!(shape.flat_index(&[0, 0, 3]), Some(3));
        assert_eq!(shape.flat_index(&[0, 1, 0]), Some(4));
        assert_eq!(shape.flat_index(&[2, 2, 3]), Some(35));
        assert_eq!(shape.flat_index(&[3, 0, 0]), None);
        assert_eq!(shape.flat_index(&[0, 0]), None);
    }

    #[test]
    fn test_index_from_flat() {
        let shape = Shape(vec![3, 3, 4]);

        assert_eq!(shape.index_from_flat(0), vec![0, 0, 0]);
        assert_eq!(shape.index_from_flat(1), vec![0, 0, 1]);
        assert_eq!(shape.index_from_flat(4), vec![0, 1, 0]);
        assert_eq!(shape.index_from_flat(35), vec![2, 2, 3]);
    }

    #[test]
    fn test_iter_indices_2d() {
        let array = Array::from_zeros(Shape(vec![2, 3]));
        let mut iter = array.iter_indices();

        assert_eq!(iter.len(), 6);
        assert_eq!(iter.next(), Some(vec![0, 0]));
        assert_eq!(iter.next(), Some(vec![0, 1]));
        assert_eq!(iter.next(), Some(vec![0, 2]));
        assert_eq!(iter.next(), Some(vec![1, 0]));
        assert_eq!(iter.next(), Some(vec![1, 1]));
        assert_eq!(iter.next(), Some(vec![1, 2]));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_sum_axis_2d() {
        let array = Array::new((0..9).map(|v| v as f64).collect::<Vec<_>>(), [3, 3]).unwrap();

        assert_eq!(array.sum_axis(0), Array::new(vec![9., 12., 15.], 3).unwrap());
        assert_eq!(array.sum_axis(1), Array::new(vec![3., 12., 21.], 3).unwrap());
    }

    #[test]
    fn test_sum_axis_3d() {
        let array = Array::new((0..27).map(|v| v as f64).collect::<Vec<_>>(), [3, 3, 3]).unwrap();

        assert_eq!(
            array.sum_axis(1),
            Array::new(vec![9., 12., 15., 36., 39., 42., 63., 66., 69.], [3, 3]).unwrap()
        );
    }

    #[test]
    fn test_new_shape_mismatch() {
        assert!(Array::new(vec![0.0; 5], [2, 3]).is_err());
    }
}
