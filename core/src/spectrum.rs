//! Joint site frequency spectra assembled from projected allele counts.

use std::{
    fmt, io,
    ops::{AddAssign, Index, IndexMut},
};

pub mod stat;

use crate::{
    array::{Array, Shape, ShapeError},
    project::ProjectedReplicate,
    scan::SizeCombination,
};

/// An allele count tuple: the number of derived alleles in each population at
/// a single site, in population order.
///
/// A count doubles as an index into a [`Spectrum`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Count(pub Vec<usize>);

impl Count {
    /// Returns the number of populations in the count.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[usize]> for Count {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Count {
    fn from(count: Vec<usize>) -> Self {
        Self(count)
    }
}

impl<const N: usize> From<[usize; N]> for Count {
    fn from(count: [usize; N]) -> Self {
        Self(count.to_vec())
    }
}

/// A joint site frequency spectrum over one or more populations.
///
/// Axis order is population order; axis `i` runs from zero to the target size
/// of population `i` inclusive. Cell values are site counts, or frequencies
/// after [`Spectrum::normalized`].
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    array: Array<f64>,
}

impl Spectrum {
    /// Returns the number of dimensions (populations) of the spectrum.
    pub fn dimensions(&self) -> usize {
        self.array.dimensions()
    }

    /// Returns the number of cells.
    pub fn elements(&self) -> usize {
        self.array.elements()
    }

    /// Accumulates the sites of a projected replicate into a spectrum with
    /// the shape implied by the targets.
    ///
    /// Each site increments the cell addressed by its allele count tuple, so
    /// the total mass of the spectrum equals the number of retained sites.
    pub fn from_replicate(replicate: &ProjectedReplicate, targets: &SizeCombination) -> Self {
        let mut spectrum = Self::from_zeros(targets.spectrum_shape());

        for count in replicate.sites() {
            spectrum += count;
        }

        spectrum
    }

    /// Creates a spectrum of zeros.
    pub fn from_zeros<S>(shape: S) -> Self
    where
        Shape: From<S>,
    {
        Self {
            array: Array::from_zeros(shape),
        }
    }

    /// Returns the backing array.
    pub fn inner(&self) -> &Array<f64> {
        &self.array
    }

    /// Returns an iterator over the cells in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.array.iter()
    }

    /// Sums the spectrum over the given axes, leaving the spectrum of the
    /// remaining populations.
    ///
    /// Summing over an axis is exactly the "ignore this population" folding
    /// used for pairwise spectra.
    pub fn marginalize(&self, axes: &[usize]) -> Result<Self, MarginalizationError> {
        if let Some(&duplicate) = axes
            .iter()
            .enumerate()
            .find_map(|(i, axis)| axes[i + 1..].contains(axis).then_some(axis))
        {
            return Err(MarginalizationError::DuplicateAxis { axis: duplicate });
        }

        if let Some(&out_of_bounds) = axes.iter().find(|&&axis| axis >= self.dimensions()) {
            return Err(MarginalizationError::AxisOutOfBounds {
                axis: out_of_bounds,
                dimensions: self.dimensions(),
            });
        }

        if axes.len() >= self.dimensions() {
            return Err(MarginalizationError::TooManyAxes {
                axes: axes.len(),
                dimensions: self.dimensions(),
            });
        }

        let mut sorted = axes.to_vec();
        sorted.sort_unstable();

        // Summing out axes one by one shifts the later axes down, so offset
        // each by the number already removed
        let mut array = self.array.clone();
        for (removed, axis) in sorted.into_iter().enumerate() {
            array = array.sum_axis(axis - removed);
        }

        Ok(Self { array })
    }

    /// Creates a spectrum from data and a shape.
    pub fn new<D, S>(data: D, shape: S) -> Result<Self, ShapeError>
    where
        Vec<f64>: From<D>,
        Shape: From<S>,
    {
        Array::new(data, shape).map(|array| Self { array })
    }

    /// Returns the spectrum normalized to frequencies.
    ///
    /// An empty spectrum normalizes to itself.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if sum == 0.0 {
            return self.clone();
        }

        let mut array = self.array.clone();
        array.iter_mut().for_each(|v| *v /= sum);

        Self { array }
    }

    /// Reads a spectrum from the numpy npy format.
    pub fn read_npy<R>(reader: R) -> io::Result<Self>
    where
        R: io::BufRead,
    {
        Array::read_npy(reader).map(|array| Self { array })
    }

    /// Returns the shape of the spectrum.
    pub fn shape(&self) -> &Shape {
        self.array.shape()
    }

    /// Returns the total mass of the spectrum.
    pub fn sum(&self) -> f64 {
        self.array.iter().sum()
    }

    /// Writes the spectrum in the numpy npy format.
    pub fn write_npy<W>(&self, writer: W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.array.write_npy(writer)
    }
}

impl AddAssign<&Count> for Spectrum {
    fn add_assign(&mut self, count: &Count) {
        self[count] += 1.0;
    }
}

impl<I> Index<I> for Spectrum
where
    I: AsRef<[usize]>,
{
    type Output = f64;

    fn index(&self, index: I) -> &Self::Output {
        self.array.index(index)
    }
}

impl<I> IndexMut<I> for Spectrum
where
    I: AsRef<[usize]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        self.array.index_mut(index)
    }
}

/// The spectra assembled from a single projected replicate: the full joint
/// spectrum across all populations plus one two-population spectrum per
/// unordered population pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicateSpectra {
    replicate: usize,
    msfs: Spectrum,
    pairwise: Vec<PairwiseSpectrum>,
}

impl ReplicateSpectra {
    /// Assembles the spectra for one projected replicate.
    ///
    /// Pairwise spectra are the marginalizations of the full spectrum onto
    /// each unordered pair of populations, in pair-lexicographic order.
    pub fn assemble(replicate: &ProjectedReplicate, targets: &SizeCombination) -> Self {
        let msfs = Spectrum::from_replicate(replicate, targets);
        let dimensions = targets.dimensions();

        let mut pairwise = Vec::new();
        for first in 0..dimensions {
            for second in first + 1..dimensions {
                let others = (0..dimensions)
                    .filter(|&axis| axis != first && axis != second)
                    .collect::<Vec<_>>();

                let spectrum = msfs
                    .marginalize(&others)
                    .expect("pair axes within mSFS dimensions");

                pairwise.push(PairwiseSpectrum {
                    populations: (first, second),
                    spectrum,
                });
            }
        }

        Self {
            replicate: replicate.replicate(),
            msfs,
            pairwise,
        }
    }

    /// Assembles the spectra for every projected replicate, preserving
    /// replicate order.
    pub fn assemble_all(
        replicates: &[ProjectedReplicate],
        targets: &SizeCombination,
    ) -> Vec<Self> {
        replicates
            .iter()
            .map(|replicate| Self::assemble(replicate, targets))
            .collect()
    }

    /// Returns the full joint spectrum across all populations.
    pub fn msfs(&self) -> &Spectrum {
        &self.msfs
    }

    /// Returns the pairwise spectra in pair-lexicographic order.
    pub fn pairwise(&self) -> &[PairwiseSpectrum] {
        &self.pairwise
    }

    /// Returns the replicate index.
    pub fn replicate(&self) -> usize {
        self.replicate
    }
}

/// A two-population joint spectrum for an unordered population pair.
#[derive(Clone, Debug, PartialEq)]
pub struct PairwiseSpectrum {
    populations: (usize, usize),
    spectrum: Spectrum,
}

impl PairwiseSpectrum {
    /// Returns the population indices of the pair, with the smaller first.
    pub fn populations(&self) -> (usize, usize) {
        self.populations
    }

    /// Returns the spectrum of the pair.
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }
}

/// An error associated with marginalizing a spectrum.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MarginalizationError {
    /// An axis was given more than once.
    DuplicateAxis {
        /// The duplicated axis.
        axis: usize,
    },
    /// An axis is out of bounds.
    AxisOutOfBounds {
        /// The offending axis.
        axis: usize,
        /// The number of dimensions of the spectrum.
        dimensions: usize,
    },
    /// Marginalizing the given axes would leave no spectrum.
    TooManyAxes {
        /// The number of axes given.
        axes: usize,
        /// The number of dimensions of the spectrum.
        dimensions: usize,
    },
}

impl fmt::Display for MarginalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginalizationError::DuplicateAxis { axis } => {
                write!(f, "cannot marginalize with duplicate axis {axis}")
            }
            MarginalizationError::AxisOutOfBounds { axis, dimensions } => write!(
                f,
                "cannot marginalize axis {axis} in spectrum with {dimensions} dimensions"
            ),
            MarginalizationError::TooManyAxes { axes, dimensions } => write!(
                f,
                "cannot marginalize {axes} axes in spectrum with {dimensions} dimensions"
            ),
        }
    }
}

impl std::error::Error for MarginalizationError {}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    use crate::{
        matrix::{AlleleMatrix, MISSING},
        project::Projector,
    };

    fn spectrum_from_range(n: usize, shape: impl Into<Shape>) -> Spectrum {
        Spectrum::new((0..n).map(|v| v as f64).collect::<Vec<_>>(), shape.into()).unwrap()
    }

    #[test]
    fn test_marginalize_2d() {
        let spectrum = spectrum_from_range(9, [3, 3]);

        assert_eq!(
            spectrum.marginalize(&[0]).unwrap(),
            Spectrum::new(vec![9., 12., 15.], 3).unwrap()
        );
        assert_eq!(
            spectrum.marginalize(&[1]).unwrap(),
            Spectrum::new(vec![3., 12., 21.], 3).unwrap()
        );
    }

    #[test]
    fn test_marginalize_3d_to_pair() {
        let spectrum = spectrum_from_range(27, [3, 3, 3]);

        assert_eq!(
            spectrum.marginalize(&[1]).unwrap(),
            Spectrum::new(vec![9., 12., 15., 36., 39., 42., 63., 66., 69.], [3, 3]).unwrap()
        );
    }

    #[test]
    fn test_marginalize_order_does_not_matter() {
        let spectrum = spectrum_from_range(27, [3, 3, 3]);
        let expected = Spectrum::new(vec![90., 117., 144.], 3).unwrap();

        assert_eq!(spectrum.marginalize(&[0, 2]).unwrap(), expected);
        assert_eq!(spectrum.marginalize(&[2, 0]).unwrap(), expected);
    }

    #[test]
    fn test_marginalize_errors() {
        let spectrum = spectrum_from_range(9, [3, 3]);

        assert_eq!(
            spectrum.marginalize(&[1, 1]),
            Err(MarginalizationError::DuplicateAxis { axis: 1 })
        );
        assert_eq!(
            spectrum.marginalize(&[2]),
            Err(MarginalizationError::AxisOutOfBounds {
                axis: 2,
                dimensions: 2
            })
        );
        assert_eq!(
            spectrum.marginalize(&[0, 1]),
            Err(MarginalizationError::TooManyAxes {
                axes: 2,
                dimensions: 2
            })
        );
    }

    #[test]
    fn test_normalized() {
        let spectrum = Spectrum::new(vec![1., 3., 0., 4.], [2, 2]).unwrap();
        let normalized = spectrum.normalized();

        assert_approx_eq!(normalized.sum(), 1.0);
        assert_approx_eq!(normalized[[0, 1]], 0.375);
    }

    #[test]
    fn test_normalized_empty() {
        let spectrum = Spectrum::from_zeros([3, 3]);

        assert_eq!(spectrum.normalized(), spectrum);
    }

    fn projected() -> (AlleleMatrix, SizeCombination) {
        let columns = vec![
            vec![0, 0, 1, 1, 0, 1, 1, MISSING],
            vec![0, 1, 1, 1, 1, 0, 0, 0],
            vec![0, 0, 0, 1, 1, 1, MISSING, MISSING],
        ];

        let matrix = AlleleMatrix::from_columns(columns, &[4, 4]).unwrap();
        (matrix, SizeCombination::from([3, 2]))
    }

    #[test]
    fn test_assemble_mass_equals_retained_sites() {
        let (matrix, targets) = projected();
        let projector =
            Projector::new(&matrix, targets.clone(), NonZeroUsize::new(4).unwrap(), 99).unwrap();

        let replicates = projector.project();
        let assembled = ReplicateSpectra::assemble_all(&replicates, &targets);

        for (replicate, spectra) in replicates.iter().zip(assembled) {
            assert_approx_eq!(spectra.msfs().sum(), replicate.len() as f64);

            for pair in spectra.pairwise() {
                assert_approx_eq!(pair.spectrum().sum(), replicate.len() as f64);
            }
        }
    }

    #[test]
    fn test_assemble_shapes_and_pairs() {
        let targets = SizeCombination::from([4, 3, 3]);
        let replicate = ProjectedReplicate::from_counts(
            0,
            vec![Count::from([0, 1, 2]), Count::from([4, 3, 0])],
        );

        let spectra = ReplicateSpectra::assemble(&replicate, &targets);

        assert_eq!(spectra.msfs().shape(), &Shape(vec![5, 4, 4]));
        assert_eq!(spectra.msfs()[[0, 1, 2]], 1.0);
        assert_eq!(spectra.msfs()[[4, 3, 0]], 1.0);

        let pairs = spectra
            .pairwise()
            .iter()
            .map(PairwiseSpectrum::populations)
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);

        let first = &spectra.pairwise()[0];
        assert_eq!(first.spectrum().shape(), &Shape(vec![5, 4]));
        assert_eq!(first.spectrum()[[0, 1]], 1.0);
        assert_eq!(first.spectrum()[[4, 3]], 1.0);
    }
}
