//! Scanning the feasibility of downsampling target sizes.

use std::{collections::BTreeMap, fmt, ops::RangeInclusive};

use itertools::Itertools;

use crate::{array::Shape, matrix::AlleleMatrix};

/// A tuple of per-population target sample sizes, in population order.
///
/// Combinations order lexicographically, which fixes the row order of the
/// [`DownsamplingTable`] regardless of the number of populations.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SizeCombination(pub Vec<usize>);

impl SizeCombination {
    /// Returns the number of populations in the combination.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Returns the spectrum shape implied by the combination: each axis runs
    /// from zero to the target size inclusive.
    pub fn spectrum_shape(&self) -> Shape {
        Shape(self.0.iter().map(|&t| t + 1).collect())
    }
}

impl AsRef<[usize]> for SizeCombination {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for SizeCombination {
    fn from(sizes: Vec<usize>) -> Self {
        Self(sizes)
    }
}

impl<const N: usize> From<[usize; N]> for SizeCombination {
    fn from(sizes: [usize; N]) -> Self {
        Self(sizes.to_vec())
    }
}

impl fmt::Display for SizeCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0[0])?;
        for v in self.0.iter().skip(1) {
            write!(f, "/{v}")?;
        }
        Ok(())
    }
}

/// A parity restriction on candidate target sizes.
///
/// Scanning even sizes only keeps targets at diploid multiples.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Parity {
    /// Even sizes only.
    Even,
    /// Odd sizes only.
    Odd,
    /// No restriction.
    #[default]
    Any,
}

impl Parity {
    fn admits(self, size: usize) -> bool {
        match self {
            Parity::Even => size % 2 == 0,
            Parity::Odd => size % 2 == 1,
            Parity::Any => true,
        }
    }
}

/// The result of a feasibility scan: for each candidate size combination, the
/// number of sites where every population has at least that many non-missing
/// calls.
///
/// Counts are monotonically non-increasing in every component of the
/// combination.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DownsamplingTable {
    entries: BTreeMap<SizeCombination, usize>,
}

impl DownsamplingTable {
    /// Returns the feasible site count for a combination, if scanned.
    pub fn get(&self, combination: &SizeCombination) -> Option<usize> {
        self.entries.get(combination).copied()
    }

    /// Returns `true` if the table contains no combinations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the combinations and their feasible site
    /// counts, in lexicographic combination order.
    pub fn iter(&self) -> impl Iterator<Item = (&SizeCombination, usize)> {
        self.entries.iter().map(|(c, &n)| (c, n))
    }

    /// Returns the number of scanned combinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<(SizeCombination, usize)> for DownsamplingTable {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (SizeCombination, usize)>,
    {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Scans the feasibility of all candidate target size combinations.
///
/// One inclusive scan range is given per population, in population order; the
/// cartesian product of the admissible values is scanned. The scan only
/// counts, so it is deterministic and may be repeated freely.
pub fn scan(
    matrix: &AlleleMatrix,
    ranges: &[RangeInclusive<usize>],
    parity: Parity,
) -> Result<DownsamplingTable, ScanError> {
    if ranges.len() != matrix.populations() {
        return Err(ScanError::WrongNumberOfRanges {
            expected: matrix.populations(),
            actual: ranges.len(),
        });
    }

    let candidates = ranges
        .iter()
        .enumerate()
        .map(|(population, range)| {
            let values = range
                .clone()
                .filter(|&size| parity.admits(size))
                .collect::<Vec<_>>();

            if values.is_empty() {
                Err(ScanError::EmptyRange { population })
            } else {
                Ok(values)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(candidates
        .into_iter()
        .multi_cartesian_product()
        .map(|sizes| {
            let count = matrix.feasible_site_count(&sizes);
            (SizeCombination(sizes), count)
        })
        .collect())
}

/// An error associated with a feasibility scan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanError {
    /// The number of scan ranges does not match the number of populations.
    WrongNumberOfRanges {
        /// The number of populations in the matrix.
        expected: usize,
        /// The number of ranges provided.
        actual: usize,
    },
    /// A scan range admits no sizes under the requested parity.
    EmptyRange {
        /// The index of the offending population.
        population: usize,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::WrongNumberOfRanges { expected, actual } => write!(
                f,
                "expected one scan range per population ({expected}), found {actual}"
            ),
            ScanError::EmptyRange { population } => {
                write!(f, "scan range for population {population} admits no sizes")
            }
        }
    }
}

impl std::error::Error for ScanError {}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::matrix::MISSING;

    fn matrix() -> AlleleMatrix {
        // Two populations with 4 and 3 haploid rows; coverage per site:
        // site 0: (4, 3), site 1: (3, 3), site 2: (2, 1)
        let columns = vec![
            vec![0, 0, 1, 1, 0, 1, 1],
            vec![0, 1, 1, MISSING, 1, 0, 0],
            vec![0, 1, MISSING, MISSING, MISSING, MISSING, 1],
        ];

        AlleleMatrix::from_columns(columns, &[4, 3]).unwrap()
    }

    #[test]
    fn test_scan_counts() -> Result<(), ScanError> {
        let table = scan(&matrix(), &[2..=4, 1..=3], Parity::Any)?;

        assert_eq!(table.len(), 9);
        assert_eq!(table.get(&SizeCombination::from([2, 1])), Some(3));
        assert_eq!(table.get(&SizeCombination::from([2, 2])), Some(2));
        assert_eq!(table.get(&SizeCombination::from([3, 3])), Some(2));
        assert_eq!(table.get(&SizeCombination::from([4, 3])), Some(1));
        assert_eq!(table.get(&SizeCombination::from([4, 1])), Some(1));

        Ok(())
    }

    #[test]
    fn test_scan_is_monotone_non_increasing() -> Result<(), ScanError> {
        let table = scan(&matrix(), &[1..=4, 1..=3], Parity::Any)?;

        for (combination, count) in table.iter() {
            for axis in 0..combination.dimensions() {
                let mut larger = combination.clone();
                larger.0[axis] += 1;

                if let Some(larger_count) = table.get(&larger) {
                    assert!(
                        larger_count <= count,
                        "count increased from {combination} to {larger}"
                    );
                }
            }
        }

        Ok(())
    }

    #[test]
    fn test_scan_parity() -> Result<(), ScanError> {
        let table = scan(&matrix(), &[2..=4, 1..=3], Parity::Even)?;

        assert_eq!(table.len(), 2);
        assert!(table.get(&SizeCombination::from([2, 2])).is_some());
        assert!(table.get(&SizeCombination::from([4, 2])).is_some());
        assert!(table.get(&SizeCombination::from([3, 2])).is_none());

        Ok(())
    }

    #[test]
    fn test_scan_empty_range() {
        assert_eq!(
            scan(&matrix(), &[2..=4, 1..=1], Parity::Even),
            Err(ScanError::EmptyRange { population: 1 })
        );
    }

    #[test]
    fn test_scan_wrong_number_of_ranges() {
        assert_eq!(
            scan(&matrix(), &[2..=4], Parity::Any),
            Err(ScanError::WrongNumberOfRanges {
                expected: 2,
                actual: 1
            })
        );
    }
}
