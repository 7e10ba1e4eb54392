//! Scalar summary statistics of assembled spectra.

use std::fmt;

use super::Spectrum;

/// Expected heterozygosity of a single population.
///
/// Computed from the normalized one-dimensional spectrum as the average
/// pairwise difference per site, Σ fᵢ · i(n−i) / C(n, 2).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Heterozygosity(pub f64);

impl Heterozygosity {
    /// Computes the heterozygosity of a one-dimensional spectrum.
    pub fn from_spectrum(spectrum: &Spectrum) -> Result<Self, DimensionError> {
        if spectrum.dimensions() != 1 {
            return Err(DimensionError {
                expected: 1,
                actual: spectrum.dimensions(),
            });
        }

        let n = spectrum.elements() - 1;
        if n < 2 {
            return Ok(Self(0.0));
        }
        let pairs = (n * (n - 1)) as f64 / 2.0;

        Ok(Self(
            spectrum
                .normalized()
                .iter()
                .enumerate()
                .map(|(i, f)| f * (i * (n - i)) as f64 / pairs)
                .sum(),
        ))
    }
}

/// Average pairwise divergence between two populations.
///
/// Computed from the normalized two-dimensional spectrum as
/// Σ fᵢⱼ · (p(1−q) + q(1−p)) with p = i/n₁ and q = j/n₂.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Dxy(pub f64);

impl Dxy {
    /// Computes the divergence of a two-dimensional spectrum.
    pub fn from_spectrum(spectrum: &Spectrum) -> Result<Self, DimensionError> {
        let [n1, n2] = two_dimensional(spectrum)?;

        Ok(Self(
            spectrum
                .normalized()
                .inner()
                .iter()
                .zip(spectrum.inner().iter_indices())
                .map(|(f, index)| {
                    let p = index[0] as f64 / n1;
                    let q = index[1] as f64 / n2;

                    f * (p * (1.0 - q) + q * (1.0 - p))
                })
                .sum(),
        ))
    }
}

/// Hudson-style Fst between two populations.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Fst(pub f64);

impl Fst {
    /// Computes the Fst of a two-dimensional spectrum.
    ///
    /// A spectrum with no between-population variation has an undefined
    /// estimator denominator; zero is returned in that case so that the
    /// statistic vector keeps a fixed shape.
    pub fn from_spectrum(spectrum: &Spectrum) -> Result<Self, DimensionError> {
        let [n1, n2] = two_dimensional(spectrum)?;

        // The sample-size corrections divide by n - 1, so a single-haplotype
        // axis leaves the estimator undefined
        if n1 < 2.0 || n2 < 2.0 {
            return Ok(Self(0.0));
        }

        let normalized = spectrum.normalized();

        // Only the polymorphic cells contribute, so the monomorphic corners
        // are dropped
        let polymorphic = normalized
            .inner()
            .iter()
            .zip(normalized.inner().iter_indices())
            .take(normalized.elements() - 1)
            .skip(1);

        let (num, denom) = polymorphic
            .map(|(v, index)| {
                let p = index[0] as f64 / n1;
                let q = index[1] as f64 / n2;
                let g_p = 1.0 - p;
                let g_q = 1.0 - q;

                let num = (p - q).powi(2) - p * g_p / (n1 - 1.0) - q * g_q / (n2 - 1.0);
                let denom = p * g_q + q * g_p;
                (v * num, v * denom)
            })
            .fold((0.0, 0.0), |(num_sum, denom_sum), (num, denom)| {
                (num_sum + num, denom_sum + denom)
            });

        if denom == 0.0 {
            Ok(Self(0.0))
        } else {
            Ok(Self(num / denom))
        }
    }
}

fn two_dimensional(spectrum: &Spectrum) -> Result<[f64; 2], DimensionError> {
    if spectrum.dimensions() == 2 {
        let shape = spectrum.shape();
        Ok([(shape.as_ref()[0] - 1) as f64, (shape.as_ref()[1] - 1) as f64])
    } else {
        Err(DimensionError {
            expected: 2,
            actual: spectrum.dimensions(),
        })
    }
}

/// The fixed-shape summary statistic vector of a joint spectrum: one
/// heterozygosity per population followed by one divergence and one Fst per
/// unordered population pair, in pair-lexicographic order.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryStatistics {
    heterozygosity: Vec<f64>,
    dxy: Vec<f64>,
    fst: Vec<f64>,
}

impl SummaryStatistics {
    /// Computes the summary statistics of a joint spectrum.
    ///
    /// Per-population and per-pair statistics are computed from the
    /// corresponding marginal spectra.
    pub fn from_msfs(msfs: &Spectrum) -> Result<Self, DimensionError> {
        let dimensions = msfs.dimensions();

        let mut heterozygosity = Vec::with_capacity(dimensions);
        for axis in 0..dimensions {
            let others = (0..dimensions).filter(|&a| a != axis).collect::<Vec<_>>();
            let marginal = msfs
                .marginalize(&others)
                .expect("axis within mSFS dimensions");

            heterozygosity.push(Heterozygosity::from_spectrum(&marginal)?.0);
        }

        let mut dxy = Vec::new();
        let mut fst = Vec::new();
        for first in 0..dimensions {
            for second in first + 1..dimensions {
                let others = (0..dimensions)
                    .filter(|&a| a != first && a != second)
                    .collect::<Vec<_>>();
                let pair = msfs
                    .marginalize(&others)
                    .expect("pair axes within mSFS dimensions");

                dxy.push(Dxy::from_spectrum(&pair)?.0);
                fst.push(Fst::from_spectrum(&pair)?.0);
            }
        }

        Ok(Self {
            heterozygosity,
            dxy,
            fst,
        })
    }

    /// Averages statistics over replicates.
    ///
    /// Returns `None` if the slice is empty or the shapes differ.
    pub fn mean(all: &[Self]) -> Option<Self> {
        let first = all.first()?;

        if all.iter().any(|s| {
            s.heterozygosity.len() != first.heterozygosity.len()
                || s.dxy.len() != first.dxy.len()
                || s.fst.len() != first.fst.len()
        }) {
            return None;
        }

        let n = all.len() as f64;
        let mean_of = |get: fn(&Self) -> &Vec<f64>| {
            let len = get(first).len();
            (0..len)
                .map(|i| all.iter().map(|s| get(s)[i]).sum::<f64>() / n)
                .collect::<Vec<_>>()
        };

        Some(Self {
            heterozygosity: mean_of(|s| &s.heterozygosity),
            dxy: mean_of(|s| &s.dxy),
            fst: mean_of(|s| &s.fst),
        })
    }

    /// Returns the per-population heterozygosities.
    pub fn heterozygosity(&self) -> &[f64] {
        &self.heterozygosity
    }

    /// Returns the per-pair divergences.
    pub fn dxy(&self) -> &[f64] {
        &self.dxy
    }

    /// Returns the per-pair Fst values.
    pub fn fst(&self) -> &[f64] {
        &self.fst
    }

    /// Flattens the statistics into a single vector: heterozygosities, then
    /// divergences, then Fst values.
    pub fn to_vec(&self) -> Vec<f64> {
        self.heterozygosity
            .iter()
            .chain(self.dxy.iter())
            .chain(self.fst.iter())
            .copied()
            .collect()
    }
}

/// An error for a statistic applied to a spectrum of the wrong dimension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DimensionError {
    expected: usize,
    actual: usize,
}

impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let DimensionError { expected, actual } = self;
        write!(
            f,
            "expected spectrum with dimension {expected}, found spectrum with dimension {actual}"
        )
    }
}

impl std::error::Error for DimensionError {}
