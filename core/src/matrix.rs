//! The integer-coded allele matrix underlying all downstream stages.

use std::{fmt, ops::Range};

use crate::{
    alignment::LocusAlignment,
    population::{Ploidy, PopulationId, PopulationMap},
};

/// The sentinel code for a missing or unresolvable call.
pub const MISSING: i8 = -1;

/// A matrix of integer-coded alleles.
///
/// Rows are haplotype sequences in population-major order, with diploid
/// individuals contributing two consecutive rows. Columns are the variable
/// sites across all input loci, concatenated in locus order; sites that are
/// monomorphic among non-missing calls are dropped. Cell values are 0-3 for
/// A/C/G/T and [`MISSING`] otherwise.
///
/// The matrix is immutable once built. Per-site, per-population non-missing
/// call counts and derived allele counts are computed once at construction,
/// so missingness is a fixed property of each site.
#[derive(Clone, Debug, PartialEq)]
pub struct AlleleMatrix {
    codes: Vec<i8>,
    rows: usize,
    sites: usize,
    row_ranges: Vec<Range<usize>>,
    coverage: Vec<usize>,
    derived: Vec<usize>,
}

impl AlleleMatrix {
    /// Builds the allele matrix from locus alignments and a population map.
    ///
    /// Every sample in the population map must be present in every locus with
    /// consistent sequence length; sequences for samples not in the map are
    /// ignored.
    pub fn build(loci: &[LocusAlignment], map: &PopulationMap) -> Result<Self, DataError> {
        if loci.is_empty() {
            return Err(DataError::NoLoci);
        }

        let row_samples = map.iter_row_samples().collect::<Vec<_>>();
        let ploidy = map.ploidy();
        let rows = map.total_rows();

        let mut columns = Vec::new();
        let mut column = vec![MISSING; rows];

        for locus in loci {
            let sequences = check_locus(locus, &row_samples)?;
            let length = sequences.first().map_or(0, |seq| seq.len());

            for position in 0..length {
                let mut row = 0;
                for seq in &sequences {
                    let symbol = seq[position];

                    match ploidy {
                        Ploidy::Haploid => {
                            column[row] = encode(symbol);
                            row += 1;
                        }
                        Ploidy::Diploid => {
                            let [first, second] = expand_diploid(symbol);
                            column[row] = first;
                            column[row + 1] = second;
                            row += 2;
                        }
                    }
                }

                if is_variable(&column) {
                    columns.push(column.clone());
                }
            }
        }

        let row_ranges = row_ranges(map);

        Ok(Self::from_parts(columns, rows, row_ranges))
    }

    /// Creates an allele matrix directly from site columns.
    ///
    /// Each column must hold one code per haplotype row, rows grouped by
    /// population in the given order. Monomorphic columns are dropped, as
    /// they would be when building from alignments. This is the entry point
    /// for data that is already encoded, e.g. simulated replicates.
    pub fn from_columns<I>(columns: I, rows_per_population: &[usize]) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = Vec<i8>>,
    {
        let rows = rows_per_population.iter().sum::<usize>();

        let mut kept = Vec::new();
        for column in columns {
            if column.len() != rows {
                return Err(DataError::MismatchingRows {
                    expected: rows,
                    actual: column.len(),
                });
            }

            if let Some(&code) = column.iter().find(|&&c| !(MISSING..=3).contains(&c)) {
                return Err(DataError::InvalidCode { code });
            }

            if is_variable(&column) {
                kept.push(column);
            }
        }

        let mut row_ranges = Vec::with_capacity(rows_per_population.len());
        let mut start = 0;
        for &n in rows_per_population {
            row_ranges.push(start..start + n);
            start += n;
        }

        Ok(Self::from_parts(kept, rows, row_ranges))
    }

    fn from_parts(columns: Vec<Vec<i8>>, rows: usize, row_ranges: Vec<Range<usize>>) -> Self {
        let sites = columns.len();
        let populations = row_ranges.len();

        let mut codes = vec![MISSING; rows * sites];
        for (site, column) in columns.iter().enumerate() {
            for (row, &code) in column.iter().enumerate() {
                codes[row * sites + site] = code;
            }
        }

        let mut coverage = vec![0; sites * populations];
        let mut derived = vec![0; sites * populations];

        for (site, column) in columns.iter().enumerate() {
            let reference = reference_allele(column);

            for (population, range) in row_ranges.iter().enumerate() {
                let calls = &column[range.clone()];
                let non_missing = calls.iter().filter(|&&c| c != MISSING).count();
                let reference_count = calls.iter().filter(|&&c| c == reference).count();

                coverage[site * populations + population] = non_missing;
                derived[site * populations + population] = non_missing - reference_count;
            }
        }

        Self {
            codes,
            rows,
            sites,
            row_ranges,
            coverage,
            derived,
        }
    }

    /// Returns the code at a row and site.
    pub fn code(&self, row: usize, site: usize) -> i8 {
        self.codes[row * self.sites + site]
    }

    /// Returns the number of non-missing calls for a population at a site.
    pub fn coverage(&self, site: usize, population: PopulationId) -> usize {
        self.coverage[site * self.populations() + population.0]
    }

    /// Returns the derived allele count for a population at a site.
    ///
    /// The reference allele at a site is the globally most frequent allele
    /// among non-missing calls, with ties broken towards the smaller code;
    /// every non-reference call counts as derived.
    pub fn derived(&self, site: usize, population: PopulationId) -> usize {
        self.derived[site * self.populations() + population.0]
    }

    /// Returns the number of sites where every population has at least its
    /// target number of non-missing calls.
    pub fn feasible_site_count(&self, targets: &[usize]) -> usize {
        (0..self.sites)
            .filter(|&site| self.site_is_feasible(site, targets))
            .count()
    }

    /// Returns the number of populations.
    pub fn populations(&self) -> usize {
        self.row_ranges.len()
    }

    /// Returns the haplotype row range of a population.
    pub fn row_range(&self, population: PopulationId) -> Range<usize> {
        self.row_ranges[population.0].clone()
    }

    /// Returns the number of haplotype rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns `true` if every population has at least its target number of
    /// non-missing calls at the site.
    pub fn site_is_feasible(&self, site: usize, targets: &[usize]) -> bool {
        debug_assert_eq!(targets.len(), self.populations());

        targets
            .iter()
            .enumerate()
            .all(|(population, &target)| self.coverage(site, PopulationId(population)) >= target)
    }

    /// Returns the number of retained variable sites.
    pub fn sites(&self) -> usize {
        self.sites
    }
}

/// Collects the sequences of a locus in matrix row order, checking that every
/// mapped sample is present with a consistent length.
fn check_locus<'a>(
    locus: &'a LocusAlignment,
    row_samples: &[(&str, PopulationId)],
) -> Result<Vec<&'a [u8]>, DataError> {
    let mut sequences = Vec::with_capacity(row_samples.len());
    let mut length = None;

    for &(sample, _) in row_samples {
        let seq = locus.get(sample).ok_or_else(|| DataError::MissingSample {
            locus: locus.name().to_string(),
            sample: sample.to_string(),
        })?;

        match length {
            None => length = Some(seq.len()),
            Some(expected) if expected != seq.len() => {
                return Err(DataError::RaggedSequence {
                    locus: locus.name().to_string(),
                    sample: sample.to_string(),
                    expected,
                    actual: seq.len(),
                })
            }
            Some(_) => (),
        }

        sequences.push(seq);
    }

    Ok(sequences)
}

fn encode(symbol: u8) -> i8 {
    match symbol.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => MISSING,
    }
}

/// Expands a diploid call into its two haplotype codes.
///
/// Heterozygous calls are carried as IUPAC ambiguity codes and split into
/// their two constituent bases, one per haplotype row; which haplotype
/// receives which base is arbitrary and does not affect allele counts.
fn expand_diploid(symbol: u8) -> [i8; 2] {
    match symbol.to_ascii_uppercase() {
        b'R' => [0, 2],
        b'Y' => [1, 3],
        b'S' => [1, 2],
        b'W' => [0, 3],
        b'K' => [2, 3],
        b'M' => [0, 1],
        symbol => {
            let code = encode(symbol);
            [code, code]
        }
    }
}

fn is_variable(column: &[i8]) -> bool {
    let mut first = None;

    for &code in column.iter().filter(|&&c| c != MISSING) {
        match first {
            None => first = Some(code),
            Some(f) if f != code => return true,
            Some(_) => (),
        }
    }

    false
}

fn reference_allele(column: &[i8]) -> i8 {
    let mut counts = [0usize; 4];
    for &code in column.iter().filter(|&&c| c != MISSING) {
        counts[code as usize] += 1;
    }

    counts
        .iter()
        .enumerate()
        .max_by_key(|&(code, &count)| (count, std::cmp::Reverse(code)))
        .map(|(code, _)| code as i8)
        .unwrap_or(MISSING)
}

fn row_ranges(map: &PopulationMap) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(map.population_count());
    let mut start = 0;

    for i in 0..map.population_count() {
        let n = map.population_rows(PopulationId(i));
        ranges.push(start..start + n);
        start += n;
    }

    ranges
}

/// An error associated with building an allele matrix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataError {
    /// A sample from the population map is absent from a locus.
    MissingSample {
        /// The offending locus.
        locus: String,
        /// The missing sample.
        sample: String,
    },
    /// A sequence length differs from the rest of its locus.
    RaggedSequence {
        /// The offending locus.
        locus: String,
        /// The offending sample.
        sample: String,
        /// The length of the other sequences in the locus.
        expected: usize,
        /// The length of the offending sequence.
        actual: usize,
    },
    /// No loci were provided.
    NoLoci,
    /// A column length does not match the number of haplotype rows.
    MismatchingRows {
        /// The expected number of rows.
        expected: usize,
        /// The actual column length.
        actual: usize,
    },
    /// A code outside the valid range was provided.
    InvalidCode {
        /// The offending code.
        code: i8,
    },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MissingSample { locus, sample } => {
                write!(f, "sample '{sample}' missing from locus '{locus}'")
            }
            DataError::RaggedSequence {
                locus,
                sample,
                expected,
                actual,
            } => write!(
                f,
                "sequence for sample '{sample}' in locus '{locus}' has length {actual}, \
                 expected {expected}"
            ),
            DataError::NoLoci => f.write_str("no locus alignments provided"),
            DataError::MismatchingRows { expected, actual } => write!(
                f,
                "column with {actual} rows does not match {expected} haplotype rows"
            ),
            DataError::InvalidCode { code } => write!(f, "invalid allele code {code}"),
        }
    }
}

impl std::error::Error for DataError {}
