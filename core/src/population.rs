//! Population assignment of samples.

use std::{
    fmt,
    fs::File,
    io::{self, Read},
    path::Path,
};

use indexmap::{IndexMap, IndexSet};

/// The ploidy of the samples in a population map.
///
/// Ploidy is assumed uniform across samples: every diploid individual
/// contributes two haplotype rows to the allele matrix, every haploid
/// individual one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Ploidy {
    /// One haplotype per individual.
    Haploid,
    /// Two haplotypes per individual.
    #[default]
    Diploid,
}

impl Ploidy {
    /// Returns the number of haplotype rows contributed per individual.
    pub fn rows(self) -> usize {
        match self {
            Ploidy::Haploid => 1,
            Ploidy::Diploid => 2,
        }
    }
}

impl TryFrom<usize> for Ploidy {
    type Error = PloidyError;

    fn try_from(ploidy: usize) -> Result<Self, Self::Error> {
        match ploidy {
            1 => Ok(Self::Haploid),
            2 => Ok(Self::Diploid),
            v => Err(PloidyError(v)),
        }
    }
}

impl fmt::Display for Ploidy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rows())
    }
}

/// An error for an unsupported ploidy value.
#[derive(Debug)]
pub struct PloidyError(usize);

impl fmt::Display for PloidyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported ploidy '{}', expected 1 or 2", self.0)
    }
}

impl std::error::Error for PloidyError {}

/// An identifier for a population within a [`PopulationMap`].
///
/// Identifiers index populations in their declared order, which fixes the
/// axis order of all downstream spectra.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PopulationId(pub usize);

impl From<PopulationId> for usize {
    fn from(id: PopulationId) -> Self {
        id.0
    }
}

/// An ordered assignment of samples to populations.
///
/// Population order is the order of first appearance of the population labels
/// in the input, and within-population sample order is the order of appearance
/// of the samples. Both orders are fixed and determine the row layout of the
/// allele matrix and the axis order of all spectra.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PopulationMap {
    assignments: IndexMap<String, PopulationId>,
    populations: IndexSet<String>,
    ploidy: Ploidy,
}

impl PopulationMap {
    /// Creates a population map from a file.
    ///
    /// Each line should contain a sample name and a population label,
    /// tab-separated.
    pub fn from_path<P>(
        path: P,
        ploidy: Ploidy,
    ) -> io::Result<Result<Self, PopulationMapError>>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path)?;
        let mut s = String::new();
        let _ = file.read_to_string(&mut s)?;

        Ok(Self::from_str(&s, ploidy))
    }

    /// Creates a population map from sample/population pairs.
    pub fn from_pairs<I, S>(pairs: I, ploidy: Ploidy) -> Result<Self, PopulationMapError>
    where
        I: IntoIterator<Item = (S, S)>,
        S: ToString,
    {
        let mut assignments = IndexMap::new();
        let mut populations = IndexSet::new();

        for (sample, population) in pairs {
            let sample = sample.to_string();
            let id = PopulationId(populations.insert_full(population.to_string()).0);

            if assignments.insert(sample.clone(), id).is_some() {
                return Err(PopulationMapError::DuplicateSample { sample });
            }
        }

        if assignments.is_empty() {
            return Err(PopulationMapError::Empty);
        }

        Ok(Self {
            assignments,
            populations,
            ploidy,
        })
    }

    /// Creates a population map from a string of tab-separated lines.
    pub fn from_str(s: &str, ploidy: Ploidy) -> Result<Self, PopulationMapError> {
        s.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split_once('\t')
                    .map(|(sample, population)| (sample.trim(), population.trim()))
                    .ok_or_else(|| PopulationMapError::MissingPopulation {
                        sample: line.trim().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .and_then(|pairs| Self::from_pairs(pairs, ploidy))
    }

    /// Returns the ploidy of the samples.
    pub fn ploidy(&self) -> Ploidy {
        self.ploidy
    }

    /// Returns the number of populations.
    pub fn population_count(&self) -> usize {
        self.populations.len()
    }

    /// Returns the name of a population.
    pub fn population_name(&self, id: PopulationId) -> Option<&str> {
        self.populations.get_index(id.0).map(String::as_str)
    }

    /// Returns an iterator over the population names in declared order.
    pub fn population_names(&self) -> impl Iterator<Item = &str> {
        self.populations.iter().map(String::as_str)
    }

    /// Returns the identifier of a population by name.
    pub fn population_id(&self, name: &str) -> Option<PopulationId> {
        self.populations.get_index_of(name).map(PopulationId)
    }

    /// Returns the number of individuals assigned to a population.
    pub fn population_size(&self, id: PopulationId) -> usize {
        self.assignments.values().filter(|&&v| v == id).count()
    }

    /// Returns the number of haplotype rows contributed by a population.
    pub fn population_rows(&self, id: PopulationId) -> usize {
        self.population_size(id) * self.ploidy.rows()
    }

    /// Returns an iterator over the samples of a population, in declared order.
    pub fn samples(&self, id: PopulationId) -> impl Iterator<Item = &str> {
        self.assignments
            .iter()
            .filter(move |(_, &v)| v == id)
            .map(|(sample, _)| sample.as_str())
    }

    /// Returns an iterator over all samples in matrix row order, i.e.
    /// population-major with within-population declared sample order.
    pub fn iter_row_samples(&self) -> impl Iterator<Item = (&str, PopulationId)> {
        (0..self.population_count()).flat_map(move |i| {
            let id = PopulationId(i);
            self.samples(id).map(move |sample| (sample, id))
        })
    }

    /// Returns the total number of haplotype rows across all populations.
    pub fn total_rows(&self) -> usize {
        self.assignments.len() * self.ploidy.rows()
    }
}

/// An error associated with the construction of a population map.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PopulationMapError {
    /// A sample was assigned more than once.
    DuplicateSample {
        /// The offending sample name.
        sample: String,
    },
    /// A line did not contain a population label.
    MissingPopulation {
        /// The offending line.
        sample: String,
    },
    /// The map contained no assignments.
    Empty,
}

impl fmt::Display for PopulationMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationMapError::DuplicateSample { sample } => {
                write!(f, "sample '{sample}' assigned to more than one population")
            }
            PopulationMapError::MissingPopulation { sample } => {
                write!(f, "no population label for sample '{sample}'")
            }
            PopulationMapError::Empty => f.write_str("empty population map"),
        }
    }
}

impl std::error::Error for PopulationMapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() -> Result<(), PopulationMapError> {
        let s = "sample0\tpopA
sample1\tpopB
sample2\tpopA
sample3\tpopC";

        let map = PopulationMap::from_str(s, Ploidy::Diploid)?;

        assert_eq!(map.population_count(), 3);
        assert_eq!(
            map.population_names().collect::<Vec<_>>(),
            vec!["popA", "popB", "popC"]
        );
        assert_eq!(map.population_size(PopulationId(0)), 2);
        assert_eq!(map.population_rows(PopulationId(0)), 4);
        assert_eq!(map.total_rows(), 8);

        Ok(())
    }

    #[test]
    fn test_row_order_is_population_major() -> Result<(), PopulationMapError> {
        let s = "sample0\tpopA
sample1\tpopB
sample2\tpopA";

        let map = PopulationMap::from_str(s, Ploidy::Haploid)?;

        let rows = map
            .iter_row_samples()
            .map(|(sample, id)| (sample, id.0))
            .collect::<Vec<_>>();

        assert_eq!(
            rows,
            vec![("sample0", 0), ("sample2", 0), ("sample1", 1)]
        );

        Ok(())
    }

    #[test]
    fn test_duplicate_sample() {
        let s = "sample0\tpopA
sample0\tpopB";

        assert_eq!(
            PopulationMap::from_str(s, Ploidy::Diploid),
            Err(PopulationMapError::DuplicateSample {
                sample: String::from("sample0")
            })
        );
    }

    #[test]
    fn test_missing_population() {
        assert_eq!(
            PopulationMap::from_str("sample0", Ploidy::Diploid),
            Err(PopulationMapError::MissingPopulation {
                sample: String::from("sample0")
            })
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            PopulationMap::from_str("\n\n", Ploidy::Diploid),
            Err(PopulationMapError::Empty)
        );
    }
}
