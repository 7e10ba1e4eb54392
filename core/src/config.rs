//! Immutable configuration for a projection run.

use std::{fmt, num::NonZeroUsize};

use indexmap::IndexMap;

use crate::{population::PopulationMap, scan::SizeCombination};

/// The configuration of a projection run: per-population downsampling
/// targets, a replicate count, and a random seed.
///
/// The configuration is immutable once constructed and is passed explicitly
/// to the components that need it; there is no process-wide state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectionConfig {
    targets: IndexMap<String, usize>,
    replicates: NonZeroUsize,
    seed: u64,
}

impl ProjectionConfig {
    /// Creates a new configuration.
    ///
    /// Targets map population labels to haploid target sample sizes, which
    /// must be positive.
    pub fn new<I, S>(
        targets: I,
        replicates: NonZeroUsize,
        seed: u64,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: ToString,
    {
        let targets: IndexMap<String, usize> = targets
            .into_iter()
            .map(|(label, size)| (label.to_string(), size))
            .collect();

        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        if let Some((label, _)) = targets.iter().find(|(_, &size)| size == 0) {
            return Err(ConfigError::ZeroTarget {
                population: label.clone(),
            });
        }

        Ok(Self {
            targets,
            replicates,
            seed,
        })
    }

    /// Returns the number of replicates.
    pub fn replicates(&self) -> NonZeroUsize {
        self.replicates
    }

    /// Returns the random seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resolves the targets against a population map, returning the target
    /// sizes as a combination in population order.
    ///
    /// Every population in the map must have a target, and every target must
    /// name a population in the map.
    pub fn size_combination(
        &self,
        map: &PopulationMap,
    ) -> Result<SizeCombination, ConfigError> {
        if let Some(label) = self
            .targets
            .keys()
            .find(|label| map.population_id(label).is_none())
        {
            return Err(ConfigError::UnknownPopulation {
                population: label.clone(),
            });
        }

        map.population_names()
            .map(|name| {
                self.targets
                    .get(name)
                    .copied()
                    .ok_or_else(|| ConfigError::MissingTarget {
                        population: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SizeCombination)
    }
}

/// An error associated with a projection configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// No downsampling targets were provided.
    NoTargets,
    /// A target size of zero was provided.
    ZeroTarget {
        /// The offending population label.
        population: String,
    },
    /// A population in the map has no target.
    MissingTarget {
        /// The population without a target.
        population: String,
    },
    /// A target names a population not in the map.
    UnknownPopulation {
        /// The unknown population label.
        population: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoTargets => f.write_str("no downsampling targets provided"),
            ConfigError::ZeroTarget { population } => {
                write!(f, "downsampling target for population '{population}' must be positive")
            }
            ConfigError::MissingTarget { population } => {
                write!(f, "no downsampling target for population '{population}'")
            }
            ConfigError::UnknownPopulation { population } => {
                write!(f, "downsampling target for unknown population '{population}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::population::Ploidy;

    fn replicates(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn popmap() -> PopulationMap {
        PopulationMap::from_str("s0\tpopA\ns1\tpopB\ns2\tpopC", Ploidy::Diploid).unwrap()
    }

    #[test]
    fn test_size_combination_follows_population_order() -> Result<(), ConfigError> {
        // Targets given out of population order
        let config = ProjectionConfig::new(
            [("popC", 6), ("popA", 8), ("popB", 6)],
            replicates(10),
            17,
        )?;

        let combination = config.size_combination(&popmap())?;

        assert_eq!(combination.as_ref(), &[8, 6, 6]);

        Ok(())
    }

    #[test]
    fn test_zero_target() {
        assert_eq!(
            ProjectionConfig::new([("popA", 0)], replicates(1), 0),
            Err(ConfigError::ZeroTarget {
                population: String::from("popA")
            })
        );
    }

    #[test]
    fn test_missing_target() -> Result<(), ConfigError> {
        let config = ProjectionConfig::new([("popA", 8), ("popB", 6)], replicates(1), 0)?;

        assert_eq!(
            config.size_combination(&popmap()),
            Err(ConfigError::MissingTarget {
                population: String::from("popC")
            })
        );

        Ok(())
    }

    #[test]
    fn test_unknown_population() -> Result<(), ConfigError> {
        let config = ProjectionConfig::new(
            [("popA", 8), ("popB", 6), ("popC", 6), ("popD", 2)],
            replicates(1),
            0,
        )?;

        assert_eq!(
            config.size_combination(&popmap()),
            Err(ConfigError::UnknownPopulation {
                population: String::from("popD")
            })
        );

        Ok(())
    }
}
