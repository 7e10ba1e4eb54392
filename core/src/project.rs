//! Stochastic hypergeometric projection of observed allele counts.

use std::{fmt, num::NonZeroUsize};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Hypergeometric};

use crate::{
    matrix::AlleleMatrix,
    population::PopulationId,
    scan::SizeCombination,
    spectrum::Count,
};

/// A projector of observed allele counts down to fixed target sample sizes.
///
/// For each feasible site and each population, the projected derived allele
/// count is drawn from the hypergeometric distribution: a sample of the
/// target size drawn without replacement from the population's non-missing
/// calls at the site. Sites where any population has fewer non-missing calls
/// than its target are dropped. Missingness is a fixed property of the
/// matrix, so the retained site set is identical across replicates; only the
/// drawn counts vary.
///
/// Replicate `r` uses a generator seeded with `seed ^ r`, so a run is fully
/// reproducible from the caller-supplied seed, and replicates are mutually
/// independent.
#[derive(Clone, Debug)]
pub struct Projector<'a> {
    matrix: &'a AlleleMatrix,
    targets: SizeCombination,
    replicates: NonZeroUsize,
    seed: u64,
    feasible: Vec<usize>,
}

impl<'a> Projector<'a> {
    /// Creates a new projector.
    ///
    /// If no site supports the targets, a warning is logged and all projected
    /// replicates will be empty; this is not an error, since the feasibility
    /// scan is the intended guard.
    pub fn new(
        matrix: &'a AlleleMatrix,
        targets: SizeCombination,
        replicates: NonZeroUsize,
        seed: u64,
    ) -> Result<Self, ProjectionError> {
        if targets.dimensions() != matrix.populations() {
            return Err(ProjectionError::MismatchingDimensions {
                expected: matrix.populations(),
                actual: targets.dimensions(),
            });
        }

        let feasible = (0..matrix.sites())
            .filter(|&site| matrix.site_is_feasible(site, targets.as_ref()))
            .collect::<Vec<_>>();

        if feasible.is_empty() {
            log::warn!(
                "no sites support downsampling targets {targets}; projected spectra will be empty"
            );
        }

        Ok(Self {
            matrix,
            targets,
            replicates,
            seed,
            feasible,
        })
    }

    /// Returns the number of sites retained under the targets.
    pub fn feasible_sites(&self) -> usize {
        self.feasible.len()
    }

    /// Projects all replicates.
    pub fn project(&self) -> Vec<ProjectedReplicate> {
        (0..self.replicates.get())
            .map(|replicate| self.project_replicate(replicate))
            .collect()
    }

    /// Projects a single replicate.
    pub fn project_replicate(&self, replicate: usize) -> ProjectedReplicate {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ replicate as u64);

        let sites = self
            .feasible
            .iter()
            .map(|&site| {
                Count(
                    self.targets
                        .as_ref()
                        .iter()
                        .enumerate()
                        .map(|(population, &target)| {
                            let population = PopulationId(population);
                            let size = self.matrix.coverage(site, population);
                            let derived = self.matrix.derived(site, population);

                            draw(size, derived, target, &mut rng)
                        })
                        .collect(),
                )
            })
            .collect();

        ProjectedReplicate { replicate, sites }
    }

    /// Returns the target sizes.
    pub fn targets(&self) -> &SizeCombination {
        &self.targets
    }
}

/// Draws the number of derived alleles in a without-replacement sample of
/// `target` calls from `size` non-missing calls of which `derived` are
/// derived.
fn draw<R>(size: usize, derived: usize, target: usize, rng: &mut R) -> usize
where
    R: rand::Rng,
{
    // Degenerate draws resolve without touching the generator: zero derived
    // alleles project to zero, and a full-size draw returns the observed count
    if derived == 0 || target == size {
        return if target == size { derived } else { 0 };
    }

    let hypergeometric = Hypergeometric::new(size as u64, derived as u64, target as u64)
        .expect("feasible site admits hypergeometric draw");

    hypergeometric.sample(rng) as usize
}

/// One projected replicate: the projected allele count tuples of every
/// retained site, in site order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectedReplicate {
    replicate: usize,
    sites: Vec<Count>,
}

impl ProjectedReplicate {
    /// Creates a projected replicate directly from allele count tuples.
    ///
    /// This is the entry point for projected counts produced elsewhere, e.g.
    /// from simulated replicates, so that empirical and simulated spectra are
    /// assembled identically.
    pub fn from_counts(replicate: usize, sites: Vec<Count>) -> Self {
        Self { replicate, sites }
    }

    /// Returns the replicate index.
    pub fn replicate(&self) -> usize {
        self.replicate
    }

    /// Returns the projected allele count tuples.
    pub fn sites(&self) -> &[Count] {
        &self.sites
    }

    /// Returns the number of retained sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns `true` if no sites were retained.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// An error associated with setting up a projection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProjectionError {
    /// The number of targets does not match the number of populations.
    MismatchingDimensions {
        /// The number of populations in the matrix.
        expected: usize,
        /// The number of targets provided.
        actual: usize,
    },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::MismatchingDimensions { expected, actual } => write!(
                f,
                "expected one downsampling target per population ({expected}), found {actual}"
            ),
        }
    }
}

impl std::error::Error for ProjectionError {}
