use std::{
    fs::{self, File},
    io::BufWriter,
    num::NonZeroUsize,
    path::PathBuf,
};

use anyhow::{Context, Error};

use clap::Parser;

use delimit_core::{
    alignment,
    matrix::AlleleMatrix,
    population::{Ploidy, PopulationId, PopulationMap},
    spectrum::{stat::SummaryStatistics, ReplicateSpectra},
    ProjectionConfig, Projector,
};

/// Project the empirical data to downsampled spectra.
///
/// Draws projected allele counts for every retained site via seeded
/// hypergeometric resampling, replicated to control sampling noise, and
/// writes one full joint spectrum plus one spectrum per population pair and
/// replicate as npy arrays.
#[derive(Debug, Parser)]
pub struct Project {
    /// Directory of per-locus FASTA alignments.
    #[arg(value_name = "DIR")]
    alignments: PathBuf,

    /// Population assignment file.
    ///
    /// Each line should contain a sample name and a population label,
    /// tab-separated. Population order is the order of first appearance and
    /// fixes the axis order of all spectra.
    #[arg(short = 'P', long, value_name = "FILE")]
    popmap: PathBuf,

    /// Sample ploidy (1 or 2).
    #[arg(long, default_value_t = 2, value_name = "INT")]
    ploidy: usize,

    /// Downsampling targets.
    ///
    /// Comma-separated 'population=size' pairs assigning a haploid target
    /// sample size to every population, e.g. 'popA=8,popB=6,popC=6'.
    #[arg(
        short = 't',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_parser = parse_target,
        value_name = "POP=INT",
        required = true
    )]
    targets: Vec<(String, usize)>,

    /// Number of projection replicates.
    #[arg(short = 'r', long, default_value_t = NonZeroUsize::new(1).unwrap(), value_name = "INT")]
    replicates: NonZeroUsize,

    /// Random seed.
    ///
    /// Replicate r derives its own generator from the seed, so runs are
    /// reproducible.
    #[arg(short = 's', long, default_value_t = 0, value_name = "INT")]
    seed: u64,

    /// Output directory for the npy spectra.
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: PathBuf,
}

fn parse_target(s: &str) -> Result<(String, usize), String> {
    let (population, size) = s
        .split_once('=')
        .ok_or_else(|| format!("expected 'population=size', found '{s}'"))?;

    let size = size
        .parse()
        .map_err(|_| format!("invalid target size '{size}' for population '{population}'"))?;

    Ok((population.to_string(), size))
}

impl Project {
    pub fn run(self) -> Result<(), Error> {
        let ploidy = Ploidy::try_from(self.ploidy)?;
        let popmap = PopulationMap::from_path(&self.popmap, ploidy)
            .with_context(|| {
                format!(
                    "Failed to read population map from '{}'",
                    self.popmap.display()
                )
            })??;

        let loci = alignment::read_alignment_dir(&self.alignments).with_context(|| {
            format!(
                "Failed to read alignments from '{}'",
                self.alignments.display()
            )
        })?;

        let matrix = AlleleMatrix::build(&loci, &popmap)?;

        let config = ProjectionConfig::new(self.targets, self.replicates, self.seed)?;
        let targets = config.size_combination(&popmap)?;

        let projector = Projector::new(&matrix, targets.clone(), config.replicates(), config.seed())?;

        log::info!(
            "{} of {} variable sites support downsampling targets {targets}",
            projector.feasible_sites(),
            matrix.sites(),
        );

        let replicates = projector.project();
        let spectra = ReplicateSpectra::assemble_all(&replicates, &targets);

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                self.output_dir.display()
            )
        })?;

        for assembled in &spectra {
            let r = assembled.replicate();

            let path = self.output_dir.join(format!("msfs_rep{r}.npy"));
            let writer = BufWriter::new(File::create(&path)?);
            assembled.msfs().write_npy(writer)?;

            for pair in assembled.pairwise() {
                let (first, second) = pair.populations();
                let first = population_name(&popmap, first);
                let second = population_name(&popmap, second);

                let path = self
                    .output_dir
                    .join(format!("jsfs_{first}_{second}_rep{r}.npy"));
                let writer = BufWriter::new(File::create(&path)?);
                pair.spectrum().write_npy(writer)?;
            }

            log::debug!("Wrote spectra for replicate {r}");
        }

        let statistics = spectra
            .iter()
            .map(|assembled| SummaryStatistics::from_msfs(assembled.msfs()))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(mean) = SummaryStatistics::mean(&statistics) {
            log::info!(
                "Mean summary statistics across {} replicates: {:?}",
                statistics.len(),
                mean.to_vec()
            );
        }

        Ok(())
    }
}

fn population_name(popmap: &PopulationMap, id: usize) -> &str {
    popmap
        .population_name(PopulationId(id))
        .expect("spectrum axis corresponds to a population")
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    use crate::tests::{parse_subcmd, try_parse_subcmd};

    #[test]
    fn test_parse_targets() {
        let args = parse_subcmd::<Project>(
            "delimit project -P popmap.tsv -t popA=8,popB=6,popC=6 -o out alignments/",
        );

        assert_eq!(
            args.targets,
            vec![
                (String::from("popA"), 8),
                (String::from("popB"), 6),
                (String::from("popC"), 6),
            ]
        );
        assert_eq!(args.replicates.get(), 1);
        assert_eq!(args.seed, 0);
    }

    #[test]
    fn test_parse_invalid_target() {
        let result = try_parse_subcmd::<Project>(
            "delimit project -P popmap.tsv -t popA=many -o out alignments/",
        );

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ValueValidation);
    }

    #[test]
    fn test_parse_requires_targets() {
        let result =
            try_parse_subcmd::<Project>("delimit project -P popmap.tsv -o out alignments/");

        assert_eq!(
            result.unwrap_err().kind(),
            ClapErrorKind::MissingRequiredArgument
        );
    }
}
