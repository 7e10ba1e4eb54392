use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Error};

use clap::Parser;

use delimit_core::{
    alignment,
    matrix::AlleleMatrix,
    population::{Ploidy, PopulationId, PopulationMap},
    scan::{self, Parity},
};

/// Scan downsampling feasibility across candidate target sizes.
///
/// For every combination of per-population target sizes, counts the variable
/// sites where every population has at least that many non-missing calls, and
/// prints the resulting table as tab-separated values.
#[derive(Debug, Parser)]
pub struct Scan {
    /// Directory of per-locus FASTA alignments.
    #[arg(value_name = "DIR")]
    alignments: PathBuf,

    /// Population assignment file.
    ///
    /// Each line should contain a sample name and a population label,
    /// tab-separated. Population order is the order of first appearance.
    #[arg(short = 'P', long, value_name = "FILE")]
    popmap: PathBuf,

    /// Sample ploidy (1 or 2).
    #[arg(long, default_value_t = 2, value_name = "INT")]
    ploidy: usize,

    /// Smallest target size to scan for every population.
    #[arg(long, default_value_t = 2, value_name = "INT")]
    min: usize,

    /// Largest target size to scan for every population.
    ///
    /// By default, each population is scanned up to its own number of
    /// haplotype rows.
    #[arg(long, value_name = "INT")]
    max: Option<usize>,

    /// Parity restriction on scanned sizes.
    ///
    /// Scanning even sizes only keeps targets at diploid multiples.
    #[arg(long, value_enum, default_value_t = ParityArg::Even)]
    parity: ParityArg,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ParityArg {
    Even,
    Odd,
    Any,
}

impl From<ParityArg> for Parity {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::Even => Parity::Even,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Any => Parity::Any,
        }
    }
}

impl Scan {
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

        log::info!(
            "Built allele matrix with {} haplotype rows and {} variable sites from {} loci",
            matrix.rows(),
            matrix.sites(),
            loci.len()
        );

        let ranges = (0..popmap.population_count())
            .map(|i| {
                let upper = self
                    .max
                    .unwrap_or_else(|| popmap.population_rows(PopulationId(i)));
                self.min..=upper
            })
            .collect::<Vec<_>>();

        let table = scan::scan(&matrix, &ranges, self.parity.into())?;

        let stdout = io::stdout().lock();
        let mut writer = io::BufWriter::new(stdout);

        for name in popmap.population_names() {
            write!(writer, "{name}\t")?;
        }
        writeln!(writer, "sites")?;

        for (combination, count) in table.iter() {
            for size in combination.as_ref() {
                write!(writer, "{size}\t")?;
            }
            writeln!(writer, "{count}")?;
        }

        Ok(())
    }
}
