use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::PathBuf,
};

use anyhow::{Context, Error};

use clap::Parser;

use delimit_core::{spectrum::stat::SummaryStatistics, Spectrum};

/// Compute summary statistics from a spectrum.
///
/// Reads a joint spectrum in npy format and prints its summary statistic
/// vector: one heterozygosity per population, followed by one divergence and
/// one Fst per population pair.
#[derive(Debug, Parser)]
pub struct Stat {
    /// Input spectrum in npy format.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

impl Stat {
    pub fn run(self) -> Result<(), Error> {
        let reader = BufReader::new(File::open(&self.input).with_context(|| {
            format!("Failed to open spectrum from '{}'", self.input.display())
        })?);

        let spectrum = Spectrum::read_npy(reader)?;
        let statistics = SummaryStatistics::from_msfs(&spectrum)?;

        let stdout = io::stdout().lock();
        let mut writer = io::BufWriter::new(stdout);

        for (i, het) in statistics.heterozygosity().iter().enumerate() {
            writeln!(writer, "het_{i}\t{het:.6}")?;
        }

        let dimensions = spectrum.dimensions();
        let pairs = (0..dimensions)
            .flat_map(|first| (first + 1..dimensions).map(move |second| (first, second)));

        for ((first, second), (dxy, fst)) in pairs.zip(
            statistics
                .dxy()
                .iter()
                .zip(statistics.fst().iter()),
        ) {
            writeln!(writer, "dxy_{first}_{second}\t{dxy:.6}")?;
            writeln!(writer, "fst_{first}_{second}\t{fst:.6}")?;
        }

        Ok(())
    }
}
