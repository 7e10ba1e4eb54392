#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Reduction of multi-population nucleotide alignments to site frequency
//! spectra.
//!
//! This serves as the core library implementation for the `delimit` CLI, but
//! can also be used as a free-standing library for preparing empirical
//! spectra for model-based species delimitation.
//!
//! # Overview
//!
//! Per-locus alignments and a [`PopulationMap`] are reduced to an immutable
//! [`AlleleMatrix`]. A feasibility [`scan`](scan::scan) over candidate
//! downsampling sizes yields a [`DownsamplingTable`] from which a target size
//! per population is chosen externally. A [`Projector`] then draws projected
//! allele counts for each retained site via seeded hypergeometric resampling,
//! replicated to control sampling noise, and
//! [`ReplicateSpectra`](spectrum::ReplicateSpectra) assembles the counts into
//! a full joint [`Spectrum`] plus one spectrum per population pair, with axis
//! order fixed by the population order so that empirical and simulated
//! spectra stay comparable.
//!
//! # Example
//!
//! Project a matrix of pre-encoded site columns over two populations and
//! assemble the spectra:
//!
//! ```
//! use std::num::NonZeroUsize;
//!
//! use delimit_core::{
//!     matrix::AlleleMatrix, project::Projector, scan::SizeCombination,
//!     spectrum::ReplicateSpectra,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let matrix = AlleleMatrix::from_columns(
//!     vec![vec![0, 0, 1, 1, 1, 0], vec![3, 2, 2, 2, 3, 3]],
//!     &[4, 2],
//! )?;
//!
//! let targets = SizeCombination::from([3, 2]);
//! let projector = Projector::new(&matrix, targets.clone(), NonZeroUsize::MIN, 42)?;
//!
//! let spectra = ReplicateSpectra::assemble_all(&projector.project(), &targets);
//!
//! assert_eq!(spectra.len(), 1);
//! assert_eq!(spectra[0].msfs().sum(), matrix.sites() as f64);
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
#[macro_use]
pub(crate) mod approx;

pub mod alignment;

pub mod array;
pub use array::Array;

pub mod config;
pub use config::ProjectionConfig;

pub mod matrix;
pub use matrix::AlleleMatrix;

pub mod population;
pub use population::PopulationMap;

pub mod project;
pub use project::Projector;

pub mod scan;
pub use scan::DownsamplingTable;

pub mod spectrum;
pub use spectrum::Spectrum;
