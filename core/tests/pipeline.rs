//! End-to-end tests of the reduction pipeline, from input through assembled
//! spectra and summary statistics.

use std::{fs::File, io::Write, num::NonZeroUsize};

use delimit_core::{
    alignment,
    array::Shape,
    matrix::{AlleleMatrix, MISSING},
    population::{Ploidy, PopulationMap},
    project::Projector,
    scan::{scan, Parity, SizeCombination},
    spectrum::{stat::SummaryStatistics, ReplicateSpectra},
};

/// A fully-covered variable site over 30 haploid rows with `derived` rows
/// carrying the non-reference allele.
fn full_column(derived: usize) -> Vec<i8> {
    let mut column = vec![0; 30];
    column.iter_mut().take(derived).for_each(|c| *c = 1);
    column
}

/// A variable site with per-population coverage exactly (8, 6, 6).
fn boundary_column() -> Vec<i8> {
    let mut column = Vec::with_capacity(30);

    // Population A: two missing, then four derived and four ancestral
    column.extend_from_slice(&[MISSING, MISSING, 1, 1, 1, 1, 0, 0, 0, 0]);
    // Populations B and C: four missing, then three derived and three ancestral
    column.extend_from_slice(&[MISSING, MISSING, MISSING, MISSING, 1, 1, 1, 0, 0, 0]);
    column.extend_from_slice(&[MISSING, MISSING, MISSING, MISSING, 1, 1, 1, 0, 0, 0]);

    column
}

/// A variable site where population B has only five non-missing calls.
fn infeasible_column() -> Vec<i8> {
    let mut column = full_column(15);
    column[10..15].copy_from_slice(&[MISSING; 5]);
    column
}

/// Three populations of ten haploid rows each with 1038 variable sites, of
/// which 1034 support downsampling targets (8, 6, 6).
fn synthetic_matrix() -> AlleleMatrix {
    let mut columns = Vec::with_capacity(1038);

    for i in 0..1030 {
        columns.push(full_column(1 + i % 28));
    }
    for _ in 0..4 {
        columns.push(boundary_column());
    }
    for _ in 0..4 {
        columns.push(infeasible_column());
    }

    AlleleMatrix::from_columns(columns, &[10, 10, 10]).unwrap()
}

#[test]
fn test_three_population_projection() {
    let matrix = synthetic_matrix();
    assert_eq!(matrix.rows(), 30);
    assert_eq!(matrix.sites(), 1038);

    // The feasibility table reports 1034 sites for the chosen targets
    let table = scan(&matrix, &[6..=10, 6..=10, 6..=10], Parity::Even).unwrap();
    assert_eq!(table.len(), 27);

    let targets = SizeCombination::from([8, 6, 6]);
    assert_eq!(table.get(&targets), Some(1034));

    let replicates = NonZeroUsize::new(10).unwrap();
    let projector = Projector::new(&matrix, targets.clone(), replicates, 1234).unwrap();
    assert_eq!(projector.feasible_sites(), 1034);

    let projected = projector.project();
    let spectra = ReplicateSpectra::assemble_all(&projected, &targets);
    assert_eq!(spectra.len(), 10);

    for (r, assembled) in spectra.iter().enumerate() {
        assert_eq!(assembled.replicate(), r);
        assert_eq!(assembled.msfs().shape(), &Shape(vec![9, 7, 7]));

        // Every site retained for the targets lands in exactly one cell
        assert_eq!(assembled.msfs().sum(), 1034.0);

        let shapes = assembled
            .pairwise()
            .iter()
            .map(|pair| pair.spectrum().shape().clone())
            .collect::<Vec<_>>();
        assert_eq!(
            shapes,
            vec![Shape(vec![9, 7]), Shape(vec![9, 7]), Shape(vec![7, 7])]
        );

        for pair in assembled.pairwise() {
            assert_eq!(pair.spectrum().sum(), 1034.0);
        }
    }
}

#[test]
fn test_projection_is_idempotent_given_seed() {
    let matrix = synthetic_matrix();
    let targets = SizeCombination::from([8, 6, 6]);
    let replicates = NonZeroUsize::new(3).unwrap();

    let first = Projector::new(&matrix, targets.clone(), replicates, 98765).unwrap();
    let second = Projector::new(&matrix, targets, replicates, 98765).unwrap();

    assert_eq!(first.project(), second.project());
}

#[test]
fn test_summary_statistics_are_finite_and_fixed_shape() {
    let matrix = synthetic_matrix();
    let targets = SizeCombination::from([8, 6, 6]);
    let replicates = NonZeroUsize::new(5).unwrap();

    let projector = Projector::new(&matrix, targets.clone(), replicates, 55).unwrap();
    let spectra = ReplicateSpectra::assemble_all(&projector.project(), &targets);

    let statistics = spectra
        .iter()
        .map(|assembled| SummaryStatistics::from_msfs(assembled.msfs()).unwrap())
        .collect::<Vec<_>>();

    for stats in &statistics {
        let vector = stats.to_vec();
        // Three heterozygosities, three divergences, three Fst values
        assert_eq!(vector.len(), 9);
        assert!(vector.iter().all(|v| v.is_finite()));
    }

    let mean = SummaryStatistics::mean(&statistics).unwrap();
    assert_eq!(mean.to_vec().len(), 9);
}

#[test]
fn test_pipeline_from_alignment_directory() {
    let dir = tempfile::tempdir().unwrap();

    // Two diploid individuals per population; heterozygous calls as IUPAC
    // ambiguity codes, one unresolvable call
    let loci = [
        (
            "locus0.fa",
            ">ind0\nACGTA\n>ind1\nACGTM\n>ind2\nAGGTA\n>ind3\nAGGAA\n",
        ),
        (
            "locus1.fa",
            ">ind0\nTTCN\n>ind1\nTTYA\n>ind2\nTACA\n>ind3\nWACA\n",
        ),
    ];

    for (name, contents) in loci {
        let mut file = File::create(dir.path().join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    let popmap = PopulationMap::from_str(
        "ind0\tnorth\nind1\tnorth\nind2\tsouth\nind3\tsouth",
        Ploidy::Diploid,
    )
    .unwrap();

    let loci = alignment::read_alignment_dir(dir.path()).unwrap();
    let matrix = AlleleMatrix::build(&loci, &popmap).unwrap();

    assert_eq!(matrix.rows(), 8);

    let table = scan(&matrix, &[2..=4, 2..=4], Parity::Even).unwrap();
    for (combination, count) in table.iter() {
        assert!(count <= matrix.sites(), "count for {combination} too large");
    }

    let targets = SizeCombination::from([4, 4]);
    let replicates = NonZeroUsize::new(2).unwrap();
    let projector = Projector::new(&matrix, targets.clone(), replicates, 7).unwrap();

    let spectra = ReplicateSpectra::assemble_all(&projector.project(), &targets);

    assert_eq!(spectra.len(), 2);
    for assembled in &spectra {
        assert_eq!(assembled.msfs().shape(), &Shape(vec![5, 5]));
        assert_eq!(
            assembled.msfs().sum(),
            projector.feasible_sites() as f64
        );
    }
}
