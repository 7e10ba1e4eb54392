//! Reading per-locus multi-sequence alignments.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;

const EXTENSIONS: &[&str] = &["fa", "fasta", "fna"];

/// A single locus alignment: one nucleotide sequence per sample.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocusAlignment {
    name: String,
    sequences: IndexMap<String, Vec<u8>>,
}

impl LocusAlignment {
    /// Creates a locus alignment from named sequences.
    pub fn new<I, S>(name: S, sequences: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: ToString,
    {
        Self {
            name: name.to_string(),
            sequences: sequences
                .into_iter()
                .map(|(name, seq)| (name.to_string(), seq))
                .collect(),
        }
    }

    /// Reads a locus alignment in FASTA format.
    pub fn from_reader<R>(name: &str, reader: R) -> io::Result<Self>
    where
        R: BufRead,
    {
        let mut sequences: IndexMap<String, Vec<u8>> = IndexMap::new();
        let mut current: Option<(String, Vec<u8>)> = None;

        let mut flush = |current: Option<(String, Vec<u8>)>,
                         sequences: &mut IndexMap<String, Vec<u8>>| {
            if let Some((sample, seq)) = current {
                if sequences.insert(sample.clone(), seq).is_some() {
                    return Err(invalid_data(format!(
                        "locus '{name}' contains duplicate record '{sample}'"
                    )));
                }
            }
            Ok(())
        };

        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end();

            if let Some(header) = line.strip_prefix('>') {
                let sample = header
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();

                if sample.is_empty() {
                    return Err(invalid_data(format!(
                        "locus '{name}' contains a record without a name"
                    )));
                }

                flush(current.take(), &mut sequences)?;
                current = Some((sample, Vec::new()));
            } else if !line.is_empty() {
                match &mut current {
                    Some((_, seq)) => seq.extend_from_slice(line.as_bytes()),
                    None => {
                        return Err(invalid_data(format!(
                            "locus '{name}' contains sequence data before the first record header"
                        )))
                    }
                }
            }
        }

        flush(current, &mut sequences)?;

        Ok(Self {
            name: name.to_string(),
            sequences,
        })
    }

    /// Reads a locus alignment from a FASTA file, transparently decompressing
    /// a `.gz` suffix.
    pub fn from_path<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let name = locus_name(path);
        let file = File::open(path)?;

        if path.extension().is_some_and(|ext| ext == "gz") {
            Self::from_reader(&name, BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Self::from_reader(&name, BufReader::new(file))
        }
    }

    /// Returns the sequence for a sample, if present.
    pub fn get(&self, sample: &str) -> Option<&[u8]> {
        self.sequences.get(sample).map(Vec::as_slice)
    }

    /// Returns the locus name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of sequences in the alignment.
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }
}

/// Reads all locus alignments from a directory.
///
/// Files with extensions `.fa`, `.fasta`, and `.fna`, optionally followed by
/// `.gz`, are read in lexicographic filename order so that the site order of
/// the resulting matrix is deterministic. Other files are ignored.
pub fn read_alignment_dir<P>(dir: P) -> io::Result<Vec<LocusAlignment>>
where
    P: AsRef<Path>,
{
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;

    paths.retain(|path| path.is_file() && is_alignment_path(path));
    paths.sort();

    paths.iter().map(LocusAlignment::from_path).collect()
}

fn is_alignment_path(path: &Path) -> bool {
    let path = if path.extension().is_some_and(|ext| ext == "gz") {
        PathBuf::from(path.file_stem().unwrap_or_default())
    } else {
        path.to_path_buf()
    };

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

fn locus_name(path: &Path) -> String {
    let path = if path.extension().is_some_and(|ext| ext == "gz") {
        PathBuf::from(path.file_stem().unwrap_or_default())
    } else {
        path.to_path_buf()
    };

    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
