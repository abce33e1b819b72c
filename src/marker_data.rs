//! Read the germline marker table
//!
//! The marker table is tab-delimited with a header line, and may be gzip-compressed. Required columns
//! are `chrom`, `pos`, and exactly one of `genotype` or `baf`.
//!

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use regex::Regex;
use simple_error::{SimpleResult, bail, map_err_with};
use thousands::Separable;

use crate::genotype::{Genotype, GenotypeCallSettings, call_germline_genotype};

/// Source of the germline genotype in the marker table
///
#[derive(Clone, Copy, Debug, PartialEq, strum::Display)]
pub enum GenotypeSource {
    #[strum(serialize = "genotype")]
    Label,
    #[strum(serialize = "baf")]
    Baf,
}

/// All markers used for stretch prediction
///
/// Markers are stored in file order, which is required to be grouped by chromosome and sorted by
/// position within each chromosome.
///
#[derive(Default)]
pub struct MarkerSet {
    pub chrom_labels: Vec<String>,

    /// Index into `chrom_labels` for each marker
    pub chrom_index: Vec<usize>,

    /// 1-indexed position of each marker
    pub positions: Vec<i64>,

    pub genotypes: Vec<Genotype>,
}

impl MarkerSet {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn chrom_label(&self, marker_index: usize) -> &str {
        self.chrom_labels[self.chrom_index[marker_index]].as_str()
    }

    /// Add a marker, enforcing chromosome grouping and position order
    ///
    fn push(&mut self, chrom: &str, pos: i64, genotype: Genotype) -> SimpleResult<()> {
        let is_new_chrom = match self.chrom_labels.last() {
            Some(last_chrom) => last_chrom != chrom,
            None => true,
        };
        if is_new_chrom {
            if self.chrom_labels.iter().any(|x| x == chrom) {
                bail!(
                    "Markers from chromosome '{}' are not contiguous, marker table must be grouped by chromosome",
                    chrom
                );
            }
            self.chrom_labels.push(chrom.to_string());
        } else {
            let last_pos = *self.positions.last().unwrap();
            if pos < last_pos {
                bail!(
                    "Marker position {} on chromosome '{}' follows position {}, markers must be sorted by position",
                    pos,
                    chrom,
                    last_pos
                );
            }
        }
        self.chrom_index.push(self.chrom_labels.len() - 1);
        self.positions.push(pos);
        self.genotypes.push(genotype);
        Ok(())
    }
}

/// Settings for reading the marker table
///
pub struct MarkerReadSettings<'a> {
    /// Only chromosomes matching this regex are kept
    pub chrom_regex: &'a str,
    pub genotype_call_settings: &'a GenotypeCallSettings,
}

/// Column layout found in the marker table header
///
struct MarkerColumns {
    chrom: usize,
    pos: usize,
    genotype: usize,
    source: GenotypeSource,
}

fn get_marker_columns(header: &StringRecord) -> SimpleResult<MarkerColumns> {
    let find_column = |name: &str| header.iter().position(|x| x.eq_ignore_ascii_case(name));

    let chrom = match find_column("chrom") {
        Some(x) => x,
        None => bail!("Marker table header is missing required column 'chrom'"),
    };
    let pos = match find_column("pos") {
        Some(x) => x,
        None => bail!("Marker table header is missing required column 'pos'"),
    };
    let (genotype, source) = match (find_column("genotype"), find_column("baf")) {
        (Some(x), None) => (x, GenotypeSource::Label),
        (None, Some(x)) => (x, GenotypeSource::Baf),
        (Some(_), Some(_)) => {
            bail!("Marker table header must contain only one of the 'genotype' or 'baf' columns")
        }
        (None, None) => {
            bail!("Marker table header is missing a 'genotype' or 'baf' column")
        }
    };
    Ok(MarkerColumns {
        chrom,
        pos,
        genotype,
        source,
    })
}

fn parse_baf(value: &str) -> SimpleResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("na") || value == "." {
        return Ok(None);
    }
    let baf = map_err_with!(value.parse::<f64>(), "Invalid BAF value '{}'", value)?;
    if baf.is_nan() {
        return Ok(None);
    }
    if !(0.0..=1.0).contains(&baf) {
        bail!("BAF value '{}' is outside of [0,1]", value);
    }
    Ok(Some(baf))
}

/// Read markers from any tab-delimited marker table source
///
/// `label` is used to describe the source in error messages
///
pub fn read_marker_table<R: Read>(
    source: R,
    label: &str,
    settings: &MarkerReadSettings,
) -> SimpleResult<MarkerSet> {
    let chrom_include_regex = map_err_with!(
        Regex::new(settings.chrom_regex),
        "Invalid chromosome regex '{}'",
        settings.chrom_regex
    )?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(source);

    let header = map_err_with!(
        rdr.headers(),
        "Failed to read header line from marker table '{}'",
        label
    )?
    .clone();
    let columns = get_marker_columns(&header)?;
    let min_column_count = columns.chrom.max(columns.pos).max(columns.genotype) + 1;

    info!(
        "Reading germline genotypes from the '{}' column of marker table '{label}'",
        columns.source
    );

    let mut markers = MarkerSet::default();
    let mut skipped_chroms = HashSet::new();
    let mut skipped_marker_count = 0usize;

    for result in rdr.records() {
        let record = map_err_with!(result, "Failed to parse marker table '{}'", label)?;
        let line_number = record.position().map(|x| x.line()).unwrap_or(0);

        if record.len() < min_column_count {
            bail!(
                "Expected at least {} columns on line {} of marker table '{}', found {}",
                min_column_count,
                line_number,
                label,
                record.len()
            );
        }

        let chrom = &record[columns.chrom];
        if !chrom_include_regex.is_match(chrom) {
            if skipped_chroms.insert(chrom.to_string()) {
                debug!("Skipping markers on chromosome '{chrom}'");
            }
            skipped_marker_count += 1;
            continue;
        }

        let pos = map_err_with!(
            record[columns.pos].parse::<i64>(),
            "Invalid position on line {} of marker table '{}'",
            line_number,
            label
        )?;
        if pos < 1 {
            bail!(
                "Marker position must be 1 or greater on line {} of marker table '{}'",
                line_number,
                label
            );
        }

        let genotype_value = &record[columns.genotype];
        let genotype = match columns.source {
            GenotypeSource::Label => Genotype::from_label(genotype_value),
            GenotypeSource::Baf => parse_baf(genotype_value)
                .map(|baf| call_germline_genotype(baf, settings.genotype_call_settings)),
        };
        let genotype = map_err_with!(
            genotype,
            "Invalid genotype on line {} of marker table '{}'",
            line_number,
            label
        )?;

        map_err_with!(
            markers.push(chrom, pos, genotype),
            "Invalid marker order on line {} of marker table '{}'",
            line_number,
            label
        )?;
    }

    if skipped_marker_count > 0 {
        info!(
            "Skipped {} markers on {} chromosomes not matching regex '{}'",
            skipped_marker_count.separate_with_commas(),
            skipped_chroms.len(),
            settings.chrom_regex
        );
    }

    info!(
        "Read {} markers on {} chromosomes from marker table '{label}'",
        markers.len().separate_with_commas(),
        markers.chrom_labels.len()
    );

    Ok(markers)
}

/// Read markers from a marker table file, decompressing files ending in '.gz'
///
pub fn read_marker_file(filename: &Utf8Path, settings: &MarkerReadSettings) -> SimpleResult<MarkerSet> {
    use flate2::read::MultiGzDecoder;

    let file = map_err_with!(
        File::open(filename),
        "Unable to open marker table file: '{}'",
        filename
    )?;
    let reader = BufReader::new(file);
    if filename.extension() == Some("gz") {
        read_marker_table(MultiGzDecoder::new(reader), filename.as_str(), settings)
    } else {
        read_marker_table(reader, filename.as_str(), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(content: &str, chrom_regex: &str) -> SimpleResult<MarkerSet> {
        let genotype_call_settings = GenotypeCallSettings::default();
        let settings = MarkerReadSettings {
            chrom_regex,
            genotype_call_settings: &genotype_call_settings,
        };
        read_marker_table(content.as_bytes(), "test", &settings)
    }

    #[test]
    fn test_read_genotype_labels() {
        let content = "chrom\tpos\tgenotype\n\
                       chr1\t100\thom\n\
                       chr1\t200\thet\n\
                       chr1\t300\tNA\n\
                       chr2\t50\t1/1\n";
        let markers = read_str(content, ".").unwrap();
        assert_eq!(markers.len(), 4);
        assert_eq!(markers.chrom_labels, vec!["chr1", "chr2"]);
        assert_eq!(markers.chrom_index, vec![0, 0, 0, 1]);
        assert_eq!(markers.positions, vec![100, 200, 300, 50]);
        assert_eq!(
            markers.genotypes,
            vec![
                Genotype::Homozygous,
                Genotype::Heterozygous,
                Genotype::Missing,
                Genotype::Homozygous
            ]
        );
        assert_eq!(markers.chrom_label(3), "chr2");
    }

    #[test]
    fn test_read_baf() {
        let content = "sample\tchrom\tpos\tbaf\n\
                       s1\t1\t10\t0.05\n\
                       s1\t1\t20\t0.48\n\
                       s1\t1\t30\tNA\n\
                       s1\t1\t40\t0.99\n";
        let markers = read_str(content, ".").unwrap();
        assert_eq!(
            markers.genotypes,
            vec![
                Genotype::Homozygous,
                Genotype::Heterozygous,
                Genotype::Missing,
                Genotype::Homozygous
            ]
        );
    }

    #[test]
    fn test_chrom_regex() {
        let content = "chrom\tpos\tgenotype\n\
                       chr1\t100\thom\n\
                       chrX\t100\thom\n\
                       chr2\t100\thet\n";
        let markers = read_str(content, r"^(chr)?\d{1,2}$").unwrap();
        assert_eq!(markers.chrom_labels, vec!["chr1", "chr2"]);
        assert_eq!(markers.len(), 2);

        assert!(read_str(content, "(").is_err());
    }

    #[test]
    fn test_comment_lines() {
        let content = "chrom\tpos\tgenotype\n\
                       # a comment\n\
                       chr1\t100\thom\n";
        let markers = read_str(content, ".").unwrap();
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_header_errors() {
        assert!(read_str("chrom\tpos\n", ".").is_err());
        assert!(read_str("chrom\tgenotype\n", ".").is_err());
        assert!(read_str("chrom\tpos\tgenotype\tbaf\n", ".").is_err());
    }

    #[test]
    fn test_record_errors() {
        // Unsorted positions
        let content = "chrom\tpos\tgenotype\nchr1\t200\thom\nchr1\t100\thom\n";
        assert!(read_str(content, ".").is_err());

        // Non-contiguous chromosome
        let content = "chrom\tpos\tgenotype\nchr1\t1\thom\nchr2\t1\thom\nchr1\t2\thom\n";
        assert!(read_str(content, ".").is_err());

        // Bad position
        let content = "chrom\tpos\tgenotype\nchr1\tabc\thom\n";
        assert!(read_str(content, ".").is_err());

        // Zero position
        let content = "chrom\tpos\tgenotype\nchr1\t0\thom\n";
        assert!(read_str(content, ".").is_err());

        // Bad genotype
        let content = "chrom\tpos\tgenotype\nchr1\t1\tmaybe\n";
        assert!(read_str(content, ".").is_err());

        // Out of range BAF
        let content = "chrom\tpos\tbaf\nchr1\t1\t1.5\n";
        assert!(read_str(content, ".").is_err());

        // Truncated line
        let content = "chrom\tpos\tgenotype\nchr1\t1\n";
        assert!(read_str(content, ".").is_err());
    }

    #[test]
    fn test_read_gzip_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let filename = camino::Utf8PathBuf::from_path_buf(dir.path().join("markers.tsv.gz")).unwrap();
        {
            let f = File::create(&filename).unwrap();
            let mut encoder = GzEncoder::new(f, Compression::default());
            encoder
                .write_all(b"chrom\tpos\tgenotype\nchr1\t5\thom\nchr1\t9\thet\n")
                .unwrap();
            encoder.finish().unwrap();
        }

        let genotype_call_settings = GenotypeCallSettings::default();
        let settings = MarkerReadSettings {
            chrom_regex: ".",
            genotype_call_settings: &genotype_call_settings,
        };
        let markers = read_marker_file(&filename, &settings).unwrap();
        assert_eq!(markers.positions, vec![5, 9]);

        let missing = filename.with_file_name("not_there.tsv");
        assert!(read_marker_file(&missing, &settings).is_err());
    }
}
