use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, map_err_with};
use unwrap::unwrap;

use super::defaults::{HOM_BAF_MAX, HOM_BAF_MIN, MAX_MARKER_GAP, MIN_GROUP_MARKER_COUNT};
use super::utils::check_required_filename;
use crate::genome_split::GenomeSplitSettings;
use crate::genotype::GenotypeCallSettings;
use crate::homozygous_stretch::StretchSettings;

pub const SETTINGS_FILENAME: &str = "predict.settings.json";

#[derive(Args, Deserialize, Serialize)]
pub struct PredictSettings {
    /// Directory for all predict command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Germline marker table, tab-delimited with an optional '.gz' compression suffix
    ///
    /// The header line must contain the columns 'chrom' and 'pos', and exactly one of 'genotype'
    /// or 'baf'. A 'genotype' column holds hom/het/NA labels or diploid GT strings such as '0/1'. A
    /// 'baf' column holds germline B-allele frequencies, which are called homozygous outside of
    /// the range given by --hom-baf-min and --hom-baf-max.
    ///
    /// Markers must be grouped by chromosome and sorted by position.
    ///
    #[arg(long = "markers", value_name = "FILE")]
    pub markers_filename: String,

    /// Regex used to select chromosomes from the marker table. Markers on all other chromosomes
    /// are skipped.
    #[arg(long = "chrom-regex", value_name = "REGEX", default_value = ".")]
    pub chrom_regex: String,

    /// Germline BAF values below this threshold are called homozygous
    #[arg(long, default_value_t = HOM_BAF_MIN)]
    pub hom_baf_min: f64,

    /// Germline BAF values above this threshold are called homozygous
    #[arg(long, default_value_t = HOM_BAF_MAX)]
    pub hom_baf_max: f64,

    /// Markers on the same chromosome separated by at least this many bases are assigned to
    /// different segmentation groups
    #[arg(long, default_value_t = MAX_MARKER_GAP)]
    pub max_gap: i64,

    /// Segmentation groups created by a gap split which have fewer markers than this are merged
    /// into a neighboring group on the same chromosome
    #[arg(hide = true, long, default_value_t = MIN_GROUP_MARKER_COUNT)]
    pub min_group_marker_count: usize,

    /// Minimum number of homozygous markers required to report a stretch
    #[arg(long, default_value_t = 1)]
    pub min_marker_count: usize,

    /// Longest run of heterozygous markers which can occur within a stretch without splitting it
    ///
    /// This can be raised to tolerate isolated genotyping errors in otherwise homozygous regions.
    ///
    #[arg(long, default_value_t = 0)]
    pub max_het_run: usize,
}

impl PredictSettings {
    pub fn genotype_call_settings(&self) -> GenotypeCallSettings {
        GenotypeCallSettings {
            hom_baf_min: self.hom_baf_min,
            hom_baf_max: self.hom_baf_max,
        }
    }

    pub fn genome_split_settings(&self) -> GenomeSplitSettings {
        GenomeSplitSettings {
            max_gap: self.max_gap,
            min_group_marker_count: self.min_group_marker_count,
        }
    }

    pub fn stretch_settings(&self) -> StretchSettings {
        StretchSettings {
            min_marker_count: self.min_marker_count,
            max_het_run: self.max_het_run,
        }
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_predict_settings(
    settings: PredictSettings,
) -> SimpleResult<PredictSettings> {
    check_required_filename(&settings.markers_filename, "marker table")?;

    let _ = map_err_with!(
        Regex::new(&settings.chrom_regex),
        "Invalid regex for --chrom-regex"
    )?;

    map_err_with!(
        settings.genotype_call_settings().validate(),
        "Invalid --hom-baf-min/--hom-baf-max settings"
    )?;
    map_err_with!(
        settings.genome_split_settings().validate(),
        "Invalid --max-gap setting"
    )?;
    if settings.min_marker_count == 0 {
        bail!("--min-marker-count argument must be greater than 0");
    }

    let mut settings = settings;
    settings.markers_filename = map_err_with!(
        Utf8PathBuf::from(&settings.markers_filename).canonicalize_utf8(),
        "Unable to canonicalize marker table path: '{}'",
        settings.markers_filename
    )?
    .to_string();

    Ok(settings)
}

/// Write predict settings out in json format
pub fn write_predict_settings(output_dir: &Utf8Path, settings: &PredictSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing predict settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create predict settings json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write predict settings json file: '{filename}'"
    );
}
