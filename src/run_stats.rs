//! Track stats for the whole homstretch run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::genome_split::GenomeGroup;
use crate::genotype::GenotypeCounts;
use crate::homozygous_stretch::HomozygousStretch;
use crate::marker_data::MarkerSet;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StretchStats {
    pub stretch_count: usize,

    /// Total homozygous markers over all stretches
    pub stretch_hom_marker_count: usize,

    /// Total tolerated heterozygous markers over all stretches
    pub stretch_het_marker_count: usize,

    /// Largest number of homozygous markers in any one stretch
    pub max_stretch_hom_marker_count: usize,

    /// Total span of all stretches in bases
    pub total_stretch_span: i64,
}

impl StretchStats {
    pub fn new(markers: &MarkerSet, stretches: &[HomozygousStretch]) -> Self {
        let mut stats = Self {
            stretch_count: stretches.len(),
            ..Default::default()
        };
        for s in stretches.iter() {
            stats.stretch_hom_marker_count += s.hom_marker_count;
            stats.stretch_het_marker_count += s.het_marker_count;
            stats.max_stretch_hom_marker_count =
                std::cmp::max(stats.max_stretch_hom_marker_count, s.hom_marker_count);
            stats.total_stretch_span +=
                1 + markers.positions[s.last_index] - markers.positions[s.first_index];
        }
        stats
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictRunStats {
    pub marker_count: usize,
    pub chrom_count: usize,
    pub group_count: usize,
    pub genotype_counts: GenotypeCounts,
    pub stretch_stats: StretchStats,
    pub total_runtime_secs: f64,
}

impl PredictRunStats {
    pub fn new(
        markers: &MarkerSet,
        groups: &[GenomeGroup],
        stretches: &[HomozygousStretch],
        total_runtime_secs: f64,
    ) -> Self {
        Self {
            marker_count: markers.len(),
            chrom_count: markers.chrom_labels.len(),
            group_count: groups.len(),
            genotype_counts: GenotypeCounts::from_genotypes(&markers.genotypes),
            stretch_stats: StretchStats::new(markers, stretches),
            total_runtime_secs,
        }
    }
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &PredictRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}

#[allow(dead_code)]
pub fn read_run_stats(output_dir: &Utf8Path) -> PredictRunStats {
    use std::io::BufReader;

    let filename = output_dir.join(RUN_STATS_FILENAME);
    let file = unwrap!(
        File::open(&filename),
        "Unable to read run stats json file: `{filename}`"
    );
    let reader = BufReader::new(file);
    unwrap!(
        serde_json::from_reader(reader),
        "Unable to parse run stats from json file: `{filename}`"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::Genotype;

    #[test]
    fn test_run_stats() {
        let markers = MarkerSet {
            chrom_labels: vec!["chr1".to_string()],
            chrom_index: vec![0; 6],
            positions: vec![100, 200, 300, 400, 500, 600],
            genotypes: vec![
                Genotype::Homozygous,
                Genotype::Homozygous,
                Genotype::Heterozygous,
                Genotype::Homozygous,
                Genotype::Missing,
                Genotype::Homozygous,
            ],
        };
        let groups = vec![GenomeGroup {
            chrom_index: 0,
            marker_range: 0..6,
        }];
        let stretches = vec![
            HomozygousStretch {
                group_index: 0,
                first_index: 0,
                last_index: 1,
                hom_marker_count: 2,
                het_marker_count: 0,
            },
            HomozygousStretch {
                group_index: 0,
                first_index: 3,
                last_index: 5,
                hom_marker_count: 2,
                het_marker_count: 0,
            },
        ];

        let run_stats = PredictRunStats::new(&markers, &groups, &stretches, 1.5);
        assert_eq!(run_stats.marker_count, 6);
        assert_eq!(run_stats.group_count, 1);
        assert_eq!(run_stats.genotype_counts.homozygous, 4);
        assert_eq!(run_stats.stretch_stats.stretch_count, 2);
        assert_eq!(run_stats.stretch_stats.stretch_hom_marker_count, 4);
        assert_eq!(run_stats.stretch_stats.max_stretch_hom_marker_count, 2);
        assert_eq!(run_stats.stretch_stats.total_stretch_span, 101 + 201);

        let dir = tempfile::tempdir().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();
        write_run_stats(output_dir, &run_stats);
        let read_stats = read_run_stats(output_dir);
        assert_eq!(read_stats.marker_count, 6);
        assert_eq!(read_stats.stretch_stats.stretch_count, 2);
        approx::assert_ulps_eq!(read_stats.total_runtime_secs, 1.5, max_ulps = 4);
    }
}
