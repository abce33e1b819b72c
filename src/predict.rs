use log::{error, info};
use simple_error::SimpleResult;
use thousands::Separable;

use crate::cli;
use crate::genome_split::{GenomeGroup, groups_to_index_lists, split_genome};
use crate::genotype::GenotypeCounts;
use crate::homozygous_stretch::{
    HomozygousStretch, predict_germline_homozygous_stretches_parallel,
};
use crate::marker_data::{MarkerReadSettings, MarkerSet, read_marker_file};
use crate::run_stats::{PredictRunStats, write_run_stats};
use crate::stretch_output::{write_group_file, write_stretch_file};

/// Results of homozygous stretch prediction for one marker table
///
pub struct PredictResult {
    pub markers: MarkerSet,
    pub groups: Vec<GenomeGroup>,
    pub stretches: Vec<HomozygousStretch>,
}

/// Read markers and predict all germline homozygous stretches, without writing any output
///
pub fn get_homozygous_stretches(
    shared_settings: &cli::SharedSettings,
    settings: &cli::PredictSettings,
) -> SimpleResult<PredictResult> {
    let genotype_call_settings = settings.genotype_call_settings();
    let markers = read_marker_file(
        camino::Utf8Path::new(&settings.markers_filename),
        &MarkerReadSettings {
            chrom_regex: &settings.chrom_regex,
            genotype_call_settings: &genotype_call_settings,
        },
    )?;

    let groups = split_genome(&markers, &settings.genome_split_settings());
    info!(
        "Split {} markers into {} segmentation groups",
        markers.len().separate_with_commas(),
        groups.len()
    );

    let chr = groups_to_index_lists(&groups);
    let stretches = predict_germline_homozygous_stretches_parallel(
        shared_settings.thread_count,
        &chr,
        &markers.genotypes,
        &settings.stretch_settings(),
    )?;
    info!(
        "Predicted {} germline homozygous stretches",
        stretches.len().separate_with_commas()
    );

    Ok(PredictResult {
        markers,
        groups,
        stretches,
    })
}

/// Run the predict command, writing all output to the output directory
///
/// Assumes that the logger and output directory are setup
///
pub fn run_predict(shared_settings: &cli::SharedSettings, settings: &cli::PredictSettings) {
    cli::write_predict_settings(&settings.output_dir, settings);

    let start = std::time::Instant::now();

    let result = match get_homozygous_stretches(shared_settings, settings) {
        Ok(x) => x,
        Err(err) => {
            error!("{err}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    let genotype_counts = GenotypeCounts::from_genotypes(&result.markers.genotypes);
    if genotype_counts.total() == 0 {
        info!("No markers found in marker table, output will be empty");
    } else {
        info!(
            "Germline genotypes: {} homozygous, {} heterozygous, {} missing",
            genotype_counts.homozygous.separate_with_commas(),
            genotype_counts.heterozygous.separate_with_commas(),
            genotype_counts.missing.separate_with_commas(),
        );
        if let Some(fraction) = genotype_counts.homozygous_fraction() {
            info!("Homozygous fraction of called markers: {fraction:.4}");
        }
    }

    write_stretch_file(&settings.output_dir, &result.markers, &result.stretches);
    write_group_file(&settings.output_dir, &result.markers, &result.groups);

    write_run_stats(
        &settings.output_dir,
        &PredictRunStats::new(
            &result.markers,
            &result.groups,
            &result.stretches,
            start.elapsed().as_secs_f64(),
        ),
    );
}
