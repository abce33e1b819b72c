use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;
use unwrap::unwrap;

use crate::genome_split::GenomeGroup;
use crate::homozygous_stretch::HomozygousStretch;
use crate::marker_data::MarkerSet;

pub const STRETCH_FILENAME: &str = "homozygous_stretches.tsv";
pub const GROUP_FILENAME: &str = "segmentation_groups.bed";

/// Write homozygous stretches out in a BED-like tab-delimited format
///
/// Stretch coordinates are converted from the 1-indexed marker positions to a zero-indexed
/// half-closed range running from the first to the last homozygous marker.
///
pub fn write_stretches<W: Write>(
    mut f: W,
    markers: &MarkerSet,
    stretches: &[HomozygousStretch],
) -> std::io::Result<()> {
    writeln!(
        f,
        "#chrom\tstart\tend\tgroup\tfirst_marker\tlast_marker\thom_markers\thet_markers"
    )?;
    for s in stretches.iter() {
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            markers.chrom_label(s.first_index),
            markers.positions[s.first_index] - 1,
            markers.positions[s.last_index],
            s.group_index,
            s.first_index,
            s.last_index,
            s.hom_marker_count,
            s.het_marker_count,
        )?;
    }
    f.flush()
}

/// Write genome segmentation groups out in BED format, with the group marker count in column 4
///
pub fn write_groups<W: Write>(
    mut f: W,
    markers: &MarkerSet,
    groups: &[GenomeGroup],
) -> std::io::Result<()> {
    for group in groups.iter().filter(|x| !x.marker_range.is_empty()) {
        writeln!(
            f,
            "{}\t{}\t{}\t{}",
            markers.chrom_labels[group.chrom_index],
            markers.positions[group.marker_range.start] - 1,
            markers.positions[group.marker_range.end - 1],
            group.marker_count(),
        )?;
    }
    f.flush()
}

pub fn write_stretch_file(
    output_dir: &Utf8Path,
    markers: &MarkerSet,
    stretches: &[HomozygousStretch],
) {
    let filename = output_dir.join(STRETCH_FILENAME);

    info!("Writing homozygous stretches to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create homozygous stretch file: '{filename}'"
    );
    unwrap!(
        write_stretches(BufWriter::new(f), markers, stretches),
        "Unable to write homozygous stretch file: '{filename}'"
    );
}

pub fn write_group_file(output_dir: &Utf8Path, markers: &MarkerSet, groups: &[GenomeGroup]) {
    let filename = output_dir.join(GROUP_FILENAME);

    info!("Writing segmentation groups to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create segmentation group file: '{filename}'"
    );
    unwrap!(
        write_groups(BufWriter::new(f), markers, groups),
        "Unable to write segmentation group file: '{filename}'"
    );
}
