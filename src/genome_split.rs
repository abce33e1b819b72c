//! Split the genome's markers into groups which can be segmented independently
//!

use std::ops::Range;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

use crate::marker_data::MarkerSet;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenomeSplitSettings {
    /// Consecutive markers on one chromosome separated by at least this distance are split into
    /// different groups. This accounts for large centromeres and other assembly gaps.
    pub max_gap: i64,

    /// Groups created by a gap split with fewer markers than this are merged back into a neighboring
    /// group from the same chromosome
    pub min_group_marker_count: usize,
}

impl Default for GenomeSplitSettings {
    fn default() -> Self {
        Self {
            max_gap: 5_000_000,
            min_group_marker_count: 200,
        }
    }
}

impl GenomeSplitSettings {
    pub fn validate(&self) -> SimpleResult<()> {
        if self.max_gap < 1 {
            bail!("Maximum marker gap must be greater than 0");
        }
        Ok(())
    }
}

/// A range of markers which can be segmented independently of all other markers
///
/// `marker_range` is a zero-indexed, half-closed range of marker indices.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenomeGroup {
    pub chrom_index: usize,
    pub marker_range: Range<usize>,
}

impl GenomeGroup {
    pub fn marker_count(&self) -> usize {
        self.marker_range.len()
    }
}

/// Find the marker index ranges of each chromosome
///
fn get_chrom_marker_ranges(markers: &MarkerSet) -> Vec<(usize, Range<usize>)> {
    let mut start = 0;
    let mut chrom_ranges = Vec::new();
    for (chrom_index, chrom_markers) in &markers.chrom_index.iter().chunk_by(|&&x| x) {
        let end = start + chrom_markers.count();
        chrom_ranges.push((chrom_index, start..end));
        start = end;
    }
    chrom_ranges
}

/// Split one chromosome's markers at large position gaps, then merge undersized pieces
///
fn split_chrom_markers(
    positions: &[i64],
    marker_range: Range<usize>,
    settings: &GenomeSplitSettings,
) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = marker_range.start;
    for marker_index in (marker_range.start + 1)..marker_range.end {
        if positions[marker_index] - positions[marker_index - 1] >= settings.max_gap {
            pieces.push(start..marker_index);
            start = marker_index;
        }
    }
    pieces.push(start..marker_range.end);

    // Merge the first undersized piece into its previous neighbor (or next neighbor for the first
    // piece) until no undersized pieces remain, or the chromosome is a single piece
    while pieces.len() > 1 {
        let small_piece_index = match pieces
            .iter()
            .position(|x| x.len() < settings.min_group_marker_count)
        {
            Some(x) => x,
            None => break,
        };
        let (left_index, right_index) = if small_piece_index > 0 {
            (small_piece_index - 1, small_piece_index)
        } else {
            (0, 1)
        };
        let right = pieces.remove(right_index);
        pieces[left_index].end = right.end;
    }
    pieces
}

/// Split markers into independently segmentable genome groups
///
/// Groups never cross chromosome boundaries. Within a chromosome, markers are split at position gaps
/// of at least `max_gap`, and any resulting group smaller than `min_group_marker_count` is merged with
/// a neighbor from the same chromosome.
///
pub fn split_genome(markers: &MarkerSet, settings: &GenomeSplitSettings) -> Vec<GenomeGroup> {
    let mut groups = Vec::new();
    for (chrom_index, chrom_marker_range) in get_chrom_marker_ranges(markers) {
        let pieces = split_chrom_markers(&markers.positions, chrom_marker_range, settings);
        debug!(
            "Split chromosome '{}' into {} groups",
            markers.chrom_labels[chrom_index],
            pieces.len()
        );
        groups.extend(pieces.into_iter().map(|marker_range| GenomeGroup {
            chrom_index,
            marker_range,
        }));
    }
    groups
}

/// Convert genome groups into lists of marker indices for stretch prediction
///
pub fn groups_to_index_lists(groups: &[GenomeGroup]) -> Vec<Vec<usize>> {
    groups
        .iter()
        .map(|x| x.marker_range.clone().collect())
        .collect()
}
