//! Prediction of germline homozygous stretches
//!
//! Homozygous stretches are found independently within each index group of the genome, so that no
//! stretch crosses a chromosome (or other segmentation group) boundary. The stretches are used to
//! mark regions where germline homozygosity, rather than a somatic allelic imbalance, explains an
//! absence of heterozygous markers during re-segmentation.
//!

use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

use crate::genotype::Genotype;

/// Settings controlling how homozygous markers are joined into stretches
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StretchSettings {
    /// Minimum number of homozygous markers required to report a stretch
    pub min_marker_count: usize,

    /// Longest run of consecutive heterozygous markers which can be absorbed into a stretch
    /// without splitting it
    pub max_het_run: usize,
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            min_marker_count: 1,
            max_het_run: 0,
        }
    }
}

impl StretchSettings {
    pub fn validate(&self) -> SimpleResult<()> {
        if self.min_marker_count == 0 {
            bail!("Minimum homozygous stretch marker count must be greater than 0");
        }
        Ok(())
    }
}

/// A germline homozygous stretch within one segmentation group
///
/// The stretch always starts and ends on a homozygous marker. Marker indices are global indices into
/// the genotype array, and the range they describe is closed, [first_index,last_index].
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HomozygousStretch {
    pub group_index: usize,
    pub first_index: usize,
    pub last_index: usize,
    pub hom_marker_count: usize,
    pub het_marker_count: usize,
}

/// Tracks the stretch currently being extended while scanning a group
///
struct StretchBuilder {
    first_index: usize,
    last_index: usize,
    hom_marker_count: usize,
    het_marker_count: usize,

    /// Heterozygous markers observed since the last homozygous marker
    pending_het_count: usize,
}

impl StretchBuilder {
    fn new(index: usize) -> Self {
        Self {
            first_index: index,
            last_index: index,
            hom_marker_count: 1,
            het_marker_count: 0,
            pending_het_count: 0,
        }
    }

    fn extend(&mut self, index: usize) {
        self.last_index = index;
        self.hom_marker_count += 1;
        self.het_marker_count += self.pending_het_count;
        self.pending_het_count = 0;
    }

    fn finish(self, group_index: usize) -> HomozygousStretch {
        HomozygousStretch {
            group_index,
            first_index: self.first_index,
            last_index: self.last_index,
            hom_marker_count: self.hom_marker_count,
            het_marker_count: self.het_marker_count,
        }
    }
}

/// Check that every index in every group can be used to look up a genotype
///
fn check_group_indices(chr: &[Vec<usize>], marker_count: usize) -> SimpleResult<()> {
    for (group_index, group) in chr.iter().enumerate() {
        if let Some(&index) = group.iter().find(|&&x| x >= marker_count) {
            bail!(
                "Marker index {} in segmentation group {} is out of range for {} genotypes",
                index,
                group_index,
                marker_count
            );
        }
    }
    Ok(())
}

/// Find the homozygous stretches of a single group
///
/// Indices in `group` are assumed to have been checked against `hom` already.
///
pub fn get_group_homozygous_stretches(
    group_index: usize,
    group: &[usize],
    hom: &[Genotype],
    settings: &StretchSettings,
) -> Vec<HomozygousStretch> {
    let mut stretches = Vec::new();

    let mut add_stretch = |builder: StretchBuilder| {
        if builder.hom_marker_count >= settings.min_marker_count {
            stretches.push(builder.finish(group_index));
        }
    };

    let mut current: Option<StretchBuilder> = None;
    for &index in group {
        match hom[index] {
            Genotype::Homozygous => match current.as_mut() {
                Some(builder) => builder.extend(index),
                None => current = Some(StretchBuilder::new(index)),
            },
            Genotype::Heterozygous => {
                if let Some(mut builder) = current.take() {
                    builder.pending_het_count += 1;
                    if builder.pending_het_count > settings.max_het_run {
                        add_stretch(builder);
                    } else {
                        current = Some(builder);
                    }
                }
            }
            Genotype::Missing => {}
        }
    }
    if let Some(builder) = current {
        add_stretch(builder);
    }

    stretches
}

/// Predict germline homozygous stretches using default stretch settings
///
/// See [predict_germline_homozygous_stretches_with_settings]
///
#[allow(dead_code)]
pub fn predict_germline_homozygous_stretches(
    chr: &[Vec<usize>],
    hom: &[Genotype],
) -> SimpleResult<Vec<HomozygousStretch>> {
    predict_germline_homozygous_stretches_with_settings(chr, hom, &StretchSettings::default())
}

/// Predict germline homozygous stretches for later re-segmentation
///
/// # Arguments
///
/// * `chr` - Marker index groups, each of which can be segmented separately (e.g. one group per
///   chromosome or chromosome arm). Each group lists global indices into `hom` in genomic order.
///
/// * `hom` - Germline genotype of every marker
///
/// Returns all stretches, ordered by group and then by position within the group. Missing genotypes
/// neither extend nor break a stretch.
///
pub fn predict_germline_homozygous_stretches_with_settings(
    chr: &[Vec<usize>],
    hom: &[Genotype],
    settings: &StretchSettings,
) -> SimpleResult<Vec<HomozygousStretch>> {
    settings.validate()?;
    check_group_indices(chr, hom.len())?;

    Ok(chr
        .iter()
        .enumerate()
        .flat_map(|(group_index, group)| {
            get_group_homozygous_stretches(group_index, group, hom, settings)
        })
        .collect())
}

/// Parallel version of [predict_germline_homozygous_stretches_with_settings]
///
/// Groups are distributed over a worker pool of `thread_count` threads. Output order is the same as
/// the sequential method.
///
pub fn predict_germline_homozygous_stretches_parallel(
    thread_count: usize,
    chr: &[Vec<usize>],
    hom: &[Genotype],
    settings: &StretchSettings,
) -> SimpleResult<Vec<HomozygousStretch>> {
    use rayon::prelude::*;

    settings.validate()?;
    check_group_indices(chr, hom.len())?;

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let group_stretches = worker_pool.install(|| {
        chr.par_iter()
            .enumerate()
            .map(|(group_index, group)| {
                get_group_homozygous_stretches(group_index, group, hom, settings)
            })
            .collect::<Vec<_>>()
    });

    Ok(group_stretches.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::genotype::Genotype::{Heterozygous as Het, Homozygous as Hom, Missing as Na};

    fn stretch(
        group_index: usize,
        first_index: usize,
        last_index: usize,
        hom_marker_count: usize,
        het_marker_count: usize,
    ) -> HomozygousStretch {
        HomozygousStretch {
            group_index,
            first_index,
            last_index,
            hom_marker_count,
            het_marker_count,
        }
    }

    #[test]
    fn test_empty_groups() {
        let hom = vec![Hom, Hom, Het];
        let result = predict_germline_homozygous_stretches(&[], &hom).unwrap();
        assert!(result.is_empty());

        let result = predict_germline_homozygous_stretches(&[vec![]], &hom).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_homozygous_markers() {
        let hom = vec![Het, Het, Na, Het];
        let chr = vec![vec![0, 1, 2, 3]];
        let result = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_all_homozygous_group() {
        let hom = vec![Het, Hom, Hom, Hom, Hom, Het];
        let chr = vec![vec![0], vec![1, 2, 3, 4], vec![5]];
        let result = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert_eq!(result, vec![stretch(1, 1, 4, 4, 0)]);
    }

    #[test]
    fn test_runs_split_by_het() {
        let hom = vec![Hom, Hom, Het, Hom, Na, Hom, Het, Het, Hom];
        let chr = vec![(0..hom.len()).collect::<Vec<_>>()];
        let result = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert_eq!(
            result,
            vec![
                stretch(0, 0, 1, 2, 0),
                stretch(0, 3, 5, 2, 0),
                stretch(0, 8, 8, 1, 0),
            ]
        );
    }

    #[test]
    fn test_stretches_do_not_cross_groups() {
        let hom = vec![Hom, Hom, Hom, Hom];
        let chr = vec![vec![0, 1], vec![2, 3]];
        let result = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert_eq!(result, vec![stretch(0, 0, 1, 2, 0), stretch(1, 2, 3, 2, 0)]);
    }

    #[test]
    fn test_non_contiguous_group_indices() {
        let hom = vec![Hom, Het, Hom, Het, Hom, Het];
        let chr = vec![vec![0, 2, 4], vec![1, 3, 5]];
        let result = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert_eq!(result, vec![stretch(0, 0, 4, 3, 0)]);
    }

    #[test]
    fn test_het_tolerance() {
        let hom = vec![Hom, Hom, Het, Hom, Het, Het, Hom, Hom, Het, Het, Het, Hom];
        let chr = vec![(0..hom.len()).collect::<Vec<_>>()];
        let settings = StretchSettings {
            min_marker_count: 1,
            max_het_run: 2,
        };
        let result =
            predict_germline_homozygous_stretches_with_settings(&chr, &hom, &settings).unwrap();
        assert_eq!(result, vec![stretch(0, 0, 7, 5, 3), stretch(0, 11, 11, 1, 0)]);
    }

    #[test]
    fn test_trailing_het_not_included() {
        let hom = vec![Hom, Hom, Het];
        let chr = vec![vec![0, 1, 2]];
        let settings = StretchSettings {
            min_marker_count: 1,
            max_het_run: 3,
        };
        let result =
            predict_germline_homozygous_stretches_with_settings(&chr, &hom, &settings).unwrap();
        assert_eq!(result, vec![stretch(0, 0, 1, 2, 0)]);
    }

    #[test]
    fn test_min_marker_count() {
        let hom = vec![Hom, Hom, Het, Hom, Hom, Hom, Na, Hom];
        let chr = vec![(0..hom.len()).collect::<Vec<_>>()];
        let settings = StretchSettings {
            min_marker_count: 3,
            max_het_run: 0,
        };
        let result =
            predict_germline_homozygous_stretches_with_settings(&chr, &hom, &settings).unwrap();
        assert_eq!(result, vec![stretch(0, 3, 7, 4, 0)]);
    }

    #[test]
    fn test_invalid_input() {
        let hom = vec![Hom, Hom];
        let chr = vec![vec![0, 1], vec![2]];
        assert!(predict_germline_homozygous_stretches(&chr, &hom).is_err());

        let settings = StretchSettings {
            min_marker_count: 0,
            max_het_run: 0,
        };
        assert!(
            predict_germline_homozygous_stretches_with_settings(&[vec![0]], &hom, &settings)
                .is_err()
        );
    }

    #[test]
    fn test_inputs_unchanged() {
        let hom = vec![Hom, Het, Hom, Hom];
        let chr = vec![vec![0, 1], vec![2, 3]];
        let hom_copy = hom.clone();
        let chr_copy = chr.clone();
        let _ = predict_germline_homozygous_stretches(&chr, &hom).unwrap();
        assert_eq!(hom, hom_copy);
        assert_eq!(chr, chr_copy);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let hom = (0..500)
            .map(|i| match i % 7 {
                0 | 3 => Het,
                5 => Na,
                _ => Hom,
            })
            .collect::<Vec<_>>();
        let chr = (0..10)
            .map(|g| (g * 50..(g + 1) * 50).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let settings = StretchSettings {
            min_marker_count: 2,
            max_het_run: 1,
        };
        let sequential =
            predict_germline_homozygous_stretches_with_settings(&chr, &hom, &settings).unwrap();
        let parallel =
            predict_germline_homozygous_stretches_parallel(4, &chr, &hom, &settings).unwrap();
        assert_eq!(sequential, parallel);
        assert!(!sequential.is_empty());
    }
}
