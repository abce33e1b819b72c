//! Germline genotype calls used as the homozygosity signal
//!

use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum Genotype {
    #[strum(serialize = "hom")]
    Homozygous,
    #[strum(serialize = "het")]
    Heterozygous,
    #[strum(serialize = "NA")]
    Missing,
}

impl Genotype {
    /// Parse a genotype label from a marker table
    ///
    /// Accepts the `hom`/`het`/`NA` labels (case-insensitive), the missing-value labels `.` and
    /// the empty string, and diploid GT strings such as `0/0`, `0|1` or `./.`.
    ///
    pub fn from_label(label: &str) -> SimpleResult<Self> {
        let label = label.trim();
        let gt = match label.to_ascii_lowercase().as_str() {
            "hom" | "homozygous" => Genotype::Homozygous,
            "het" | "heterozygous" => Genotype::Heterozygous,
            "na" | "nan" | "." | "" => Genotype::Missing,
            _ => return parse_diploid_gt(label),
        };
        Ok(gt)
    }
}

/// Parse a VCF-style diploid GT string
///
fn parse_diploid_gt(label: &str) -> SimpleResult<Genotype> {
    let alleles = label.split(['/', '|']).collect::<Vec<_>>();
    if alleles.len() != 2 {
        bail!("Unrecognized genotype label: '{}'", label);
    }
    if alleles.iter().any(|x| *x == ".") {
        return Ok(Genotype::Missing);
    }
    let mut allele_ids = [0u32; 2];
    for (i, allele) in alleles.iter().enumerate() {
        allele_ids[i] = match allele.parse::<u32>() {
            Ok(x) => x,
            Err(_) => bail!("Unrecognized genotype label: '{}'", label),
        };
    }
    Ok(if allele_ids[0] == allele_ids[1] {
        Genotype::Homozygous
    } else {
        Genotype::Heterozygous
    })
}

/// Germline BAF thresholds used to call homozygous markers
///
#[derive(Clone, Debug)]
pub struct GenotypeCallSettings {
    /// BAF values below this are called homozygous
    pub hom_baf_min: f64,

    /// BAF values above this are called homozygous
    pub hom_baf_max: f64,
}

impl Default for GenotypeCallSettings {
    fn default() -> Self {
        Self {
            hom_baf_min: 0.3,
            hom_baf_max: 0.7,
        }
    }
}

impl GenotypeCallSettings {
    pub fn validate(&self) -> SimpleResult<()> {
        if !(0.0..=1.0).contains(&self.hom_baf_min) || !(0.0..=1.0).contains(&self.hom_baf_max) {
            bail!(
                "Homozygous BAF thresholds must be in [0,1], found [{}, {}]",
                self.hom_baf_min,
                self.hom_baf_max
            );
        }
        if self.hom_baf_min > self.hom_baf_max {
            bail!(
                "Homozygous BAF minimum threshold ({}) exceeds the maximum threshold ({})",
                self.hom_baf_min,
                self.hom_baf_max
            );
        }
        Ok(())
    }
}

/// Call the germline genotype of one marker from its germline B-allele frequency
///
/// A marker with no BAF value (or a NaN value) is `Missing`. BAF values outside of the
/// heterozygous band `[hom_baf_min, hom_baf_max]` are `Homozygous`.
///
pub fn call_germline_genotype(baf: Option<f64>, settings: &GenotypeCallSettings) -> Genotype {
    match baf {
        Some(baf) if !baf.is_nan() => {
            if baf < settings.hom_baf_min || baf > settings.hom_baf_max {
                Genotype::Homozygous
            } else {
                Genotype::Heterozygous
            }
        }
        _ => Genotype::Missing,
    }
}

/// Counts of each genotype over a set of markers
///
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GenotypeCounts {
    pub homozygous: usize,
    pub heterozygous: usize,
    pub missing: usize,
}

impl GenotypeCounts {
    pub fn from_genotypes(genotypes: &[Genotype]) -> Self {
        let mut counts = Self::default();
        for gt in genotypes {
            match gt {
                Genotype::Homozygous => counts.homozygous += 1,
                Genotype::Heterozygous => counts.heterozygous += 1,
                Genotype::Missing => counts.missing += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.homozygous + self.heterozygous + self.missing
    }

    /// Fraction of called (non-missing) markers which are homozygous
    ///
    pub fn homozygous_fraction(&self) -> Option<f64> {
        let called = self.homozygous + self.heterozygous;
        if called == 0 {
            None
        } else {
            Some(self.homozygous as f64 / called as f64)
        }
    }
}
