//! Stage output contracts.
//!
//! Each pipeline stage has a fixed contract of expected output file names,
//! optionally expanded per produced sample. Validation is a pure predicate:
//! the actual file names (minus the `metadata.yaml` bookkeeping sentinel) must
//! equal the expected set exactly, compared as unordered sets.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bookkeeping output excluded from contract comparison.
pub const METADATA_SENTINEL: &str = "metadata.yaml";

/// The closed set of pipeline stages with output contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Hmmcopy,
    Alignment,
    BreakpointCalling,
    VariantCalling,
    SnvGenotyping,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown pipeline stage `{0}`")]
pub struct UnknownStage(pub String);

#[derive(Debug, Error)]
pub enum OutputsError {
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
    #[error(
        "stage {stage} output mismatch; missing: [{}]; unexpected: [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    ContractMismatch {
        stage: Stage,
        /// Expected files absent from the actual set, sorted.
        missing: Vec<String>,
        /// Actual files the contract does not name, sorted.
        unexpected: Vec<String>,
    },
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Hmmcopy,
        Stage::Alignment,
        Stage::BreakpointCalling,
        Stage::VariantCalling,
        Stage::SnvGenotyping,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Hmmcopy => "hmmcopy",
            Stage::Alignment => "alignment",
            Stage::BreakpointCalling => "breakpoint_calling",
            Stage::VariantCalling => "variant_calling",
            Stage::SnvGenotyping => "snv_genotyping",
        }
    }

    /// Sample-independent expected files.
    fn fixed_files(&self) -> &'static [&'static str] {
        match self {
            Stage::Hmmcopy => &[
                "hmmcopy_params.csv.gz",
                "hmmcopy_params.csv.gz.yaml",
                "hmmcopy_segments.csv.gz",
                "hmmcopy_segments.csv.gz.yaml",
                "hmmcopy_reads.csv.gz",
                "hmmcopy_reads.csv.gz.yaml",
                "hmmcopy_metrics.csv.gz",
                "hmmcopy_metrics.csv.gz.yaml",
                "hmmcopy_segments_pass.tar.gz",
                "hmmcopy_segments_fail.tar.gz",
                "hmmcopy_heatmap.pdf",
                "input.json",
            ],
            Stage::Alignment => &[
                "alignment_gc_metrics.csv.gz",
                "alignment_gc_metrics.csv.gz.yaml",
                "alignment_metrics.csv.gz",
                "alignment_metrics.csv.gz.yaml",
                "alignment_metrics.tar.gz",
                "all_cells_bulk.bam",
                "all_cells_bulk.bam.bai",
                "all_cells_bulk_contaminated.bam",
                "all_cells_bulk_contaminated.bam.bai",
                "all_cells_bulk_control.bam",
                "all_cells_bulk_control.bam.bai",
                "detailed_fastqscreen_breakdown.csv.gz",
                "detailed_fastqscreen_breakdown.csv.gz.yaml",
                "input.json",
            ],
            Stage::BreakpointCalling => &[
                "four_way_consensus.csv.gz",
                "four_way_consensus.csv.gz.yaml",
                "input.json",
            ],
            Stage::VariantCalling => &[
                "final_maf_all_samples.maf",
                "final_vcf_all_samples.vcf.gz",
                "final_vcf_all_samples.vcf.gz.csi",
                "final_vcf_all_samples.vcf.gz.tbi",
            ],
            Stage::SnvGenotyping => &["snv_genotyping.csv.gz", "snv_genotyping.csv.gz.yaml"],
        }
    }

    /// Per-sample file-name suffixes; each expected name is the sample id
    /// followed by one of these. Empty for flat contracts.
    fn per_sample_suffixes(&self) -> &'static [&'static str] {
        match self {
            Stage::BreakpointCalling => &[
                "_breakpoint_library_table.csv",
                "_breakpoint_table.csv",
                "_gridss.vcf.gz",
                "_lumpy.vcf",
                ".svaba.somatic.sv.vcf.gz",
            ],
            Stage::VariantCalling => &[
                "_consensus.vcf.gz",
                "_consensus.vcf.gz.csi",
                "_consensus.vcf.gz.tbi",
                "_museq.vcf.gz",
                "_museq.vcf.gz.csi",
                "_museq.vcf.gz.tbi",
                "_mutect.vcf.gz",
                "_mutect.vcf.gz.csi",
                "_mutect.vcf.gz.tbi",
                "_strelka_indel.vcf.gz",
                "_strelka_indel.vcf.gz.csi",
                "_strelka_indel.vcf.gz.tbi",
                "_strelka_snv.vcf.gz",
                "_strelka_snv.vcf.gz.csi",
                "_strelka_snv.vcf.gz.tbi",
                "_updated_counts.maf",
            ],
            Stage::Hmmcopy | Stage::Alignment | Stage::SnvGenotyping => &[],
        }
    }

    /// The complete expected output set for this stage and sample set.
    /// Duplicate sample ids collapse since the result is a set.
    pub fn expected_files(&self, samples: &[&str]) -> BTreeSet<String> {
        let mut expected: BTreeSet<String> =
            self.fixed_files().iter().map(|f| (*f).to_string()).collect();
        for sample in samples {
            for suffix in self.per_sample_suffixes() {
                expected.insert(format!("{sample}{suffix}"));
            }
        }
        expected
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Check a stage's actual output file names against its contract.
///
/// Strips the [`METADATA_SENTINEL`] first, then requires exact set equality
/// with [`Stage::expected_files`]. Order-independent and idempotent.
pub fn validate_outputs<I, S>(
    actual_files: I,
    stage_name: &str,
    sample_ids: &[&str],
) -> Result<(), OutputsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let stage: Stage = stage_name.parse()?;
    validate_stage_outputs(actual_files, stage, sample_ids)
}

/// [`validate_outputs`] for an already-resolved [`Stage`].
pub fn validate_stage_outputs<I, S>(
    actual_files: I,
    stage: Stage,
    sample_ids: &[&str],
) -> Result<(), OutputsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut actual: BTreeSet<String> = actual_files.into_iter().map(Into::into).collect();
    actual.remove(METADATA_SENTINEL);

    let expected = stage.expected_files(sample_ids);
    if actual == expected {
        return Ok(());
    }
    Err(OutputsError::ContractMismatch {
        stage,
        missing: expected.difference(&actual).cloned().collect(),
        unexpected: actual.difference(&expected).cloned().collect(),
    })
}

/// Machine-readable result of one contract check, for `--json` consumers.
#[derive(Debug, Serialize)]
pub struct VerificationReport {
    pub stage: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl VerificationReport {
    pub fn from_result(stage_name: &str, result: &Result<(), OutputsError>) -> Self {
        match result {
            Ok(()) => Self {
                stage: stage_name.to_string(),
                ok: true,
                error: None,
                missing: Vec::new(),
                unexpected: Vec::new(),
            },
            Err(OutputsError::ContractMismatch {
                missing,
                unexpected,
                ..
            }) => Self {
                stage: stage_name.to_string(),
                ok: false,
                error: None,
                missing: missing.clone(),
                unexpected: unexpected.clone(),
            },
            Err(err @ OutputsError::UnknownStage(_)) => Self {
                stage: stage_name.to_string(),
                ok: false,
                error: Some(err.to_string()),
                missing: Vec::new(),
                unexpected: Vec::new(),
            },
        }
    }
}
