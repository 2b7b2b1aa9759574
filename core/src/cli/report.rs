use crate::batch::BatchSummary;
use crate::recognition::FovAnalysis;
use std::collections::BTreeMap;
use std::fmt;

/// Text report for a batch run
pub struct TextReport<'a> {
    summary: &'a BatchSummary,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(summary: &'a BatchSummary) -> Self {
        Self { summary }
    }
}

fn write_counts(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    counts: &BTreeMap<String, usize>,
) -> fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(title.len()))?;
    for (label, count) in counts {
        writeln!(f, "{:<16}{}", format!("{}:", label), count)?;
    }
    Ok(())
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Summary")?;
        writeln!(f, "=============")?;
        writeln!(f)?;
        writeln!(f, "Output:         {}", self.summary.output_path.display())?;
        writeln!(f, "Resumed:        {}", self.summary.resumed)?;
        writeln!(f, "Processed:      {}", self.summary.processed)?;
        writeln!(f, "Already Done:   {}", self.summary.already_processed)?;
        writeln!(f, "Duplicates:     {}", self.summary.duplicates_skipped)?;
        writeln!(f, "Rows w/ Errors: {}", self.summary.rows_with_errors)?;

        write_counts(f, "FOV Labels", &self.summary.fov_counts)?;
        write_counts(f, "Phase Labels", &self.summary.phase_counts)?;

        Ok(())
    }
}

/// Text report for a single-volume FOV analysis
pub struct AnalysisReport<'a> {
    analysis: &'a FovAnalysis,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(analysis: &'a FovAnalysis) -> Self {
        Self { analysis }
    }
}

impl<'a> fmt::Display for AnalysisReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FOV Analysis")?;
        writeln!(f, "============")?;
        writeln!(f)?;
        writeln!(f, "Label:          {}", self.analysis.label.simple_name())?;
        writeln!(f, "Slices:         {}", self.analysis.total_slices)?;
        writeln!(f, "Non-blank:      {}", self.analysis.kept_slices)?;
        writeln!(
            f,
            "Task:           {}",
            self.analysis.task.map(|t| t.name()).unwrap_or("none")
        )?;

        // Scouts are not segmented
        let Some(signals) = &self.analysis.signals else {
            return Ok(());
        };

        writeln!(f)?;
        writeln!(f, "Organ Signals")?;
        writeln!(f, "-------------")?;
        writeln!(f, "Heart:          {}", signals.heart_ok)?;
        writeln!(f, "Sternum:        {}", signals.sternum_ok)?;
        writeln!(f, "Edges Clear:    {}", signals.edges_clear)?;
        writeln!(f, "Sacrum:         {}", signals.sacrum)?;
        writeln!(f, "Liver:          {}", signals.liver)?;
        writeln!(f, "Liver Slice 0:  {}", signals.liver_on_first_slice)?;
        writeln!(f, "Spleen:         {}", signals.spleen)?;
        writeln!(f, "Kidney:         {}", signals.kidney)?;
        writeln!(f, "Prostate:       {}", signals.prostate)?;
        writeln!(f, "Prostate Clear: {}", signals.prostate_clear)?;

        Ok(())
    }
}
