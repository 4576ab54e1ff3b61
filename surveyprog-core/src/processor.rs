use crate::config::AssemblyConfig;
use crate::error::AssemblyIssue;
use crate::extractor::{FactExtractor, HeuristicExtractor};
use crate::locator::{find_table, RegionIndex};
use crate::merge;
use crate::normalize;
use crate::rules::{AssemblyContext, RuleEngine};
use crate::types::{AssemblyReport, ExtractedData};
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = (duration.as_secs_f64() / total.as_secs_f64()) * 100.0;
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// The assembled document plus its run log.
pub struct AssemblyOutput {
    pub document: String,
    pub report: AssemblyReport,
}

/// sha256 over the template bytes — stamped on every report so a
/// re-authored template is traceable to its burst of audit misses.
pub fn calculate_template_fingerprint(template: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Library entry point: template + merged facts → assembled document.
///
/// Purely synchronous; every generation run owns its own document
/// value, so there is no internal locking and no state across runs.
pub struct ProgramAssembler {
    config: AssemblyConfig,
    engine: RuleEngine,
}

impl Default for ProgramAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramAssembler {
    pub fn new() -> Self {
        Self::with_config(AssemblyConfig::default())
    }

    pub fn with_config(config: AssemblyConfig) -> Self {
        Self {
            config,
            engine: RuleEngine::new(),
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Assemble from already-extracted sources (a primary order plus
    /// any supplements). Callers must have finished every extraction
    /// before this point — the engine performs no partial application.
    pub fn assemble(&self, template: &str, sources: &[ExtractedData]) -> Result<AssemblyOutput> {
        self.assemble_with_profiling(template, sources, false)
    }

    pub fn assemble_with_profiling(
        &self,
        template: &str,
        sources: &[ExtractedData],
        enable_profiling: bool,
    ) -> Result<AssemblyOutput> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);

        println!("📄 Assembling survey program from {} source(s)", sources.len());

        let fingerprint = profiler.time_step("1. Template Fingerprint", || {
            calculate_template_fingerprint(template)
        });
        let mut report = AssemblyReport::new(fingerprint);

        let merged = profiler.time_step("2. Fact Merge", || merge::merge_extracted(sources));

        profiler.time_step("3. Region Audit", || {
            self.audit_regions(template, &mut report)
        });

        let ctx = AssemblyContext::new(&merged, &self.config);
        let doc = profiler.time_step("4. Section Rules", || {
            self.engine
                .apply_sections(template.to_string(), &ctx, &mut report)
        })?;

        let doc = if self.config.normalize_styles {
            profiler.time_step("5. Style Normalization", || {
                normalize::normalize_styles(&doc)
            })
        } else {
            doc
        };

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        profiler.print_summary();
        println!(
            "✅ Assembly complete: {} section(s), {} issue(s), {:.3}s",
            report.sections.len(),
            report.issues.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(AssemblyOutput {
            document: doc,
            report,
        })
    }

    /// Convenience path: run an extractor over raw source texts first.
    /// A failed extractor call degrades to the keyword heuristic for
    /// that source, recorded as an issue — never an abort.
    pub fn assemble_from_texts(
        &self,
        template: &str,
        source_texts: &[&str],
        extractor: &dyn FactExtractor,
    ) -> Result<AssemblyOutput> {
        let heuristic = HeuristicExtractor::new();
        let mut pre_issues = Vec::new();
        let mut sources = Vec::with_capacity(source_texts.len());

        for (i, text) in source_texts.iter().enumerate() {
            let context = if i == 0 { "primary order" } else { "supplementary order" };
            match extractor.extract(text, Some(context)) {
                Ok(data) => sources.push(data),
                Err(e) => {
                    println!("⚠️  Extractor '{}' failed: {e}. Falling back to heuristic.", extractor.name());
                    pre_issues.push(AssemblyIssue::MalformedExtractorOutput {
                        detail: e.to_string(),
                    });
                    sources.push(heuristic.extract(text, Some(context)).unwrap_or_default());
                }
            }
        }

        let mut output = self.assemble(template, &sources)?;
        // Extraction happened before the report existed; front-load.
        output.report.issues.splice(0..0, pre_issues);
        Ok(output)
    }

    /// Verify every configured region exists in this template before
    /// any rule runs. Authoring tools regenerate paraIds on edit; this
    /// turns that silent breakage into a loud, fingerprinted report.
    fn audit_regions(&self, template: &str, report: &mut AssemblyReport) {
        let index = RegionIndex::build(template);

        for (meaning, para_id) in &self.config.regions.paragraphs {
            if !index.contains(para_id) {
                report.push_issue(AssemblyIssue::RegionNotFound {
                    meaning: meaning.clone(),
                    locator: format!("paraId {para_id}"),
                });
            }
        }
        for (meaning, anchor) in &self.config.regions.anchors {
            if find_table(template, anchor).is_none() {
                report.push_issue(AssemblyIssue::RegionNotFound {
                    meaning: meaning.clone(),
                    locator: format!("anchor {anchor:?}"),
                });
            }
        }

        if report.issues.is_empty() {
            println!("🔍 Region audit: all {} mapped regions present", self.config.regions.paragraphs.len() + self.config.regions.anchors.len());
        } else {
            println!(
                "⚠️  Region audit: {} mapped region(s) missing — template drift?",
                report.issues.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let a = calculate_template_fingerprint("<w:body/>");
        let b = calculate_template_fingerprint("<w:body/>");
        let c = calculate_template_fingerprint("<w:body></w:body>");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_audit_reports_every_missing_region() {
        let assembler = ProgramAssembler::new();
        let mut report = AssemblyReport::new("test".to_string());
        assembler.audit_regions("<w:body></w:body>", &mut report);
        let expected = assembler.config.regions.paragraphs.len()
            + assembler.config.regions.anchors.len();
        assert_eq!(report.issues.len(), expected);
    }
}
