//! Per-case results from JUnit XML reports.
//!
//! Gradle writes one `TEST-<class>.xml` per test class under
//! `build/test-results/test`. Reading them is best-effort: a missing
//! directory or an unparsable file yields no cases, never an error.

use std::path::Path;

use tracing::debug;

use crate::domain::TestCaseResult;

/// Collect test case results from every `*.xml` report in `dir`.
///
/// Files are read in name order so the result is deterministic.
pub fn collect(dir: &Path) -> Vec<TestCaseResult> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    paths.sort();

    let mut cases = Vec::new();
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(xml) => cases.extend(parse_report(&xml)),
            Err(e) => debug!(path = %path.display(), error = %e, "unreadable test report"),
        }
    }
    cases
}

/// Parse the `<testcase>` elements of one JUnit XML document.
pub fn parse_report(xml: &str) -> Vec<TestCaseResult> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "malformed test report");
            return Vec::new();
        }
    };

    doc.descendants()
        .filter(|n| n.has_tag_name("testcase"))
        .map(|case| {
            let failure = case
                .children()
                .find(|c| c.has_tag_name("failure") || c.has_tag_name("error"))
                .map(|f| {
                    f.attribute("message")
                        .map(str::to_string)
                        .or_else(|| f.text().map(|t| t.trim().to_string()))
                        .unwrap_or_else(|| "test failed".to_string())
                });

            TestCaseResult {
                test_name: case.attribute("name").unwrap_or_default().to_string(),
                class_name: case.attribute("classname").unwrap_or_default().to_string(),
                success: failure.is_none(),
                duration: case
                    .attribute("time")
                    .and_then(|t| t.parse::<f64>().ok())
                    .map(|secs| (secs * 1000.0).round() as u64)
                    .unwrap_or(0),
                failure,
            }
        })
        .collect()
}
