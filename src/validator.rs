//! Structural validation: a pure, read-only pass over a loaded `Document`
//! that reports problems instead of fixing or rejecting them. Severity scales
//! with `ValidationMode` but the same checks run regardless of mode; `None`
//! simply means nobody asked for a report.

use std::collections::HashSet;

use crate::config::ValidationMode;
use crate::document::Document;
use crate::object::{Object, ObjectId};

#[cfg(feature = "serde")]
use serde::Serialize;

/// How serious a finding is. `Error` means the document violates something
/// a conforming reader may refuse to open; `Warning` is a lenient-reader
/// recoverable defect; `Info` is a style/compaction observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One reported defect, identified by a stable rule id so callers can filter
/// or suppress specific checks.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Finding {
    pub rule: &'static str,
    pub severity: Severity,
    pub object: Option<ObjectId>,
    pub message: String,
}

/// The result of one `Validator::validate` run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Report {
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.findings.iter().all(|f| f.severity != Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    fn push(&mut self, rule: &'static str, severity: Severity, object: Option<ObjectId>, message: impl Into<String>) {
        self.findings.push(Finding { rule, severity, object, message: message.into() });
    }
}

/// Runs the structural checks named in `DocumentConfig::validation_mode`.
/// `ValidationMode::None` still builds a `Report`, it's just never consulted
/// by the reader to reject anything.
pub struct Validator<'a> {
    document: &'a Document,
    mode: ValidationMode,
}

impl<'a> Validator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Validator { document, mode: document.config.validation_mode }
    }

    pub fn with_mode(document: &'a Document, mode: ValidationMode) -> Self {
        Validator { document, mode }
    }

    pub fn validate(&self) -> Report {
        let mut report = Report::default();
        if self.mode == ValidationMode::None {
            return report;
        }

        self.check_trailer(&mut report);
        self.check_xref_consistency(&mut report);
        self.check_page_tree(&mut report);
        self.check_streams(&mut report);
        report
    }

    fn check_trailer(&self, report: &mut Report) {
        if self.document.trailer.get(b"Root").is_err() {
            report.push("trailer-root", Severity::Error, None, "trailer is missing /Root");
            return;
        }
        if self.document.catalog().is_err() {
            report.push("trailer-root", Severity::Error, None, "/Root does not resolve to a dictionary");
        }
    }

    /// Every `InUse` xref entry should point at an object that actually
    /// parsed; every object in the table should have a backing xref entry.
    fn check_xref_consistency(&self, report: &mut Report) {
        for &id in self.document.objects.keys() {
            if self.document.reference_table.get(id.0).is_none() {
                report.push(
                    "xref-missing-entry",
                    Severity::Warning,
                    Some(id),
                    "object was loaded but has no cross-reference table entry",
                );
            }
        }
        if self.document.reference_table.max_id() >= self.document.trailer.get(b"Size").and_then(Object::as_i64).unwrap_or(i64::MAX) as u32 {
            report.push(
                "xref-size",
                Severity::Warning,
                None,
                "highest object number exceeds trailer /Size",
            );
        }
    }

    fn check_page_tree(&self, report: &mut Report) {
        let Ok(catalog) = self.document.catalog() else { return };
        let Ok(pages_id) = catalog.get(b"Pages").and_then(Object::as_reference) else {
            report.push("catalog-pages", Severity::Error, None, "/Root is missing /Pages");
            return;
        };
        let mut seen = HashSet::new();
        self.walk_page_tree(pages_id, &mut seen, report);
    }

    fn walk_page_tree(&self, id: ObjectId, seen: &mut HashSet<ObjectId>, report: &mut Report) {
        if !seen.insert(id) {
            report.push("page-tree-cycle", Severity::Error, Some(id), "page tree contains a cycle");
            return;
        }
        let Ok(dict) = self.document.get_dictionary(id) else {
            report.push("page-tree-node", Severity::Error, Some(id), "page tree node does not resolve to a dictionary");
            return;
        };
        match dict.get_type() {
            Ok(t) if t == b"Pages" => {
                let Ok(kids) = dict.get(b"Kids").and_then(Object::as_array) else {
                    report.push("pages-kids", Severity::Error, Some(id), "/Pages node is missing /Kids");
                    return;
                };
                for kid in kids {
                    match kid.as_reference() {
                        Ok(kid_id) => self.walk_page_tree(kid_id, seen, report),
                        Err(_) => report.push("pages-kids", Severity::Error, Some(id), "/Kids entry is not an indirect reference"),
                    }
                }
            }
            Ok(t) if t == b"Page" => {
                if self.document.get_inherited(id, b"MediaBox").is_none() {
                    report.push("page-mediabox", Severity::Warning, Some(id), "page has no inherited /MediaBox");
                }
            }
            _ => report.push("pages-node-type", Severity::Warning, Some(id), "page tree node has neither /Type /Pages nor /Type /Page"),
        }
    }

    /// Confirms every stream's declared `/Length` (once dereferenced) matches
    /// the content actually stored, and that its filter chain decodes.
    fn check_streams(&self, report: &mut Report) {
        for (&id, obj) in &self.document.objects {
            let Object::Stream(stream) = obj else { continue };
            let declared = stream
                .dict
                .get(b"Length")
                .ok()
                .and_then(|v| self.document.dereference(v).ok())
                .and_then(|(_, v)| v.as_i64().ok());
            match declared {
                Some(len) if len as usize != stream.content.len() => {
                    report.push(
                        "stream-length-mismatch",
                        Severity::Warning,
                        Some(id),
                        format!("/Length {len} does not match stored content of {} bytes", stream.content.len()),
                    );
                }
                None => report.push("stream-length-missing", Severity::Error, Some(id), "stream has no resolvable /Length"),
                _ => {}
            }

            if let Err(e) = stream.decompressed_content() {
                report.push("stream-filter-failed", Severity::Error, Some(id), e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    fn doc_with_root() -> Document {
        let mut doc = Document::new();
        let pages_id = doc.add_object(dictionary! { b"Type" => "Pages", b"Kids" => Object::Array(vec![]), b"Count" => 0i64 });
        let catalog_id = doc.add_object(dictionary! { b"Type" => "Catalog", b"Pages" => Object::Reference(pages_id) });
        doc.trailer.set(b"Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn clean_document_has_no_errors() {
        let doc = doc_with_root();
        let report = Validator::new(&doc).validate();
        assert!(report.is_clean(), "unexpected findings: {:?}", report.findings);
    }

    #[test]
    fn missing_root_is_an_error() {
        let doc = Document::new();
        let report = Validator::new(&doc).validate();
        assert!(!report.is_clean());
        assert!(report.errors().any(|f| f.rule == "trailer-root"));
    }

    #[test]
    fn none_mode_reports_nothing() {
        let doc = Document::new();
        let report = Validator::with_mode(&doc, ValidationMode::None).validate();
        assert!(report.findings.is_empty());
    }
}
