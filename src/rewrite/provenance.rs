use std::fmt;

use itertools::Itertools;

use crate::runtime::{Fault, LineMap, Unit};

const UNDETERMINED: &str = "<could not be determined>";

/// Chained onto faults raised while running generated code, pointing back
/// at the user-written source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCodeError {
    line_map: LineMap,
    original_filename: Option<String>,
    generated_filename: String,
    original_line: Option<usize>,
}

impl GeneratedCodeError {
    pub fn new(
        line_map: LineMap,
        original_filename: Option<String>,
        generated_filename: String,
        original_line: Option<usize>,
    ) -> Self {
        Self {
            line_map,
            original_filename,
            generated_filename,
            original_line,
        }
    }

    /// Generated line to original line, for each traceback frame inside the
    /// generated unit.
    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }

    pub fn generated_filename(&self) -> &str {
        &self.generated_filename
    }

    /// The original line of the innermost generated frame.
    pub fn original_line(&self) -> Option<usize> {
        self.original_line
    }
}

impl fmt::Display for GeneratedCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = if self.line_map.is_empty() {
            UNDETERMINED.to_string()
        } else {
            self.line_map
                .iter()
                .map(|(generated, original)| format!("{generated} -> {original}"))
                .join(", ")
        };
        write!(
            f,
            "raised in generated code at line(s) {lines} ({} -> {})",
            self.generated_filename,
            self.original_filename().unwrap_or(UNDETERMINED)
        )?;
        if let Some(line) = self.original_line {
            write!(f, ", original line {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GeneratedCodeError {}

/// Chains provenance for `unit` onto a fault raised while running it.
///
/// A fault that already went through an inner generated unit keeps that
/// attribution.
pub fn attach(mut fault: Fault, unit: &Unit) -> Fault {
    if fault.cause.is_some() {
        return fault;
    }
    let Some(map) = unit.line_map() else {
        return fault;
    };

    let line_map: LineMap = fault
        .traceback
        .iter()
        .filter(|entry| entry.file == unit.filename())
        .filter_map(|entry| map.get(&entry.line).map(|original| (entry.line, *original)))
        .collect();
    let original_line = fault
        .traceback
        .iter()
        .rev()
        .find(|entry| entry.file == unit.filename())
        .and_then(|entry| map.get(&entry.line).copied());

    fault.cause = Some(Box::new(GeneratedCodeError::new(
        line_map,
        Some(unit.original_filename().to_string()),
        unit.filename().to_string(),
        original_line,
    )));
    fault
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{GeneratedCodeError, attach};
    use crate::runtime::{Fault, LineMap, TraceEntry, Unit};

    fn map(pairs: &[(usize, usize)]) -> LineMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn display_lists_mapping_and_files() {
        let err = GeneratedCodeError::new(
            map(&[(1, 3), (5, 4)]),
            Some("original.cap".into()),
            "generated.cap".into(),
            Some(4),
        );
        let text = err.to_string();
        assert!(text.contains("1 -> 3"));
        assert!(text.contains("5 -> 4"));
        assert!(text.contains("generated.cap -> original.cap"));
    }

    #[test]
    fn display_marks_unknowns() {
        let err = GeneratedCodeError::new(LineMap::new(), None, "generated.cap".into(), None);
        let text = err.to_string();
        assert!(text.contains("<could not be determined>"));
        assert!(text.contains("generated.cap -> <could not be determined>"));
    }

    #[test]
    fn attach_maps_generated_frames() {
        let original = Unit::original("circuit.cap", "");
        let unit = Unit::generated(String::new(), original, map(&[(2, 10), (7, 12)])).unwrap();
        let mut fault = Fault::value_error("oh no");
        fault.traceback = vec![
            TraceEntry {
                file: "circuit.cap".into(),
                line: 20,
            },
            TraceEntry {
                file: unit.filename().into(),
                line: 2,
            },
            TraceEntry {
                file: unit.filename().into(),
                line: 7,
            },
        ];
        let fault = attach(fault, &unit);
        assert_eq!(fault.to_string(), "value error: oh no");
        let cause = fault.cause.as_deref().unwrap();
        assert_eq!(cause.line_map(), &map(&[(2, 10), (7, 12)]));
        assert_eq!(cause.original_line(), Some(12));
        assert_eq!(cause.original_filename(), Some("circuit.cap"));
        assert!(fault.source().is_some());
    }

    #[test]
    fn attach_without_generated_frames() {
        let original = Unit::original("circuit.cap", "");
        let unit = Unit::generated(String::new(), original, map(&[(1, 1)])).unwrap();
        let fault = attach(Fault::value_error("oh no"), &unit);
        let cause = fault.cause.as_deref().unwrap();
        assert!(cause.line_map().is_empty());
        assert_eq!(cause.original_line(), None);
    }
}
