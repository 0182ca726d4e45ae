use std::{collections::BTreeMap, io::Write, rc::Rc};

use tempfile::NamedTempFile;
use tracing::debug;

/// Generated line to original line.
pub type LineMap = BTreeMap<usize, usize>;

/// A body of source code statements were parsed from.
pub struct Unit {
    filename: String,
    source: String,
    kind: UnitKind,
}

enum UnitKind {
    Original,
    Generated {
        original: Rc<Unit>,
        line_map: LineMap,
        // Removed from disk when the unit is dropped.
        _file: NamedTempFile,
    },
}

impl Unit {
    pub fn original(filename: &str, source: &str) -> Rc<Self> {
        Rc::new(Self {
            filename: filename.to_string(),
            source: source.to_string(),
            kind: UnitKind::Original,
        })
    }

    /// Writes generated source to a fresh temporary file so that faults
    /// raised while running it name a real file.
    pub fn generated(
        source: String,
        original: Rc<Unit>,
        line_map: LineMap,
    ) -> std::io::Result<Rc<Self>> {
        let mut file = tempfile::Builder::new()
            .prefix("captive_")
            .suffix(".cap")
            .tempfile()?;
        file.write_all(source.as_bytes())?;
        file.flush()?;
        let filename = file.path().display().to_string();
        debug!(filename, original = original.filename(), "wrote generated unit");
        Ok(Rc::new(Self {
            filename,
            source,
            kind: UnitKind::Generated {
                original: original.root(),
                line_map,
                _file: file,
            },
        }))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.kind, UnitKind::Generated { .. })
    }

    /// The user-written unit this one descends from.
    pub fn root(self: &Rc<Self>) -> Rc<Unit> {
        match &self.kind {
            UnitKind::Original => self.clone(),
            UnitKind::Generated { original, .. } => original.clone(),
        }
    }

    pub fn original_filename(&self) -> &str {
        match &self.kind {
            UnitKind::Original => &self.filename,
            UnitKind::Generated { original, .. } => original.filename(),
        }
    }

    pub fn line_map(&self) -> Option<&LineMap> {
        match &self.kind {
            UnitKind::Original => None,
            UnitKind::Generated { line_map, .. } => Some(line_map),
        }
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("filename", &self.filename)
            .field("generated", &self.is_generated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{LineMap, Unit};

    #[test]
    fn generated_units_point_at_their_root() {
        let original = Unit::original("circuit.cap", "fn f() {}\n");
        let first = Unit::generated("a".into(), original.clone(), LineMap::new()).unwrap();
        let second = Unit::generated("b".into(), first.clone(), LineMap::new()).unwrap();
        assert_eq!(second.original_filename(), "circuit.cap");
        assert!(second.filename().ends_with(".cap"));
        assert_ne!(first.filename(), second.filename());
        assert!(std::path::Path::new(first.filename()).exists());
        assert_eq!(std::fs::read_to_string(second.filename()).unwrap(), "b");
    }
}
