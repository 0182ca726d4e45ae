use std::collections::HashSet;

/// Hands out names that collide with nothing seen so far.
///
/// A trailing `_<digits>` suffix on the requested base is dropped before
/// numbering, so asking for `cond_3` can yield `cond` or `cond_0`.
#[derive(Debug, Clone, Default)]
pub struct Namer {
    used: HashSet<String>,
}

impl Namer {
    pub fn new<I, S>(used: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            used: used.into_iter().map(Into::into).collect(),
        }
    }

    pub fn new_name(&mut self, base: &str) -> String {
        let stem = match base.rsplit_once('_') {
            Some((stem, suffix))
                if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
            {
                stem
            }
            _ => base,
        };

        let mut candidate = stem.to_string();
        let mut index = 0;
        while self.used.contains(&candidate) {
            candidate = format!("{stem}_{index}");
            index += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}
