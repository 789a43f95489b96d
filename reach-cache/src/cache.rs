use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref LABELS: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Handle to an interned on-screen text label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

impl LabelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Intern a label and return its id. Interning the same text twice yields the same id.
pub fn intern_label(text: &str) -> LabelId {
    let atom = Atom::from(text);
    let mut labels = LABELS.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    match labels.iter().position(|a| *a == atom) {
        Some(idx) => LabelId(idx),
        None => {
            labels.push(atom);
            LabelId(labels.len() - 1)
        }
    }
}

/// Number of distinct labels interned so far
pub fn label_count() -> usize {
    LABELS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .len()
}

/// Text for an interned label, or `None` for an id this process never issued
pub fn label_text(id: LabelId) -> Option<Atom> {
    LABELS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(id.0)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = intern_label("Touch to start");
        let b = intern_label("Touch to start");
        assert_eq!(a, b);
        assert_eq!(label_text(a).as_deref(), Some("Touch to start"));
    }

    #[test]
    fn distinct_labels_get_distinct_ids() {
        let a = intern_label("Trial 1/4");
        let b = intern_label("Trial 2/4");
        assert_ne!(a, b);
        assert!(label_count() >= 2);
    }
}
