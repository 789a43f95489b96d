pub mod cache;

pub use cache::{Atom, LabelId, intern_label, label_count, label_text};
