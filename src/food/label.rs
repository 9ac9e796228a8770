use serde::{Deserialize, Serialize};

/// Output of the on-device image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierLabel {
    /// Class name, e.g. `butter_chicken`.
    pub label: String,
    pub confidence: f32,
}

impl ClassifierLabel {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Free-text query for the resolver: class-name separators become spaces.
    pub fn query(&self) -> String {
        self.label
            .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_class_name() {
        assert_eq!(ClassifierLabel::new("butter_chicken", 0.91).query(), "butter chicken");
        assert_eq!(ClassifierLabel::new("pav-bhaji", 0.5).query(), "pav bhaji");
        assert_eq!(ClassifierLabel::new(" idli ", 0.7).query(), "idli");
        assert_eq!(ClassifierLabel::new("__", 0.1).query(), "");
    }
}
