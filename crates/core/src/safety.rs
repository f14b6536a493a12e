//! Pluggable safety classification for generated artifacts.
//!
//! Any implementation of [`SafetyClassifier`] can be swapped in; the
//! worker only depends on the `bytes -> verdict` contract. The default
//! [`PermissiveClassifier`] reports everything as unflagged, which is the
//! documented stance until a real model-backed classifier is wired in.

use serde::Serialize;

/// Outcome of classifying one artifact's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyVerdict {
    /// Whether the artifact should be flagged for review.
    pub flagged: bool,
    /// Classifier confidence in `0.0..=1.0`. Meaningless for the
    /// permissive stub, which always reports `0.0`.
    pub score: f32,
}

/// Classifies raw artifact bytes.
pub trait SafetyClassifier: Send + Sync {
    fn classify(&self, bytes: &[u8]) -> SafetyVerdict;
}

/// Stub classifier that flags nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveClassifier;

impl SafetyClassifier for PermissiveClassifier {
    fn classify(&self, _bytes: &[u8]) -> SafetyVerdict {
        SafetyVerdict {
            flagged: false,
            score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_classifier_never_flags() {
        let classifier = PermissiveClassifier;
        let verdict = classifier.classify(b"\x89PNG\r\n");
        assert!(!verdict.flagged);
        assert_eq!(verdict.score, 0.0);
    }

    #[test]
    fn usable_as_trait_object() {
        let classifier: Box<dyn SafetyClassifier> = Box::new(PermissiveClassifier);
        assert!(!classifier.classify(&[]).flagged);
    }
}
