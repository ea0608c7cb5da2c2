use rand::Rng;

/// Prompts surfaced when the user idles without recording
pub const DEFAULT_SUGGESTIONS: [&str; 5] = [
    "Tell us about your favorite travel memory",
    "Describe your perfect weekend",
    "What's your favorite book and why?",
    "Share a funny story that always makes you laugh",
    "What's your biggest dream or aspiration?",
];

/// Source of the suggestion choice
///
/// Seam for deterministic tests; production uses [`UniformPicker`].
pub trait SuggestionPicker: Send {
    /// Pick an index in `0..len` (`len` is never 0)
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Uniformly random pick
#[derive(Debug, Default)]
pub struct UniformPicker;

impl SuggestionPicker for UniformPicker {
    fn pick_index(&mut self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_picker_stays_in_range() {
        let mut picker = UniformPicker;
        for _ in 0..100 {
            let idx = picker.pick_index(DEFAULT_SUGGESTIONS.len());
            assert!(idx < DEFAULT_SUGGESTIONS.len());
        }
    }

    #[test]
    fn test_default_suggestions_are_distinct() {
        for (i, a) in DEFAULT_SUGGESTIONS.iter().enumerate() {
            for b in DEFAULT_SUGGESTIONS.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
