//! Lexicon-based polarity scoring.

/// Scores the polarity of a text in [-1.0, 1.0].
pub trait SentimentAnalyzer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Word polarities. Unlisted words are neutral.
const LEXICON: &[(&str, f64)] = &[
    ("bad", -0.7),
    ("best", 1.0),
    ("better", 0.5),
    ("broken", -0.4),
    ("clean", 0.37),
    ("clear", 0.1),
    ("consistent", 0.25),
    ("correct", 0.4),
    ("dangerous", -0.6),
    ("error", -0.3),
    ("errors", -0.3),
    ("excellent", 1.0),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failing", -0.5),
    ("fine", 0.42),
    ("good", 0.7),
    ("great", 0.8),
    ("improve", 0.3),
    ("insecure", -0.5),
    ("nice", 0.6),
    ("poor", -0.4),
    ("proper", 0.2),
    ("readable", 0.3),
    ("safe", 0.5),
    ("secure", 0.4),
    ("simple", 0.2),
    ("slow", -0.3),
    ("strong", 0.43),
    ("unsafe", -0.5),
    ("unused", -0.1),
    ("violations", -0.4),
    ("vulnerable", -0.4),
    ("weak", -0.38),
    ("wrong", -0.5),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "without"];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
];

/// Averages the polarity of known words.
///
/// A negation before a word flips and halves it; an intensifier scales it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentiment;

impl LexiconSentiment {
    fn word_polarity(word: &str) -> Option<f64> {
        LEXICON
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, polarity)| *polarity)
    }

    fn intensity(word: &str) -> Option<f64> {
        INTENSIFIERS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, factor)| *factor)
    }
}

impl SentimentAnalyzer for LexiconSentiment {
    fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let mut scores = Vec::new();
        let mut negated = false;
        let mut intensity = 1.0;

        let words = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty());

        for word in words {
            if NEGATIONS.contains(&word) || word.ends_with("n't") {
                negated = true;
                continue;
            }
            if let Some(factor) = Self::intensity(word) {
                intensity *= factor;
                continue;
            }

            if let Some(polarity) = Self::word_polarity(word) {
                let mut value = polarity * intensity;
                if negated {
                    value *= -0.5;
                }
                scores.push(value);
            }
            negated = false;
            intensity = 1.0;
        }

        if scores.is_empty() {
            return 0.0;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        mean.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_neutral_text() {
        assert!(approx(LexiconSentiment.polarity("update dependencies"), 0.0));
        assert!(approx(LexiconSentiment.polarity(""), 0.0));
    }

    #[test]
    fn test_average_of_known_words() {
        // good (0.7) and bad (-0.7) cancel out.
        assert!(approx(LexiconSentiment.polarity("good and bad"), 0.0));
        assert!(approx(LexiconSentiment.polarity("Good!"), 0.7));
    }

    #[test]
    fn test_negation_flips_and_damps() {
        assert!(approx(LexiconSentiment.polarity("not good"), -0.35));
        assert!(approx(LexiconSentiment.polarity("isn't bad"), 0.35));
    }

    #[test]
    fn test_intensifier_is_clamped() {
        assert!(approx(LexiconSentiment.polarity("extremely excellent"), 1.0));
        assert!(approx(LexiconSentiment.polarity("very good"), 0.91));
    }

    #[test]
    fn test_range() {
        for text in [
            "fix style violations flagged by the style checker",
            "resolve type errors reported by the type checker",
            "update vulnerable dependencies",
        ] {
            let polarity = LexiconSentiment.polarity(text);
            assert!((-1.0..=1.0).contains(&polarity));
            assert!(polarity < 0.0);
        }
    }
}
