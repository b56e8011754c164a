//! Random starting-letter selection.

use rand::Rng;

const LATIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Ordered, non-empty set of uppercase ASCII letters a round may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    letters: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from arbitrary characters.
    ///
    /// Letters are uppercased and deduplicated while keeping their first position; anything that
    /// is not an ASCII letter is dropped. An input without a single usable letter yields the full
    /// latin alphabet so callers always get something to draw from.
    pub fn new(letters: impl IntoIterator<Item = char>) -> Self {
        let mut kept: Vec<char> = Vec::new();
        for letter in letters {
            if !letter.is_ascii_alphabetic() {
                continue;
            }
            let upper = letter.to_ascii_uppercase();
            if !kept.contains(&upper) {
                kept.push(upper);
            }
        }

        if kept.is_empty() {
            return Self::latin();
        }

        Self { letters: kept }
    }

    /// The 26 letters `A..=Z`.
    pub fn latin() -> Self {
        Self {
            letters: LATIN.chars().collect(),
        }
    }

    /// Letters in their configured order.
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Whether `letter` (case-insensitive) belongs to the alphabet.
    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter.to_ascii_uppercase())
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::latin()
    }
}

/// Pick a uniformly random letter from `alphabet`.
pub fn random_letter<R: Rng + ?Sized>(rng: &mut R, alphabet: &Alphabet) -> char {
    let letters = alphabet.letters();
    letters[rng.random_range(0..letters.len())]
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn new_uppercases_and_deduplicates() {
        let alphabet = Alphabet::new("abBa c-1".chars());
        assert_eq!(alphabet.letters(), &['A', 'B', 'C']);
    }

    #[test]
    fn new_without_letters_falls_back_to_latin() {
        let alphabet = Alphabet::new("123 !?".chars());
        assert_eq!(alphabet, Alphabet::latin());
        assert_eq!(alphabet.letters().len(), 26);
    }

    #[test]
    fn contains_ignores_case() {
        let alphabet = Alphabet::new("XYZ".chars());
        assert!(alphabet.contains('x'));
        assert!(!alphabet.contains('a'));
    }

    #[test]
    fn random_letter_stays_inside_alphabet() {
        let alphabet = Alphabet::new("QRS".chars());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(alphabet.contains(random_letter(&mut rng, &alphabet)));
        }
    }

    #[test]
    fn random_letter_is_deterministic_for_a_seed() {
        let alphabet = Alphabet::latin();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| random_letter(&mut rng, &alphabet))
                .collect::<String>()
        };
        assert_eq!(draw(42), draw(42));
    }

    #[test]
    fn single_letter_alphabet_always_draws_it() {
        let alphabet = Alphabet::new(['k']);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_letter(&mut rng, &alphabet), 'K');
    }
}
