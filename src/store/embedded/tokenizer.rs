//! Edge n-gram tokenizer.
//!
//! Splits text into runs of letters and digits and emits every prefix of each
//! run whose length is within `[min_gram, max_gram]` characters. "Apollo 11"
//! becomes `A, Ap, Apo, Apol, Apoll, Apollo, 1, 11`.

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

#[derive(Clone, Debug)]
pub struct EdgeNgramTokenizer {
    min_gram: usize,
    max_gram: usize,
}

impl EdgeNgramTokenizer {
    pub fn new(min_gram: usize, max_gram: usize) -> Self {
        let min_gram = min_gram.max(1);
        Self {
            min_gram,
            max_gram: max_gram.max(min_gram),
        }
    }
}

pub struct EdgeNgramTokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Tokenizer for EdgeNgramTokenizer {
    type TokenStream<'a> = EdgeNgramTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> EdgeNgramTokenStream {
        let mut tokens = Vec::new();

        for (position, (start, word)) in words(text).into_iter().enumerate() {
            // Byte offsets of each char boundary after the first char
            let ends: Vec<usize> = word
                .char_indices()
                .skip(1)
                .map(|(i, _)| i)
                .chain(std::iter::once(word.len()))
                .collect();

            for (n, end) in ends.into_iter().enumerate() {
                let gram_len = n + 1;
                if gram_len < self.min_gram {
                    continue;
                }
                if gram_len > self.max_gram {
                    break;
                }
                tokens.push(Token {
                    offset_from: start,
                    offset_to: start + end,
                    position,
                    text: word[..end].to_string(),
                    position_length: 1,
                });
            }
        }

        EdgeNgramTokenStream { tokens, cursor: 0 }
    }
}

/// Maximal runs of alphanumeric characters with their byte offsets.
fn words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                words.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }

    words
}

impl TokenStream for EdgeNgramTokenStream {
    fn advance(&mut self) -> bool {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.cursor - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.cursor - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::{LowerCaser, TextAnalyzer};

    fn grams(min: usize, max: usize, text: &str) -> Vec<String> {
        let mut analyzer = TextAnalyzer::builder(EdgeNgramTokenizer::new(min, max))
            .filter(LowerCaser)
            .build();
        let mut stream = analyzer.token_stream(text);
        let mut out = Vec::new();
        stream.process(&mut |token| out.push(token.text.clone()));
        out
    }

    #[test]
    fn test_prefixes_per_word() {
        assert_eq!(
            grams(1, 30, "Apollo 11"),
            vec!["a", "ap", "apo", "apol", "apoll", "apollo", "1", "11"]
        );
    }

    #[test]
    fn test_punctuation_splits_words() {
        assert_eq!(grams(1, 30, "M-31"), vec!["m", "3", "31"]);
    }

    #[test]
    fn test_gram_bounds() {
        assert_eq!(grams(2, 3, "Nebula"), vec!["ne", "neb"]);
        assert!(grams(3, 5, "Io").is_empty());
    }

    #[test]
    fn test_multibyte_characters() {
        assert_eq!(grams(1, 30, "Éta"), vec!["é", "ét", "éta"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(grams(1, 30, "  ...  ").is_empty());
    }
}
