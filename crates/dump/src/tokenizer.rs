/// Splits a block of text into an ordered sequence of sentences.
pub trait SentenceTokenizer: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '”', '’', '»'];

/// Sentence splitter keyed on terminal punctuation.
///
/// A sentence ends after a run of `.`, `!`, `?` or `…`, plus any closing
/// quotes or brackets, when followed by whitespace or the end of the text.
/// Decimal points and dotted abbreviations without a following space stay
/// inside their sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationTokenizer;

impl SentenceTokenizer for PunctuationTokenizer {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            if !TERMINATORS.contains(&c) {
                continue;
            }
            while let Some(&next) = chars.peek() {
                if !TERMINATORS.contains(&next) && !CLOSERS.contains(&next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            if chars.peek().is_none_or(|next| next.is_whitespace()) {
                push_sentence(&mut sentences, &mut current);
            }
        }
        push_sentence(&mut sentences, &mut current);
        sentences
    }
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
    current.clear();
}
