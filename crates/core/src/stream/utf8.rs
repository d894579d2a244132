use std::mem;

const REPLACEMENT: char = '\u{FFFD}';

/// A UTF-8 decoder that carries incomplete characters over to the next
/// chunk.
///
/// Invalid sequences are replaced with U+FFFD instead of failing, the same
/// way a lossy conversion would treat them.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes the next chunk, returning all complete characters.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let input = if self.pending.is_empty() {
            bytes.to_vec()
        } else {
            let mut input = mem::take(&mut self.pending);
            input.extend_from_slice(bytes);
            input
        };

        let mut out = String::with_capacity(input.len());
        let mut rest = &input[..];
        loop {
            match str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(s) = str::from_utf8(valid) {
                        out.push_str(s);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &tail[len..];
                        }
                        None => {
                            // The chunk ends in the middle of a character.
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes the decoder at the end of the input.
    pub fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(REPLACEMENT)
    }
}
