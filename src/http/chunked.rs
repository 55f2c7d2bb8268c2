use super::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data,
    Last,
}

/// Nested state machine for chunked transfer encoding. It only tracks where
/// the body ends; chunk payloads are never copied or inspected.
#[derive(Debug)]
pub(super) struct ChunkedScanner {
    state: ChunkState,
    remaining: usize,
}

impl ChunkedScanner {
    pub(super) fn new() -> Self {
        ChunkedScanner {
            state: ChunkState::Size,
            remaining: 0,
        }
    }

    pub(super) fn reset(&mut self) {
        self.state = ChunkState::Size;
        self.remaining = 0;
    }

    /// Consumes the next fragment of body bytes. Returns the offset right
    /// after the terminating CRLF of the zero-length chunk, relative to
    /// `data`, once the body is fully delimited.
    pub(super) fn scan(&mut self, data: &[u8]) -> Result<Option<usize>, ScanError> {
        let mut pos = 0;
        loop {
            match self.state {
                ChunkState::Size => loop {
                    let Some(&b) = data.get(pos) else {
                        return Ok(None);
                    };
                    pos += 1;
                    match b {
                        b'\r' => {}
                        b'\n' => {
                            self.state = if self.remaining == 0 {
                                ChunkState::Last
                            } else {
                                ChunkState::Data
                            };
                            break;
                        }
                        _ => match unhex(b) {
                            Some(digit) => {
                                self.remaining = (self.remaining << 4) | digit as usize;
                            }
                            None => return Err(ScanError::InvalidChunkSize(b)),
                        },
                    }
                },
                ChunkState::Data => {
                    let available = data.len() - pos;
                    if available <= self.remaining {
                        // `remaining == 0` afterwards means the trailing CRLF
                        // is still outstanding; the next call picks it up.
                        self.remaining -= available;
                        return Ok(None);
                    }
                    pos += self.remaining;
                    self.remaining = 0;
                    match data[pos..].iter().position(|&b| b == b'\n') {
                        Some(i) => {
                            pos += i + 1;
                            self.state = ChunkState::Size;
                        }
                        None => return Ok(None),
                    }
                }
                ChunkState::Last => match data[pos..].iter().position(|&b| b == b'\n') {
                    Some(i) => return Ok(Some(pos + i + 1)),
                    None => return Ok(None),
                },
            }
        }
    }
}

#[inline]
fn unhex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_chunks(chunks: &[&[u8]]) -> Result<Option<usize>, ScanError> {
        let mut scanner = ChunkedScanner::new();
        let mut consumed = 0;
        for chunk in chunks {
            if let Some(end) = scanner.scan(chunk)? {
                return Ok(Some(consumed + end));
            }
            consumed += chunk.len();
        }
        Ok(None)
    }

    #[test]
    fn single_chunk_body() {
        let body = b"5\r\nhello\r\n0\r\n\r\n";
        assert_eq!(scan_chunks(&[body]), Ok(Some(body.len())));
    }

    #[test]
    fn multiple_chunks() {
        let body = b"4\r\nwiki\r\n5\r\npedia\r\n0\r\n\r\n";
        assert_eq!(scan_chunks(&[body]), Ok(Some(body.len())));
    }

    #[test]
    fn reports_end_relative_to_final_fragment() {
        let mut scanner = ChunkedScanner::new();
        assert_eq!(scanner.scan(b"5\r\nhel"), Ok(None));
        assert_eq!(scanner.scan(b"lo\r\n0\r\n\r\n"), Ok(Some(9)));
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let body = b"a\r\n0123456789\r\n2\r\nok\r\n0\r\n\r\n";
        let whole = scan_chunks(&[body]).unwrap();
        let mut scanner = ChunkedScanner::new();
        let mut end = None;
        for (i, b) in body.iter().enumerate() {
            if let Some(rel) = scanner.scan(std::slice::from_ref(b)).unwrap() {
                end = Some(i + rel);
                break;
            }
        }
        assert_eq!(end, whole);
    }

    #[test]
    fn split_between_chunk_data_and_trailer() {
        // The trailing CRLF of a chunk arrives in a later fragment.
        let end = scan_chunks(&[b"5\r\nhello", b"\r", b"\n0\r\n\r\n"]);
        assert_eq!(end, Ok(Some("5\r\nhello\r\n0\r\n\r\n".len())));
    }

    #[test]
    fn hex_size_is_case_insensitive() {
        let body = b"A\r\n0123456789\r\n0\r\n\r\n";
        assert_eq!(scan_chunks(&[body]), Ok(Some(body.len())));
        let body = b"a\r\n0123456789\r\n0\r\n\r\n";
        assert_eq!(scan_chunks(&[body]), Ok(Some(body.len())));
    }

    #[test]
    fn multi_digit_size() {
        let payload = vec![b'x'; 0x1f];
        let mut body = b"1f\r\n".to_vec();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n0\r\n\r\n");
        assert_eq!(scan_chunks(&[&body]), Ok(Some(body.len())));
    }

    #[test]
    fn rejects_non_hex_size() {
        assert_eq!(
            scan_chunks(&[b"zz\r\n"]),
            Err(ScanError::InvalidChunkSize(b'z'))
        );
    }

    #[test]
    fn zero_length_body() {
        let body = b"0\r\n\r\n";
        assert_eq!(scan_chunks(&[body]), Ok(Some(body.len())));
    }

    #[test]
    fn excess_bytes_are_not_consumed() {
        let mut scanner = ChunkedScanner::new();
        let data = b"0\r\n\r\nGET /next";
        assert_eq!(scanner.scan(data), Ok(Some(5)));
    }
}
