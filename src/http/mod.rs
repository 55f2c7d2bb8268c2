mod chunked;

use std::borrow::Cow;

use chunked::ChunkedScanner;

const HOST_KEY: &[u8] = b"host:";
const CONTENT_LENGTH_KEY: &[u8] = b"content-length:";
const TRANSFER_ENCODING_KEY: &[u8] = b"transfer-encoding:";
const CHUNKED_TOKEN: &[u8] = b"chunked";

/// No recognized header key is longer than `transfer-encoding:`.
const MAX_KEY_LEN: usize = TRANSFER_ENCODING_KEY.len();
/// Upper bound on the accumulated Host value, colon-port included.
pub const MAX_HOST_LEN: usize = 4096;
const MAX_TRANSFER_ENCODING_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("malformed CRLF sequence")]
    MalformedCrlf,

    #[error("invalid Content-Length value")]
    InvalidContentLength,

    #[error("invalid chunk size byte: 0x{0:02x}")]
    InvalidChunkSize(u8),

    #[error("Host value too long")]
    HostTooLong,

    #[error("Transfer-Encoding value too long")]
    TransferEncodingTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    RequestLine,
    HeaderKey,
    HeadersEnd,
    HostValue,
    ContentLengthValue,
    ContentLengthEnd,
    TransferEncodingValue,
    OtherHeaderValue,
    Body,
}

/// Incremental HTTP/1.x request scanner.
///
/// Feed it the raw downstream byte stream chunk by chunk; it extracts the
/// `Host` value and the exact offset at which the current message ends,
/// without ever needing the message in one piece. The request line and all
/// unrecognized headers are skipped structurally, never validated. State
/// persists across calls, so any fragmentation of the input parses
/// identically to the whole stream.
#[derive(Debug)]
pub struct Scanner {
    state: State,
    key: Vec<u8>,
    host: Vec<u8>,
    host_done: bool,
    transfer_encoding: Vec<u8>,
    content_length: usize,
    is_chunked: bool,
    chunk: ChunkedScanner,
    needs_reset: bool,
}

impl Scanner {
    pub fn new() -> Self {
        Scanner {
            state: State::RequestLine,
            key: Vec::with_capacity(MAX_KEY_LEN),
            host: Vec::new(),
            host_done: false,
            transfer_encoding: Vec::new(),
            content_length: 0,
            is_chunked: false,
            chunk: ChunkedScanner::new(),
            needs_reset: false,
        }
    }

    /// Consumes the next chunk of the request stream.
    ///
    /// Returns `Ok(Some(end))` when the current message ends within `data`;
    /// `end` is relative to `data`, so `data[..end]` belongs to this message
    /// and `data[end..]` to whatever follows. Bytes past `end` are left
    /// untouched for a later call. Returns `Ok(None)` while the message is
    /// still incomplete. Errors are fatal; the connection must be dropped.
    ///
    /// After a message ends, per-message state (including the reported host)
    /// stays readable until the next call, which starts the next message
    /// fresh.
    pub fn scan(&mut self, data: &[u8]) -> Result<Option<usize>, ScanError> {
        if self.needs_reset {
            self.reset();
        }
        let mut pos = 0;
        loop {
            match self.state {
                State::RequestLine => match data[pos..].iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        pos += i + 1;
                        self.state = State::HeaderKey;
                    }
                    None => return Ok(None),
                },
                State::HeaderKey => {
                    if self.key.is_empty() {
                        let Some(&b) = data.get(pos) else {
                            return Ok(None);
                        };
                        match b {
                            b'\r' => {
                                pos += 1;
                                self.state = State::HeadersEnd;
                                continue;
                            }
                            b'\n' => return Err(ScanError::MalformedCrlf),
                            _ => {}
                        }
                    }
                    loop {
                        let Some(&b) = data.get(pos) else {
                            return Ok(None);
                        };
                        if b == b'\r' || b == b'\n' {
                            // A line without a colon; skip it like any
                            // unrecognized header.
                            self.key.clear();
                            self.state = State::OtherHeaderValue;
                            break;
                        }
                        pos += 1;
                        self.key.push(b);
                        if b == b':' {
                            self.state = self.match_key();
                            self.key.clear();
                            break;
                        }
                        if self.key.len() == MAX_KEY_LEN {
                            // Longer than any recognized key.
                            self.key.clear();
                            self.state = State::OtherHeaderValue;
                            break;
                        }
                    }
                }
                State::HeadersEnd => {
                    let Some(&b) = data.get(pos) else {
                        return Ok(None);
                    };
                    if b != b'\n' {
                        return Err(ScanError::MalformedCrlf);
                    }
                    pos += 1;
                    if self.is_chunked || self.content_length > 0 {
                        self.state = State::Body;
                    } else {
                        return Ok(Some(self.complete(pos)));
                    }
                }
                State::HostValue => match gather_line(&mut self.host, MAX_HOST_LEN, data, pos) {
                    Gather::Complete(next) => {
                        pos = next;
                        self.host_done = true;
                        self.state = State::HeaderKey;
                    }
                    Gather::Partial => return Ok(None),
                    Gather::Overflow => return Err(ScanError::HostTooLong),
                },
                State::ContentLengthValue => loop {
                    let Some(&b) = data.get(pos) else {
                        return Ok(None);
                    };
                    pos += 1;
                    match b {
                        b'0'..=b'9' => {
                            let digit = (b - b'0') as usize;
                            self.content_length = self
                                .content_length
                                .checked_mul(10)
                                .and_then(|n| n.checked_add(digit))
                                .ok_or(ScanError::InvalidContentLength)?;
                        }
                        b' ' => {}
                        b'\r' => {
                            self.state = State::ContentLengthEnd;
                            break;
                        }
                        b'\n' => {
                            self.state = State::HeaderKey;
                            break;
                        }
                        _ => return Err(ScanError::InvalidContentLength),
                    }
                },
                State::ContentLengthEnd => {
                    let Some(&b) = data.get(pos) else {
                        return Ok(None);
                    };
                    if b != b'\n' {
                        return Err(ScanError::MalformedCrlf);
                    }
                    pos += 1;
                    self.state = State::HeaderKey;
                }
                State::TransferEncodingValue => {
                    match gather_line(
                        &mut self.transfer_encoding,
                        MAX_TRANSFER_ENCODING_LEN,
                        data,
                        pos,
                    ) {
                        Gather::Complete(next) => {
                            pos = next;
                            if contains_chunked(&self.transfer_encoding) {
                                self.is_chunked = true;
                            }
                            self.state = State::HeaderKey;
                        }
                        Gather::Partial => return Ok(None),
                        Gather::Overflow => return Err(ScanError::TransferEncodingTooLong),
                    }
                }
                State::OtherHeaderValue => match data[pos..].iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        pos += i + 1;
                        self.state = State::HeaderKey;
                    }
                    None => return Ok(None),
                },
                State::Body => {
                    if self.is_chunked {
                        return match self.chunk.scan(&data[pos..])? {
                            Some(rel) => Ok(Some(self.complete(pos + rel))),
                            None => Ok(None),
                        };
                    }
                    let available = data.len() - pos;
                    if available >= self.content_length {
                        let end = pos + self.content_length;
                        return Ok(Some(self.complete(end)));
                    }
                    self.content_length -= available;
                    return Ok(None);
                }
            }
        }
    }

    /// The `Host` value of the current message, once its header line is
    /// fully received. Stays available after the message ends, until the
    /// next `scan` call.
    pub fn host(&self) -> Option<&[u8]> {
        self.host_done.then_some(self.host.as_slice())
    }

    /// True once the header section of the current message is fully parsed
    /// and its body (if any) is still being consumed.
    pub fn headers_done(&self) -> bool {
        matches!(self.state, State::Body)
    }

    fn match_key(&mut self) -> State {
        if self.key.eq_ignore_ascii_case(HOST_KEY) {
            // A repeated Host header replaces the previous value.
            self.host.clear();
            self.host_done = false;
            State::HostValue
        } else if self.key.eq_ignore_ascii_case(CONTENT_LENGTH_KEY) {
            self.content_length = 0;
            State::ContentLengthValue
        } else if self.key.eq_ignore_ascii_case(TRANSFER_ENCODING_KEY) {
            self.transfer_encoding.clear();
            State::TransferEncodingValue
        } else {
            State::OtherHeaderValue
        }
    }

    fn complete(&mut self, end: usize) -> usize {
        self.state = State::RequestLine;
        self.needs_reset = true;
        end
    }

    fn reset(&mut self) {
        self.needs_reset = false;
        self.key.clear();
        self.host.clear();
        self.host_done = false;
        self.transfer_encoding.clear();
        self.content_length = 0;
        self.is_chunked = false;
        self.chunk.reset();
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::new()
    }
}

enum Gather {
    Complete(usize),
    Partial,
    Overflow,
}

/// Accumulates a header value line into `buf` until its newline. On
/// completion the trailing `\r` and any leading spaces are trimmed, so the
/// result is identical no matter where chunk boundaries fall.
fn gather_line(buf: &mut Vec<u8>, cap: usize, data: &[u8], pos: usize) -> Gather {
    let rest = &data[pos..];
    match rest.iter().position(|&b| b == b'\n') {
        Some(i) => {
            buf.extend_from_slice(&rest[..i]);
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            let spaces = buf.iter().take_while(|&&b| b == b' ').count();
            buf.drain(..spaces);
            if buf.len() > cap {
                return Gather::Overflow;
            }
            Gather::Complete(pos + i + 1)
        }
        None => {
            if buf.len() + rest.len() > cap {
                return Gather::Overflow;
            }
            buf.extend_from_slice(rest);
            Gather::Partial
        }
    }
}

#[inline]
fn contains_chunked(value: &[u8]) -> bool {
    value
        .windows(CHUNKED_TOKEN.len())
        .any(|w| w.eq_ignore_ascii_case(CHUNKED_TOKEN))
}

/// Strips a literal leading `www.` from a host. Only the exact four-byte
/// prefix is removed; the remainder is never case-folded.
#[inline]
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// True when the authority carries an explicit port. Bracketed IPv6
/// literals are recognized so their colons are not mistaken for a port
/// separator.
#[inline]
fn has_port(authority: &str) -> bool {
    match authority.strip_prefix('[') {
        Some(rest) => matches!(rest.split_once(']'), Some((_, tail)) if tail.starts_with(':')),
        None => authority.contains(':'),
    }
}

/// The address to dial for an authority, appending `default_port` when the
/// authority has none of its own.
pub fn dial_address(authority: &str, default_port: u16) -> Cow<'_, str> {
    if has_port(authority) {
        Cow::Borrowed(authority)
    } else {
        Cow::Owned(format!("{}:{}", authority, default_port))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    /// Builds a request in the shape real clients send: filler headers
    /// around the Host line, optionally a fixed-length body.
    fn generate_request(filler_headers: usize, host: &str, body: &[u8]) -> Vec<u8> {
        let mut request = b"POST /path/to/resource HTTP/1.1\r\n".to_vec();
        for i in 0..filler_headers {
            request.extend_from_slice(format!("X-Filler-{}: value-{}\r\n", i, i).as_bytes());
        }
        request.extend_from_slice(format!("Host: {}\r\n", host).as_bytes());
        if !body.is_empty() {
            request.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }
        request.extend_from_slice(b"Accept: */*\r\n\r\n");
        request.extend_from_slice(body);
        request
    }

    /// Feeds `chunks` into a fresh scanner, returning the final host and
    /// the absolute end offset.
    fn scan_chunks(chunks: &[&[u8]]) -> Result<(Option<Vec<u8>>, Option<usize>), ScanError> {
        let mut scanner = Scanner::new();
        let mut consumed = 0;
        for chunk in chunks {
            if let Some(end) = scanner.scan(chunk)? {
                return Ok((scanner.host().map(|h| h.to_vec()), Some(consumed + end)));
            }
            consumed += chunk.len();
        }
        Ok((scanner.host().map(|h| h.to_vec()), None))
    }

    #[test]
    fn bodyless_request_ends_at_blank_line() {
        let request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"example.com".as_ref()));
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn content_length_body_ends_before_pipelined_bytes() {
        let request = b"GET / HTTP/1.1\r\nContent-Length: 5\r\nHost: a.com\r\n\r\nhelloNEXT";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"a.com".as_ref()));
        let end = end.unwrap();
        assert_eq!(&request[end - 5..end], b"hello");
        assert_eq!(&request[end..], b"NEXT");
    }

    #[test]
    fn missing_host_still_reports_message_end() {
        let request = b"GET / HTTP/1.1\r\n\r\n";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host, None);
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn host_key_match_is_case_insensitive() {
        for key in ["Host", "HOST", "host", "hOsT"] {
            let request = format!("GET / HTTP/1.1\r\n{}: example.com\r\n\r\n", key);
            let (host, end) = scan_chunks(&[request.as_bytes()]).unwrap();
            assert_eq!(host.as_deref(), Some(b"example.com".as_ref()), "{}", key);
            assert_eq!(end, Some(request.len()));
        }
    }

    #[test]
    fn host_key_split_across_chunks() {
        let (host, end) = scan_chunks(&[b"GET / HTTP/1.1\r\nHo", b"st: x.y\r\n\r\n"]).unwrap();
        assert_eq!(host.as_deref(), Some(b"x.y".as_ref()));
        assert_eq!(end, Some("GET / HTTP/1.1\r\nHost: x.y\r\n\r\n".len()));
    }

    #[test]
    fn host_line_split_between_cr_and_lf() {
        let (host, _) = scan_chunks(&[b"GET / HTTP/1.1\r\nHost: x.y\r", b"\n\r\n"]).unwrap();
        assert_eq!(host.as_deref(), Some(b"x.y".as_ref()));
    }

    #[test]
    fn leading_spaces_in_host_value_are_skipped() {
        let (host, _) = scan_chunks(&[b"GET / HTTP/1.1\r\nHost:    spaced.com\r\n\r\n"]).unwrap();
        assert_eq!(host.as_deref(), Some(b"spaced.com".as_ref()));
    }

    #[test]
    fn host_keeps_explicit_port() {
        let (host, _) =
            scan_chunks(&[b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n"]).unwrap();
        assert_eq!(host.as_deref(), Some(b"example.com:8080".as_ref()));
    }

    #[test]
    fn repeated_host_header_last_wins() {
        let (host, _) =
            scan_chunks(&[b"GET / HTTP/1.1\r\nHost: first.com\r\nHost: second.com\r\n\r\n"])
                .unwrap();
        assert_eq!(host.as_deref(), Some(b"second.com".as_ref()));
    }

    #[test]
    fn every_two_chunk_split_matches_whole() {
        let requests: Vec<Vec<u8>> = vec![
            b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec(),
            generate_request(3, "fragmented.example.com", b"0123456789abcdef"),
            b"POST /u HTTP/1.1\r\nHost: c.d\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"
                .to_vec(),
        ];
        for request in &requests {
            let whole = scan_chunks(&[request]).unwrap();
            for i in 0..=request.len() {
                let split = scan_chunks(&[&request[..i], &request[i..]]).unwrap();
                assert_eq!(split, whole, "split at {}", i);
            }
        }
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let request = generate_request(2, "one.byte.at.a.time", b"body bytes");
        let whole = scan_chunks(&[&request]).unwrap();
        let chunks: Vec<&[u8]> = request.chunks(1).collect();
        assert_eq!(scan_chunks(&chunks).unwrap(), whole);
    }

    #[test]
    fn random_fragmentation_matches_whole() {
        let mut rng = StdRng::seed_from_u64(0x5ca11ab1e);
        let request = generate_request(5, "www.fuzzed.example.com", &vec![b'z'; 333]);
        let whole = scan_chunks(&[&request]).unwrap();
        for _ in 0..200 {
            let mut chunks: Vec<&[u8]> = Vec::new();
            let mut rest = request.as_slice();
            while !rest.is_empty() {
                let take = rng.random_range(1..=rest.len());
                let (head, tail) = rest.split_at(take);
                chunks.push(head);
                rest = tail;
            }
            assert_eq!(scan_chunks(&chunks).unwrap(), whole);
        }
    }

    #[test]
    fn pipelined_requests_scan_one_at_a_time() {
        let first = b"GET /a HTTP/1.1\r\nHost: a.com\r\n\r\n";
        let second = b"GET /b HTTP/1.1\r\nHost: b.com\r\n\r\n";
        let mut combined = first.to_vec();
        combined.extend_from_slice(second);

        let mut scanner = Scanner::new();
        let end = scanner.scan(&combined).unwrap().unwrap();
        assert_eq!(end, first.len());
        assert_eq!(scanner.host().map(|h| h.to_vec()), Some(b"a.com".to_vec()));

        let end = scanner.scan(&combined[first.len()..]).unwrap().unwrap();
        assert_eq!(end, second.len());
        assert_eq!(scanner.host().map(|h| h.to_vec()), Some(b"b.com".to_vec()));
    }

    #[test]
    fn per_message_state_resets_between_messages() {
        let mut scanner = Scanner::new();
        let first = b"GET / HTTP/1.1\r\nHost: kept.com\r\n\r\n";
        assert!(scanner.scan(first).unwrap().is_some());
        assert_eq!(
            scanner.host().map(|h| h.to_vec()),
            Some(b"kept.com".to_vec())
        );

        // The next message has no Host header; nothing may leak over.
        let second = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert_eq!(scanner.scan(second).unwrap(), Some(second.len()));
        assert_eq!(scanner.host(), None);
    }

    #[test]
    fn headers_done_while_body_outstanding() {
        let mut scanner = Scanner::new();
        let partial = b"POST / HTTP/1.1\r\nHost: h.i\r\nContent-Length: 10\r\n\r\nabc";
        assert_eq!(scanner.scan(partial).unwrap(), None);
        assert!(scanner.headers_done());
        assert_eq!(scanner.host().map(|h| h.to_vec()), Some(b"h.i".to_vec()));
        assert_eq!(scanner.scan(b"defg").unwrap(), None);
        assert_eq!(scanner.scan(b"hij").unwrap(), Some(3));
    }

    #[test]
    fn headers_not_done_before_blank_line() {
        let mut scanner = Scanner::new();
        assert_eq!(
            scanner.scan(b"GET / HTTP/1.1\r\nHost: x.y\r\n").unwrap(),
            None
        );
        assert!(!scanner.headers_done());
        assert_eq!(scanner.host().map(|h| h.to_vec()), Some(b"x.y".to_vec()));
    }

    #[test]
    fn transfer_encoding_chunked_arms_chunked_body() {
        let request =
            b"POST / HTTP/1.1\r\nHost: c.d\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\nrest";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"c.d".as_ref()));
        assert_eq!(end, Some(request.len() - "rest".len()));
    }

    #[test]
    fn transfer_encoding_match_is_case_insensitive() {
        let request = b"POST / HTTP/1.1\r\nHost: c.d\r\nTRANSFER-ENCODING: Chunked\r\n\r\n0\r\n\r\n";
        let (_, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn transfer_encoding_chunked_in_list() {
        let request =
            b"POST / HTTP/1.1\r\nHost: c.d\r\nTransfer-Encoding: gzip, chunked\r\n\r\n0\r\n\r\n";
        let (_, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn content_length_rejects_non_digit() {
        let request = b"GET / HTTP/1.1\r\nContent-Length: 12x\r\nHost: a.b\r\n\r\n";
        assert_eq!(
            scan_chunks(&[request]),
            Err(ScanError::InvalidContentLength)
        );
    }

    #[test]
    fn content_length_rejects_overflow() {
        let request = b"GET / HTTP/1.1\r\nContent-Length: 99999999999999999999999999\r\n\r\n";
        assert_eq!(
            scan_chunks(&[request]),
            Err(ScanError::InvalidContentLength)
        );
    }

    #[test]
    fn content_length_allows_bare_lf_terminator() {
        let request = b"GET / HTTP/1.1\r\nContent-Length: 2\nHost: a.b\r\n\r\nok";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"a.b".as_ref()));
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn bad_chunk_size_is_fatal() {
        let request = b"POST / HTTP/1.1\r\nHost: c.d\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        assert_eq!(
            scan_chunks(&[request]),
            Err(ScanError::InvalidChunkSize(b'z'))
        );
    }

    #[test]
    fn host_longer_than_cap_is_fatal() {
        let mut request = b"GET / HTTP/1.1\r\nHost: ".to_vec();
        request.extend_from_slice(&vec![b'a'; MAX_HOST_LEN + 1]);
        request.extend_from_slice(b"\r\n\r\n");
        assert_eq!(scan_chunks(&[&request]), Err(ScanError::HostTooLong));
    }

    #[test]
    fn host_at_cap_is_accepted() {
        let mut request = b"GET / HTTP/1.1\r\nHost: ".to_vec();
        request.extend_from_slice(&vec![b'a'; MAX_HOST_LEN]);
        request.extend_from_slice(b"\r\n\r\n");
        let (host, _) = scan_chunks(&[&request]).unwrap();
        assert_eq!(host.map(|h| h.len()), Some(MAX_HOST_LEN));
    }

    #[test]
    fn bare_lf_header_terminator_is_rejected() {
        let request = b"GET / HTTP/1.1\r\nHost: x.y\r\n\nrest";
        assert_eq!(scan_chunks(&[request]), Err(ScanError::MalformedCrlf));
    }

    #[test]
    fn cr_followed_by_garbage_is_rejected() {
        let request = b"GET / HTTP/1.1\r\nHost: x.y\r\n\rX";
        assert_eq!(scan_chunks(&[request]), Err(ScanError::MalformedCrlf));
    }

    #[test]
    fn unrecognized_long_header_is_skipped() {
        let request =
            b"GET / HTTP/1.1\r\nX-Some-Very-Long-Header-Name: ignored\r\nHost: ok.com\r\n\r\n";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"ok.com".as_ref()));
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn colonless_header_line_is_skipped() {
        let request = b"GET / HTTP/1.1\r\ngarbage\r\nHost: ok.com\r\n\r\n";
        let (host, end) = scan_chunks(&[request]).unwrap();
        assert_eq!(host.as_deref(), Some(b"ok.com".as_ref()));
        assert_eq!(end, Some(request.len()));
    }

    #[test]
    fn incomplete_message_reports_nothing() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.scan(b"GET / HTTP/1.1\r\nHos").unwrap(), None);
        assert_eq!(scanner.host(), None);
        assert!(!scanner.headers_done());
    }

    #[test]
    fn strip_www_exact_prefix_only() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
        assert_eq!(strip_www("WWW.example.com"), "WWW.example.com");
        assert_eq!(strip_www("www.www.example.com"), "www.example.com");
        assert_eq!(strip_www("wwwexample.com"), "wwwexample.com");
        assert_eq!(strip_www("www."), "");
    }

    #[test]
    fn dial_address_appends_default_port() {
        assert_eq!(dial_address("example.com", 80), "example.com:80");
        assert_eq!(dial_address("example.com:8080", 80), "example.com:8080");
        assert_eq!(dial_address("[::1]", 80), "[::1]:80");
        assert_eq!(dial_address("[::1]:8443", 80), "[::1]:8443");
    }
}
