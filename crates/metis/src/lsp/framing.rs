//! Incremental framing of the length-prefixed JSON-RPC byte stream.
//!
//! The server's stdout is a single pipe carrying framed messages, and the
//! reads that arrive from it may split a message anywhere: inside the
//! header, inside the body, even inside the `Content-Length:` marker
//! itself. `MessageFramer` accumulates bytes across reads and yields one
//! complete [`Message`] at a time, staying correct under arbitrary
//! fragmentation.
//!
//! The stream is also not trusted to be clean. Some servers write stray
//! diagnostics to stdout before or between frames, and a frame's body can
//! turn out to be garbage despite a well-formed header. Both cases are
//! recovered locally: the framer discards up to the next header marker,
//! logs what it dropped, and carries on. Framing problems never surface
//! as errors to callers.

use tracing::warn;

use super::message::Message;

const HEADER_MARKER: &[u8] = b"Content-Length:";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Buffer cap for streams that never produce a header. If this much
/// accumulates without a `Content-Length:` marker anywhere in sight the
/// buffer is cleared outright to bound memory.
const MAX_HEADERLESS_BYTES: usize = 64 * 1024;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reassembles framed messages from an arbitrarily fragmented byte stream.
#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: Vec<u8>,
}

impl MessageFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes to the accumulation buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete message from the buffer.
    ///
    /// Returns `None` when the buffer holds no complete frame yet; feeding
    /// more bytes and calling again resumes exactly where parsing left
    /// off. Corrupt input (leading garbage, unparseable headers, bodies
    /// that are not valid envelopes) is skipped with a diagnostic.
    pub fn next_message(&mut self) -> Option<Message> {
        loop {
            self.discard_leading_garbage();

            if !self.buffer.starts_with(HEADER_MARKER) {
                // Empty, or a partial marker awaiting more bytes.
                return None;
            }

            let header_end = find(&self.buffer, HEADER_TERMINATOR)?;
            let header_len = header_end + HEADER_TERMINATOR.len();

            let Some(content_length) = parse_content_length(&self.buffer[..header_end]) else {
                warn!(
                    header = %String::from_utf8_lossy(&self.buffer[..header_end]),
                    "unparseable header block, resynchronizing"
                );
                self.buffer.drain(..header_len);
                continue;
            };

            let body_end = header_len + content_length;
            if self.buffer.len() < body_end {
                // Full body not here yet; leave the header unconsumed.
                return None;
            }

            match serde_json::from_slice::<Message>(&self.buffer[header_len..body_end]) {
                Ok(message) => {
                    self.buffer.drain(..body_end);
                    return Some(message);
                }
                Err(error) => {
                    warn!(
                        %error,
                        content_length,
                        body = %String::from_utf8_lossy(&self.buffer[header_len..body_end]),
                        "malformed message body, resynchronizing"
                    );
                    // Resume at the next header after the bad body, if any.
                    match find(&self.buffer[body_end..], HEADER_MARKER) {
                        Some(offset) => {
                            self.buffer.drain(..body_end + offset);
                        }
                        None => self.buffer.clear(),
                    }
                }
            }
        }
    }

    /// Drop any non-protocol bytes sitting before the first header marker.
    fn discard_leading_garbage(&mut self) {
        match find(&self.buffer, HEADER_MARKER) {
            Some(0) => {}
            Some(start) => {
                warn!(
                    discarded = %String::from_utf8_lossy(&self.buffer[..start]),
                    "discarding non-protocol bytes before header"
                );
                self.buffer.drain(..start);
            }
            None => {
                if self.buffer.len() > MAX_HEADERLESS_BYTES {
                    warn!(
                        bytes = self.buffer.len(),
                        "clearing oversized buffer with no header in sight"
                    );
                    self.buffer.clear();
                }
            }
        }
    }
}

/// Pull the `Content-Length` value out of a header block.
fn parse_content_length(header: &[u8]) -> Option<usize> {
    let header = std::str::from_utf8(header).ok()?;
    header
        .split("\r\n")
        .find_map(|line| line.strip_prefix("Content-Length:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::message::RequestId;
    use proptest::prelude::*;
    use serde_json::json;

    fn framed(msg: &Message) -> Vec<u8> {
        msg.to_wire().unwrap()
    }

    fn drain(framer: &mut MessageFramer) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(msg) = framer.next_message() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn round_trips_each_message_shape() {
        let shapes = [
            Message::request(1, "textDocument/documentSymbol", json!({"uri": "file:///a"})),
            Message::response(RequestId::Number(1), json!([{"name": "bar"}])),
            Message::error_response(RequestId::Number(2), -32601, "method not found"),
            Message::notification("initialized", json!({})),
        ];

        for original in shapes {
            let mut framer = MessageFramer::new();
            framer.feed(&framed(&original));
            assert_eq!(framer.next_message(), Some(original));
            assert_eq!(framer.next_message(), None);
        }
    }

    #[test]
    fn multibyte_bodies_frame_on_byte_boundaries() {
        let original = Message::notification("log", json!({"message": "日本語テキスト"}));
        let mut framer = MessageFramer::new();
        framer.feed(&framed(&original));
        assert_eq!(framer.next_message(), Some(original));
    }

    #[test]
    fn byte_at_a_time_feeding_yields_the_same_messages() {
        let a = Message::request(7, "initialize", json!({"rootUri": "file:///ws"}));
        let b = Message::notification("exit", serde_json::Value::Null);
        let mut stream = framed(&a);
        stream.extend_from_slice(&framed(&b));

        let mut framer = MessageFramer::new();
        let mut got = Vec::new();
        for byte in stream {
            framer.feed(&[byte]);
            got.extend(drain(&mut framer));
        }
        assert_eq!(got, vec![a, b]);
    }

    #[test]
    fn split_inside_header_is_harmless() {
        let msg = Message::response(RequestId::Number(3), json!({"capabilities": {}}));
        let bytes = framed(&msg);

        let mut framer = MessageFramer::new();
        framer.feed(&bytes[..9]); // mid-"Content-Length"
        assert_eq!(framer.next_message(), None);
        framer.feed(&bytes[9..]);
        assert_eq!(framer.next_message(), Some(msg));
    }

    #[test]
    fn split_inside_body_leaves_header_unconsumed() {
        let msg = Message::response(RequestId::Number(4), json!({"v": "value"}));
        let bytes = framed(&msg);
        let body_start = find(&bytes, b"\r\n\r\n").unwrap() + 4;

        let mut framer = MessageFramer::new();
        framer.feed(&bytes[..body_start + 3]);
        assert_eq!(framer.next_message(), None);
        framer.feed(&bytes[body_start + 3..]);
        assert_eq!(framer.next_message(), Some(msg));
    }

    #[test]
    fn two_messages_in_one_feed_come_out_in_order(){
        let a = Message::notification("one", json!(1));
        let b = Message::notification("two", json!(2));
        let mut stream = framed(&a);
        stream.extend_from_slice(&framed(&b));

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(drain(&mut framer), vec![a, b]);
    }

    #[test]
    fn garbage_prefix_is_discarded_before_a_valid_frame() {
        let msg = Message::notification("ready", json!({}));
        let mut stream = b"Picked up JAVA_TOOL_OPTIONS: -Xshare:off\n".to_vec();
        stream.extend_from_slice(&framed(&msg));

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(framer.next_message(), Some(msg));
    }

    #[test]
    fn accepts_frames_without_content_type_header() {
        let msg = Message::notification("plain", json!({}));
        let body = serde_json::to_vec(&msg).unwrap();
        let mut stream = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        stream.extend_from_slice(&body);

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(framer.next_message(), Some(msg));
    }

    #[test]
    fn malformed_body_recovers_at_the_next_header() {
        let good = Message::notification("after", json!({}));
        let bad_body = b"{not json at all";
        let mut stream = format!("Content-Length: {}\r\n\r\n", bad_body.len()).into_bytes();
        stream.extend_from_slice(bad_body);
        stream.extend_from_slice(&framed(&good));

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(framer.next_message(), Some(good));
        assert_eq!(framer.next_message(), None);
    }

    #[test]
    fn malformed_body_with_no_following_header_clears_the_buffer() {
        let bad_body = b"garbage";
        let mut stream = format!("Content-Length: {}\r\n\r\n", bad_body.len()).into_bytes();
        stream.extend_from_slice(bad_body);
        stream.extend_from_slice(b"trailing noise");

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(framer.next_message(), None);
        assert!(framer.buffer.is_empty());
    }

    #[test]
    fn unparseable_content_length_resynchronizes() {
        let good = Message::notification("after", json!({}));
        let mut stream = b"Content-Length: zero\r\n\r\n".to_vec();
        stream.extend_from_slice(&framed(&good));

        let mut framer = MessageFramer::new();
        framer.feed(&stream);
        assert_eq!(framer.next_message(), Some(good));
    }

    #[test]
    fn oversized_headerless_buffer_is_cleared() {
        let mut framer = MessageFramer::new();
        framer.feed(&vec![b'x'; MAX_HEADERLESS_BYTES + 1]);
        assert_eq!(framer.next_message(), None);
        assert!(framer.buffer.is_empty());

        // Still usable afterwards.
        let msg = Message::notification("alive", json!({}));
        framer.feed(&framed(&msg));
        assert_eq!(framer.next_message(), Some(msg));
    }

    proptest! {
        /// Feeding a well-formed stream in arbitrarily sized pieces emits
        /// the same message sequence as feeding it whole.
        #[test]
        fn fragmentation_invariance(cuts in proptest::collection::vec(0usize..400, 0..8)) {
            let messages = vec![
                Message::request(1, "textDocument/references", json!({"position": {"line": 3}})),
                Message::response(RequestId::Number(1), json!([{"uri": "file:///Ünïcode.java"}])),
                Message::notification("window/logMessage", json!({"message": "ログ"})),
            ];
            let mut stream = Vec::new();
            for msg in &messages {
                stream.extend_from_slice(&framed(msg));
            }

            let mut cut_points: Vec<usize> =
                cuts.into_iter().map(|c| c % (stream.len() + 1)).collect();
            cut_points.sort_unstable();
            cut_points.dedup();

            let mut framer = MessageFramer::new();
            let mut got = Vec::new();
            let mut prev = 0;
            for cut in cut_points {
                framer.feed(&stream[prev..cut]);
                got.extend(drain(&mut framer));
                prev = cut;
            }
            framer.feed(&stream[prev..]);
            got.extend(drain(&mut framer));

            prop_assert_eq!(got, messages);
        }
    }
}
