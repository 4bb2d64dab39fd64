//! Frame types and the incremental frame parser
//!
//! `parse_frame` works on an accumulating `BytesMut`. It consumes bytes only
//! when a whole frame is available, so callers can keep appending reads and
//! retry without losing partial input.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::{CMD_PUBLISH, CMD_SUBSCRIBE, MAX_HEADER_LEN};
use super::error::ProtocolError;

/// One complete protocol unit read from a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `SUB <topic>\n`
    Subscribe { topic: String },
    /// `PUB <topic> <len>\n<payload>`
    Publish { topic: String, payload: Bytes },
}

impl Frame {
    /// Build a subscribe frame
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Frame::Subscribe {
            topic: topic.into(),
        }
    }

    /// Build a publish frame
    pub fn publish(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Frame::Publish {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Subscribe { .. } => CMD_SUBSCRIBE,
            Frame::Publish { .. } => CMD_PUBLISH,
        }
    }

    /// Encode into wire format
    pub fn encode(&self) -> Bytes {
        match self {
            Frame::Subscribe { topic } => {
                let mut buf = BytesMut::with_capacity(CMD_SUBSCRIBE.len() + topic.len() + 2);
                buf.put_slice(CMD_SUBSCRIBE.as_bytes());
                buf.put_u8(b' ');
                buf.put_slice(topic.as_bytes());
                buf.put_u8(b'\n');
                buf.freeze()
            }
            Frame::Publish { topic, payload } => {
                let len = payload.len().to_string();
                let mut buf = BytesMut::with_capacity(
                    CMD_PUBLISH.len() + topic.len() + len.len() + 3 + payload.len(),
                );
                buf.put_slice(CMD_PUBLISH.as_bytes());
                buf.put_u8(b' ');
                buf.put_slice(topic.as_bytes());
                buf.put_u8(b' ');
                buf.put_slice(len.as_bytes());
                buf.put_u8(b'\n');
                buf.put_slice(payload);
                buf.freeze()
            }
        }
    }
}

/// Parsed header line
#[derive(Debug, PartialEq, Eq)]
enum Header {
    Subscribe { topic: String },
    Publish { topic: String, len: usize },
}

/// Try to parse one frame from the front of `buf`
///
/// Returns `Ok(None)` when more input is needed; nothing is consumed in that
/// case. The topic name is returned as sent: name validation belongs to the
/// registry.
pub fn parse_frame(buf: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>, ProtocolError> {
    let newline = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None if buf.len() > MAX_HEADER_LEN => {
            return Err(ProtocolError::HeaderTooLong {
                max: MAX_HEADER_LEN,
            })
        }
        None => return Ok(None),
    };

    if newline > MAX_HEADER_LEN {
        return Err(ProtocolError::HeaderTooLong {
            max: MAX_HEADER_LEN,
        });
    }

    match parse_header(&buf[..newline])? {
        Header::Subscribe { topic } => {
            buf.advance(newline + 1);
            Ok(Some(Frame::Subscribe { topic }))
        }
        Header::Publish { topic, len } => {
            if len > max_payload {
                return Err(ProtocolError::PayloadTooLarge {
                    len,
                    max: max_payload,
                });
            }

            let frame_len = newline + 1 + len;
            if buf.len() < frame_len {
                buf.reserve(frame_len - buf.len());
                return Ok(None);
            }

            buf.advance(newline + 1);
            let payload = buf.split_to(len).freeze();
            Ok(Some(Frame::Publish { topic, payload }))
        }
    }
}

fn parse_header(line: &[u8]) -> Result<Header, ProtocolError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;

    let mut fields = line.split(' ');
    let command = fields.next().unwrap_or_default();

    match command {
        CMD_SUBSCRIBE => {
            // A missing topic surfaces as an empty name, which the registry rejects
            let topic = fields.next().unwrap_or_default();
            if fields.next().is_some() {
                return Err(ProtocolError::MalformedHeader(line.to_string()));
            }
            Ok(Header::Subscribe {
                topic: topic.to_string(),
            })
        }
        CMD_PUBLISH => {
            let (Some(topic), Some(len), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(ProtocolError::MalformedHeader(line.to_string()));
            };
            Ok(Header::Publish {
                topic: topic.to_string(),
                len: parse_length(len)?,
            })
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn parse_length(field: &str) -> Result<usize, ProtocolError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidLength(field.to_string()));
    }
    field
        .parse()
        .map_err(|_| ProtocolError::InvalidLength(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::DEFAULT_MAX_PAYLOAD_SIZE;

    fn parse(input: &[u8]) -> (Result<Option<Frame>, ProtocolError>, BytesMut) {
        let mut buf = BytesMut::from(input);
        let result = parse_frame(&mut buf, DEFAULT_MAX_PAYLOAD_SIZE);
        (result, buf)
    }

    #[test]
    fn test_parse_subscribe() {
        let (result, rest) = parse(b"SUB weather\n");
        assert_eq!(result.unwrap(), Some(Frame::subscribe("weather")));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_publish() {
        let (result, rest) = parse(b"PUB weather 5\nhello");
        assert_eq!(result.unwrap(), Some(Frame::publish("weather", "hello")));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_publish_empty_payload() {
        let (result, _) = parse(b"PUB weather 0\n");
        assert_eq!(result.unwrap(), Some(Frame::publish("weather", "")));
    }

    #[test]
    fn test_partial_header_consumes_nothing() {
        let (result, rest) = parse(b"PUB weath");
        assert_eq!(result.unwrap(), None);
        assert_eq!(&rest[..], b"PUB weath");
    }

    #[test]
    fn test_partial_payload_consumes_nothing() {
        let (result, rest) = parse(b"PUB weather 5\nhel");
        assert_eq!(result.unwrap(), None);
        assert_eq!(&rest[..], b"PUB weather 5\nhel");
    }

    #[test]
    fn test_leaves_following_frame_in_buffer() {
        let mut buf = BytesMut::from(&b"PUB a 2\nhiPUB b 3\nyo!"[..]);

        let first = parse_frame(&mut buf, DEFAULT_MAX_PAYLOAD_SIZE).unwrap();
        assert_eq!(first, Some(Frame::publish("a", "hi")));

        let second = parse_frame(&mut buf, DEFAULT_MAX_PAYLOAD_SIZE).unwrap();
        assert_eq!(second, Some(Frame::publish("b", "yo!")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_may_contain_newlines() {
        let (result, _) = parse(b"PUB t 7\nSUB x\n\n");
        assert_eq!(result.unwrap(), Some(Frame::publish("t", "SUB x\n\n")));
    }

    #[test]
    fn test_crlf_tolerated() {
        let (result, _) = parse(b"SUB weather\r\n");
        assert_eq!(result.unwrap(), Some(Frame::subscribe("weather")));
    }

    #[test]
    fn test_missing_topic_is_empty_name() {
        let (result, _) = parse(b"SUB\n");
        assert_eq!(result.unwrap(), Some(Frame::subscribe("")));
    }

    #[test]
    fn test_unknown_command() {
        let (result, _) = parse(b"HELLO there\n");
        assert_eq!(
            result,
            Err(ProtocolError::UnknownCommand("HELLO".to_string()))
        );
    }

    #[test]
    fn test_commands_are_case_sensitive() {
        let (result, _) = parse(b"sub weather\n");
        assert!(matches!(result, Err(ProtocolError::UnknownCommand(_))));
    }

    #[test]
    fn test_extra_fields_rejected() {
        let (result, _) = parse(b"SUB a b\n");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader(_))));

        let (result, _) = parse(b"PUB a 1 2\nx");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader(_))));
    }

    #[test]
    fn test_publish_missing_length() {
        let (result, _) = parse(b"PUB weather\n");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader(_))));
    }

    #[test]
    fn test_invalid_length() {
        for input in [&b"PUB t -1\n"[..], b"PUB t +5\n", b"PUB t five\n", b"PUB t \n"] {
            let (result, _) = parse(input);
            assert!(
                matches!(result, Err(ProtocolError::InvalidLength(_))),
                "input {:?} gave {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_payload_too_large() {
        let mut buf = BytesMut::from(&b"PUB t 11\n"[..]);
        let result = parse_frame(&mut buf, 10);
        assert_eq!(
            result,
            Err(ProtocolError::PayloadTooLarge { len: 11, max: 10 })
        );
    }

    #[test]
    fn test_header_too_long_without_newline() {
        let input = vec![b'A'; MAX_HEADER_LEN + 1];
        let (result, _) = parse(&input);
        assert!(matches!(result, Err(ProtocolError::HeaderTooLong { .. })));
    }

    #[test]
    fn test_invalid_utf8() {
        let (result, _) = parse(b"SUB \xff\xfe\n");
        assert_eq!(result, Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn test_encode_matches_wire_format() {
        assert_eq!(&Frame::subscribe("weather").encode()[..], b"SUB weather\n");
        assert_eq!(
            &Frame::publish("weather", "hello").encode()[..],
            b"PUB weather 5\nhello"
        );
    }

    #[test]
    fn test_encoded_publish_parses_back() {
        let payload = Bytes::from(vec![0u8, 10, 255, 13, 10]);
        let frame = Frame::publish("bin", payload);
        let mut buf = BytesMut::from(&frame.encode()[..]);

        assert_eq!(
            parse_frame(&mut buf, DEFAULT_MAX_PAYLOAD_SIZE).unwrap(),
            Some(frame)
        );
    }
}
