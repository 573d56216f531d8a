use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{StreamExt as _, TryStreamExt as _};
use pretty_assertions::assert_eq;
use test_log::test;
use tokio::io::{AsyncReadExt as _, ReadBuf};

use super::*;

/// A reader that fails on every read.
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }
}

fn decode_all(codec: &mut EventCodec, input: &str) -> Vec<RawFrame> {
    let mut buf = BytesMut::from(input);
    let mut frames = vec![];
    while let Some(frame) = codec.decode_eof(&mut buf).unwrap() {
        frames.push(frame);
    }

    frames
}

async fn collect(input: &'static [u8], config: DecoderConfig) -> Vec<Result<String, DecodeError>> {
    decode(input, config).collect().await
}

#[test]
fn test_codec_classifies_lines() {
    let mut codec = EventCodec::default();
    let frames = decode_all(
        &mut codec,
        ": keep-alive\nevent: message\ndata: {\"a\":1}\n\ndata: [DONE]\n",
    );

    assert_eq!(frames, vec![
        RawFrame::Ignored,
        RawFrame::Ignored,
        RawFrame::Data(r#"{"a":1}"#.to_owned()),
        RawFrame::Ignored,
        RawFrame::Done,
    ]);
}

#[test]
fn test_codec_requires_exact_prefix() {
    let mut codec = EventCodec::default();
    let frames = decode_all(&mut codec, "data:{}\nDATA: {}\n data: {}\ndata: \n");

    assert_eq!(frames, vec![
        RawFrame::Ignored,
        RawFrame::Ignored,
        RawFrame::Ignored,
        RawFrame::Data(String::new()),
    ]);
}

#[test]
fn test_codec_strips_carriage_return() {
    let mut codec = EventCodec::default();
    let frames = decode_all(&mut codec, "data: hello\r\ndata: [DONE]\r\n");

    assert_eq!(frames, vec![
        RawFrame::Data("hello".to_owned()),
        RawFrame::Done
    ]);
}

#[test]
fn test_codec_sentinel_must_match_exactly() {
    let mut codec = EventCodec::default();
    let frames = decode_all(&mut codec, "data: [DONE] \ndata:  [DONE]\n");

    assert_eq!(frames, vec![
        RawFrame::Data("[DONE] ".to_owned()),
        RawFrame::Data(" [DONE]".to_owned()),
    ]);
}

#[test]
fn test_codec_waits_for_newline_across_reads() {
    let mut codec = EventCodec::default();
    let mut buf = BytesMut::from("data: hel");

    assert_eq!(codec.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"lo\ndata: wor");
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(RawFrame::Data("hello".to_owned()))
    );
    assert_eq!(codec.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"ld\n");
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(RawFrame::Data("world".to_owned()))
    );
    assert!(buf.is_empty());
}

#[test]
fn test_codec_discards_unterminated_trailing_line() {
    let mut codec = EventCodec::default();
    let frames = decode_all(&mut codec, "data: one\ndata: tw");

    assert_eq!(frames, vec![RawFrame::Data("one".to_owned())]);
}

#[test]
fn test_codec_line_length_limit() {
    // "data: 12345" is exactly 11 bytes.
    let mut codec = EventCodec::new(11);
    let mut buf = BytesMut::from("data: 12345\ndata: 123456\n");

    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(RawFrame::Data("12345".to_owned()))
    );
    assert_eq!(
        codec.decode(&mut buf).unwrap_err(),
        DecodeError::LineTooLong { limit: 11 }
    );
}

#[test]
fn test_codec_line_length_limit_without_newline() {
    let mut codec = EventCodec::new(8);
    let mut buf = BytesMut::from("data: 123");

    assert_eq!(
        codec.decode(&mut buf).unwrap_err(),
        DecodeError::LineTooLong { limit: 8 }
    );
}

#[test]
fn test_codec_rejects_invalid_utf8() {
    let mut codec = EventCodec::default();
    let mut buf = BytesMut::from(&b"data: \xff\xfe\n"[..]);

    assert!(matches!(
        codec.decode(&mut buf),
        Err(DecodeError::InvalidUtf8(_))
    ));
}

#[test(tokio::test)]
async fn test_decode_yields_payloads() {
    let input = b"data: {\"x\":1}\n: ping\n\ndata: {\"x\":2}\n";
    let payloads: Vec<String> = decode(&input[..], DecoderConfig::default())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(payloads, vec![r#"{"x":1}"#, r#"{"x":2}"#]);
}

#[test(tokio::test)]
async fn test_decode_stops_at_sentinel() {
    // Anything after the sentinel is never decoded, not even an invalid line.
    let input = b"data: {\"x\":1}\ndata: [DONE]\ndata: \xff\n";
    let results = collect(input, DecoderConfig::default()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_deref().unwrap(), r#"{"x":1}"#);
}

#[test(tokio::test)]
async fn test_decode_ends_after_first_error() {
    let input = b"data: ok\ndata: this line is far too long\ndata: never\n";
    let results = collect(input, DecoderConfig { max_line_length: 16 }).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_deref().unwrap(), "ok");
    assert_eq!(
        results[1].as_ref().unwrap_err(),
        &DecodeError::LineTooLong { limit: 16 }
    );
}

#[test(tokio::test)]
async fn test_decode_surfaces_io_errors() {
    let reader = (&b"data: first\n"[..]).chain(BrokenReader);
    let results: Vec<_> = decode(reader, DecoderConfig::default()).collect().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_deref().unwrap(), "first");
    assert!(matches!(&results[1], Err(DecodeError::Io(error)) if error.kind() == io::ErrorKind::ConnectionReset));
}

#[test(tokio::test)]
async fn test_decode_empty_source() {
    let results = collect(b"", DecoderConfig::default()).await;
    assert!(results.is_empty());
}
