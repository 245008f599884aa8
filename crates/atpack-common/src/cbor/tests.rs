use bytes::Bytes;
use serde_json::json;

use super::*;
use crate::{Cid, Data, ErrorKind, Object, error::MAX_SAFE_INTEGER};

const LINK: &str = "bafyreihffx5a2e7k5uwrmmgofbvzujc5cmw5h4espouwuxt3liqoflx3ee";

fn obj<const N: usize>(entries: [(&str, Data); N]) -> Data {
    Data::Object(entries.into_iter().collect::<Object>())
}

#[test]
fn test_canonical_key_order() {
    let value = obj([("bb", Data::from(1i64)), ("a", Data::from(2i64))]);
    let encoded = encode(&value).unwrap();
    assert_eq!(encoded, [0xa2, 0x61, 0x61, 0x02, 0x62, 0x62, 0x62, 0x01]);

    // length beats lexicographic order
    let value = obj([
        ("zz", Data::Null),
        ("aaa", Data::Null),
        ("b", Data::Null),
    ]);
    let encoded = encode(&value).unwrap();
    assert_eq!(
        encoded,
        [
            0xa3, 0x61, b'b', 0xf6, 0x62, b'z', b'z', 0xf6, 0x63, b'a', b'a', b'a', 0xf6
        ]
    );
}

#[test]
fn test_shortest_integer_form() {
    let cases: &[(i64, &[u8])] = &[
        (0, &[0x00]),
        (23, &[0x17]),
        (24, &[0x18, 0x18]),
        (255, &[0x18, 0xff]),
        (256, &[0x19, 0x01, 0x00]),
        (65536, &[0x1a, 0x00, 0x01, 0x00, 0x00]),
        (4294967296, &[0x1b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]),
        (-1, &[0x20]),
        (-24, &[0x37]),
        (-25, &[0x38, 0x18]),
        (-500, &[0x39, 0x01, 0xf3]),
    ];
    for (n, expected) in cases {
        assert_eq!(encode(&Data::Integer(*n)).unwrap(), *expected, "{n}");
        assert_eq!(decode(expected).unwrap(), Data::Integer(*n));
    }
}

#[test]
fn test_floats() {
    let encoded = encode(&Data::Float(1.5)).unwrap();
    assert_eq!(encoded, [0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);
    assert_eq!(decode(&encoded).unwrap(), Data::Float(1.5));

    // integral floats take the integer form
    assert_eq!(encode(&Data::Float(3.0)).unwrap(), [0x03]);
    assert_eq!(encode(&Data::Float(-0.0)).unwrap(), [0x00]);

    // half and single precision are accepted on input
    assert_eq!(decode(&[0xf9, 0x3e, 0x00]).unwrap(), Data::Float(1.5));
    assert_eq!(
        decode(&[0xfa, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
        Data::Float(1.5)
    );

    assert_eq!(encode(&Data::Float(f64::NAN)), Err(EncodeError::NaN));
    let err = encode(&Data::Float(f64::INFINITY)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

#[test]
fn test_round_trip() {
    let value = Data::from_json(json!({
        "key": "value",
        "link": {"$link": LINK},
        "bytes": {"$bytes": "bG9yZW0gaXBzdW0gc2l0IGRvbG9yIGFtZXQ"},
        "answer": 42,
        "correct": true,
        "wrong": false,
        "blank": null,
        "ratio": 0.25,
        "negative": -9000,
        "nested": {"hello": "world"},
        "bee": [
            "According to all known laws of aviation, there is no way that a bee should be able to fly.",
            "Its wings are too small to get its fat little body off the ground.",
            "The bee, of course, flies anyway.",
            "Because bees don't care what humans think is impossible.",
        ],
    }))
    .unwrap();

    let encoded = encode(&value).unwrap();
    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded.get("link").and_then(Data::link_str).as_deref(), Some(LINK));
    assert_eq!(
        decoded.get("bytes").and_then(Data::as_bytes),
        Some(&Bytes::from_static(b"lorem ipsum sit dolor amet"))
    );
}

#[test]
fn test_undefined_is_omitted() {
    let value = obj([("kept", Data::from(1i64)), ("empty", Data::Undefined)]);
    let decoded = decode(&encode(&value).unwrap()).unwrap();
    let decoded = decoded.as_object().unwrap();
    assert_eq!(decoded.len(), 1);
    assert!(!decoded.contains_key("empty"));

    assert_eq!(encode(&Data::Undefined), Err(EncodeError::Undefined));
    let arr = Data::from(vec![Data::Undefined]);
    assert_eq!(encode(&arr), Err(EncodeError::Undefined));
}

#[test]
fn test_post_record_cid() {
    let record = Data::from_json(json!({
        "$type": "app.bsky.feed.post",
        "createdAt": "2024-08-13T01:16:06.453Z",
        "embed": {
            "$type": "app.bsky.embed.images",
            "images": [
                {
                    "alt": "a photoshopped picture of kit with a microphone. kit is saying \"meow\"",
                    "aspectRatio": {"height": 885, "width": 665},
                    "image": {
                        "$type": "blob",
                        "ref": {"$link": "bafkreic6hvmy3ymbo25wxsvylu77r57uwhtnviu7vmhfsns3ab4xfal5ou"},
                        "mimeType": "image/jpeg",
                        "size": 645553,
                    },
                },
            ],
        },
        "langs": ["en"],
        "text": "exclusively on bluesky",
    }))
    .unwrap();

    let cid = cid_for(&record).unwrap();
    assert_eq!(
        cid.to_string(),
        "bafyreicbb3p4hmtm7iw3k7kiydzqp7qhufq3jdc5sbc4gxa4mxqd6bywba"
    );
}

#[test]
fn test_decode_first_concatenated() {
    let mut buf = encode(&obj([("foo", Data::Boolean(true))])).unwrap();
    encode_into(&obj([("bar", Data::Boolean(false))]), &mut buf).unwrap();

    let (first, rest) = decode_first(&buf).unwrap();
    assert_eq!(first.get("foo"), Some(&Data::Boolean(true)));
    let (second, rest) = decode_first(rest).unwrap();
    assert_eq!(second.get("bar"), Some(&Data::Boolean(false)));
    assert!(rest.is_empty());

    assert_eq!(decode(&buf), Err(DecodeError::TrailingBytes(6)));
}

#[test]
fn test_cid_link_encoding() {
    let cid = Cid::parse(LINK).unwrap();
    let encoded = encode(&Data::CidLink(cid.clone())).unwrap();
    assert_eq!(&encoded[..4], &[0xd8, 0x2a, 0x58, 0x25]);
    assert_eq!(encoded[4], 0x00);
    assert_eq!(&encoded[5..], cid.as_bytes());
    assert_eq!(decode(&encoded).unwrap(), Data::CidLink(cid));
}

#[test]
fn test_unsafe_integers() {
    let max = MAX_SAFE_INTEGER as i64;
    assert!(encode(&Data::Integer(max)).is_ok());
    assert!(encode(&Data::Integer(-max)).is_ok());
    assert_eq!(
        encode(&Data::Integer(max + 1)),
        Err(EncodeError::UnsafeInteger(max + 1))
    );
    assert_eq!(
        encode(&Data::Integer(i64::MIN)),
        Err(EncodeError::UnsafeInteger(i64::MIN))
    );

    // 2^53 as a major type 0 argument
    let too_big = [0x1b, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(decode(&too_big), Err(DecodeError::UnsafeInteger));
    // -(2^53) as a major type 1 argument
    let too_small = [0x3b, 0x00, 0x1f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    assert_eq!(decode(&too_small), Err(DecodeError::UnsafeInteger));
    // -(2^53 - 1) is fine
    let smallest = [0x3b, 0x00, 0x1f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe];
    assert_eq!(decode(&smallest), Ok(Data::Integer(-max)));
}

#[test]
fn test_decode_errors() {
    let cases: &[(&[u8], DecodeError, ErrorKind)] = &[
        (&[], DecodeError::UnexpectedEnd, ErrorKind::Bounds),
        (&[0x62, b'a'], DecodeError::UnexpectedEnd, ErrorKind::Bounds),
        (&[0x9a, 0xff, 0xff, 0xff, 0xff], DecodeError::UnexpectedEnd, ErrorKind::Bounds),
        (&[0x9f, 0xff], DecodeError::InvalidArgument(31), ErrorKind::Format),
        (&[0xa1, 0x01, 0x02], DecodeError::NonStringKey(0), ErrorKind::Integrity),
        (&[0x62, 0xc3, 0x28], DecodeError::InvalidUtf8, ErrorKind::Format),
        (&[0xc1, 0x00], DecodeError::UnsupportedTag(1), ErrorKind::Type),
        (&[0xd8, 0x2a, 0x61, b'x'], DecodeError::CidLinkNotBytes(3), ErrorKind::Type),
        (&[0xd8, 0x2a, 0x41, 0x01], DecodeError::CidLinkPrefix, ErrorKind::Format),
        (&[0xf7], DecodeError::UnsupportedSimple(23), ErrorKind::Type),
    ];
    for (input, expected, kind) in cases {
        let err = decode(input).unwrap_err();
        assert_eq!(&err, expected, "{input:02x?}");
        assert_eq!(err.kind(), *kind, "{input:02x?}");
    }
}

#[test]
fn test_depth_limit() {
    let mut nested = vec![0x81; MAX_DEPTH];
    nested.push(0xf6);
    assert!(decode(&nested).is_ok());

    let mut too_deep = vec![0x81; MAX_DEPTH + 1];
    too_deep.push(0xf6);
    assert_eq!(decode(&too_deep), Err(DecodeError::TooDeep));
}
