//! Subcommand implementations, writing to any output stream

use std::io::Write;

use atpack_common::{Cid, Data, cbor, cid};
use atpack_repo::RepoEntries;
use miette::{IntoDiagnostic, Result};

use crate::cli::Codec;

/// One `collection/rkey cid` line per record
pub fn ls(entries: RepoEntries, out: &mut impl Write) -> Result<usize> {
    let mut count = 0;
    for entry in entries {
        let entry = entry?;
        writeln!(out, "{} {}", entry.key(), entry.cid()).into_diagnostic()?;
        count += 1;
    }
    Ok(count)
}

/// One JSON object per record: `{collection, rkey, cid, record}`
pub fn dump(entries: RepoEntries, out: &mut impl Write) -> Result<usize> {
    let mut count = 0;
    for entry in entries {
        let entry = entry?;
        let line = serde_json::json!({
            "collection": entry.collection(),
            "rkey": entry.rkey(),
            "cid": entry.cid().to_string(),
            "record": entry.record()?.to_json()?,
        });
        serde_json::to_writer(&mut *out, &line).into_diagnostic()?;
        writeln!(out).into_diagnostic()?;
        count += 1;
    }
    Ok(count)
}

/// CID of raw file contents, or of a JSON document's canonical encoding
pub fn cid_of(contents: &[u8], codec: Codec, json: bool) -> Result<Cid> {
    if json {
        let value = Data::from_json_slice(contents)?;
        return Ok(cbor::cid_for(&value)?);
    }
    Ok(Cid::create(codec.code(), contents)?)
}

fn codec_name(code: u64) -> &'static str {
    match code {
        cid::DAG_CBOR => "dag-cbor",
        cid::DAG_PB => "dag-pb",
        cid::RAW => "raw",
        _ => "unknown",
    }
}

/// Human-readable breakdown of a CID string
pub fn inspect(s: &str, out: &mut impl Write) -> Result<()> {
    let parsed = Cid::parse(s)?;
    let parts = cid::inspect(parsed.as_bytes())?;
    let hash = match parts.multihash_code {
        cid::SHA2_256 => "sha2-256",
        _ => "unknown",
    };

    writeln!(out, "version: {}", parts.version).into_diagnostic()?;
    writeln!(out, "codec: {} (0x{:x})", codec_name(parts.codec), parts.codec).into_diagnostic()?;
    writeln!(out, "hash: {} (0x{:x})", hash, parts.multihash_code).into_diagnostic()?;
    writeln!(out, "digest size: {}", parts.digest_size).into_diagnostic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atpack_repo::iterate_atp_repo;
    use base64::{Engine, prelude::BASE64_STANDARD};
    use bytes::Bytes;

    fn fixture() -> RepoEntries {
        let b64 = include_str!("../../atpack-repo/tests/fixtures/two_records.car.b64");
        let buf = Bytes::from(BASE64_STANDARD.decode(b64.trim()).unwrap());
        iterate_atp_repo(buf).unwrap()
    }

    #[test]
    fn test_ls() {
        let mut out = Vec::new();
        assert_eq!(ls(fixture(), &mut out).unwrap(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "app.bsky.actor.profile/self bafyreihkdpfd6d36zlpbsxmfatgenl37kl6j73l7l27h6xqh2zoyffrk5i\n\
             app.bsky.feed.post/3km5ymk4hhk2z bafyreihd7ict3u3s64lxak2yfa7gtzazmbeizxukbddkdw2w63id3g6enq\n"
        );
    }

    #[test]
    fn test_dump_lines_parse() {
        let mut out = Vec::new();
        dump(fixture(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["collection"], "app.bsky.actor.profile");
        assert_eq!(lines[0]["record"]["description"], "testing account");
        assert_eq!(lines[1]["rkey"], "3km5ymk4hhk2z");
        assert_eq!(lines[1]["record"]["text"], "beep boop @mary.my.id");
    }

    #[test]
    fn test_cid_of_json_matches_record() {
        let json = br#"{
            "$type": "app.bsky.actor.profile",
            "createdAt": "2024-02-24T12:15:41.219Z",
            "description": "testing account",
            "displayName": ""
        }"#;
        let cid = cid_of(json, Codec::Raw, true).unwrap();
        assert_eq!(
            cid.to_string(),
            "bafyreihkdpfd6d36zlpbsxmfatgenl37kl6j73l7l27h6xqh2zoyffrk5i"
        );
    }

    #[test]
    fn test_cid_of_raw_bytes() {
        let id = cid_of(b"abc", Codec::Raw, false).unwrap();
        assert_eq!(id.codec(), cid::RAW);
        assert_eq!(id, Cid::create_raw(b"abc"));

        let id = cid_of(b"abc", Codec::DagCbor, false).unwrap();
        assert_eq!(id.codec(), cid::DAG_CBOR);
    }

    #[test]
    fn test_cid_of_invalid_json() {
        assert!(cid_of(b"{not json", Codec::DagCbor, true).is_err());
    }

    #[test]
    fn test_inspect() {
        let mut out = Vec::new();
        inspect(
            "bafyreihkdpfd6d36zlpbsxmfatgenl37kl6j73l7l27h6xqh2zoyffrk5i",
            &mut out,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "version: 1\ncodec: dag-cbor (0x71)\nhash: sha2-256 (0x12)\ndigest size: 32\n"
        );
    }

    #[test]
    fn test_inspect_rejects_other_bases() {
        let mut out = Vec::new();
        assert!(inspect("zdj7WWeQ43G6JJvLWQWZpyHuAMq6uYWRjkBXFad11vE2LHhQ7", &mut out).is_err());
        assert!(out.is_empty());
    }
}
