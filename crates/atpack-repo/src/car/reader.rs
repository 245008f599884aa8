//! CAR file reading
//!
//! The whole archive is held in memory as a [`Bytes`] buffer. Blocks are
//! yielded as zero-copy slices of it.

use std::iter::FusedIterator;
use std::path::Path;

use atpack_common::{Cid, Data, cbor, cid, varint};
use bytes::Bytes;

use crate::error::{CarError, RepoError, Result};

/// A single archive frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarBlock {
    /// Identifier the frame was stored under
    pub cid: Cid,
    /// Block contents
    pub data: Bytes,
}

impl CarBlock {
    /// Check that the block contents hash to its CID
    pub fn is_valid(&self) -> bool {
        self.cid.matches(&self.data)
    }
}

/// Reader over an in-memory CARv1 archive
///
/// Construction parses the header; [`CarReader::blocks`] then walks the frames.
#[derive(Debug, Clone)]
pub struct CarReader {
    roots: Vec<Cid>,
    buf: Bytes,
    pos: usize,
}

impl CarReader {
    /// Parse the archive header
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(len = buf.len())))]
    pub fn new(buf: Bytes) -> Result<Self> {
        let (roots, pos) = read_header(&buf)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(roots = roots.len(), header_len = pos, "read car header");

        Ok(Self { roots, buf, pos })
    }

    /// Root CIDs from the header
    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// Consume the reader and iterate over its frames
    pub fn blocks(self) -> CarBlocks {
        CarBlocks {
            buf: self.buf,
            pos: self.pos,
            done: false,
        }
    }

    /// Split into roots and the frame iterator
    pub fn into_parts(self) -> (Vec<Cid>, CarBlocks) {
        let blocks = CarBlocks {
            buf: self.buf,
            pos: self.pos,
            done: false,
        };
        (self.roots, blocks)
    }
}

/// Iterator over archive frames
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct CarBlocks {
    buf: Bytes,
    pos: usize,
    done: bool,
}

impl Iterator for CarBlocks {
    type Item = Result<CarBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.buf.len() {
            self.done = true;
            return None;
        }

        match read_block(&self.buf, self.pos) {
            Ok((block, next)) => {
                self.pos = next;
                Some(Ok(block))
            }
            Err(e) => {
                self.done = true;
                Some(Err(RepoError::from(e).with_context(format!("at offset {}", self.pos))))
            }
        }
    }
}

impl FusedIterator for CarBlocks {}

/// Read a whole CAR file and parse its header
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display())))]
pub async fn read_car_file(path: impl AsRef<Path>) -> Result<CarReader> {
    let buf = tokio::fs::read(path.as_ref())
        .await
        .map_err(|e| RepoError::io(e).with_context(path.as_ref().display().to_string()))?;
    CarReader::new(Bytes::from(buf))
}

fn read_varint(buf: &[u8], pos: usize) -> std::result::Result<(usize, usize), CarError> {
    if pos >= buf.len() {
        return Err(CarError::UnexpectedEnd);
    }
    let (value, read) = varint::decode(buf, pos)?;
    let value = usize::try_from(value).map_err(|_| CarError::UnexpectedEnd)?;
    Ok((value, pos + read))
}

fn read_header(buf: &[u8]) -> std::result::Result<(Vec<Cid>, usize), CarError> {
    let (len, start) = read_varint(buf, 0)?;
    if len == 0 {
        return Err(CarError::EmptyHeader);
    }

    let end = start.checked_add(len).ok_or(CarError::UnexpectedEnd)?;
    let raw = buf.get(start..end).ok_or(CarError::UnexpectedEnd)?;
    let header = cbor::decode(raw).map_err(CarError::HeaderDecode)?;

    if header.get("version") != Some(&Data::Integer(1)) {
        return Err(CarError::NotV1);
    }
    let roots = header
        .get("roots")
        .and_then(Data::as_array)
        .ok_or(CarError::NotV1)?
        .iter()
        .map(|root| root.as_link().cloned().ok_or(CarError::NotV1))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((roots, end))
}

fn read_block(buf: &Bytes, pos: usize) -> std::result::Result<(CarBlock, usize), CarError> {
    let (section_len, start) = read_varint(buf, pos)?;
    if section_len == 0 {
        return Err(CarError::EmptySection);
    }

    let end = start
        .checked_add(section_len)
        .filter(|end| *end <= buf.len())
        .ok_or(CarError::UnexpectedEnd)?;
    let section = &buf[start..end];

    let specs = cid::inspect(section)?;
    if specs.version != 1 {
        return Err(CarError::CidVersion(specs.version));
    }
    if specs.size > section.len() {
        return Err(CarError::SectionTooShort {
            section: section.len(),
            cid: specs.size,
        });
    }

    let cid_end = start + specs.size;
    let cid = Cid::from_bytes(buf.slice(start..cid_end))?;
    let data = buf.slice(cid_end..end);

    Ok((CarBlock { cid, data }, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::writer::write_car_bytes;
    use crate::error::RepoErrorKind;
    use atpack_common::{ErrorKind, Object};

    fn sample_car() -> (Vec<Cid>, Vec<CarBlock>, Vec<u8>) {
        let blocks: Vec<CarBlock> = [&b"first"[..], b"second", b""]
            .into_iter()
            .map(|data| CarBlock {
                cid: Cid::create_raw(data),
                data: Bytes::copy_from_slice(data),
            })
            .collect();
        let roots = vec![blocks[0].cid.clone()];
        let bytes = write_car_bytes(&roots, blocks.iter().map(|b| (&b.cid, &b.data))).unwrap();
        (roots, blocks, bytes)
    }

    fn encode_header(value: Data) -> Vec<u8> {
        let header = atpack_common::cbor::encode(&value).unwrap();
        let mut out = Vec::new();
        varint::encode(header.len() as u64, &mut out).unwrap();
        out.extend_from_slice(&header);
        out
    }

    #[test]
    fn test_read_blocks_in_order() {
        let (roots, blocks, bytes) = sample_car();
        let reader = CarReader::new(Bytes::from(bytes)).unwrap();
        assert_eq!(reader.roots(), roots.as_slice());

        let read: Vec<CarBlock> = reader.blocks().collect::<Result<_>>().unwrap();
        assert_eq!(read, blocks);
        assert!(read.iter().all(CarBlock::is_valid));
    }

    #[test]
    fn test_blocks_are_slices_of_input() {
        let (_, _, bytes) = sample_car();
        let buf = Bytes::from(bytes);
        let range = buf.as_ptr_range();

        let (_, mut blocks) = CarReader::new(buf.clone()).unwrap().into_parts();
        let first = blocks.next().unwrap().unwrap();
        assert!(range.contains(&first.data.as_ptr()));
    }

    #[test]
    fn test_header_errors() {
        let err = CarReader::new(Bytes::new()).unwrap_err();
        assert_eq!(err.category(), ErrorKind::Bounds);

        let err = CarReader::new(Bytes::from_static(&[0x00])).unwrap_err();
        assert_eq!(err.kind(), &RepoErrorKind::Car);
        assert_eq!(err.category(), ErrorKind::Format);

        // declared header length runs past the input
        let err = CarReader::new(Bytes::from_static(&[0x10, 0xa0])).unwrap_err();
        assert_eq!(err.category(), ErrorKind::Bounds);

        let v2: Object = [
            ("version", Data::from(2i64)),
            ("roots", Data::from(Vec::<Data>::new())),
        ]
        .into_iter()
        .collect();
        let err = CarReader::new(Bytes::from(encode_header(Data::Object(v2)))).unwrap_err();
        assert_eq!(err.category(), ErrorKind::Format);
        assert!(err.to_string().contains("expected a car v1 archive"));

        let bad_roots: Object = [
            ("version", Data::from(1i64)),
            ("roots", Data::from(vec![Data::from("not a link")])),
        ]
        .into_iter()
        .collect();
        let err = CarReader::new(Bytes::from(encode_header(Data::Object(bad_roots)))).unwrap_err();
        assert_eq!(err.category(), ErrorKind::Format);

        let err = CarReader::new(Bytes::from(encode_header(Data::from(1i64)))).unwrap_err();
        assert_eq!(err.category(), ErrorKind::Format);
    }

    #[test]
    fn test_empty_roots_allowed() {
        let bytes = write_car_bytes(&[], std::iter::empty::<(Cid, Bytes)>()).unwrap();
        let reader = CarReader::new(Bytes::from(bytes)).unwrap();
        assert!(reader.roots().is_empty());
        assert_eq!(reader.blocks().count(), 0);
    }

    #[test]
    fn test_truncated_final_frame() {
        let (_, _, mut bytes) = sample_car();
        bytes.pop();
        // the last block is empty, so drop a byte of its cid instead
        let reader = CarReader::new(Bytes::from(bytes)).unwrap();
        let results: Vec<_> = reader.blocks().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.category(), ErrorKind::Bounds);
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let (roots, _, _) = sample_car();
        let mut bytes = write_car_bytes(&roots, std::iter::empty::<(Cid, Bytes)>()).unwrap();
        // zero-length section followed by garbage
        bytes.extend_from_slice(&[0x00, 0x01, 0x02]);

        let mut blocks = CarReader::new(Bytes::from(bytes)).unwrap().blocks();
        let err = blocks.next().unwrap().unwrap_err();
        assert_eq!(err.category(), ErrorKind::Format);
        assert!(blocks.next().is_none());
        assert!(blocks.next().is_none());
    }

    #[test]
    fn test_section_shorter_than_cid() {
        let (roots, _, _) = sample_car();
        let mut bytes = write_car_bytes(&roots, std::iter::empty::<(Cid, Bytes)>()).unwrap();
        let cid = Cid::create_raw(b"x");
        // section claims 10 bytes, cid needs 36
        bytes.push(10);
        bytes.extend_from_slice(&cid.as_bytes()[..10]);

        let err = CarReader::new(Bytes::from(bytes))
            .unwrap()
            .blocks()
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.category(), ErrorKind::Bounds);
    }

    #[test]
    fn test_non_v1_frame_cid() {
        let (roots, _, _) = sample_car();
        let mut bytes = write_car_bytes(&roots, std::iter::empty::<(Cid, Bytes)>()).unwrap();
        // a bare sha2-256 multihash is a v0 cid
        let mut frame = vec![0x12, 0x20];
        frame.extend_from_slice(&[0u8; 32]);
        frame.extend_from_slice(b"data");
        bytes.push(frame.len() as u8);
        bytes.extend_from_slice(&frame);

        let err = CarReader::new(Bytes::from(bytes))
            .unwrap()
            .blocks()
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.category(), ErrorKind::Format);
        assert!(err.to_string().contains("expected a cidv1"));
    }

    #[tokio::test]
    async fn test_read_car_file() {
        let (roots, blocks, bytes) = sample_car();
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), &bytes).await.unwrap();

        let reader = read_car_file(temp_file.path()).await.unwrap();
        assert_eq!(reader.roots(), roots.as_slice());
        assert_eq!(reader.blocks().count(), blocks.len());

        let missing = temp_file.path().with_extension("missing");
        let err = read_car_file(&missing).await.unwrap_err();
        assert_eq!(err.kind(), &RepoErrorKind::Io);
    }
}
