//! Repository commit objects

use atpack_common::{Cid, Data, Object};
use bytes::Bytes;
use smol_str::SmolStr;

use crate::error::{RepoError, Result};

/// Repository commit object
///
/// Stored as the single root block of a repository export. Signatures are
/// carried through but not verified.
///
/// **Version compatibility**: v2 commits may omit `rev`; v3 commits always
/// carry it. `prev` is written as an explicit `null` when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Repository DID
    pub did: SmolStr,

    /// Commit version (2 or 3)
    pub version: i64,

    /// MST root CID
    pub data: Cid,

    /// Revision TID
    pub rev: Option<SmolStr>,

    /// Previous commit CID (None for initial commit)
    pub prev: Option<Cid>,

    /// Signature bytes
    pub sig: Bytes,
}

impl Commit {
    /// Read a commit from a decoded block
    pub fn from_data(value: &Data) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            RepoError::invalid_commit(format!("expected object, got {}", value.type_name()))
        })?;

        let version = field(obj, "version")?
            .as_integer()
            .ok_or_else(|| RepoError::invalid_commit("version must be an integer"))?;
        if !matches!(version, 2 | 3) {
            return Err(RepoError::invalid_commit(format!(
                "unsupported version {}",
                version
            )));
        }

        let did = field(obj, "did")?
            .as_str()
            .ok_or_else(|| RepoError::invalid_commit("did must be a string"))?;
        let data = field(obj, "data")?
            .as_link()
            .ok_or_else(|| RepoError::invalid_commit("data must be a link"))?;
        let sig = field(obj, "sig")?
            .as_bytes()
            .ok_or_else(|| RepoError::invalid_commit("sig must be bytes"))?;

        let rev = match obj.get("rev") {
            Some(Data::String(rev)) => Some(rev.clone()),
            None | Some(Data::Null) if version == 2 => None,
            _ => return Err(RepoError::invalid_commit("rev must be a string")),
        };
        let prev = match obj.get("prev") {
            Some(Data::CidLink(prev)) => Some(prev.clone()),
            None | Some(Data::Null) => None,
            _ => return Err(RepoError::invalid_commit("prev must be a link or null")),
        };

        Ok(Self {
            did: SmolStr::new(did),
            version,
            data: data.clone(),
            rev,
            prev,
            sig: sig.clone(),
        })
    }

    /// Convert back to the block representation
    pub fn to_data(&self) -> Data {
        let mut obj = Object::new();
        obj.insert("did".into(), Data::String(self.did.clone()));
        obj.insert("version".into(), Data::Integer(self.version));
        obj.insert("data".into(), Data::CidLink(self.data.clone()));
        if let Some(rev) = &self.rev {
            obj.insert("rev".into(), Data::String(rev.clone()));
        }
        obj.insert(
            "prev".into(),
            self.prev.clone().map_or(Data::Null, Data::CidLink),
        );
        obj.insert("sig".into(), Data::Bytes(self.sig.clone()));
        Data::Object(obj)
    }

    /// Get the MST root CID
    pub fn data(&self) -> &Cid {
        &self.data
    }

    /// Get the previous commit CID
    pub fn prev(&self) -> Option<&Cid> {
        self.prev.as_ref()
    }
}

fn field<'a>(obj: &'a Object, name: &str) -> Result<&'a Data> {
    obj.get(name)
        .ok_or_else(|| RepoError::invalid_commit(format!("missing field {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepoErrorKind;
    use atpack_common::cbor;

    fn sample() -> Commit {
        Commit {
            did: "did:plc:srcqou2m7uquogyd5xk4b5y5".into(),
            version: 3,
            data: Cid::create_dag_cbor(b"\xa0"),
            rev: Some("3l5q5fjentc2d".into()),
            prev: None,
            sig: Bytes::from_static(&[7; 64]),
        }
    }

    #[test]
    fn test_round_trip_through_cbor() {
        let commit = sample();
        let bytes = cbor::encode(&commit.to_data()).unwrap();
        let decoded = Commit::from_data(&cbor::decode(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn test_prev_is_explicit_null() {
        let data = sample().to_data();
        assert_eq!(data.get("prev"), Some(&Data::Null));
    }

    #[test]
    fn test_v2_without_rev() {
        let mut commit = sample();
        commit.version = 2;
        commit.rev = None;
        let decoded = Commit::from_data(&commit.to_data()).unwrap();
        assert_eq!(decoded.rev, None);

        // v3 needs a rev
        commit.version = 3;
        let err = Commit::from_data(&commit.to_data()).unwrap_err();
        assert_eq!(err.kind(), &RepoErrorKind::InvalidCommit);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let mut commit = sample();
        commit.version = 4;
        assert!(Commit::from_data(&commit.to_data()).is_err());

        assert!(Commit::from_data(&Data::from("commit")).is_err());

        let Data::Object(mut obj) = sample().to_data() else {
            unreachable!()
        };
        obj.insert("data".into(), Data::from("bafy"));
        let err = Commit::from_data(&Data::Object(obj)).unwrap_err();
        assert!(err.to_string().contains("data must be a link"));
    }
}
