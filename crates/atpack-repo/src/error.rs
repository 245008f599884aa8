//! Error types for archive and repository operations

use std::error::Error;
use std::fmt;

use atpack_common::{
    Cid, ErrorKind,
    cbor::{DecodeError, EncodeError},
    cid::CidError,
    varint::VarintError,
};

/// Boxed error type for error sources
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

/// Repository operation error with rich diagnostics
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct RepoError {
    kind: RepoErrorKind,
    category: ErrorKind,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<String>,
    context: Option<String>,
}

/// Error categories for repository operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    /// CAR archive framing or header is malformed
    Car,
    /// Commit block does not have the commit shape
    InvalidCommit,
    /// Invalid MST structure
    InvalidMst,
    /// A referenced block is not in the archive
    NotFound,
    /// A block could not be encoded or decoded
    Codec,
    /// I/O error
    Io,
}

impl RepoError {
    /// Create a new error with the given kind, taxonomy category and optional source
    pub fn new(kind: RepoErrorKind, category: ErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            category,
            source,
            help: None,
            context: None,
        }
    }

    /// Add a help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add context information to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> &RepoErrorKind {
        &self.kind
    }

    /// Where this error falls in the shared codec taxonomy
    pub fn category(&self) -> ErrorKind {
        self.category
    }

    // Constructors for different error kinds

    /// Create a CAR archive error
    pub fn car(source: CarError) -> Self {
        let category = source.kind();
        Self::new(RepoErrorKind::Car, category, Some(Box::new(source)))
    }

    /// Create an invalid MST error
    pub fn invalid_mst(msg: impl Into<String>) -> Self {
        Self::new(
            RepoErrorKind::InvalidMst,
            ErrorKind::Integrity,
            Some(msg.into().into()),
        )
        .with_help("MST nodes must follow protocol structure")
    }

    /// Create an invalid commit error
    pub fn invalid_commit(msg: impl Into<String>) -> Self {
        Self::new(
            RepoErrorKind::InvalidCommit,
            ErrorKind::Integrity,
            Some(msg.into().into()),
        )
    }

    /// Create a not found error
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(RepoErrorKind::NotFound, ErrorKind::Integrity, None)
            .with_context(format!("{} not found: {}", resource, id))
    }

    /// Create a block decoding error
    pub fn decode(source: DecodeError) -> Self {
        let category = source.kind();
        Self::new(RepoErrorKind::Codec, category, Some(Box::new(source)))
    }

    /// Create a block encoding error
    pub fn encode(source: EncodeError) -> Self {
        let category = source.kind();
        Self::new(RepoErrorKind::Codec, category, Some(Box::new(source)))
    }

    /// Create an I/O error
    pub fn io(source: std::io::Error) -> Self {
        Self::new(RepoErrorKind::Io, ErrorKind::Bounds, Some(Box::new(source)))
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;

        if let Some(ctx) = &self.context {
            write!(f, ": {}", ctx)?;
        }

        if let Some(src) = &self.source {
            write!(f, ": {}", src)?;
        }

        Ok(())
    }
}

impl From<DecodeError> for RepoError {
    fn from(e: DecodeError) -> Self {
        RepoError::decode(e)
    }
}

impl From<EncodeError> for RepoError {
    fn from(e: EncodeError) -> Self {
        RepoError::encode(e)
    }
}

// Internal granular errors

/// CAR archive errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CarError {
    /// Header length prefix is zero
    #[error("invalid car header; length=0")]
    #[diagnostic(code(car::empty_header))]
    EmptyHeader,

    /// Header block is not valid DAG-CBOR
    #[error("car header is not valid dag-cbor")]
    #[diagnostic(code(car::header_decode))]
    HeaderDecode(#[source] DecodeError),

    /// Header does not describe a version 1 archive
    #[error("expected a car v1 archive")]
    #[diagnostic(
        code(car::not_v1),
        help("the header must be a map of {{version: 1, roots: [cid, ...]}}")
    )]
    NotV1,

    /// A frame length prefix is zero
    #[error("invalid car section; length=0")]
    #[diagnostic(code(car::empty_section))]
    EmptySection,

    /// A frame's CID is not version 1
    #[error("expected a cidv1; got version {0}")]
    #[diagnostic(code(car::cid_version))]
    CidVersion(u64),

    /// A frame's CID could not be read
    #[error("invalid cid in car section")]
    #[diagnostic(code(car::invalid_cid))]
    Cid(#[from] CidError),

    /// A frame is shorter than the CID it declares
    #[error("car section of {section} bytes cannot hold a {cid} byte cid")]
    #[diagnostic(code(car::section_too_short))]
    SectionTooShort {
        /// Declared section length
        section: usize,
        /// Length of the CID at the start of the section
        cid: usize,
    },

    /// A length prefix could not be read
    #[error("invalid length prefix")]
    #[diagnostic(code(car::varint))]
    Varint(#[from] VarintError),

    /// Input ends inside a header or frame
    #[error("unexpected end of data")]
    #[diagnostic(code(car::unexpected_end))]
    UnexpectedEnd,
}

impl CarError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CarError::EmptyHeader
            | CarError::NotV1
            | CarError::EmptySection
            | CarError::CidVersion(_) => ErrorKind::Format,
            CarError::HeaderDecode(e) => e.kind(),
            CarError::Cid(e) => e.kind(),
            CarError::Varint(e) => e.kind(),
            CarError::SectionTooShort { .. } | CarError::UnexpectedEnd => ErrorKind::Bounds,
        }
    }
}

impl From<CarError> for RepoError {
    fn from(e: CarError) -> Self {
        RepoError::car(e)
    }
}

/// Repository walk errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum WalkError {
    /// Archive does not have exactly one root
    #[error("expected only 1 root in the car archive; got={0}")]
    #[diagnostic(
        code(repo::root_count),
        help("a repository export has a single root pointing at its commit")
    )]
    RootCount(usize),

    /// A linked block is not in the archive
    #[error("cid not found in blockmap; cid={0}")]
    #[diagnostic(code(repo::missing_block))]
    MissingBlock(Cid),

    /// Node does not have the `{l, e}` shape
    #[error("malformed mst node: {0}")]
    #[diagnostic(code(repo::malformed_node))]
    MalformedNode(String),

    /// Entry prefix reaches past the previous key
    #[error("entry prefix {prefix} is longer than previous key ({previous} bytes)")]
    #[diagnostic(code(repo::prefix_too_long))]
    PrefixTooLong {
        /// Declared shared prefix length
        prefix: usize,
        /// Length of the key it is relative to
        previous: usize,
    },

    /// Reconstructed key is not UTF-8
    #[error("mst key is not valid utf-8")]
    #[diagnostic(code(repo::key_not_utf8))]
    KeyNotUtf8,

    /// Key has no collection separator
    #[error("mst key {0:?} is not of the form collection/rkey")]
    #[diagnostic(code(repo::invalid_key))]
    InvalidKey(String),

    /// A node links back to one already visited
    #[error("mst node {0} is reachable more than once")]
    #[diagnostic(code(repo::cycle))]
    RevisitedNode(Cid),
}

impl From<WalkError> for RepoError {
    fn from(e: WalkError) -> Self {
        match &e {
            WalkError::RootCount(_) => {
                RepoError::new(RepoErrorKind::Car, ErrorKind::Integrity, Some(Box::new(e)))
            }
            WalkError::MissingBlock(_) => {
                RepoError::new(RepoErrorKind::NotFound, ErrorKind::Integrity, Some(Box::new(e)))
            }
            WalkError::MalformedNode(_)
            | WalkError::PrefixTooLong { .. }
            | WalkError::KeyNotUtf8
            | WalkError::InvalidKey(_)
            | WalkError::RevisitedNode(_) => {
                RepoError::new(RepoErrorKind::InvalidMst, ErrorKind::Integrity, Some(Box::new(e)))
                    .with_help("MST nodes must follow protocol structure")
            }
        }
    }
}
