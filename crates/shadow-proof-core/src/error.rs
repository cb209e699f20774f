/// Cause of a [`ClaimValidationError::MalformedInput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFault {
    SecretLength,
    RecipientLength,
    HexEncoding,
    NoteCount,
    NoteIndex,
    ArrayShape,
    ZeroAmount,
    TotalAmountExceeded,
    SelectedAmountMismatch,
    RecipientHashMismatch,
    HeaderTooLarge,
    BlockNumberMismatch,
    BlockNumberRange,
    ProofShape,
    NodeTooLarge,
    InvalidConfig,
}

impl InputFault {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SecretLength => "secret must be exactly 32 bytes",
            Self::RecipientLength => "recipient must be exactly 20 bytes",
            Self::HexEncoding => "invalid 0x-prefixed hex encoding",
            Self::NoteCount => "invalid note count",
            Self::NoteIndex => "invalid note index",
            Self::ArrayShape => "invalid input array lengths",
            Self::ZeroAmount => "active note amount must be non-zero",
            Self::TotalAmountExceeded => "total amount exceeds protocol limit",
            Self::SelectedAmountMismatch => "selected note amount does not match public amount",
            Self::RecipientHashMismatch => "selected note recipient hash mismatch",
            Self::HeaderTooLarge => "block header exceeds max byte length",
            Self::BlockNumberMismatch => "block header number does not match public block number",
            Self::BlockNumberRange => "block number does not fit in uint48",
            Self::ProofShape => "account proof depth/array shape mismatch",
            Self::NodeTooLarge => "account proof node exceeds max byte length",
            Self::InvalidConfig => "protocol config exceeds compiled capacities",
        }
    }
}

/// Cause of a [`ClaimValidationError::MalformedProof`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProofFault {
    EmptyProof,
    NodeReference,
    RlpEncoding,
    TrieNode,
    TriePath,
    MissingAccount,
    AccountEncoding,
    HeaderEncoding,
}

impl ProofFault {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyProof => "account proof has no nodes",
            Self::NodeReference => "account proof node does not match parent reference",
            Self::RlpEncoding => "invalid RLP node encoding",
            Self::TrieNode => "invalid trie node shape",
            Self::TriePath => "invalid trie path for target address",
            Self::MissingAccount => "account value missing from trie proof",
            Self::AccountEncoding => "invalid account value encoding",
            Self::HeaderEncoding => "invalid block header encoding",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimValidationError {
    MalformedInput(InputFault),
    PowNotFound,
    InvalidPowDigest,
    BlockHashMismatch,
    ProofTooDeep,
    MalformedProof(ProofFault),
    InsufficientBalance,
    PublicInputShape,
}

impl ClaimValidationError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput(fault) => fault.as_str(),
            Self::PowNotFound => "no secret satisfying the pow target within the attempt budget",
            Self::InvalidPowDigest => "pow digest does not satisfy target",
            Self::BlockHashMismatch => "block header does not hash to the expected block hash",
            Self::ProofTooDeep => "account proof exceeds max depth",
            Self::MalformedProof(fault) => fault.as_str(),
            Self::InsufficientBalance => "account balance is insufficient for note total",
            Self::PublicInputShape => "public inputs must be exactly 87 in-range elements",
        }
    }

    /// Input-shape errors are raised before any cryptographic work.
    pub const fn is_shape_error(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::PublicInputShape)
    }
}

impl From<InputFault> for ClaimValidationError {
    fn from(fault: InputFault) -> Self {
        Self::MalformedInput(fault)
    }
}

impl From<ProofFault> for ClaimValidationError {
    fn from(fault: ProofFault) -> Self {
        Self::MalformedProof(fault)
    }
}

impl core::fmt::Display for ClaimValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
