use thiserror::Error;

/// Why a datagram could not be decoded into a message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram too short: {len} bytes, prefix needs {min}")]
    TooShort { len: usize, min: usize },

    #[error("unknown message kind: {0}")]
    UnknownKind(u32),

    #[error("size mismatch for kind {kind}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        kind: u32,
        expected: usize,
        actual: usize,
    },
}

/// Step of transport initialization that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    SocketCreate,
    SetBroadcast,
    ResolveAddress,
    ReceiveTimeout,
    Bind,
}

impl InitStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SocketCreate => "socket-create",
            Self::SetBroadcast => "set-broadcast-option",
            Self::ResolveAddress => "resolve-address",
            Self::ReceiveTimeout => "set-receive-timeout",
            Self::Bind => "bind",
        }
    }
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// Fatal: the node cannot run without a working transport.
    #[error("transport init failed at {stage}: {source}")]
    Init {
        stage: InitStage,
        #[source]
        source: std::io::Error,
    },

    /// Non-fatal: logged by the send loop, which carries on.
    #[error("broadcast send failed: {0}")]
    Send(#[source] std::io::Error),
}

impl TransportError {
    pub fn init(stage: InitStage, source: std::io::Error) -> Self {
        Self::Init { stage, source }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init { .. })
    }
}

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BeaconResult<T> = Result<T, BeaconError>;
