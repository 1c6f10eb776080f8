use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,

    // Cache Errors
    #[error("Cache miss")]
    CacheMiss,

    // Pool and body errors (crate-specific codes from -10000)
    #[error("Client pool closed")]
    PoolClosed,
    #[error("Client pool capacity must be between 1 and the semaphore permit limit")]
    InvalidPoolCapacity,
    #[error("Transport client construction failed")]
    TransportConstruction,
    #[error("HTTP body error")]
    HttpBodyError,
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("JSON parse error")]
    JsonParseError,
    #[error("Invalid header name or value")]
    InvalidHeader,

    #[error("Unknown error ({0})")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::AddressInvalid => -108,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::EmptyResponse => -324,
            NetError::InvalidHttpResponse => -370,

            NetError::CacheMiss => -400,

            NetError::PoolClosed => -10000,
            NetError::InvalidPoolCapacity => -10001,
            NetError::TransportConstruction => -10002,
            NetError::HttpBodyError => -10003,
            NetError::InvalidUtf8 => -10004,
            NetError::JsonParseError => -10005,
            NetError::InvalidHeader => -10006,
            NetError::Unknown(code) => *code,
        }
    }

    /// Whether the error happened while talking to the network, as opposed
    /// to a local misuse (bad URL, bad header) or a pool condition.
    pub fn is_network_error(&self) -> bool {
        (-199..=-100).contains(&self.as_i32())
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -107 => NetError::SslProtocolError,
            -108 => NetError::AddressInvalid,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,

            -300 => NetError::InvalidUrl,
            -302 => NetError::UnknownUrlScheme,
            -324 => NetError::EmptyResponse,
            -370 => NetError::InvalidHttpResponse,

            -400 => NetError::CacheMiss,

            -10000 => NetError::PoolClosed,
            -10001 => NetError::InvalidPoolCapacity,
            -10002 => NetError::TransportConstruction,
            -10003 => NetError::HttpBodyError,
            -10004 => NetError::InvalidUtf8,
            -10005 => NetError::JsonParseError,
            -10006 => NetError::InvalidHeader,
            _ => NetError::Unknown(code),
        }
    }
}

