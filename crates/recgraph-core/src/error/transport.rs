use super::Error;

/// Error raised by, or on behalf of, the transport.
#[derive(Debug)]
pub(super) struct TransportError {
    status: Option<u16>,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("transport failed: ")?;
        core::fmt::Display::fmt(&self.inner, f)?;
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Creates an error from a transport-level failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Transport(TransportError {
            status: None,
            inner: Box::new(err),
        }))
    }

    /// Creates an error for a response whose status was not expected by the caller.
    pub fn transport_status(status: u16, url: &str) -> Error {
        let message = format!("unexpected status {status} for {url}");
        Error::from(super::ErrorKind::Transport(TransportError {
            status: Some(status),
            inner: message.into(),
        }))
    }

    /// Returns `true` if this error is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Transport(_))
    }

    /// The HTTP status attached to a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self.kind() {
            super::ErrorKind::Transport(err) => err.status,
            _ => None,
        }
    }
}
