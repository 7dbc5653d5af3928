//! Protocol engine port.
//!
//! [`FtpSession`](crate::session::FtpSession) drives the control connection
//! through [`Transport`] and opens new ones through [`Connector`]. The
//! production implementation wraps `suppaftp::FtpStream`.

use std::net::ToSocketAddrs;
use std::time::Duration;

use log::debug;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use crate::error::TransportError;

/// Data-channel negotiation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Passive,
    Active,
}

impl DataMode {
    pub fn from_passive(passive: bool) -> Self {
        if passive {
            DataMode::Passive
        } else {
            DataMode::Active
        }
    }
}

/// One open control connection.
pub trait Transport: Send {
    /// Whether the server's opening reply was a positive completion.
    fn greeting_positive(&self) -> bool;
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError>;
    fn set_data_mode(&mut self, mode: DataMode);
    fn set_binary(&mut self) -> Result<(), TransportError>;
    /// Raw LIST lines.
    fn list(&mut self, path: &str) -> Result<Vec<String>, TransportError>;
    /// Raw NLST names.
    fn nlst(&mut self, path: &str) -> Result<Vec<String>, TransportError>;
    fn cwd(&mut self, path: &str) -> Result<(), TransportError>;
    fn pwd(&mut self) -> Result<String, TransportError>;
    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, TransportError>;
    fn store(&mut self, path: &str, data: &[u8]) -> Result<(), TransportError>;
    fn logout(&mut self) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    fn is_connected(&self) -> bool;
}

/// Opens transports. Shared by every session a registry creates.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Transport>, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct SuppaConnector {
    connect_timeout: Option<Duration>,
}

impl SuppaConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        SuppaConnector {
            connect_timeout: Some(timeout),
        }
    }
}

impl Connector for SuppaConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Transport>, TransportError> {
        let stream = match self.connect_timeout {
            Some(timeout) => {
                let addr = (host, port)
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| TransportError::new(format!("cannot resolve {}:{}", host, port)))?;
                FtpStream::connect_timeout(addr, timeout)?
            }
            None => FtpStream::connect((host, port))?,
        };

        if let Some(welcome) = stream.get_welcome_msg() {
            debug!("Server greeting from {}:{}: {}", host, port, welcome.trim_end());
        }

        Ok(Box::new(SuppaTransport { stream, open: true }))
    }
}

/// `suppaftp` control connection.
pub struct SuppaTransport {
    stream: FtpStream,
    open: bool,
}

impl Transport for SuppaTransport {
    fn greeting_positive(&self) -> bool {
        // FtpStream::connect already rejects anything but a 220 greeting.
        self.open
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        Ok(self.stream.login(username, password)?)
    }

    fn set_data_mode(&mut self, mode: DataMode) {
        let mode = match mode {
            DataMode::Passive => Mode::Passive,
            DataMode::Active => Mode::Active,
        };
        self.stream.set_mode(mode);
    }

    fn set_binary(&mut self) -> Result<(), TransportError> {
        Ok(self.stream.transfer_type(FileType::Binary)?)
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, TransportError> {
        Ok(self.stream.list(Some(path))?)
    }

    fn nlst(&mut self, path: &str) -> Result<Vec<String>, TransportError> {
        Ok(self.stream.nlst(Some(path))?)
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        Ok(self.stream.cwd(path)?)
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        Ok(self.stream.pwd()?)
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, TransportError> {
        Ok(self.stream.retr_as_buffer(path)?.into_inner())
    }

    fn store(&mut self, path: &str, data: &[u8]) -> Result<(), TransportError> {
        let mut reader = data;
        self.stream.put_file(path, &mut reader)?;
        Ok(())
    }

    fn logout(&mut self) -> Result<(), TransportError> {
        let result = self.stream.quit();
        self.open = false;
        Ok(result?)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // The socket itself is released when the stream is dropped.
        self.open = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}
