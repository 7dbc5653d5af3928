//! Scripted in-memory FTP server for driving sessions without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crossbeam::channel::Receiver;
use ftp_session_core::{ConnectionProfile, Connector, DataMode, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct Script {
    pub refuse_connect: bool,
    pub greeting_ok: bool,
    pub reject_login: bool,
    pub list_lines: Vec<String>,
    pub list_error: Option<String>,
    pub nlst_names: Vec<String>,
    pub nlst_error: Option<String>,
    pub logout_error: Option<String>,
    /// When set, logout blocks until the test sends on the other end.
    pub logout_gate: Option<Receiver<()>>,
    pub cwd_error: Option<String>,
    pub working_dir: String,
    pub files: HashMap<String, Vec<u8>>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            refuse_connect: false,
            greeting_ok: true,
            reject_login: false,
            list_lines: Vec::new(),
            list_error: None,
            nlst_names: Vec::new(),
            nlst_error: None,
            logout_error: None,
            logout_gate: None,
            cwd_error: None,
            working_dir: "/".to_string(),
            files: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockServer {
    pub script: Mutex<Script>,
    pub calls: Mutex<Vec<String>>,
}

impl MockServer {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(MockServer {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn script(&self) -> Script {
        self.script.lock().unwrap().clone()
    }
}

pub struct MockConnector {
    pub server: Arc<MockServer>,
}

impl MockConnector {
    pub fn new(server: &Arc<MockServer>) -> Arc<Self> {
        Arc::new(MockConnector {
            server: Arc::clone(server),
        })
    }
}

impl Connector for MockConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Transport>, TransportError> {
        self.server.record(format!("connect {}:{}", host, port));
        if self.server.script().refuse_connect {
            return Err(TransportError::new("Connection refused (os error 111)"));
        }
        Ok(Box::new(MockTransport {
            server: Arc::clone(&self.server),
            open: true,
        }))
    }
}

pub struct MockTransport {
    server: Arc<MockServer>,
    open: bool,
}

impl MockTransport {
    fn fail_with(message: &Option<String>) -> Result<(), TransportError> {
        match message {
            Some(m) => Err(TransportError::new(m.clone())),
            None => Ok(()),
        }
    }
}

impl Transport for MockTransport {
    fn greeting_positive(&self) -> bool {
        self.server.script().greeting_ok
    }

    fn login(&mut self, username: &str, _password: &str) -> Result<(), TransportError> {
        self.server.record(format!("login {}", username));
        if self.server.script().reject_login {
            return Err(TransportError::new("530 Login incorrect."));
        }
        Ok(())
    }

    fn set_data_mode(&mut self, mode: DataMode) {
        self.server.record(format!("mode {:?}", mode));
    }

    fn set_binary(&mut self) -> Result<(), TransportError> {
        self.server.record("type binary");
        Ok(())
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, TransportError> {
        self.server.record(format!("list {}", path));
        let script = self.server.script();
        Self::fail_with(&script.list_error)?;
        Ok(script.list_lines)
    }

    fn nlst(&mut self, path: &str) -> Result<Vec<String>, TransportError> {
        self.server.record(format!("nlst {}", path));
        let script = self.server.script();
        Self::fail_with(&script.nlst_error)?;
        Ok(script.nlst_names)
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        self.server.record(format!("cwd {}", path));
        Self::fail_with(&self.server.script().cwd_error)?;
        self.server.edit(|s| s.working_dir = path.to_string());
        Ok(())
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        self.server.record("pwd");
        Ok(self.server.script().working_dir)
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, TransportError> {
        self.server.record(format!("retr {}", path));
        self.server
            .script()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::new("550 No such file"))
    }

    fn store(&mut self, path: &str, data: &[u8]) -> Result<(), TransportError> {
        self.server.record(format!("stor {}", path));
        let data = data.to_vec();
        self.server.edit(|s| {
            s.files.insert(path.to_string(), data);
        });
        Ok(())
    }

    fn logout(&mut self) -> Result<(), TransportError> {
        self.server.record("logout");
        let script = self.server.script();
        if let Some(gate) = &script.logout_gate {
            let _ = gate.recv();
        }
        Self::fail_with(&script.logout_error)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.server.record("close");
        self.open = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

pub fn bob_profile() -> ConnectionProfile {
    ConnectionProfile::new("example", "ftp.example.com", 21, "bob", "secret")
}

pub fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}
