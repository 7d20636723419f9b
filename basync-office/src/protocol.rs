//! Newline-delimited JSON bridge to the office process.
//!
//! Each request is one JSON object tagged by `op`; each response is one
//! `{ "ok": bool, "data": ..., "error": ... }` object. A session starts with
//! `bind`, naming the container service it talks to.
//!
//! [`Session`] is the client half and implements [`LibraryContainer`].
//! [`dispatch`] and [`serve_connection`] are the server half, for exposing any
//! container on a socket.
//!
//! The office process does not speak this protocol itself; something on the
//! office side has to run the server half. A peer that accepts the
//! connection but never replies fails the call after [`READ_TIMEOUT`].

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use basync_core::{Endpoint, LibraryContainer, LibraryName, ModuleName, StoreError};

use crate::endpoint::{socket_address, SCRIPT_LIBRARY_CONTAINER};
use crate::error::{io_err, OfficeError};

/// How long a call waits for its response line.
pub const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// JSON newline-delimited request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    Bind {
        service: String,
    },
    HasLibrary {
        library: LibraryName,
    },
    CreateLibrary {
        library: LibraryName,
    },
    LoadLibrary {
        library: LibraryName,
    },
    ElementNames {
        library: LibraryName,
    },
    GetModule {
        library: LibraryName,
        module: ModuleName,
    },
    InsertModule {
        library: LibraryName,
        module: ModuleName,
        source: String,
    },
    ReplaceModule {
        library: LibraryName,
        module: ModuleName,
        source: String,
    },
    RemoveModule {
        library: LibraryName,
        module: ModuleName,
    },
    IsModified,
    StoreLibraries,
    InvokeScript {
        uri: String,
    },
}

impl BridgeRequest {
    pub fn op(&self) -> &'static str {
        match self {
            BridgeRequest::Bind { .. } => "bind",
            BridgeRequest::HasLibrary { .. } => "has_library",
            BridgeRequest::CreateLibrary { .. } => "create_library",
            BridgeRequest::LoadLibrary { .. } => "load_library",
            BridgeRequest::ElementNames { .. } => "element_names",
            BridgeRequest::GetModule { .. } => "get_module",
            BridgeRequest::InsertModule { .. } => "insert_module",
            BridgeRequest::ReplaceModule { .. } => "replace_module",
            BridgeRequest::RemoveModule { .. } => "remove_module",
            BridgeRequest::IsModified => "is_modified",
            BridgeRequest::StoreLibraries => "store_libraries",
            BridgeRequest::InvokeScript { .. } => "invoke_script",
        }
    }
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connected bridge session.
#[derive(Debug)]
pub struct Session {
    endpoint: String,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Session {
    /// Connect to `endpoint`. A refused connection is [`OfficeError::NoListener`].
    pub fn open(endpoint: &Endpoint) -> Result<Self, OfficeError> {
        let label = endpoint.to_string();
        let stream = TcpStream::connect(socket_address(endpoint)).map_err(|err| {
            if matches!(
                err.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::AddrNotAvailable
            ) {
                OfficeError::NoListener {
                    endpoint: label.clone(),
                }
            } else {
                io_err(&label, err)
            }
        })?;
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|e| io_err(&label, e))?;
        let writer = stream.try_clone().map_err(|e| io_err(&label, e))?;
        Ok(Self {
            endpoint: label,
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Open and bind in one step.
    pub fn connect(endpoint: &Endpoint, service: &str) -> Result<Self, OfficeError> {
        let mut session = Self::open(endpoint)?;
        session.bind(service)?;
        Ok(session)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Replace the default [`READ_TIMEOUT`].
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), OfficeError> {
        self.reader
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(|e| io_err(&self.endpoint, e))
    }

    pub fn bind(&mut self, service: &str) -> Result<(), OfficeError> {
        self.call(&BridgeRequest::Bind {
            service: service.to_string(),
        })
        .map(|_| ())
    }

    /// Send one request and wait for its response.
    pub fn call(&mut self, request: &BridgeRequest) -> Result<Value, OfficeError> {
        let payload = serde_json::to_string(request)?;
        self.writer
            .write_all(payload.as_bytes())
            .map_err(|e| io_err(&self.endpoint, e))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| io_err(&self.endpoint, e))?;
        self.writer.flush().map_err(|e| io_err(&self.endpoint, e))?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| io_err(&self.endpoint, e))?;
        if read == 0 {
            return Err(OfficeError::Protocol(format!(
                "office closed connection before answering {}",
                request.op()
            )));
        }

        let response: BridgeResponse = serde_json::from_str(line.trim_end())?;
        response_into_data(request.op(), response)
    }

    fn call_as<T: DeserializeOwned>(&mut self, request: &BridgeRequest) -> Result<T, OfficeError> {
        let data = self.call(request)?;
        Ok(serde_json::from_value(data)?)
    }
}

fn response_into_data(op: &'static str, response: BridgeResponse) -> Result<Value, OfficeError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(OfficeError::Remote {
            op,
            message: response
                .error
                .unwrap_or_else(|| "unknown office error".to_string()),
        })
    }
}

impl LibraryContainer for Session {
    fn has_library(&mut self, library: &LibraryName) -> Result<bool, StoreError> {
        Ok(self.call_as(&BridgeRequest::HasLibrary {
            library: library.clone(),
        })?)
    }

    fn create_library(&mut self, library: &LibraryName) -> Result<(), StoreError> {
        self.call(&BridgeRequest::CreateLibrary {
            library: library.clone(),
        })?;
        Ok(())
    }

    fn load_library(&mut self, library: &LibraryName) -> Result<(), StoreError> {
        self.call(&BridgeRequest::LoadLibrary {
            library: library.clone(),
        })?;
        Ok(())
    }

    fn element_names(&mut self, library: &LibraryName) -> Result<Vec<ModuleName>, StoreError> {
        Ok(self.call_as(&BridgeRequest::ElementNames {
            library: library.clone(),
        })?)
    }

    fn get_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
    ) -> Result<String, StoreError> {
        Ok(self.call_as(&BridgeRequest::GetModule {
            library: library.clone(),
            module: module.clone(),
        })?)
    }

    fn insert_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError> {
        self.call(&BridgeRequest::InsertModule {
            library: library.clone(),
            module: module.clone(),
            source: source.to_string(),
        })?;
        Ok(())
    }

    fn replace_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError> {
        self.call(&BridgeRequest::ReplaceModule {
            library: library.clone(),
            module: module.clone(),
            source: source.to_string(),
        })?;
        Ok(())
    }

    fn remove_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
    ) -> Result<(), StoreError> {
        self.call(&BridgeRequest::RemoveModule {
            library: library.clone(),
            module: module.clone(),
        })?;
        Ok(())
    }

    fn is_modified(&mut self) -> Result<bool, StoreError> {
        Ok(self.call_as(&BridgeRequest::IsModified)?)
    }

    fn store_libraries(&mut self) -> Result<(), StoreError> {
        self.call(&BridgeRequest::StoreLibraries)?;
        Ok(())
    }

    fn invoke_script(&mut self, uri: &str) -> Result<(), StoreError> {
        self.call(&BridgeRequest::InvokeScript {
            uri: uri.to_string(),
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Answer one request against `container`.
pub fn dispatch<C: LibraryContainer + ?Sized>(
    container: &mut C,
    request: BridgeRequest,
) -> BridgeResponse {
    let result: Result<Value, StoreError> = match request {
        BridgeRequest::Bind { service } => {
            if service == SCRIPT_LIBRARY_CONTAINER {
                Ok(json!(service))
            } else {
                return BridgeResponse::error(format!("unknown service {service}"));
            }
        }
        BridgeRequest::HasLibrary { library } => container.has_library(&library).map(|b| json!(b)),
        BridgeRequest::CreateLibrary { library } => {
            container.create_library(&library).map(|_| Value::Null)
        }
        BridgeRequest::LoadLibrary { library } => {
            container.load_library(&library).map(|_| Value::Null)
        }
        BridgeRequest::ElementNames { library } => {
            container.element_names(&library).map(|names| json!(names))
        }
        BridgeRequest::GetModule { library, module } => {
            container.get_module(&library, &module).map(|s| json!(s))
        }
        BridgeRequest::InsertModule {
            library,
            module,
            source,
        } => container
            .insert_module(&library, &module, &source)
            .map(|_| Value::Null),
        BridgeRequest::ReplaceModule {
            library,
            module,
            source,
        } => container
            .replace_module(&library, &module, &source)
            .map(|_| Value::Null),
        BridgeRequest::RemoveModule { library, module } => container
            .remove_module(&library, &module)
            .map(|_| Value::Null),
        BridgeRequest::IsModified => container.is_modified().map(|b| json!(b)),
        BridgeRequest::StoreLibraries => container.store_libraries().map(|_| Value::Null),
        BridgeRequest::InvokeScript { uri } => container.invoke_script(&uri).map(|_| Value::Null),
    };
    match result {
        Ok(data) => BridgeResponse::ok(data),
        Err(StoreError::Remote { message, .. }) => BridgeResponse::error(message),
        Err(err) => BridgeResponse::error(err.to_string()),
    }
}

/// Serve requests from one client until it disconnects.
pub fn serve_connection<C: LibraryContainer + ?Sized>(
    stream: TcpStream,
    container: &mut C,
) -> Result<(), OfficeError> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "bridge client".to_string());
    let mut writer = stream.try_clone().map_err(|e| io_err(&peer, e))?;
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = line.map_err(|e| io_err(&peer, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<BridgeRequest>(&line) {
            Ok(request) => {
                tracing::debug!(op = request.op(), "bridge request");
                dispatch(container, request)
            }
            Err(err) => BridgeResponse::error(format!("invalid request: {err}")),
        };
        let payload = serde_json::to_string(&response)?;
        writer
            .write_all(payload.as_bytes())
            .map_err(|e| io_err(&peer, e))?;
        writer.write_all(b"\n").map_err(|e| io_err(&peer, e))?;
        writer.flush().map_err(|e| io_err(&peer, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_op() {
        let request = BridgeRequest::GetModule {
            library: LibraryName::from("Tools"),
            module: ModuleName::from("Main"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({ "op": "get_module", "library": "Tools", "module": "Main" })
        );
        assert_eq!(request.op(), "get_module");

        let unit = serde_json::to_string(&BridgeRequest::StoreLibraries).unwrap();
        assert_eq!(unit, r#"{"op":"store_libraries"}"#);
    }

    #[test]
    fn error_response_omits_data() {
        let text = serde_json::to_string(&BridgeResponse::error("boom")).unwrap();
        assert_eq!(text, r#"{"ok":false,"error":"boom"}"#);
    }

    #[test]
    fn failed_response_becomes_remote_error() {
        let err = response_into_data("load_library", BridgeResponse::error("no such library"))
            .unwrap_err();
        assert!(matches!(err, OfficeError::Remote { op: "load_library", .. }));
        let store: StoreError = err.into();
        assert_eq!(store.to_string(), "remote load_library failed: no such library");
    }

    #[test]
    fn ok_response_without_data_is_null() {
        let data = response_into_data(
            "store_libraries",
            BridgeResponse {
                ok: true,
                data: None,
                error: None,
            },
        )
        .unwrap();
        assert_eq!(data, Value::Null);
    }
}
