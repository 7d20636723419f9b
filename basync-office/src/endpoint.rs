use basync_core::Endpoint;

/// Service every bridge session binds to: the application-level Basic
/// library container.
pub const SCRIPT_LIBRARY_CONTAINER: &str = "com.sun.star.script.ApplicationScriptLibraryContainer";

/// Argument that makes the office process listen on `endpoint`.
pub fn accept_argument(endpoint: &Endpoint) -> String {
    format!(
        "-accept=socket,host={},port={};urp;",
        endpoint.host, endpoint.port
    )
}

/// `host:port` form accepted by `TcpStream::connect`.
pub fn socket_address(endpoint: &Endpoint) -> (String, u16) {
    (endpoint.host.clone(), endpoint.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accept_argument() {
        assert_eq!(
            accept_argument(&Endpoint::default()),
            "-accept=socket,host=localhost,port=2002;urp;"
        );
    }

    #[test]
    fn custom_endpoint_is_reflected() {
        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port: 8100,
        };
        assert_eq!(
            accept_argument(&endpoint),
            "-accept=socket,host=127.0.0.1,port=8100;urp;"
        );
        assert_eq!(socket_address(&endpoint), ("127.0.0.1".to_string(), 8100));
    }
}
