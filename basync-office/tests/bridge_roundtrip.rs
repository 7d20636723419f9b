//! Bridge protocol over a loopback socket, served by an in-memory container.

use std::fs;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use basync_core::{Endpoint, LibraryContainer, LibraryName, ModuleName, ModuleSet, RetryPolicy};
use basync_office::{
    serve_connection, BridgeResolver, ConnectionState, Connector, Launcher, OfficeError, Session,
    SCRIPT_LIBRARY_CONTAINER,
};
use basync_sync::{pipeline, MemoryContainer, SyncRequest};
use tempfile::TempDir;

/// Serve exactly one client, then hand the container back.
fn spawn_bridge(container: MemoryContainer) -> (Endpoint, JoinHandle<MemoryContainer>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        let mut container = container;
        let (stream, _) = listener.accept().expect("accept");
        serve_connection(stream, &mut container).expect("serve");
        container
    });
    let endpoint = Endpoint {
        host: "127.0.0.1".to_string(),
        port,
    };
    (endpoint, handle)
}

/// A port nothing listens on.
fn closed_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    Endpoint {
        host: "127.0.0.1".to_string(),
        port,
    }
}

struct NoLaunch;

impl Launcher for NoLaunch {
    fn launch(&self, _endpoint: &Endpoint) -> Result<(), OfficeError> {
        Ok(())
    }
}

#[test]
fn session_speaks_to_container() {
    let (endpoint, server) = spawn_bridge(MemoryContainer::default());
    let tools = LibraryName::from("Tools");
    {
        let mut session = Session::connect(&endpoint, SCRIPT_LIBRARY_CONTAINER).expect("connect");
        assert!(!session.has_library(&tools).expect("has"));
        session.create_library(&tools).expect("create");
        session
            .insert_module(&tools, &ModuleName::from("Main"), "Sub Main\nEnd Sub\n")
            .expect("insert");
        assert_eq!(
            session.element_names(&tools).expect("names"),
            vec![ModuleName::from("Main")]
        );
        assert!(session.is_modified().expect("modified"));
        session.store_libraries().expect("store");

        let err = session
            .insert_module(&tools, &ModuleName::from("Main"), "again")
            .unwrap_err();
        assert!(err.to_string().contains("already exists"), "got: {err}");
    }
    let container = server.join().expect("server thread");
    assert_eq!(container.store_count(), 1);
}

#[test]
fn unknown_service_is_refused() {
    let (endpoint, server) = spawn_bridge(MemoryContainer::default());
    let err = Session::connect(&endpoint, "com.example.Nope").unwrap_err();
    assert!(
        matches!(err, OfficeError::Remote { op: "bind", .. }),
        "got: {err}"
    );
    server.join().expect("server thread");
}

#[test]
fn upload_over_the_bridge() {
    let dir = TempDir::new().expect("dir");
    fs::write(dir.path().join("b.vb"), "2").expect("write");
    fs::write(dir.path().join("a.vb"), "1").expect("write");
    let (endpoint, server) = spawn_bridge(MemoryContainer::default());

    let outcome = {
        let mut connector = Connector::new(endpoint, RetryPolicy::default());
        let mut session = connector
            .connect(&BridgeResolver::default(), &NoLaunch)
            .expect("connect");
        assert_eq!(connector.state(), ConnectionState::Connected);
        pipeline::run(&mut session, &SyncRequest::new(dir.path(), LibraryName::from("Tools")))
            .expect("upload")
    };

    assert!(outcome.report.created());
    assert_eq!(outcome.report.added(), 2);
    let container = server.join().expect("server thread");
    let mut expected = ModuleSet::new();
    expected.insert(ModuleName::from("a"), "1".to_string());
    expected.insert(ModuleName::from("b"), "2".to_string());
    assert_eq!(container.library(&LibraryName::from("Tools")), Some(&expected));
    assert_eq!(container.store_count(), 1);
}

#[test]
fn closed_port_is_no_listener() {
    let err = Session::open(&closed_endpoint()).unwrap_err();
    assert!(matches!(err, OfficeError::NoListener { .. }), "got: {err}");
}

#[test]
fn closed_port_exhausts_bounded_retry() {
    let policy = RetryPolicy {
        max_attempts: 2,
        retry_delay_ms: 0,
    };
    let mut connector = Connector::new(closed_endpoint(), policy);
    let err = connector
        .connect(&BridgeResolver::default(), &NoLaunch)
        .unwrap_err();
    assert!(
        matches!(err, OfficeError::Unreachable { attempts: 2, .. }),
        "got: {err}"
    );
}

#[test]
fn silent_peer_times_out_instead_of_hanging() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = Endpoint {
        host: "127.0.0.1".to_string(),
        port: listener.local_addr().expect("addr").port(),
    };
    let holder = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        thread::sleep(std::time::Duration::from_millis(500));
        drop(stream);
    });

    let mut session = Session::open(&endpoint).expect("open");
    session
        .set_read_timeout(std::time::Duration::from_millis(50))
        .expect("timeout");
    let err = session.bind(SCRIPT_LIBRARY_CONTAINER).unwrap_err();
    assert!(matches!(err, OfficeError::Io { .. }), "got: {err}");
    holder.join().expect("holder thread");
}
