//! Connection manager: get a live bridge handle, starting the office process
//! when nothing listens yet.
//!
//! ```text
//! Unconnected ──► Resolving ──► Connected
//!                   │   ▲
//!        no listener│   │ retry delay
//!                   ▼   │
//!                  Spawning
//! ```
//!
//! Every refused attempt re-enters `Spawning`. After `max_attempts` refused
//! attempts the connector gives up with [`OfficeError::Unreachable`]. Launch
//! failures and any other resolve error end the loop immediately.

use std::thread::sleep;

use basync_core::{Endpoint, RetryPolicy, Settings};

use crate::endpoint::SCRIPT_LIBRARY_CONTAINER;
use crate::error::OfficeError;
use crate::launcher::{Launcher, OfficeLauncher};
use crate::protocol::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Resolving { attempt: u32 },
    Spawning { attempt: u32 },
    Connected,
}

/// Tries to reach a listener once.
///
/// Must return [`OfficeError::NoListener`] when nothing is listening, so the
/// connector knows to launch.
pub trait Resolver {
    type Handle;

    fn resolve(&self, endpoint: &Endpoint) -> Result<Self::Handle, OfficeError>;
}

/// Resolves to a [`Session`] bound to the script library container.
#[derive(Debug, Clone)]
pub struct BridgeResolver {
    service: String,
}

impl Default for BridgeResolver {
    fn default() -> Self {
        Self {
            service: SCRIPT_LIBRARY_CONTAINER.to_string(),
        }
    }
}

impl Resolver for BridgeResolver {
    type Handle = Session;

    fn resolve(&self, endpoint: &Endpoint) -> Result<Session, OfficeError> {
        Session::connect(endpoint, &self.service)
    }
}

/// Drives the resolve/spawn loop and remembers every state it went through.
#[derive(Debug, Clone)]
pub struct Connector {
    endpoint: Endpoint,
    policy: RetryPolicy,
    state: ConnectionState,
    history: Vec<ConnectionState>,
}

impl Connector {
    pub fn new(endpoint: Endpoint, policy: RetryPolicy) -> Self {
        Self {
            endpoint,
            policy,
            state: ConnectionState::Unconnected,
            history: vec![ConnectionState::Unconnected],
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.endpoint.clone(), settings.connect)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn history(&self) -> &[ConnectionState] {
        &self.history
    }

    /// Resolve, launching and retrying as needed.
    pub fn connect<R, L>(&mut self, resolver: &R, launcher: &L) -> Result<R::Handle, OfficeError>
    where
        R: Resolver,
        L: Launcher + ?Sized,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.enter(ConnectionState::Resolving { attempt });
            match resolver.resolve(&self.endpoint) {
                Ok(handle) => {
                    self.enter(ConnectionState::Connected);
                    tracing::debug!("connected to {} on attempt {attempt}", self.endpoint);
                    return Ok(handle);
                }
                Err(OfficeError::NoListener { .. }) if attempt < max_attempts => {
                    self.enter(ConnectionState::Spawning { attempt });
                    if let Err(err) = launcher.launch(&self.endpoint) {
                        self.enter(ConnectionState::Unconnected);
                        return Err(err);
                    }
                    sleep(self.policy.retry_delay());
                }
                Err(OfficeError::NoListener { .. }) => {
                    self.enter(ConnectionState::Unconnected);
                    tracing::warn!("giving up on {} after {attempt} attempts", self.endpoint);
                    return Err(OfficeError::Unreachable {
                        endpoint: self.endpoint.to_string(),
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    self.enter(ConnectionState::Unconnected);
                    return Err(err);
                }
            }
        }
    }

    fn enter(&mut self, state: ConnectionState) {
        tracing::trace!(?state, "connection state");
        self.state = state;
        self.history.push(state);
    }
}

/// Connect with the settings' endpoint, retry policy and office program.
pub fn connect(settings: &Settings) -> Result<Session, OfficeError> {
    let launcher = OfficeLauncher::new(&settings.office_program);
    Connector::from_settings(settings).connect(&BridgeResolver::default(), &launcher)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Refuses the first `refusals` attempts, then hands out the attempt number.
    struct FlakyResolver {
        refusals: u32,
        calls: Cell<u32>,
    }

    impl FlakyResolver {
        fn new(refusals: u32) -> Self {
            Self {
                refusals,
                calls: Cell::new(0),
            }
        }
    }

    impl Resolver for FlakyResolver {
        type Handle = u32;

        fn resolve(&self, endpoint: &Endpoint) -> Result<u32, OfficeError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call <= self.refusals {
                Err(OfficeError::NoListener {
                    endpoint: endpoint.to_string(),
                })
            } else {
                Ok(call)
            }
        }
    }

    #[derive(Default)]
    struct CountingLauncher {
        launches: Cell<u32>,
        fail: bool,
    }

    impl Launcher for CountingLauncher {
        fn launch(&self, _endpoint: &Endpoint) -> Result<(), OfficeError> {
            self.launches.set(self.launches.get() + 1);
            if self.fail {
                Err(OfficeError::ExecutableNotFound {
                    program: "soffice".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            retry_delay_ms: 0,
        }
    }

    #[test]
    fn existing_listener_connects_without_launch() {
        let launcher = CountingLauncher::default();
        let mut connector = Connector::new(Endpoint::default(), policy(5));
        let handle = connector.connect(&FlakyResolver::new(0), &launcher).unwrap();

        assert_eq!(handle, 1);
        assert_eq!(launcher.launches.get(), 0);
        assert_eq!(
            connector.history(),
            [
                ConnectionState::Unconnected,
                ConnectionState::Resolving { attempt: 1 },
                ConnectionState::Connected,
            ]
        );
    }

    #[test]
    fn refused_attempts_spawn_then_retry() {
        let launcher = CountingLauncher::default();
        let mut connector = Connector::new(Endpoint::default(), policy(5));
        let handle = connector.connect(&FlakyResolver::new(2), &launcher).unwrap();

        assert_eq!(handle, 3);
        assert_eq!(launcher.launches.get(), 2);
        assert_eq!(connector.state(), ConnectionState::Connected);
        assert_eq!(
            connector.history(),
            [
                ConnectionState::Unconnected,
                ConnectionState::Resolving { attempt: 1 },
                ConnectionState::Spawning { attempt: 1 },
                ConnectionState::Resolving { attempt: 2 },
                ConnectionState::Spawning { attempt: 2 },
                ConnectionState::Resolving { attempt: 3 },
                ConnectionState::Connected,
            ]
        );
    }

    #[test]
    fn retry_is_bounded() {
        let launcher = CountingLauncher::default();
        let resolver = FlakyResolver::new(u32::MAX);
        let mut connector = Connector::new(Endpoint::default(), policy(3));
        let err = connector.connect(&resolver, &launcher).unwrap_err();

        assert!(
            matches!(err, OfficeError::Unreachable { attempts: 3, .. }),
            "got: {err}"
        );
        assert_eq!(resolver.calls.get(), 3);
        assert_eq!(launcher.launches.get(), 2);
        assert_eq!(connector.state(), ConnectionState::Unconnected);
    }

    #[test]
    fn launch_failure_is_fatal_without_retry() {
        let launcher = CountingLauncher {
            fail: true,
            ..CountingLauncher::default()
        };
        let resolver = FlakyResolver::new(u32::MAX);
        let mut connector = Connector::new(Endpoint::default(), policy(10));
        let err = connector.connect(&resolver, &launcher).unwrap_err();

        assert!(matches!(err, OfficeError::ExecutableNotFound { .. }), "got: {err}");
        assert_eq!(resolver.calls.get(), 1);
        assert_eq!(launcher.launches.get(), 1);
    }

    #[test]
    fn other_resolve_errors_are_not_retried() {
        struct Broken;
        impl Resolver for Broken {
            type Handle = ();
            fn resolve(&self, _endpoint: &Endpoint) -> Result<(), OfficeError> {
                Err(OfficeError::Protocol("garbage greeting".to_string()))
            }
        }

        let launcher = CountingLauncher::default();
        let mut connector = Connector::new(Endpoint::default(), policy(10));
        let err = connector.connect(&Broken, &launcher).unwrap_err();

        assert!(matches!(err, OfficeError::Protocol(_)));
        assert_eq!(launcher.launches.get(), 0);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let launcher = CountingLauncher::default();
        let resolver = FlakyResolver::new(0);
        let mut connector = Connector::new(Endpoint::default(), policy(0));
        assert!(connector.connect(&resolver, &launcher).is_ok());
    }
}
