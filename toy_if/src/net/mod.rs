//! # Network Module
//!
//! This module provides a request/reply client over ZMQ, used to reach the SDK bridge. Messages
//! are serialised as JSON strings.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use zmq::{Context, Socket, SocketType};

use crate::toy::ToyError;

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| NetError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, loaded from `bridge.toml`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NetParams {
    /// Endpoint the SDK bridge listens on
    pub bridge_endpoint: String,

    /// Time to wait for a connection to the bridge.
    ///
    /// Units: milliseconds
    pub connect_timeout_ms: i32,

    /// Time to wait for a reply, on top of the duration of the request itself (a `roll` takes as
    /// long as the roll).
    ///
    /// Units: milliseconds
    pub recv_timeout_ms: i32,

    /// Units: milliseconds
    pub send_timeout_ms: i32,
}

/// Represents options which can be set on a socket.
///
/// Most options here correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation.
#[derive(Debug, Clone, Copy)]
pub struct SocketOptions {
    /// `ZMQ_REQ_CORRELATE`: Match replies with requests
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`: relax strict alternation between request and reply
    pub req_relaxed: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_CONNECT_TIMEOUT`: Set `connect()` timeout
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,
}

/// A REQ socket exchanging JSON messages with a REP server.
pub struct ReqClient {
    socket: Socket,

    endpoint: String,

    recv_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),

    #[error("Could not connect the socket to {0}: {1}")]
    ConnectError(String, zmq::Error),

    #[error("Could not send the request: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a reply: {0}")]
    RecvError(zmq::Error),

    #[error("The reply was not valid UTF-8")]
    NonUtf8Reply,

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the reply: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReqClient {
    /// Create a new client connected to `endpoint`.
    ///
    /// zmq connects lazily, so an unreachable endpoint only shows up as a timeout on the first
    /// request.
    pub fn new(
        ctx: &Context,
        socket_options: SocketOptions,
        endpoint: &str
    ) -> Result<Self, NetError> {
        let socket = ctx.socket(SocketType::REQ)
            .map_err(NetError::CreateSocketError)?;

        socket_options.set(&socket)?;

        socket.connect(endpoint)
            .map_err(|e| NetError::ConnectError(endpoint.to_string(), e))?;

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
            recv_timeout: socket_options.recv_timeout,
        })
    }

    /// Endpoint this client is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request and wait for the reply using the socket's configured receive timeout.
    pub fn request<Q, R>(&mut self, request: &Q) -> Result<R, NetError>
    where
        Q: Serialize,
        R: DeserializeOwned
    {
        let req_str = serde_json::to_string(request)
            .map_err(NetError::SerializationError)?;

        trace!("-> {}: {}", self.endpoint, req_str);

        self.socket.send(req_str.as_str(), 0)
            .map_err(NetError::SendError)?;

        let msg = self.socket.recv_msg(0)
            .map_err(NetError::RecvError)?;

        let rep_str = msg.as_str().ok_or(NetError::NonUtf8Reply)?;

        trace!("<- {}: {}", self.endpoint, rep_str);

        serde_json::from_str(rep_str).map_err(NetError::DeserializeError)
    }

    /// Send a request which is expected to take `extra_ms` longer than usual to be answered.
    ///
    /// The receive timeout is extended for this one request and restored afterwards.
    pub fn request_with_extra_time<Q, R>(
        &mut self,
        request: &Q,
        extra_ms: i32
    ) -> Result<R, NetError>
    where
        Q: Serialize,
        R: DeserializeOwned
    {
        if self.recv_timeout < 0 || extra_ms <= 0 {
            return self.request(request);
        }

        set_sockopts!(self.socket, (set_rcvtimeo, self.recv_timeout.saturating_add(extra_ms)));
        let result = self.request(request);
        set_sockopts!(self.socket, (set_rcvtimeo, self.recv_timeout));

        result
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), NetError> {

        // Set all the socket options, we use a macro here to make the error handling nice and
        // easy
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_linger, self.linger),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        if let Ok(SocketType::REQ) = socket.get_socket_type() {
            set_sockopts!(
                socket,
                (set_req_correlate, self.req_correlate),
                (set_req_relaxed, self.req_relaxed)
            );
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            connect_timeout: 0,
            linger: 30_000,
            recv_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
            send_timeout: -1,
        }
    }
}

impl From<NetError> for ToyError {
    fn from(e: NetError) -> Self {
        ToyError::Comms(e.to_string())
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            bridge_endpoint: "tcp://localhost:5050".into(),
            connect_timeout_ms: 2000,
            recv_timeout_ms: 1500,
            send_timeout_ms: 200,
        }
    }
}

impl NetParams {
    /// Socket options for a bridge client using these parameters.
    ///
    /// Correlation and relaxed alternation let a client keep using its socket after a timed out
    /// request.
    pub fn socket_options(&self) -> SocketOptions {
        SocketOptions {
            connect_timeout: self.connect_timeout_ms,
            linger: 1,
            recv_timeout: self.recv_timeout_ms,
            send_timeout: self.send_timeout_ms,
            req_correlate: true,
            req_relaxed: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bridge_socket_options() {
        let params = NetParams::default();
        let opts = params.socket_options();
        assert!(opts.req_correlate && opts.req_relaxed);
        assert_eq!(opts.recv_timeout, 1500);
    }

    #[test]
    fn test_request_reply_over_inproc() {
        let ctx = Context::new();
        let server = ctx.socket(SocketType::REP).unwrap();
        server.bind("inproc://net_test").unwrap();

        let mut client = ReqClient::new(
            &ctx,
            NetParams::default().socket_options(),
            "inproc://net_test"
        ).unwrap();

        let handle = std::thread::spawn(move || {
            let msg = server.recv_msg(0).unwrap();
            let echoed: Vec<u32> = serde_json::from_str(msg.as_str().unwrap()).unwrap();
            let total: u32 = echoed.iter().sum();
            server.send(serde_json::to_string(&total).unwrap().as_str(), 0).unwrap();
        });

        let total: u32 = client.request(&vec![1u32, 2, 3]).unwrap();
        assert_eq!(total, 6);

        handle.join().unwrap();
    }
}
