// Connection broker: hands out dedicated channels between the sidebar and
// the frames that ask for one.
//
// A peer posts `requestSidebarConnection` to the sidebar window. The broker
// creates a channel, keeps one end for the sidebar (posted to its own window)
// and sends the other end back to the requesting window at that window's
// origin.

use annotator_common::protocol::bootstrap::{BootstrapMessage, ConnectionRole};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::BrokerConfig;
use crate::rpc::{PortRpc, PortRpcError};
use crate::window::{MessageChannel, MessageEvent, MessageListener, MessagePort, Window};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("window stopped delivering messages before a connection was granted")]
    Closed,
}

/// One end of a brokered channel.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Role granted to the peer. The sidebar's end carries none.
    pub role: Option<ConnectionRole>,
    pub port: MessagePort,
}

impl Connection {
    /// Bind an RPC endpoint to this connection.
    pub fn connect_rpc(&self, rpc: &PortRpc) -> Result<(), PortRpcError> {
        rpc.connect(self.port.clone())
    }

    pub fn close(&self) {
        self.port.close();
    }
}

/// Sidebar-side listener granting connection requests.
#[derive(Debug)]
pub struct SidebarBroker {
    listener: JoinHandle<()>,
}

impl SidebarBroker {
    /// Start granting requests posted to `sidebar`. Must run inside a tokio
    /// runtime.
    pub fn listen(sidebar: Window) -> Self {
        let mut inbox = sidebar.subscribe();
        let listener = tokio::spawn(async move {
            while let Some(event) = inbox.recv().await {
                grant(&sidebar, event);
            }
        });
        Self { listener }
    }

    pub fn stop(self) {
        self.listener.abort();
    }
}

fn grant(sidebar: &Window, event: MessageEvent) {
    let Some(BootstrapMessage::RequestSidebarConnection { role }) =
        BootstrapMessage::from_value(&event.data)
    else {
        return;
    };

    let channel = MessageChannel::new();
    sidebar.post_message(
        sidebar,
        BootstrapMessage::SidebarConnection { role: None }.to_value(),
        sidebar.origin(),
        vec![channel.port1],
    );
    event.source.post_message(
        sidebar,
        BootstrapMessage::SidebarConnection { role: Some(role) }.to_value(),
        &event.origin,
        vec![channel.port2],
    );
    info!(%role, origin = %event.origin, "granted sidebar connection");
}

/// The sidebar's own feed of new connections. Create it before peers start
/// requesting so no grant is missed.
#[derive(Debug)]
pub struct SidebarConnections {
    sidebar: Window,
    inbox: MessageListener,
}

impl SidebarConnections {
    pub fn new(sidebar: Window) -> Self {
        let inbox = sidebar.subscribe();
        Self { sidebar, inbox }
    }

    /// Wait for the next granted connection.
    pub async fn accept(&mut self) -> Option<Connection> {
        while let Some(event) = self.inbox.recv().await {
            if event.source != self.sidebar {
                continue;
            }
            if !matches!(
                BootstrapMessage::from_value(&event.data),
                Some(BootstrapMessage::SidebarConnection { .. })
            ) {
                continue;
            }
            match event.ports.into_iter().next() {
                Some(port) => return Some(Connection { role: None, port }),
                None => trace!("sidebar connection without a port ignored"),
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Reject grants whose origin differs from the requested host origin
    /// instead of only logging them.
    pub strict_origin: bool,
}

impl From<&BrokerConfig> for ConnectOptions {
    fn from(config: &BrokerConfig) -> Self {
        Self { strict_origin: config.strict_connection_origin }
    }
}

/// Ask the sidebar in `host` for a channel with the given role.
///
/// There is no timeout: callers that need one should wrap this future.
pub async fn request_connection(
    own: &Window,
    host: &Window,
    host_origin: &str,
    role: ConnectionRole,
    options: ConnectOptions,
) -> Result<Connection, BrokerError> {
    let mut inbox = own.subscribe();
    host.post_message(
        own,
        BootstrapMessage::RequestSidebarConnection { role }.to_value(),
        host_origin,
        Vec::new(),
    );
    debug!(%role, host_origin, "requested sidebar connection");

    while let Some(event) = inbox.recv().await {
        let Some(BootstrapMessage::SidebarConnection { role: granted }) =
            BootstrapMessage::from_value(&event.data)
        else {
            continue;
        };
        let Some(port) = event.ports.first().cloned() else {
            trace!("sidebar connection without a port ignored");
            continue;
        };
        if host_origin != "*" && event.origin != host_origin {
            if options.strict_origin {
                warn!(expected = host_origin, origin = %event.origin, "ignoring sidebar connection from unexpected origin");
                continue;
            }
            warn!(expected = host_origin, origin = %event.origin, "accepting sidebar connection from unexpected origin");
        }
        return Ok(Connection { role: granted, port });
    }
    Err(BrokerError::Closed)
}
