use std::{fmt, time::Duration};

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use libp2p::{
    multiaddr::Protocol, noise, swarm::SwarmEvent, tcp, yamux, Multiaddr, PeerId, StreamProtocol,
    Swarm,
};
use libp2p_stream as stream;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tracing::{debug, info, warn};

use crate::relay;

/// Protocol identifier routing inbound streams to the chat handler; must
/// match exactly between the two ends.
pub const CHAT_PROTOCOL: StreamProtocol = StreamProtocol::new("/peerchat/1.0.0");

const LISTEN_ADDR: &str = "/ip4/127.0.0.1/tcp/0";

const OPEN_ATTEMPTS: usize = 20;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Which side of the session this process plays. The role tags every
/// outbound message so the peer can attribute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Server => "server",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a local ephemeral port, prints the connectable multiaddress, and
/// accepts inbound chat streams, one session at a time. Returns once the
/// listener tasks are running; the process keeps them alive.
pub async fn listen() -> Result<()> {
    let mut swarm = build_swarm()?;

    let listen_addr: Multiaddr = LISTEN_ADDR.parse().context("invalid listen address")?;
    swarm
        .listen_on(listen_addr)
        .context("failed to bind listen address")?;

    let mut control = swarm.behaviour().new_control();
    let incoming = control
        .accept(CHAT_PROTOCOL)
        .context("chat protocol already registered")?;

    tokio::spawn(drive_swarm(swarm));
    tokio::spawn(accept_sessions(incoming));

    Ok(())
}

/// Dials the peer at `addr` and opens a chat stream to it. Returns once the
/// session is running; any failure on the way there is fatal.
pub async fn dial(addr: Multiaddr) -> Result<()> {
    let peer_id = peer_id_from_addr(&addr)?;
    let mut swarm = build_swarm()?;

    swarm
        .dial(addr.clone())
        .with_context(|| format!("failed to dial {addr}"))?;

    let mut control = swarm.behaviour().new_control();
    tokio::spawn(drive_swarm(swarm));

    let stream = open_chat_stream(&mut control, peer_id).await?;
    info!(%peer_id, "chat stream open, type away");

    tokio::spawn(async move {
        relay::run(stream.compat(), Role::Client).await;
        info!("chat session ended");
    });

    Ok(())
}

fn build_swarm() -> Result<Swarm<stream::Behaviour>> {
    let swarm = libp2p::SwarmBuilder::with_new_identity()
        .with_tokio()
        .with_tcp(
            tcp::Config::default().nodelay(true),
            noise::Config::new,
            yamux::Config::default,
        )?
        .with_behaviour(|_| stream::Behaviour::new())?
        .build();

    Ok(swarm)
}

async fn drive_swarm(mut swarm: Swarm<stream::Behaviour>) {
    let local_peer = *swarm.local_peer_id();
    loop {
        match swarm.select_next_some().await {
            SwarmEvent::NewListenAddr { address, .. } => {
                let address = address.with_p2p(local_peer).unwrap_or_else(|addr| addr);
                println!("server multi address: {address}");
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                info!(%peer_id, "connection established");
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                info!(%peer_id, "connection closed");
            }
            SwarmEvent::OutgoingConnectionError { error, .. } => {
                warn!(%error, "outgoing connection failed");
            }
            event => debug!(?event, "swarm event"),
        }
    }
}

async fn accept_sessions(mut incoming: stream::IncomingStreams) {
    // One chat session at a time; later streams wait until this one ends.
    while let Some((peer, stream)) = incoming.next().await {
        info!(%peer, "peer joined the chat");
        relay::run(stream.compat(), Role::Server).await;
        info!(%peer, "chat session ended");
    }
}

async fn open_chat_stream(control: &mut stream::Control, peer: PeerId) -> Result<libp2p::Stream> {
    let mut attempts = 0;
    loop {
        match control.open_stream(peer, CHAT_PROTOCOL).await {
            Ok(stream) => return Ok(stream),
            Err(stream::OpenStreamError::UnsupportedProtocol(protocol)) => {
                bail!("peer does not speak {protocol}");
            }
            Err(error) => {
                attempts += 1;
                if attempts >= OPEN_ATTEMPTS {
                    bail!("could not open a chat stream to {peer}: {error}");
                }
                // The dial may still be in flight on the first attempts.
                debug!(%peer, %error, "stream not ready yet, retrying");
                tokio::time::sleep(OPEN_RETRY_DELAY).await;
            }
        }
    }
}

fn peer_id_from_addr(addr: &Multiaddr) -> Result<PeerId> {
    match addr.iter().last() {
        Some(Protocol::P2p(peer_id)) => Ok(peer_id),
        _ => bail!("peer address {addr} does not end with a /p2p/<peer-id> component"),
    }
}
