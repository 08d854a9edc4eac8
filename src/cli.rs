use clap::Parser;
use libp2p::Multiaddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Multiaddress of a listening peer, e.g.
    /// /ip4/127.0.0.1/tcp/4001/p2p/<peer-id>. When omitted, listen for a
    /// peer instead and print our own address.
    pub peer: Option<Multiaddr>,
}
