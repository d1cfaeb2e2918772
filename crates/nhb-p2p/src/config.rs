/// Configuration for a node's P2P gossip network.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Local listen address (e.g. "/ip4/0.0.0.0/tcp/26656").
    pub listen_addr: String,
    /// Bootstrap peer multiaddresses.
    pub bootstrap_peers: Vec<String>,
    /// Protocol version string advertised to peers.
    pub protocol_version: String,
    /// GossipSub topic name for broadcasting transactions, proposals and votes.
    pub gossip_topic: String,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: "/ip4/0.0.0.0/tcp/26656".into(),
            bootstrap_peers: Vec::new(),
            protocol_version: "/nhb/1.0.0".into(),
            gossip_topic: "nhb-gossip".into(),
        }
    }
}
