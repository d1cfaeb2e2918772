//! Two-node gossip propagation test: a transaction submitted to node A's
//! RPC is gossiped over the P2P network and admitted into node B's mempool,
//! where node B's own block-production loop commits it independently.
//!
//! Run with:
//!   cargo test -p nhb-node --test p2p

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nhb_core::types::Signature;
use nhb_core::{Transaction, TxKind};
use nhb_crypto::KeyPair;

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let body = serde_json::json!({
            "jsonrpc": "2.0", "method": "nhb_getGenesisInfo", "params": [], "id": 1
        });
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    false
}

async fn get_balance(client: &reqwest::Client, url: &str, addr_bech32: &str) -> u128 {
    let result = rpc_call(client, url, "nhb_getBalance", serde_json::json!([addr_bech32, "NHB"])).await;
    result.as_str().unwrap().parse().expect("parse balance")
}

fn write_genesis(path: &PathBuf, sender_addr: &str, initial_nhb: u128) {
    let genesis = serde_json::json!({
        "genesisTime": "2026-01-01T00:00:00Z",
        "nativeTokens": [
            {"symbol": "NHB", "name": "NHB", "decimals": 18},
            {"symbol": "ZNHB", "name": "ZNHB", "decimals": 18}
        ],
        "validators": [
            {"power": 1, "moniker": "dev", "autoPopulateLocal": true}
        ],
        "alloc": {
            sender_addr: { "NHB": initial_nhb.to_string() }
        },
        "roles": {}
    });
    std::fs::write(path, serde_json::to_string_pretty(&genesis).unwrap()).unwrap();
}

fn spawn_node(
    data_dir: &PathBuf,
    rpc_port: u16,
    p2p_port: u16,
    genesis_path: &PathBuf,
    bootstrap: Option<&str>,
) -> Child {
    let node_bin = env!("CARGO_BIN_EXE_nhb-node");
    let mut args = vec![
        "--data-dir".to_string(),
        data_dir.join("state").to_str().unwrap().to_string(),
        "--rpc-addr".to_string(),
        format!("127.0.0.1:{rpc_port}"),
        "--p2p-listen".to_string(),
        format!("/ip4/127.0.0.1/tcp/{p2p_port}"),
        "--genesis".to_string(),
        genesis_path.to_str().unwrap().to_string(),
        "--validator-key".to_string(),
        data_dir.join("validator.key").to_str().unwrap().to_string(),
        "--block-interval-ms".to_string(),
        "200".to_string(),
    ];
    if let Some(peer) = bootstrap {
        args.push("--bootstrap".to_string());
        args.push(peer.to_string());
    }
    Command::new(node_bin)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn nhb-node")
}

fn build_transfer(
    sender: &KeyPair,
    chain_id: u64,
    nonce: u64,
    to: nhb_core::types::Address,
    value: u128,
) -> Transaction {
    let mut tx = Transaction {
        chain_id,
        kind: TxKind::Transfer,
        nonce,
        to: Some(to),
        value: Some(value),
        gas_limit: 1,
        gas_price: 1,
        data: Vec::new(),
        paymaster: None,
        public_key: sender.public_key.clone(),
        signature: Signature::from_bytes([0u8; 65]),
    };
    let digest = tx.signing_bytes();
    tx.signature = sender.sign(&digest);
    tx
}

#[tokio::test]
async fn transaction_propagates_to_peer_over_gossip() {
    let sender = KeyPair::generate();
    let recipient = KeyPair::generate();
    let initial_nhb: u128 = 1_000_000;

    let dir_a = std::env::temp_dir().join(format!("nhb_p2p_a_{}", std::process::id()));
    let dir_b = std::env::temp_dir().join(format!("nhb_p2p_b_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir_a);
    let _ = std::fs::remove_dir_all(&dir_b);
    std::fs::create_dir_all(&dir_a).unwrap();
    std::fs::create_dir_all(&dir_b).unwrap();

    let genesis_a = dir_a.join("genesis.json");
    write_genesis(&genesis_a, &sender.address.to_bech32(), initial_nhb);
    let genesis_b = dir_b.join("genesis.json");
    write_genesis(&genesis_b, &sender.address.to_bech32(), initial_nhb);

    let rpc_a_port = free_port();
    let p2p_a_port = free_port();
    let rpc_a_url = format!("http://127.0.0.1:{rpc_a_port}");

    let child_a = spawn_node(&dir_a, rpc_a_port, p2p_a_port, &genesis_a, None);
    let _guard_a = NodeGuard { child: child_a, data_dir: dir_a.clone() };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_a_url, Duration::from_secs(20)).await,
        "bootstrap node did not become ready"
    );

    let network_info = rpc_call(&http, &rpc_a_url, "nhb_getNetworkInfo", serde_json::json!([])).await;
    let bootstrap_addr = network_info["peer_multiaddr"].as_str().expect("peer_multiaddr").to_string();

    let rpc_b_port = free_port();
    let p2p_b_port = free_port();
    let rpc_b_url = format!("http://127.0.0.1:{rpc_b_port}");

    let child_b = spawn_node(&dir_b, rpc_b_port, p2p_b_port, &genesis_b, Some(&bootstrap_addr));
    let _guard_b = NodeGuard { child: child_b, data_dir: dir_b.clone() };

    assert!(
        wait_for_rpc(&http, &rpc_b_url, Duration::from_secs(20)).await,
        "joining node did not become ready"
    );

    // Give gossipsub a moment to establish mesh membership between peers.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let genesis_info = rpc_call(&http, &rpc_a_url, "nhb_getGenesisInfo", serde_json::json!([])).await;
    let chain_id = genesis_info["chain_id"].as_u64().expect("chain_id field");

    let tx = build_transfer(&sender, chain_id, 0, recipient.address, 2_500);
    let tx_hex = hex::encode(bincode::serialize(&tx).expect("serialize tx"));
    rpc_call(&http, &rpc_a_url, "nhb_sendTransaction", serde_json::json!([tx_hex])).await;

    let recipient_bech32 = recipient.address.to_bech32();
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut recipient_bal_on_b = 0u128;
    while Instant::now() < deadline {
        recipient_bal_on_b = get_balance(&http, &rpc_b_url, &recipient_bech32).await;
        if recipient_bal_on_b == 2_500 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(
        recipient_bal_on_b, 2_500,
        "transfer submitted on node A was not observed on node B within the timeout"
    );
}
