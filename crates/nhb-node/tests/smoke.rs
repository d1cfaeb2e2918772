//! End-to-end smoke test for nhb-node.
//!
//! Starts a real node process with a fresh genesis, submits a signed
//! transfer via JSON-RPC, and asserts the balance change is reflected once
//! the node's own block-production loop commits it.
//!
//! Run with:
//!   cargo test -p nhb-node --test smoke

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
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "nhb_getGenesisInfo",
        "params": [],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
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

async fn get_nonce(client: &reqwest::Client, url: &str, addr_bech32: &str) -> u64 {
    let result = rpc_call(client, url, "nhb_getAccount", serde_json::json!([addr_bech32])).await;
    if result.is_null() {
        return 0;
    }
    result["nonce"].as_u64().expect("nonce field")
}

async fn send_tx(client: &reqwest::Client, url: &str, tx: &Transaction) -> String {
    let bytes = bincode::serialize(tx).expect("serialize tx");
    let tx_hex = hex::encode(bytes);
    let result = rpc_call(client, url, "nhb_sendTransaction", serde_json::json!([tx_hex])).await;
    result.as_str().expect("tx hash string").to_string()
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

fn write_genesis(path: &PathBuf, genesis_time: &str, sender_addr: &str, initial_nhb: u128) {
    let genesis = serde_json::json!({
        "genesisTime": genesis_time,
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

fn spawn_node(data_dir: &PathBuf, rpc_port: u16, p2p_port: u16, genesis_path: &PathBuf) -> Child {
    let node_bin = env!("CARGO_BIN_EXE_nhb-node");
    Command::new(node_bin)
        .args([
            "--data-dir",
            data_dir.join("state").to_str().unwrap(),
            "--rpc-addr",
            &format!("127.0.0.1:{rpc_port}"),
            "--p2p-listen",
            &format!("/ip4/127.0.0.1/tcp/{p2p_port}"),
            "--genesis",
            genesis_path.to_str().unwrap(),
            "--validator-key",
            data_dir.join("validator.key").to_str().unwrap(),
            "--block-interval-ms",
            "200",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn nhb-node")
}

#[tokio::test]
async fn smoke_transfer_is_committed() {
    let data_dir = std::env::temp_dir().join(format!("nhb_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let sender = KeyPair::generate();
    let recipient = KeyPair::generate();

    let initial_nhb: u128 = 1_000_000;
    let genesis_path = data_dir.join("genesis.json");
    write_genesis(&genesis_path, "2026-01-01T00:00:00Z", &sender.address.to_bech32(), initial_nhb);

    let rpc_port = free_port();
    let p2p_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");

    let child = spawn_node(&data_dir, rpc_port, p2p_port, &genesis_path);
    let _guard = NodeGuard { child, data_dir: data_dir.clone() };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "nhb-node did not become ready within 20 seconds"
    );

    let genesis_info = rpc_call(&http, &rpc_url, "nhb_getGenesisInfo", serde_json::json!([])).await;
    let chain_id = genesis_info["chain_id"].as_u64().expect("chain_id field");

    let sender_bech32 = sender.address.to_bech32();
    let genesis_bal = get_balance(&http, &rpc_url, &sender_bech32).await;
    assert_eq!(genesis_bal, initial_nhb, "sender genesis balance mismatch");

    let nonce = get_nonce(&http, &rpc_url, &sender_bech32).await;
    let tx = build_transfer(&sender, chain_id, nonce, recipient.address, 1_000);
    send_tx(&http, &rpc_url, &tx).await;

    let deadline = Instant::now() + Duration::from_secs(10);
    let recipient_bech32 = recipient.address.to_bech32();
    let mut recipient_bal = 0u128;
    while Instant::now() < deadline {
        recipient_bal = get_balance(&http, &rpc_url, &recipient_bech32).await;
        if recipient_bal == 1_000 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(recipient_bal, 1_000, "recipient did not receive the transfer in time");

    let sender_bal_after = get_balance(&http, &rpc_url, &sender_bech32).await;
    assert_eq!(
        sender_bal_after,
        initial_nhb - 1_000 - tx.fee(),
        "sender balance should be reduced by the transfer amount plus fee"
    );
}
