//! End-to-end secure channel scenarios between two nodes

use std::sync::Arc;
use std::time::Duration;

use gridlink_common::types::{MessageId, NodeId};
use gridlink_core::crypto::signing;
use gridlink_core::protocol::{from_json, to_json, SignatureStatus};
use gridlink_core::storage::KeyStore;
use gridlink_node::config::ChannelConfig;
use gridlink_node::{ChannelSession, FileKeyStore, NodeError};

const SET_VOLTAGE: &str = r#"{"command":"SET_VOLTAGE","value":"230V"}"#;

fn node(id: &str) -> NodeId {
    NodeId::new(id).unwrap()
}

fn one_hour() -> ChannelConfig {
    ChannelConfig {
        secret_ttl_secs: 3600,
        ..ChannelConfig::default()
    }
}

fn keyed_session(id: &str) -> ChannelSession {
    let session = ChannelSession::new(node(id), one_hour());
    session.generate_keys().unwrap();
    session
}

fn connect(a: &ChannelSession, b: &ChannelSession) {
    a.establish_channel(b.node_id(), &b.export_public_key().unwrap())
        .unwrap();
    b.establish_channel(a.node_id(), &a.export_public_key().unwrap())
        .unwrap();
}

#[test]
fn test_signed_command_over_the_wire() {
    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    connect(&controller, &simulator);

    let sent = controller
        .send_secure(simulator.node_id(), SET_VOLTAGE, true)
        .unwrap();

    // Serialize to JSON and back
    let json = to_json(&sent).unwrap();
    assert!(json.contains("\"algorithm\":\"AES-256-CBC\""));
    assert!(json.contains("\"algorithm\":\"ECDSA-SHA256\""));
    let arrived = from_json(&json).unwrap();

    let controller_key = simulator.peer_public_key(controller.node_id()).unwrap();
    let received = simulator
        .receive_secure(&arrived, controller.node_id(), Some(&controller_key))
        .unwrap();

    assert_eq!(received.plaintext, SET_VOLTAGE);
    assert_eq!(received.signature_valid, SignatureStatus::Valid);
    assert_eq!(received.sender_node, *controller.node_id());
}

#[test]
fn test_wrong_peer_key_fails_decryption() {
    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    let intruder = keyed_session("intruder");

    controller
        .establish_channel(simulator.node_id(), &simulator.export_public_key().unwrap())
        .unwrap();
    // Simulator derives its secret from the wrong public key
    simulator
        .establish_channel(controller.node_id(), &intruder.export_public_key().unwrap())
        .unwrap();

    let sent = controller
        .send_secure(simulator.node_id(), SET_VOLTAGE, true)
        .unwrap();
    let err = simulator
        .receive_secure(&sent, controller.node_id(), None)
        .unwrap_err();

    assert!(err.is_decryption_failure(), "unexpected error: {err}");
}

#[test]
fn test_tampered_signature_message_is_invalid() {
    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    connect(&controller, &simulator);

    let mut sent = controller
        .send_secure(simulator.node_id(), SET_VOLTAGE, true)
        .unwrap();
    let statement = sent.signature.as_mut().unwrap();
    statement.message.push_str("tampered");

    let controller_key = controller.key_pair().unwrap().public_key().clone();
    assert!(!signing::verify_statement(statement, &controller_key).unwrap());

    // Decryption still succeeds; only the signature status reports the tamper
    let received = simulator
        .receive_secure(&sent, controller.node_id(), Some(&controller_key))
        .unwrap();
    assert_eq!(received.plaintext, SET_VOLTAGE);
    assert_eq!(received.signature_valid, SignatureStatus::Invalid);
}

#[test]
fn test_expired_secret_requires_new_exchange() {
    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    connect(&controller, &simulator);

    let key = controller.secrets().get(simulator.node_id()).unwrap();
    controller
        .secrets()
        .put(simulator.node_id(), key, Duration::ZERO)
        .unwrap();

    let err = controller
        .send_secure(simulator.node_id(), SET_VOLTAGE, true)
        .unwrap_err();
    assert!(matches!(err, NodeError::NoSharedSecret { .. }));
    assert!(controller.secrets().is_empty());

    // Re-running the exchange restores the channel
    connect(&controller, &simulator);
    assert!(controller
        .send_secure(simulator.node_id(), SET_VOLTAGE, true)
        .is_ok());
}

#[test]
fn test_message_id_is_content_fingerprint() {
    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    connect(&controller, &simulator);

    let first = controller.send_secure(simulator.node_id(), SET_VOLTAGE, false).unwrap();
    let second = controller.send_secure(simulator.node_id(), SET_VOLTAGE, false).unwrap();
    let other = controller.send_secure(simulator.node_id(), "STATUS", false).unwrap();

    assert_eq!(first.message_id, second.message_id);
    assert_ne!(first.message_id, other.message_id);
    assert_eq!(first.message_id.to_string().len(), 16);
    assert_eq!(first.message_id, MessageId::for_content(SET_VOLTAGE.as_bytes()));

    // Fresh IV per message
    assert_ne!(first.encrypted_data.iv, second.encrypted_data.iv);
}

#[tokio::test]
async fn test_restored_identity_keeps_channel() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyStore::new(dir.path());

    let controller = keyed_session("security_controller");
    let simulator = keyed_session("matlab_simulation");
    let pair = controller.key_pair().unwrap();
    store
        .save_private_key(&pair, controller.node_id(), Some("grid-pass"))
        .await
        .unwrap();
    store
        .save_public_key(pair.public_key(), controller.node_id())
        .await
        .unwrap();

    // Restart the controller from disk
    let restarted = ChannelSession::new(node("security_controller"), one_hour());
    let restored = store
        .load_private_key(restarted.node_id(), Some("grid-pass"))
        .await
        .unwrap();
    restarted.install_key_pair(restored).unwrap();

    let controller_key = store.load_public_key_for(controller.node_id()).await.unwrap();
    simulator
        .establish_with_key(controller.node_id(), &controller_key)
        .unwrap();
    restarted
        .establish_channel(simulator.node_id(), &simulator.export_public_key().unwrap())
        .unwrap();

    let sent = restarted.send_secure(simulator.node_id(), SET_VOLTAGE, true).unwrap();
    let received = simulator.receive_from_peer(&sent, controller.node_id()).unwrap();
    assert_eq!(received.signature_valid, SignatureStatus::Valid);
}

#[test]
fn test_concurrent_peers() {
    let hub = Arc::new(keyed_session("hub"));
    let peers: Vec<ChannelSession> = (0..4)
        .map(|i| keyed_session(&format!("feeder_{i}")))
        .collect();
    for peer in &peers {
        connect(&hub, peer);
    }

    std::thread::scope(|scope| {
        for peer in &peers {
            let hub = Arc::clone(&hub);
            scope.spawn(move || {
                for n in 0..20 {
                    let text = format!("READ_METER:{n}");
                    let msg = hub.send_secure(peer.node_id(), &text, true).unwrap();
                    let received = peer.receive_from_peer(&msg, hub.node_id()).unwrap();
                    assert_eq!(received.plaintext, text);
                    assert!(received.signature_valid.is_valid());
                }
            });
        }
    });

    assert_eq!(hub.status().secrets.active_count, 4);
}
