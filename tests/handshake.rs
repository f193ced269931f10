// tests/handshake.rs
//
// Drives a full client handshake (fieldlink::Session) against a scripted, in-process
// "server" built from the same crypto/framing primitives, both running on real threads
// over a LoopbackTransport.

use std::thread;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use fieldlink::constants::{DER_PUBLIC_KEY_LEN, RSA_SIZE, SESSION_OKAY};
use fieldlink::crypto::{ChannelCipher, ClientKeypair, ServerPublicKey};
use fieldlink::error::HandshakeStage;
use fieldlink::framing::Framing;
use fieldlink::request::{CMD_READ_TEMPERATURE, CMD_TOGGLE_INDICATOR};
use fieldlink::transport::{LoopbackTransport, Transport};
use fieldlink::{Session, SessionError, SessionState};

type HmacSha256 = Hmac<Sha256>;

const FIXED_SESSION_ID: [u8; 8] = [0xAA; 8];
const FIXED_IV: [u8; 16] = [0x11; 16];
const FIXED_KEY: [u8; 32] = [0x22; 32];

/// Outcome of the scripted server's handshake half, handed to the command-loop phase.
struct ServerSession {
    framing: Framing<LoopbackTransport>,
    cipher: ChannelCipher,
}

/// Mirrors `handshake::run` from the peer's side. `authorized` toggles whether the
/// server accepts the client's signature (bad pre-shared secret scenario).
fn server_handshake(
    mut framing: Framing<LoopbackTransport>,
    psk_digest: [u8; 32],
    authorized: bool,
) -> Result<ServerSession, ()> {
    // Step 1: client's first ephemeral public key.
    let client_der1 = framing.recv(DER_PUBLIC_KEY_LEN).map_err(|_| ())?;
    let client_pub1 = ServerPublicKey::from_der(HandshakeStage::ServerKey, &client_der1).map_err(|_| ())?;

    // Step 2: offer our own ephemeral key, split into two RSA ciphertexts.
    let server_keypair = ClientKeypair::generate(HandshakeStage::ServerKey).map_err(|_| ())?;
    let server_der = server_keypair
        .public_key_der(HandshakeStage::ServerKey)
        .map_err(|_| ())?;
    let half = server_der.len() / 2;
    let mut server_key_wire = Vec::with_capacity(2 * RSA_SIZE);
    server_key_wire.extend(
        client_pub1
            .encrypt(HandshakeStage::ServerKey, &server_der[..half])
            .map_err(|_| ())?,
    );
    server_key_wire.extend(
        client_pub1
            .encrypt(HandshakeStage::ServerKey, &server_der[half..])
            .map_err(|_| ())?,
    );
    framing.send(&server_key_wire).map_err(|_| ())?;

    // Step 3: client's rotated key + signature, three RSA segments. The wire split is
    // 184|184|182 on the plaintext side, but each segment is its own independent
    // RSA_SIZE-byte ciphertext, so reassembly here just walks RSA_SIZE strides.
    let auth_ct = framing.recv(3 * RSA_SIZE).map_err(|_| ())?;
    let mut auth_payload = Vec::with_capacity(550);
    for i in 0..3 {
        auth_payload.extend(
            server_keypair
                .decrypt(HandshakeStage::ClientAuth, &auth_ct[i * RSA_SIZE..(i + 1) * RSA_SIZE])
                .map_err(|_| ())?,
        );
    }
    // The signature is always exactly RSA_SIZE bytes (PKCS#1v1.5 sign output size); the
    // DER occupies whatever is left, regardless of the exact encoding the key uses.
    let der_len = auth_payload.len() - RSA_SIZE;
    let client_der2 = &auth_payload[..der_len];
    let client_signature = &auth_payload[der_len..];
    let client_pub2 = ServerPublicKey::from_der(HandshakeStage::ClientAuth, client_der2).map_err(|_| ())?;

    let step3_ok = authorized && client_pub2.verify(&psk_digest, client_signature);

    // Step 4: ack (or a deliberately wrong literal if unauthorized).
    let ack_plain: &[u8] = if step3_ok { SESSION_OKAY } else { b"DENY" };
    let ack_ct = client_pub2
        .encrypt(HandshakeStage::Ack, ack_plain)
        .map_err(|_| ())?;
    framing.send(&ack_ct).map_err(|_| ())?;
    if !step3_ok {
        return Err(());
    }

    // Step 5: second signature over two segments, then hand back session material.
    let channel_ct = framing.recv(2 * RSA_SIZE).map_err(|_| ())?;
    let mut signature2 = Vec::with_capacity(256);
    for i in 0..2 {
        signature2.extend(
            server_keypair
                .decrypt(HandshakeStage::SessionMaterial, &channel_ct[i * RSA_SIZE..(i + 1) * RSA_SIZE])
                .map_err(|_| ())?,
        );
    }
    if !client_pub2.verify(&psk_digest, &signature2) {
        return Err(());
    }

    let mut material = Vec::with_capacity(56);
    material.extend_from_slice(&FIXED_SESSION_ID);
    material.extend_from_slice(&FIXED_IV);
    material.extend_from_slice(&FIXED_KEY);
    let material_ct = client_pub2
        .encrypt(HandshakeStage::SessionMaterial, &material)
        .map_err(|_| ())?;
    framing.send(&material_ct).map_err(|_| ())?;

    Ok(ServerSession {
        framing,
        cipher: ChannelCipher::new(FIXED_KEY, FIXED_IV),
    })
}

/// Runs the post-handshake command loop: decrypts one 16-byte request at a time and
/// replies per the command/response status table. `responder` maps a command byte to a status byte and
/// 5-byte payload.
fn server_command_loop(mut server: ServerSession, mut responder: impl FnMut(u8) -> (u8, [u8; 5])) {
    loop {
        let Ok(ct) = server.framing.recv(16) else {
            return;
        };
        let mut block = [0u8; 16];
        block.copy_from_slice(&ct);
        let plaintext = server.cipher.decrypt_block(&block);

        if plaintext[1..9] != FIXED_SESSION_ID {
            return;
        }
        let (status, payload) = responder(plaintext[0]);

        let mut reply = [0u8; 16];
        reply[0] = status;
        reply[1..6].copy_from_slice(&payload);
        let reply_ct = server.cipher.encrypt_block(&reply);
        if server.framing.send(&reply_ct).is_err() {
            return;
        }
    }
}

fn spawn_happy_server(
    server_transport: LoopbackTransport,
    responder: impl FnMut(u8) -> (u8, [u8; 5]) + Send + 'static,
) -> thread::JoinHandle<()> {
    let psk_digest = fieldlink::handshake::hmac_key();
    thread::spawn(move || {
        let framing = Framing::new(server_transport, &psk_digest);
        if let Ok(server) = server_handshake(framing, psk_digest, true) {
            server_command_loop(server, responder);
        }
    })
}

#[test]
fn toggle_then_read_temperature_happy_path() {
    let (client_t, server_t) = LoopbackTransport::pair();

    let mut led_on = false;
    let server_thread = spawn_happy_server(server_t, move |command| match command {
        CMD_TOGGLE_INDICATOR => {
            led_on = !led_on;
            let text = if led_on { b"ON\0\0\0" } else { b"OFF\0\0" };
            (0x00, *text)
        }
        CMD_READ_TEMPERATURE => (0x00, *b"23.50"),
        _ => (0x04, [0u8; 5]),
    });

    let mut session = Session::open(client_t).expect("handshake should succeed");
    assert_eq!(session.state(), SessionState::Established);

    let resp = session.request(CMD_TOGGLE_INDICATOR).unwrap();
    assert_eq!(resp.as_text(), "ON");
    assert!(resp.as_led().unwrap());

    let resp = session.request(CMD_TOGGLE_INDICATOR).unwrap();
    assert_eq!(resp.as_text(), "OFF");
    assert!(!resp.as_led().unwrap());

    let resp = session.request(CMD_READ_TEMPERATURE).unwrap();
    assert!((resp.as_temperature_celsius().unwrap() - 23.50).abs() < f32::EPSILON);

    session.close();
    server_thread.join().unwrap();
}

#[test]
fn unknown_command_returns_bad_request_and_stays_usable() {
    let (client_t, server_t) = LoopbackTransport::pair();
    let server_thread = spawn_happy_server(server_t, |_command| (0x04, [0u8; 5]));

    let mut session = Session::open(client_t).unwrap();
    let err = session.request(0x7F).unwrap_err();
    assert!(matches!(err, SessionError::Command { status: 0x04 }));
    assert_eq!(session.state(), SessionState::Established);

    session.close();
    server_thread.join().unwrap();
}

#[test]
fn corrupted_server_key_frame_fails_handshake_with_integrity_error() {
    let (client_t, mut server_t) = LoopbackTransport::pair();
    let psk_digest = fieldlink::handshake::hmac_key();

    thread::spawn(move || {
        // The DER blob's length isn't carried on the wire, so the reader has to know
        // how many bytes to take up front. Rather than trust a protocol constant, probe
        // the actual encoder the client side uses for the real length.
        let probe = ClientKeypair::generate(HandshakeStage::ServerKey).unwrap();
        let der_len = probe.public_key_der(HandshakeStage::ServerKey).unwrap().len();

        // Read the client's first frame raw (payload + digest) rather than through
        // Framing, so we can hand-compute the exact digest the client's hasher
        // expects for the *next* frame and then corrupt one bit of it — a single
        // atomic write, with no window where the uncorrupted frame is observable.
        let frame1 = server_t.read_exact(der_len + 32).unwrap();
        let client_der1 = &frame1[..der_len];
        let client_pub1 = ServerPublicKey::from_der(HandshakeStage::ServerKey, client_der1).unwrap();

        let server_keypair = ClientKeypair::generate(HandshakeStage::ServerKey).unwrap();
        let server_der = server_keypair.public_key_der(HandshakeStage::ServerKey).unwrap();
        let half = server_der.len() / 2;
        let mut wire = Vec::new();
        wire.extend(client_pub1.encrypt(HandshakeStage::ServerKey, &server_der[..half]).unwrap());
        wire.extend(client_pub1.encrypt(HandshakeStage::ServerKey, &server_der[half..]).unwrap());

        let mut mac = HmacSha256::new_from_slice(&psk_digest).unwrap();
        Mac::update(&mut mac, client_der1);
        Mac::update(&mut mac, &wire);
        let mut digest: [u8; 32] = mac.finalize().into_bytes().into();
        digest[3] ^= 0x08; // a single flipped bit in the digest

        let mut frame2 = wire;
        frame2.extend_from_slice(&digest);
        server_t.write(&frame2).unwrap();
    });

    let err = Session::open(client_t).unwrap_err();
    assert!(matches!(err, SessionError::Integrity));
}

#[test]
fn bad_pre_shared_secret_fails_handshake_at_ack() {
    let (client_t, server_t) = LoopbackTransport::pair();
    let psk_digest = fieldlink::handshake::hmac_key();

    thread::spawn(move || {
        let framing = Framing::new(server_t, &psk_digest);
        let _ = server_handshake(framing, psk_digest, false);
    });

    let err = Session::open(client_t).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Handshake { stage: HandshakeStage::Ack, .. }
    ));
}

#[test]
fn close_is_idempotent_and_refuses_further_requests() {
    let (client_t, server_t) = LoopbackTransport::pair();
    let server_thread = spawn_happy_server(server_t, |_| (0x00, *b"ON\0\0\0"));

    let mut session = Session::open(client_t).unwrap();
    session.close();
    session.close();

    let err = session.request(CMD_TOGGLE_INDICATOR).unwrap_err();
    assert!(matches!(
        err,
        SessionError::ProtocolState {
            expected: SessionState::Established,
            actual: SessionState::Closed,
        }
    ));

    drop(session);
    let _ = server_thread.join();
}
