use qtunnel::channel::{Channel, ChannelError, COMPRESSION_THRESHOLD};
use qtunnel::keys::{KeyBuffer, KeySource};
use qtunnel::msgs::{Message, HEADER_SIZE};
use qtunnel_ciphers::AssociationDefinition;
use rand::RngCore;

const QUANTUM: usize = 32;

fn setup_logging() {
    let mut log_builder = env_logger::Builder::from_default_env();
    log_builder.filter_level(log::LevelFilter::Info);
    log_builder.format_timestamp_nanos();
    let _ = log_builder.is_test(true).try_init();
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut v = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut v);
    v
}

/// Alice's view; Bob uses the mirrored definition
fn definition() -> AssociationDefinition {
    AssociationDefinition {
        authentication_incoming: "evhash-96:02cc942de299f4b0d86ffd53".to_owned(),
        authentication_outgoing: "evhash-128:31323334313233343132333431323335".to_owned(),
        encryption_incoming: "xor".to_owned(),
        encryption_outgoing: "xor".to_owned(),
    }
}

fn channel_pair(
    id: u16,
    key_bytes: usize,
) -> anyhow::Result<(Channel<KeyBuffer>, Channel<KeyBuffer>)> {
    let (alice_keys, bob_keys) =
        KeyBuffer::pair(QUANTUM, &random_bytes(key_bytes), &random_bytes(key_bytes));
    let alice = Channel::from_definition(id, &definition(), alice_keys)?;
    let bob = Channel::from_definition(id, &definition().mirrored(), bob_keys)?;
    Ok((alice, bob))
}

/// Encodes on `from`, sends the frame and decodes on `to`
fn transmit(
    from: &mut Channel<KeyBuffer>,
    to: &mut Channel<KeyBuffer>,
    payload: &[u8],
    encrypt: bool,
) -> anyhow::Result<Message> {
    let mut msg = Message::new(0x10, payload.to_vec()).with_encryption(encrypt);
    from.encode(&mut msg)?;
    assert!(msg.is_length_consistent());
    assert!(msg.header.authentic());

    let mut received = Message::from_wire(&msg.to_wire(), to.incoming_tag_len())?;
    to.decode(&mut received)?;
    assert!(received.tag.is_empty());
    assert_eq!(received.header, msg.header);
    Ok(received)
}

#[test]
fn payloads_survive_the_round_trip() -> anyhow::Result<()> {
    setup_logging();
    let (mut alice, mut bob) = channel_pair(42, 1 << 20)?;

    let sizes = [
        0,
        1,
        100,
        COMPRESSION_THRESHOLD,
        COMPRESSION_THRESHOLD + 1,
        100_000,
    ];
    for size in sizes {
        for encrypt in [false, true] {
            let payload = random_bytes(size);
            let received = transmit(&mut alice, &mut bob, &payload, encrypt)?;
            assert_eq!(received.payload, payload, "size {size}, encrypt {encrypt}");
            assert_eq!(received.header.encrypted(), encrypt);
            assert_eq!(
                received.header.compressed(),
                encrypt || size > COMPRESSION_THRESHOLD
            );
            assert_eq!(received.header.command(), 0x10);

            let back = transmit(&mut bob, &mut alice, &payload, encrypt)?;
            assert_eq!(back.payload, payload);
        }
    }
    Ok(())
}

#[test]
fn encryption_hides_the_payload() -> anyhow::Result<()> {
    let (mut alice, _) = channel_pair(1, 4096)?;
    let plain = b"the same text, over and over, the same text, over and over".repeat(4);

    let mut msg = Message::new(0, plain.clone()).with_encryption(true);
    alice.encode(&mut msg)?;
    assert!(msg.header.encrypted());
    assert_ne!(msg.header.encryption_key_id(), 0);
    assert_ne!(msg.header.encryption_key_id(), msg.header.authentication_key_id());
    assert!(!msg
        .payload
        .windows(16)
        .any(|w| plain.windows(16).any(|p| p == w)));
    Ok(())
}

#[test]
fn every_single_bit_flip_is_detected() -> anyhow::Result<()> {
    setup_logging();
    let mut alice = Channel::from_definition(5, &definition(), KeyBuffer::new(QUANTUM))?;
    let auth_key = random_bytes(QUANTUM);
    alice.keys_mut().push_outgoing(&auth_key);

    let mut msg = Message::new(1, random_bytes(64));
    alice.encode(&mut msg)?;
    let wire = msg.to_wire();
    assert_eq!(wire.len(), HEADER_SIZE + 64 + 16);

    for bit in HEADER_SIZE * 8..wire.len() * 8 {
        // verifying consumes the key, so every attempt gets a fresh receiver
        let mut bob =
            Channel::from_definition(5, &definition().mirrored(), KeyBuffer::new(QUANTUM))?;
        bob.keys_mut().push_incoming(&auth_key);

        let mut tampered = wire.clone();
        tampered[bit / 8] ^= 1 << (bit % 8);
        let mut received = Message::from_wire(&tampered, bob.incoming_tag_len())?;
        let before = received.clone();
        assert_eq!(bob.decode(&mut received), Err(ChannelError::Auth), "bit {bit}");
        assert_eq!(received, before);
    }

    let mut bob = Channel::from_definition(5, &definition().mirrored(), KeyBuffer::new(QUANTUM))?;
    bob.keys_mut().push_incoming(&auth_key);
    let mut received = Message::from_wire(&wire, bob.incoming_tag_len())?;
    bob.decode(&mut received)?;
    Ok(())
}

#[test]
fn tampered_header_fields_are_rejected() -> anyhow::Result<()> {
    let (mut alice, mut bob) = channel_pair(9, 4096)?;
    let mut msg = Message::new(3, b"hello".to_vec());
    alice.encode(&mut msg)?;

    let mut wrong_length = msg.clone();
    wrong_length.header.set_length(msg.header.length() + 1);
    assert_eq!(bob.decode(&mut wrong_length), Err(ChannelError::Message));

    let mut short = msg.clone();
    short.payload.pop();
    assert_eq!(bob.decode(&mut short), Err(ChannelError::Message));

    let mut other_channel = msg.clone();
    other_channel.header.set_channel_id(10);
    assert_eq!(bob.decode(&mut other_channel), Err(ChannelError::Message));

    let mut other_version = msg.clone();
    other_version.header.set_version(2);
    assert_eq!(bob.decode(&mut other_version), Err(ChannelError::Message));

    let mut not_authentic = msg.clone();
    not_authentic.header.set_authentic(false);
    assert_eq!(bob.decode(&mut not_authentic), Err(ChannelError::Message));

    let mut short_tag = msg.clone();
    short_tag.tag.pop();
    short_tag.header.set_length(msg.header.length() - 1);
    assert_eq!(bob.decode(&mut short_tag), Err(ChannelError::Auth));

    // none of the above touched bob's keys
    bob.decode(&mut msg)?;
    assert_eq!(msg.payload, b"hello");
    Ok(())
}

#[test]
fn missing_keys_are_recoverable() -> anyhow::Result<()> {
    setup_logging();
    let material = random_bytes(8 * QUANTUM);
    let mut alice = Channel::from_definition(2, &definition(), KeyBuffer::new(QUANTUM))?;
    let mut bob = Channel::from_definition(2, &definition().mirrored(), KeyBuffer::new(QUANTUM))?;

    let mut msg = Message::new(7, b"waiting for keys".to_vec()).with_encryption(true);
    let original = msg.clone();
    let err = alice.encode(&mut msg).unwrap_err();
    assert_eq!(err, ChannelError::Keys);
    assert!(err.is_recoverable());
    assert_eq!(msg, original);
    assert_eq!(alice.next_message_id(), 1);

    alice.keys_mut().push_outgoing(&material);
    alice.encode(&mut msg)?;
    assert_eq!(msg.header.message_id(), 1);
    assert_eq!(alice.next_message_id(), 2);

    let sent = msg.clone();
    assert_eq!(bob.decode(&mut msg), Err(ChannelError::Keys));
    assert_eq!(msg, sent);
    assert_eq!(bob.keys().incoming_len(), 0);

    bob.keys_mut().push_incoming(&material);
    bob.decode(&mut msg)?;
    assert_eq!(msg.payload, b"waiting for keys");

    // the keys are one-time: a replay finds them gone
    let mut replay = sent;
    assert_eq!(bob.decode(&mut replay), Err(ChannelError::Keys));
    Ok(())
}

#[test]
fn message_ids_count_up() -> anyhow::Result<()> {
    let (mut alice, mut bob) = channel_pair(4, 4096)?;
    for expected in 1..=5 {
        assert_eq!(alice.next_message_id(), expected);
        let received = transmit(&mut alice, &mut bob, b"tick", false)?;
        assert_eq!(received.header.message_id(), expected);
        assert_eq!(received.header.channel_id(), 4);
    }
    Ok(())
}

#[test]
fn channel_zero_does_not_send() -> anyhow::Result<()> {
    let (mut alice, _) = channel_pair(0, 1024)?;
    let mut msg = Message::new(0, b"nowhere".to_vec());
    assert_eq!(alice.encode(&mut msg), Err(ChannelError::Message));
    assert_eq!(alice.keys().outgoing_len(), 1024);

    let (_, mut bob) = channel_pair(0, 1024)?;
    assert_eq!(bob.decode(&mut msg), Err(ChannelError::Message));
    Ok(())
}

#[test]
fn encrypted_messages_need_a_decryption_context() -> anyhow::Result<()> {
    let material = random_bytes(4096);
    let mut alice_keys = KeyBuffer::new(QUANTUM);
    alice_keys.push_outgoing(&material);
    let mut bob_keys = KeyBuffer::new(QUANTUM);
    bob_keys.push_incoming(&material);

    let mut alice = Channel::from_definition(6, &definition(), alice_keys)?;
    let bob_definition = AssociationDefinition {
        encryption_incoming: "null".to_owned(),
        ..definition().mirrored()
    };
    let mut bob = Channel::from_definition(6, &bob_definition, bob_keys)?;

    let mut msg = Message::new(0, b"secret".to_vec()).with_encryption(true);
    alice.encode(&mut msg)?;
    assert_eq!(bob.decode(&mut msg), Err(ChannelError::Context));
    assert!(bob.keys().incoming_available(&[(msg.header.authentication_key_id(), 16)]));
    Ok(())
}
