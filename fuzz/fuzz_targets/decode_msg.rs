#![no_main]
extern crate qtunnel;

use libfuzzer_sys::fuzz_target;

use qtunnel::channel::Channel;
use qtunnel::keys::KeyBuffer;
use qtunnel::msgs::Message;
use qtunnel_ciphers::AssociationDefinition;

fuzz_target!(|rx_buf: &[u8]| {
    let definition = AssociationDefinition {
        authentication_incoming: "evhash-96:02cc942de299f4b0d86ffd53".to_owned(),
        authentication_outgoing: "evhash-96:02cc942de299f4b0d86ffd53".to_owned(),
        encryption_incoming: "xor".to_owned(),
        encryption_outgoing: "xor".to_owned(),
    };
    let (_, keys) = KeyBuffer::pair(32, &[0x5a; 4096], &[]);
    let mut channel = Channel::from_definition(1, &definition, keys).unwrap();

    let Ok(mut msg) = Message::from_wire(rx_buf, channel.incoming_tag_len()) else {
        return;
    };
    let before = msg.clone();

    // We expect errors while fuzzing; a failed decode must not touch the message.
    if channel.decode(&mut msg).is_err() {
        assert_eq!(msg, before);
    }
});
