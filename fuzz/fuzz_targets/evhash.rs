#![no_main]
extern crate arbitrary;
extern crate qtunnel_ciphers;

use libfuzzer_sys::fuzz_target;

use qtunnel_cipher_traits::Key;
use qtunnel_ciphers::engine;

#[derive(arbitrary::Arbitrary, Debug)]
pub struct EvHash {
    pub init_key: [u8; 12],
    pub final_key: [u8; 12],
    pub data: Box<[u8]>,
    pub split: u16,
}

fuzz_target!(|input: EvHash| {
    let Ok(mut whole) = engine::create_with_key("evhash", &Key::from_slice(&input.init_key)) else {
        return;
    };
    let mut parts = whole.try_clone().unwrap();

    // splits on block boundaries do not change the tag
    let split = (input.split as usize * 12).min(input.data.len() / 12 * 12);
    whole.add(&input.data).unwrap();
    parts.add(&input.data[..split]).unwrap();
    parts.add(&input.data[split..]).unwrap();

    let key = Key::from_slice(&input.final_key);
    assert_eq!(whole.finalize(&key).unwrap(), parts.finalize(&key).unwrap());
});
