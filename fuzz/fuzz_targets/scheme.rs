#![no_main]
extern crate qtunnel_ciphers;

use libfuzzer_sys::fuzz_target;

use qtunnel_ciphers::engine;

fuzz_target!(|scheme: &str| {
    // Invalid schemes are expected; valid ones must describe themselves faithfully.
    if let Ok(ctx) = engine::create(scheme) {
        let again = engine::create_from_scheme(&ctx.scheme()).unwrap();
        assert_eq!(again.scheme(), ctx.scheme());
    }
});
