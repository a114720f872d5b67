#![no_main]
use infbits::{BitVector, StreamDeserializer, StreamSerializer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Each 5-byte EMPTY_BLOCK header can claim 4 GiB of zeros.
    if data.len() > 64 {
        return;
    }

    let mut bv = BitVector::<65536>::new();
    if bv.deserialize(&mut StreamDeserializer::new(data)).is_err() {
        return;
    }

    // Anything that decodes must survive a re-encode unchanged.
    let mut bytes = Vec::new();
    bv.serialize(&mut StreamSerializer::new(&mut bytes)).unwrap();
    let mut again = BitVector::<32768>::new();
    again
        .deserialize(&mut StreamDeserializer::new(&bytes[..]))
        .unwrap();
    assert_eq!(bv, again);
});
