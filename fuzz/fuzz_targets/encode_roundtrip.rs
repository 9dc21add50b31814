#![no_main]
use libfuzzer_sys::fuzz_target;

use mtdec::{decode_frame_to_vec, encode_to_vec, EncodeProps, Method};

fuzz_target!(|data: &[u8]| {
    let method = if data.first().map_or(false, |b| b & 1 == 1) { Method::Rle } else { Method::Stored };
    let props = EncodeProps { block_size: 1024, nb_workers: 3, method, content_checksum: true };
    let frame = encode_to_vec(data, &props).expect("in-memory encode");
    let back = decode_frame_to_vec(&frame).expect("decode of fresh frame");
    assert_eq!(back, data);
});
