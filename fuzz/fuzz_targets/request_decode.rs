#![no_main]

use codec::{CellRequest, CodecLimits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let limits = CodecLimits::for_testing();
    if let Ok(request) = CellRequest::decode(data, &limits) {
        // Reserved bits and header forms may differ, but the content must survive.
        let bytes = request.to_bytes().expect("re-encode decoded request");
        let again = CellRequest::decode(&bytes, &CodecLimits::unlimited()).expect("decode re-encoded");
        assert_eq!(again, request);
    }
});
