#![no_main]

use libfuzzer_sys::fuzz_target;
use seriesql::{ConditionNode, Expression};

fuzz_target!(|data: &[u8]| {
    if let Ok(node) = serde_json::from_slice::<ConditionNode>(data) {
        let _ = node.validate();
    }
});
