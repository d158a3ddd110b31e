#![no_main]

use libfuzzer_sys::fuzz_target;
use seriesql::{Expression, Formula};

fuzz_target!(|data: &[u8]| {
    if let Ok(formula) = serde_json::from_slice::<Formula>(data) {
        // Decoding may accept or reject; validation must never panic and
        // must be repeatable on the same value.
        let first = formula.validate().is_ok();
        let second = formula.validate().is_ok();
        assert_eq!(first, second);

        if first {
            let encoded = serde_json::to_string(&formula).expect("valid formula serializes");
            let decoded: Formula = serde_json::from_str(&encoded).expect("round-trip decodes");
            assert_eq!(decoded, formula);
        }
    }
});
