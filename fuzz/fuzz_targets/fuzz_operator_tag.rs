#![no_main]

use libfuzzer_sys::fuzz_target;
use seriesql::{ArithmeticOperator, Expression, Formula};

fuzz_target!(|tag: &str| {
    let formula = Formula::new(tag, None);
    // validate() accepts exactly the canonical tag catalog.
    assert_eq!(
        formula.validate().is_ok(),
        ArithmeticOperator::from_tag(tag).is_some()
    );
});
