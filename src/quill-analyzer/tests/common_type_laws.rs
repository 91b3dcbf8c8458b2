//! Algebraic laws of the common-type lattice.

use proptest::prelude::*;
use quill_analyzer::coercion::{
    find_tightest_common_type, find_wider_common_type, find_wider_type_for_two, implicit_cast_type,
};
use quill_core::{AbstractDataType, DataType};

fn arb_atomic_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Null),
        Just(DataType::Boolean),
        Just(DataType::Byte),
        Just(DataType::Short),
        Just(DataType::Integer),
        Just(DataType::Long),
        Just(DataType::Float),
        Just(DataType::Double),
        (1u8..=38)
            .prop_flat_map(|p| (Just(p), 0..=p))
            .prop_map(|(precision, scale)| DataType::Decimal { precision, scale }),
        Just(DataType::String),
        Just(DataType::Binary),
        Just(DataType::Date),
        Just(DataType::Timestamp),
        Just(DataType::TimestampNtz),
    ]
}

fn arb_data_type() -> impl Strategy<Value = DataType> {
    arb_atomic_type().prop_recursive(2, 8, 1, |inner| {
        (inner, any::<bool>())
            .prop_map(|(element, contains_null)| DataType::array(element, contains_null))
    })
}

proptest! {
    #[test]
    fn prop_tightest_is_symmetric(a in arb_data_type(), b in arb_data_type(), cs in any::<bool>()) {
        prop_assert_eq!(
            find_tightest_common_type(&a, &b, cs),
            find_tightest_common_type(&b, &a, cs)
        );
    }

    #[test]
    fn prop_wider_is_symmetric(a in arb_data_type(), b in arb_data_type(), cs in any::<bool>()) {
        prop_assert_eq!(find_wider_type_for_two(&a, &b, cs), find_wider_type_for_two(&b, &a, cs));
    }

    #[test]
    fn prop_common_type_of_self_is_self(a in arb_data_type(), cs in any::<bool>()) {
        prop_assert_eq!(find_tightest_common_type(&a, &a, cs), Some(a.clone()));
        prop_assert_eq!(find_wider_common_type(&[a.clone(), a.clone()], cs), Some(a));
    }

    #[test]
    fn prop_null_is_bottom(a in arb_data_type()) {
        prop_assert_eq!(find_tightest_common_type(&DataType::Null, &a, false), Some(a));
    }

    #[test]
    fn prop_wider_extends_tightest(a in arb_data_type(), b in arb_data_type()) {
        if let Some(t) = find_tightest_common_type(&a, &b, false) {
            prop_assert_eq!(find_wider_type_for_two(&a, &b, false), Some(t));
        }
    }

    #[test]
    fn prop_wider_decimal_keeps_both_scales(
        (p1, s1) in (1u8..=38, 0u8..=38),
        (p2, s2) in (1u8..=38, 0u8..=38),
    ) {
        // Scales above the precision still widen without underflow.
        let a = DataType::Decimal { precision: p1, scale: s1 };
        let b = DataType::Decimal { precision: p2, scale: s2 };
        let wider = find_wider_type_for_two(&a, &b, false);
        let Some(DataType::Decimal { precision, scale }) = wider else {
            return Err(TestCaseError::fail(format!("no decimal for {a} and {b}: {wider:?}")));
        };
        prop_assert!(scale <= precision);
        prop_assert!(precision <= 38);
    }

    #[test]
    fn prop_implicit_cast_target_is_accepted(a in arb_atomic_type()) {
        let expected = [
            AbstractDataType::AnyNumeric,
            AbstractDataType::AnyIntegral,
            AbstractDataType::AnyDecimal,
            AbstractDataType::AnyTimestamp,
            DataType::String.into(),
        ];
        for target in expected {
            if let Some(t) = implicit_cast_type(&a, &target) {
                prop_assert!(target.accepts_type(&t), "{} -> {}", a, t);
            }
        }
    }
}
