//! Cardinality, selection order, responses and verification reports.

mod common;

use common::*;
use decoy::prelude::*;

#[test]
fn exact_cardinality_rejects_the_extra_call() {
    let demo = Demo::strict();
    demo.0
        .expect(&VOID_STRING_ARG, [Arg::<String>::is().anything()])
        .unwrap()
        .once();

    demo.void_string_arg("first").unwrap();
    let err = demo.void_string_arg("second").unwrap_err();

    assert!(err.is_violation());
    assert_eq!(
        err.message(),
        r#"IDemo.VoidStringArg("second"); Expected #1, Actual #2."#
    );
    // The expectation itself was met.
    demo.0.verify().unwrap();
    assert!(demo.0.verify_all().is_err());
}

#[test]
fn first_declared_expectation_wins() {
    let demo = Demo::strict();
    demo.0
        .expect(&STRING_ARG_STRING, [Arg::<String>::is().anything()])
        .unwrap()
        .once()
        .returns("first")
        .unwrap();
    demo.0
        .expect(&STRING_ARG_STRING, [Arg::<String>::is().equal("x")])
        .unwrap()
        .returns("second")
        .unwrap();

    assert_eq!(demo.string_arg_string("x").unwrap().as_deref(), Some("first"));
    // The first expectation is exhausted, so the next match is the second one.
    assert_eq!(demo.string_arg_string("x").unwrap().as_deref(), Some("second"));
    assert_eq!(demo.string_arg_string("x").unwrap().as_deref(), Some("second"));
    demo.0.verify().unwrap();
}

#[test]
fn ranged_repeat_reports_the_range() {
    let demo = Demo::strict();
    demo.0
        .expect(&VOID_NO_ARGS, Vec::<ArgSpec>::new())
        .unwrap()
        .repeat(Repeat::between(2, 3).unwrap())
        .unwrap();

    demo.void_no_args().unwrap();
    let err = demo.0.verify().unwrap_err();
    assert_eq!(err.message(), "IDemo.VoidNoArgs(); Expected #(2-3), Actual #1.");

    demo.void_no_args().unwrap();
    demo.void_no_args().unwrap();
    demo.0.verify().unwrap();
    assert!(demo.void_no_args().is_err());
}

#[test]
fn never_rejects_every_call() {
    let demo = Demo::strict();
    demo.0
        .expect(&VOID_NO_ARGS, Vec::<ArgSpec>::new())
        .unwrap()
        .never();

    demo.0.verify().unwrap();
    let err = demo.void_no_args().unwrap_err();
    assert_eq!(err.message(), "IDemo.VoidNoArgs(); Expected #0, Actual #1.");
}

#[test]
fn verify_is_idempotent() {
    let demo = Demo::strict();
    demo.0
        .expect(&VOID_STRING_ARG, [Arg::<String>::is().equal("a")])
        .unwrap()
        .twice();
    demo.void_string_arg("a").unwrap();

    let first = demo.0.report();
    let second = demo.0.report();
    assert_eq!(first, second);
    assert_eq!(first.unmet.len(), 1);
    assert_eq!(first.unmet[0].actual, 1);
    assert_eq!(first.unmet[0].expected, Repeat::times(2));
}

#[test]
fn stubs_are_never_reported_unmet() {
    let demo = Demo::strict();
    demo.0
        .stub(&VOID_STRING_ARG, [Arg::<String>::is().anything()])
        .unwrap();

    let report = demo.0.report();
    assert!(report.is_clean());
    assert_eq!(report.to_string(), "IDemo: all expectations met");
}

#[test]
fn report_lists_unmet_and_unexpected() {
    let demo = Demo::lenient();
    demo.0
        .expect(&VOID_STRING_ARG, [Arg::<String>::is().equal("wanted")])
        .unwrap();
    demo.void_string_arg("other").unwrap();

    let report = demo.0.report();
    assert!(!report.expectations_met());
    assert_eq!(report.unexpected, vec![r#"IDemo.VoidStringArg("other");"#]);
    assert_eq!(demo.0.unexpected_calls(), report.unexpected);

    let text = report.to_string();
    assert!(text.contains(
        r#"unmet: IDemo.VoidStringArg(equal to "wanted"); Expected at least #1, Actual #0."#
    ));
    assert!(text.contains(r#"unexpected: IDemo.VoidStringArg("other");"#));
}

#[test]
fn callback_sees_and_rewrites_the_call() {
    let test = TestInterface::strict();
    test.0
        .expect(
            &REF_OUT,
            [
                Arg::<String>::is().anything(),
                Arg::<i32>::out(3),
                Arg::<String>::is().anything(),
                Arg::<i32>::reference_any(7),
                Arg::<String>::is().anything(),
            ],
        )
        .unwrap()
        .does(|invocation| {
            // Injected values are already in place.
            assert_eq!(invocation.argument(1), Some(&Value::I32(3)));
            assert_eq!(invocation.argument(3), Some(&Value::I32(7)));
            invocation.arguments_mut()[3] = Value::I32(70);
        });

    let mut iout = 0;
    let mut iref = 1;
    test.ref_out("a", &mut iout, "b", &mut iref, "c").unwrap();
    assert_eq!(iout, 3);
    assert_eq!(iref, 70);
}

#[test]
fn callback_return_value_is_converted() {
    let demo = Demo::strict();
    demo.0
        .expect(&STRING_ARG_STRING, [Arg::<String>::is().anything()])
        .unwrap()
        .does(|invocation| {
            let input = invocation.argument(0).map(ToString::to_string).unwrap_or_default();
            invocation.set_return_value(input.to_uppercase());
        });

    assert_eq!(demo.string_arg_string("quiet").unwrap().as_deref(), Some("QUIET"));
}

#[test]
fn callback_returning_the_wrong_kind_is_a_conversion_error() {
    let demo = Demo::strict();
    demo.0
        .expect(&STRING_ARG_STRING, [Arg::<String>::is().anything()])
        .unwrap()
        .does(|invocation| invocation.set_return_value(42i32));

    let err = demo.string_arg_string("x").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Conversion);
}

#[test]
fn raised_calls_still_count_and_skip_write_back() {
    let test = TestInterface::strict();
    test.0
        .expect(
            &REF_OUT,
            [
                Arg::<String>::is().anything(),
                Arg::<i32>::out(3),
                Arg::<String>::is().anything(),
                Arg::<i32>::reference_any(7),
                Arg::<String>::is().anything(),
            ],
        )
        .unwrap()
        .once()
        .raises("connection reset");

    let mut iout = 0;
    let mut iref = 1;
    let err = test
        .ref_out("a", &mut iout, "b", &mut iref, "c")
        .unwrap_err();

    assert_eq!(err.error_type(), ErrorType::Raised);
    assert_eq!(err.message(), "connection reset");
    assert_eq!((iout, iref), (0, 1));
    test.0.verify().unwrap();
}

#[test]
fn returns_is_checked_against_the_declared_return_kind() {
    let service = TestService::lenient();
    let err = service
        .0
        .stub(&GET_USER, [Arg::<i64>::is().anything()])
        .unwrap()
        .returns(12i32)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn lenient_default_follows_the_return_kind() {
    let length = MethodSig::new("IText", "Length")
        .param_of::<String>("s")
        .returns(ValueKind::I32);
    let surrogate = Surrogate::lenient("IText");

    let returned = surrogate
        .invoke(&length, Call::new().arg("abc"))
        .unwrap();
    assert_eq!(returned, Value::I32(0));
}

#[test]
fn wrapper_forwarding_too_few_arguments_is_an_internal_error() {
    let demo = Demo::strict();
    let err = demo
        .0
        .invoke(&VOID_THREE_ARGS, Call::new().arg(1i32))
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Internal);
}

#[test]
fn call_text_marks_missing_parameters() {
    let call = decoy::method::format_call(&VOID_THREE_ARGS, &[Value::I32(1)]);
    assert_eq!(
        call,
        "IDemo.VoidThreeArgs(1, missing parameter, missing parameter);"
    );
}

#[test]
fn surrogates_do_not_share_state() {
    let a = Demo::strict();
    let b = Demo::strict();
    a.0.expect(&VOID_NO_ARGS, Vec::<ArgSpec>::new()).unwrap();

    assert_eq!(a.0.expectation_count(&VOID_NO_ARGS), 1);
    assert_eq!(b.0.expectation_count(&VOID_NO_ARGS), 0);
    assert!(b.void_no_args().is_err());
    assert!(a.void_no_args().is_ok());
}
