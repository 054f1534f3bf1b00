use proptest::prelude::*;
use pullbridge_core::AppError;
use serde_json::{Value, json};

use super::{FilterExpression, normalize_filter};

fn run(expression: &str, input: Value) -> Vec<Value> {
    let filter = FilterExpression::parse(expression);
    assert!(filter.is_ok(), "failed to parse {expression}");
    let outputs = filter
        .unwrap_or_else(|_| unreachable!())
        .apply(&input);
    assert!(outputs.is_ok(), "failed to evaluate {expression}");
    outputs.unwrap_or_default()
}

fn run_error(expression: &str, input: Value) -> String {
    let result = FilterExpression::parse(expression).and_then(|filter| filter.apply(&input));
    assert!(
        matches!(result, Err(AppError::Transform(_))),
        "{expression} should fail with a transform error, got {result:?}"
    );
    result.err().map(|error| error.to_string()).unwrap_or_default()
}

#[test]
fn select_keeps_matching_records_from_batch() {
    let outputs = run(".[] | select(.a > 1)", json!([{"a": 1}, {"a": 2}]));
    assert_eq!(outputs, vec![json!({"a": 2})]);
}

#[test]
fn normalization_strips_spaces_and_newlines() {
    assert_eq!(
        normalize_filter(".[]\n| select( .a > 1 )"),
        ".[]|select(.a>1)"
    );
}

#[test]
fn reshapes_tracking_records_into_observations() {
    let input = json!([
        {
            "device": {"id": "collar-7", "name": "Kiboko"},
            "fix": {"lat": -1.28, "lon": 36.82, "ts": 1_700_000_000},
            "battery": 81
        },
        {
            "device": {"id": "collar-9", "name": "Tembo"},
            "fix": null,
            "battery": 12
        }
    ]);
    let expression = r#"
        .[]
        | select(.fix != null)
        | {
            source: .device.id,
            source_name: .device.name,
            recorded_at: (.fix.ts | todate),
            location: {lat: .fix.lat, lon: .fix.lon},
            additional: {battery: .battery}
          }
    "#;

    let outputs = run(expression, input);
    assert_eq!(
        outputs,
        vec![json!({
            "source": "collar-7",
            "source_name": "Kiboko",
            "recorded_at": "2023-11-14T22:13:20Z",
            "location": {"lat": -1.28, "lon": 36.82},
            "additional": {"battery": 81}
        })]
    );
}

#[test]
fn comma_and_array_construction_collect_outputs() {
    assert_eq!(run("[.[] | .a]", json!([{"a": 1}, {"a": 2}])), vec![json!([1, 2])]);
    assert_eq!(run(".a, .b", json!({"a": 1, "b": 2})), vec![json!(1), json!(2)]);
}

#[test]
fn alternative_falls_back_on_null_and_errors() {
    assert_eq!(run(".missing // \"default\"", json!({})), vec![json!("default")]);
    assert_eq!(run("(.a.b.c) // 5", json!({"a": 3})), vec![json!(5)]);
    assert_eq!(run(".a // 5", json!({"a": 0})), vec![json!(0)]);
}

#[test]
fn boolean_keywords_survive_whitespace_removal() {
    let input = json!([{"a": 2, "b": 1}, {"a": 2, "b": 9}, {"a": 0, "b": 1}]);
    assert_eq!(
        run(".[] | select(.a > 1 and .b < 2) | .b", input.clone()),
        vec![json!(1)]
    );
    assert_eq!(
        run("[.[] | select(.a == 0 or .b == 9) | .b]", input),
        vec![json!([9, 1])]
    );
}

#[test]
fn conditionals_choose_branch_per_value() {
    let outputs = run(
        r#"[.[] | if .speed > 5 then "moving" elif .speed > 0 then "grazing" else "resting" end]"#,
        json!([{"speed": 9}, {"speed": 1}, {"speed": 0}]),
    );
    // Whitespace removal glues `then "moving"` etc., which string literals tolerate.
    assert_eq!(outputs, vec![json!(["moving", "grazing", "resting"])]);
}

#[test]
fn indexing_and_slicing_follow_jq_semantics() {
    let input = json!({"points": [10, 20, 30, 40]});
    assert_eq!(run(".points[-1]", input.clone()), vec![json!(40)]);
    assert_eq!(run(".points[1:3]", input.clone()), vec![json!([20, 30])]);
    assert_eq!(run(".points[9]", input.clone()), vec![Value::Null]);
    assert_eq!(run(".\"points\" | length", input), vec![json!(4)]);
}

#[test]
fn builtins_cover_common_reshaping() {
    assert_eq!(
        run("map(.v) | add", json!([{"v": 1}, {"v": 2.5}])),
        vec![json!(3.5)]
    );
    assert_eq!(
        run("sort_by(.t) | map(.id)", json!([{"id": "b", "t": 2}, {"id": "a", "t": 1}])),
        vec![json!(["a", "b"])]
    );
    assert_eq!(
        run("with_entries(select(.value != null))", json!({"a": 1, "b": null})),
        vec![json!({"a": 1})]
    );
    assert_eq!(
        run(".name | split(\"-\") | join(\"/\")", json!({"name": "a-b-c"})),
        vec![json!("a/b/c")]
    );
    assert_eq!(
        run("[.[] | tostring]", json!([1, "x", null])),
        vec![json!(["1", "x", "null"])]
    );
    assert_eq!(run("keys", json!({"b": 1, "a": 2})), vec![json!(["a", "b"])]);
    assert_eq!(run("unique", json!([3, 1, 3, 2])), vec![json!([1, 2, 3])]);
    assert_eq!(run("has(\"a\")", json!({"a": null})), vec![json!(true)]);
}

#[test]
fn object_construction_multiplies_outputs() {
    let outputs = run("{id: .ids[], kind}", json!({"ids": [1, 2], "kind": "gps"}));
    assert_eq!(
        outputs,
        vec![json!({"id": 1, "kind": "gps"}), json!({"id": 2, "kind": "gps"})]
    );
}

#[test]
fn jq_ordering_across_types() {
    assert_eq!(
        run("sort", json!([{"a": 1}, [1], "s", 2, true, false, null])),
        vec![json!([null, false, true, 2, "s", [1], {"a": 1}])]
    );
}

#[test]
fn optional_operator_suppresses_errors() {
    assert_eq!(run("[.[] | .a?]", json!([1, {"a": 2}])), vec![json!([2])]);
}

#[test]
fn type_mismatch_is_transform_error() {
    let filter = FilterExpression::parse(".[] | .a");
    assert!(filter.is_ok());
    let result = filter
        .unwrap_or_else(|_| unreachable!())
        .apply(&json!([1, 2]));
    assert!(matches!(result, Err(AppError::Transform(message)) if message.contains("cannot index number")));
}

#[test]
fn malformed_expression_is_transform_error() {
    assert!(matches!(
        FilterExpression::parse(".[] | select(.a >"),
        Err(AppError::Transform(_))
    ));
    assert!(matches!(
        FilterExpression::parse("unknown_fn"),
        Ok(_)
    ));
    let unknown = FilterExpression::parse("unknown_fn").map(|filter| filter.apply(&json!(null)));
    assert!(matches!(unknown, Ok(Err(AppError::Transform(_)))));
}

#[test]
fn optional_keeps_outputs_produced_before_the_error() {
    assert_eq!(
        run("[(.[] | .a)?]", json!([{"a": 1}, 2, {"a": 3}])),
        vec![json!([1])]
    );
    assert_eq!(run("[.[] | (error(\"bad\"))?]", json!([1, 2])), vec![json!([])]);
    assert_eq!(run("(error(\"bad\")) // 5", json!(null)), vec![json!(5)]);
    assert!(run_error("error(\"bad_record\")", json!(null)).contains("bad_record"));
}

#[test]
fn string_interpolation_renders_each_output() {
    let input = json!([
        {"device": {"id": "c7"}, "battery": 81, "meta": {"a": 1}},
        {"device": {"id": "c9"}, "battery": null, "meta": [1]}
    ]);

    assert_eq!(
        run(r#".[] | "\(.device.id)/\(.battery)""#, input.clone()),
        vec![json!("c7/81"), json!("c9/null")]
    );
    assert_eq!(
        run(r#"[.[] | "meta=\(.meta)"]"#, input.clone()),
        vec![json!(["meta={\"a\":1}", "meta=[1]"])]
    );
    assert_eq!(
        run(r#"[.[] | {("id-\(.device.id)"): .battery}]"#, input),
        vec![json!([{"id-c7": 81}, {"id-c9": null}])]
    );
}

#[test]
fn containment_and_regex_predicates() {
    assert_eq!(
        run(".tags | contains([\"gps\"])", json!({"tags": ["gps", "vhf"]})),
        vec![json!(true)]
    );
    assert_eq!(
        run("contains({a: {b: 1}})", json!({"a": {"b": 1, "c": 2}})),
        vec![json!(true)]
    );
    assert_eq!(run(".name | contains(\"bok\")", json!({"name": "Kiboko"})), vec![json!(true)]);
    assert_eq!(run("[\"gps\"] | inside([\"gps\", \"vhf\"])", json!(null)), vec![json!(true)]);
    run_error("contains(\"gps\")", json!(["gps"]));

    assert_eq!(
        run(
            r#"[.[] | select(.id | test("^collar-\\d+$")) | .id]"#,
            json!([{"id": "collar-7"}, {"id": "tag-2"}])
        ),
        vec![json!(["collar-7"])]
    );
    assert_eq!(
        run(".name | test(\"KIB\"; \"i\")", json!({"name": "Kiboko"})),
        vec![json!(true)]
    );
    run_error(".name | test(\"(\")", json!({"name": "Kiboko"}));
    run_error(".name | test(\"a\"; \"q\")", json!({"name": "Kiboko"}));
}

#[test]
fn affix_trimming_leaves_non_matching_values_alone() {
    assert_eq!(run(".id | ltrimstr(\"collar-\")", json!({"id": "collar-7"})), vec![json!("7")]);
    assert_eq!(run(".file | rtrimstr(\".json\")", json!({"file": "fix.json"})), vec![json!("fix")]);
    assert_eq!(run("ltrimstr(\"x\")", json!("abc")), vec![json!("abc")]);
    assert_eq!(run("rtrimstr(\"x\")", json!(5)), vec![json!(5)]);
}

#[test]
fn dates_parse_and_format() {
    let input = json!({"ts": "2023-11-14T22:13:20Z", "offset": "2023-11-14T23:13:20+01:00", "t": 1_700_000_000});

    assert_eq!(run(".ts | fromdateiso8601", input.clone()), vec![json!(1_700_000_000)]);
    assert_eq!(run(".ts | fromdate", input.clone()), vec![json!(1_700_000_000)]);
    assert_eq!(run(".offset | fromdate", input.clone()), vec![json!(1_700_000_000)]);
    assert_eq!(run(".t | strftime(\"%Y-%m-%d\")", input.clone()), vec![json!("2023-11-14")]);
    assert_eq!(run(".t | strftime(\"%H:%M\")", input.clone()), vec![json!("22:13")]);
    assert_eq!(run(".t | todateiso8601", input.clone()), vec![json!("2023-11-14T22:13:20Z")]);

    run_error(".ts | strftime(\"%Y\")", input.clone());
    run_error(".t | strftime(\"%Y%\")", input);
    run_error("fromdate", json!("14/11/2023"));
    run_error("todate", json!(1e20));
}

#[test]
fn rounding_and_extremes() {
    assert_eq!(run("[.[] | ceil]", json!([1.2, -1.5])), vec![json!([2, -1])]);
    assert_eq!(run("[.[] | round]", json!([1.5, -1.5, 2.4])), vec![json!([2, -2, 2])]);
    assert_eq!(run("min", json!([3, 1, 2])), vec![json!(1)]);
    assert_eq!(run("max", json!([])), vec![Value::Null]);
    assert_eq!(
        run("min_by(.t)", json!([{"id": "a", "t": 2}, {"id": "b", "t": 1}])),
        vec![json!({"id": "b", "t": 1})]
    );
    assert_eq!(
        run("max_by(.t) | .id", json!([{"id": "a", "t": 2}, {"id": "b", "t": 2}])),
        vec![json!("b")]
    );
}

#[test]
fn grouping_and_first_last() {
    let fixes = json!([{"kind": "gps"}, {"kind": "vhf"}, {"kind": "gps"}]);
    assert_eq!(run("group_by(.kind) | map(length)", fixes.clone()), vec![json!([2, 1])]);
    assert_eq!(run("unique_by(.kind) | map(.kind)", fixes), vec![json!(["gps", "vhf"])]);

    assert_eq!(run("first", json!([1, 2])), vec![json!(1)]);
    assert_eq!(run("last", json!([1, 2])), vec![json!(2)]);
    assert_eq!(run("first(.[] | select(. > 1))", json!([1, 2, 3])), vec![json!(2)]);
    assert_eq!(run("first(.[] | 10 / .)", json!([2, 0])), vec![json!(5)]);
    assert_eq!(run("[first(empty)]", json!(null)), vec![json!([])]);
    assert_eq!(run("last(empty)", json!(null)), vec![Value::Null]);
}

#[test]
fn quantifiers_and_flattening() {
    assert_eq!(run("any", json!([false, 1])), vec![json!(true)]);
    assert_eq!(run("all", json!([true, null])), vec![json!(false)]);
    assert_eq!(run("any(. > 2)", json!([1, 3])), vec![json!(true)]);
    assert_eq!(run("all(. > 0)", json!([])), vec![json!(true)]);

    assert_eq!(run("flatten", json!([1, [2, [3]]])), vec![json!([1, 2, 3])]);
    assert_eq!(run("flatten(1)", json!([1, [2, [3]]])), vec![json!([1, 2, [3]])]);
    run_error("flatten(-1)", json!([1, [2]]));
}

#[test]
fn value_mapping_and_deletion() {
    assert_eq!(run("map_values(. + 1)", json!({"a": 1, "b": 2})), vec![json!({"a": 2, "b": 3})]);
    assert_eq!(run("map_values(select(. > 1))", json!({"a": 1, "b": 2})), vec![json!({"b": 2})]);
    assert_eq!(run("[.[] | values]", json!([1, null, 2])), vec![json!([1, 2])]);
    assert_eq!(run(".payload | fromjson | .a", json!({"payload": "{\"a\":1}"})), vec![json!(1)]);

    assert_eq!(run("del(.secret)", json!({"a": 1, "secret": "x"})), vec![json!({"a": 1})]);
    assert_eq!(run("del(.[0, 2])", json!([1, 2, 3, 4])), vec![json!([2, 4])]);
    assert_eq!(
        run("del(.[] | select(. == null))", json!([1, null, 2, null])),
        vec![json!([1, 2])]
    );
    assert_eq!(
        run("del(.a.b)", json!({"a": {"b": 1, "c": 2}})),
        vec![json!({"a": {"c": 2}})]
    );
    run_error("del(.a + 1)", json!({"a": 1}));
}

#[test]
fn arithmetic_edge_cases_are_transform_errors() {
    assert_eq!(run(".[] | .a % -1", json!([{"a": -1e19}])), vec![json!(0)]);
    assert_eq!(run(".a % 3", json!({"a": -7})), vec![json!(-1)]);
    run_error(".a % 0", json!({"a": 1}));
    run_error(".a % 0.5", json!({"a": 1}));
    run_error(".a / 0", json!({"a": 1}));

    assert_eq!(run(".s * 3", json!({"s": "ab"})), vec![json!("ababab")]);
    assert_eq!(run(".s * 0", json!({"s": "ab"})), vec![Value::Null]);
    assert!(run_error(".[] | .s * .n", json!([{"s": "ab", "n": 1e19}])).contains("exceeds"));
    assert!(run_error(".s * .n", json!({"s": "ab", "n": 1e7})).contains("exceeds"));

    run_error("tonumber", json!("nan"));
    run_error("tonumber", json!("inf"));
}

fn json_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<i64>().prop_map(|value| value as f64),
        -1e300_f64..1e300,
        Just(-1e19),
        Just(1e19),
        Just(0.0),
        Just(-1.0),
        Just(0.5),
        Just(f64::MAX),
        Just(f64::MIN),
    ]
}

fn cosmetic_whitespace() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(" "), Just("\n"), Just("")], 0..3)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn cosmetic_whitespace_does_not_change_results(
        values in prop::collection::vec(-50_i64..50, 0..12),
        threshold in -50_i64..50,
        pads in prop::collection::vec(cosmetic_whitespace(), 8),
    ) {
        let compact = format!(".[]|select(.a>{threshold})|{{a:.a,double:(.a*2)}}");
        let padded = format!(
            "{}.[]{}|{}select(.a>{threshold}){}|{}{{a:.a,{}double:(.a*2)}}{}",
            pads[0], pads[1], pads[2], pads[3], pads[4], pads[5], pads[6],
        );
        let input = Value::Array(values.iter().map(|value| json!({"a": value})).collect());

        let compact_result = FilterExpression::parse(compact.as_str())
            .and_then(|filter| filter.apply(&input));
        let padded_result = FilterExpression::parse(padded.as_str())
            .and_then(|filter| filter.apply(&input));

        prop_assert!(compact_result.is_ok());
        prop_assert!(padded_result.is_ok());
        prop_assert_eq!(
            compact_result.unwrap_or_default(),
            padded_result.unwrap_or_default()
        );
    }

    #[test]
    fn arithmetic_on_arbitrary_numbers_never_panics(
        lhs in json_number(),
        rhs in json_number(),
        op in prop_oneof![Just("+"), Just("-"), Just("*"), Just("/"), Just("%")],
    ) {
        let input = json!({"lhs": lhs, "rhs": rhs, "text": "ab"});
        for expression in [
            format!(".lhs{op}.rhs"),
            format!(".text{op}.rhs"),
            format!(".rhs{op}.text"),
        ] {
            let result = FilterExpression::parse(expression.as_str())
                .and_then(|filter| filter.apply(&input));
            prop_assert!(
                matches!(result, Ok(_) | Err(AppError::Transform(_))),
                "{} produced {:?}",
                expression,
                result
            );
        }
    }

    #[test]
    fn normalization_is_idempotent(expression in "[ .a-z\n|\\[\\]]{0,40}") {
        let once = normalize_filter(expression.as_str());
        prop_assert_eq!(normalize_filter(once.as_str()), once.clone());
        prop_assert!(!once.contains(' ') && !once.contains('\n'));
    }
}
