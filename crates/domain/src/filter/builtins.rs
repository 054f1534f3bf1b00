use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use pullbridge_core::{AppError, AppResult};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::eval::{
    add_values, compare_values, describe_key, describe_value, eval_error, evaluate,
    evaluate_until_error, index_value, is_truthy, iterate_value, split_string, to_text,
    type_error, type_name,
};
use super::parser::{Ast, number_value};

const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Depth used by `flatten` without an argument.
const FULL_FLATTEN_DEPTH: i64 = 1_000_000_000;

pub(super) fn call_builtin(name: &str, args: &[Ast], input: &Value) -> AppResult<Vec<Value>> {
    match (name, args) {
        ("empty", []) => Ok(Vec::new()),
        ("error", []) => Err(eval_error(to_text(input))),
        ("error", [message]) => match evaluate(message, input)?.first() {
            Some(message) => Err(eval_error(to_text(message))),
            None => Ok(Vec::new()),
        },
        ("not", []) => Ok(one(Value::Bool(!is_truthy(input)))),
        ("values", []) => Ok(if input.is_null() {
            Vec::new()
        } else {
            one(input.clone())
        }),
        ("length", []) => length(input).map(one),
        ("keys", []) => keys(input, true).map(one),
        ("keys_unsorted", []) => keys(input, false).map(one),
        ("type", []) => Ok(one(Value::String(type_name(input).to_owned()))),
        ("tostring", []) => Ok(one(Value::String(to_text(input)))),
        ("tojson", []) => Ok(one(Value::String(input.to_string()))),
        ("fromjson", []) => from_json(input).map(one),
        ("tonumber", []) => to_number(input).map(one),
        ("add", []) => add_all(input).map(one),
        ("reverse", []) => reverse(input).map(one),
        ("sort", []) => sorted_array(input, "sort").map(|items| one(Value::Array(items))),
        ("unique", []) => sorted_array(input, "unique").map(|mut items| {
            items.dedup_by(|lhs, rhs| compare_values(lhs, rhs) == Ordering::Equal);
            one(Value::Array(items))
        }),
        ("floor", []) => round_number(input, "floor", f64::floor).map(one),
        ("ceil", []) => round_number(input, "ceil", f64::ceil).map(one),
        ("round", []) => round_number(input, "round", f64::round).map(one),
        ("min", []) => extreme(input, None, "min", false).map(one),
        ("max", []) => extreme(input, None, "max", true).map(one),
        ("min_by", [selector]) => extreme(input, Some(selector), "min_by", false).map(one),
        ("max_by", [selector]) => extreme(input, Some(selector), "max_by", true).map(one),
        ("first", []) => index_value(input, &Value::from(0)).map(one),
        ("last", []) => index_value(input, &Value::from(-1)).map(one),
        ("first", [generator]) => first_output(generator, input),
        ("last", [generator]) => Ok(one(
            evaluate(generator, input)?.pop().unwrap_or(Value::Null),
        )),
        ("any", []) => any_or_all(input, None, "any", true).map(one),
        ("all", []) => any_or_all(input, None, "all", false).map(one),
        ("any", [predicate]) => any_or_all(input, Some(predicate), "any", true).map(one),
        ("all", [predicate]) => any_or_all(input, Some(predicate), "all", false).map(one),
        ("flatten", []) => flatten(input, &Value::from(FULL_FLATTEN_DEPTH)).map(one),
        ("flatten", [depth]) => evaluate(depth, input)?
            .iter()
            .map(|depth| flatten(input, depth))
            .collect(),
        ("ascii_downcase", []) => match input {
            Value::String(text) => Ok(one(Value::String(text.to_ascii_lowercase()))),
            other => Err(type_error(other, "ascii_downcase")),
        },
        ("ascii_upcase", []) => match input {
            Value::String(text) => Ok(one(Value::String(text.to_ascii_uppercase()))),
            other => Err(type_error(other, "ascii_upcase")),
        },
        ("ltrimstr", [prefix]) => trim_affix(input, prefix, |text, prefix| {
            text.strip_prefix(prefix).map(str::to_owned)
        }),
        ("rtrimstr", [suffix]) => trim_affix(input, suffix, |text, suffix| {
            text.strip_suffix(suffix).map(str::to_owned)
        }),
        ("to_entries", []) => to_entries(input).map(one),
        ("from_entries", []) => from_entries(input).map(one),
        ("todate" | "todateiso8601", []) => {
            format_timestamp(input, ISO8601_FORMAT, name).map(one)
        }
        ("fromdate" | "fromdateiso8601", []) => parse_timestamp(input, name).map(one),
        ("strftime", [format]) => evaluate(format, input)?
            .iter()
            .map(|format| match format {
                Value::String(format) => format_timestamp(input, format, "strftime"),
                other => Err(type_error(other, "strftime")),
            })
            .collect(),
        ("now", []) => Ok(one(number_value(
            Utc::now().timestamp_millis() as f64 / 1000.0,
        ))),
        ("select", [predicate]) => Ok(evaluate(predicate, input)?
            .iter()
            .filter(|value| is_truthy(value))
            .map(|_| input.clone())
            .collect()),
        ("map", [mapper]) => {
            let mut mapped = Vec::new();
            for item in iterate_value(input)? {
                mapped.extend(evaluate(mapper, &item)?);
            }
            Ok(one(Value::Array(mapped)))
        }
        ("map_values", [mapper]) => map_values(input, mapper).map(one),
        ("with_entries", [mapper]) => {
            let mut mapped = Vec::new();
            for entry in iterate_value(&to_entries(input)?)? {
                mapped.extend(evaluate(mapper, &entry)?);
            }
            from_entries(&Value::Array(mapped)).map(one)
        }
        ("has", [key]) => evaluate(key, input)?
            .iter()
            .map(|key| has_key(input, key).map(Value::Bool))
            .collect(),
        ("contains", [element]) => evaluate(element, input)?
            .iter()
            .map(|element| contains(input, element))
            .collect(),
        ("inside", [container]) => evaluate(container, input)?
            .iter()
            .map(|container| contains(container, input))
            .collect(),
        ("sort_by", [selector]) => {
            sort_by(input, selector, "sort_by").map(|items| one(Value::Array(items)))
        }
        ("group_by", [selector]) => group_by(input, selector, "group_by").map(|groups| {
            one(Value::Array(groups.into_iter().map(Value::Array).collect()))
        }),
        ("unique_by", [selector]) => group_by(input, selector, "unique_by").map(|groups| {
            one(Value::Array(
                groups
                    .into_iter()
                    .filter_map(|group| group.into_iter().next())
                    .collect(),
            ))
        }),
        ("startswith", [prefix]) => string_predicate(input, prefix, "startswith", |text, arg| {
            text.starts_with(arg)
        }),
        ("endswith", [suffix]) => string_predicate(input, suffix, "endswith", |text, arg| {
            text.ends_with(arg)
        }),
        ("test", [pattern]) => test_regex(input, pattern, None),
        ("test", [pattern, flags]) => test_regex(input, pattern, Some(flags)),
        ("split", [separator]) => {
            let Value::String(text) = input else {
                return Err(type_error(input, "split"));
            };
            evaluate(separator, input)?
                .iter()
                .map(|separator| match separator {
                    Value::String(separator) => Ok(split_string(text, separator)),
                    other => Err(type_error(other, "split")),
                })
                .collect()
        }
        ("join", [separator]) => evaluate(separator, input)?
            .iter()
            .map(|separator| join(input, separator))
            .collect(),
        ("del", [selector]) => delete_paths(input, selector).map(one),
        _ => Err(eval_error(format!("{name}/{} is not defined", args.len()))),
    }
}

fn one(value: Value) -> Vec<Value> {
    vec![value]
}

fn length(input: &Value) -> AppResult<Value> {
    match input {
        Value::Null => Ok(Value::from(0)),
        Value::Number(number) => Ok(number_value(number.as_f64().unwrap_or_default().abs())),
        Value::String(text) => Ok(Value::from(text.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
        Value::Bool(_) => Err(eval_error(format!("{} has no length", describe_value(input)))),
    }
}

fn keys(input: &Value, sorted: bool) -> AppResult<Value> {
    match input {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            if sorted {
                names.sort();
            }
            Ok(Value::Array(
                names
                    .into_iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ))
        }
        Value::Array(items) => Ok(Value::Array((0..items.len()).map(Value::from).collect())),
        other => Err(eval_error(format!("{} has no keys", describe_value(other)))),
    }
}

fn from_json(input: &Value) -> AppResult<Value> {
    let Value::String(text) = input else {
        return Err(type_error(input, "fromjson"));
    };

    serde_json::from_str(text)
        .map_err(|error| eval_error(format!("{text} cannot be parsed as JSON: {error}")))
}

fn to_number(input: &Value) -> AppResult<Value> {
    match input {
        Value::Number(_) => Ok(input.clone()),
        Value::String(text) => text
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(number_value)
            .ok_or_else(|| eval_error(format!("cannot parse '{text}' as a number"))),
        other => Err(type_error(other, "tonumber")),
    }
}

fn round_number(input: &Value, function: &str, rounding: fn(f64) -> f64) -> AppResult<Value> {
    match input.as_f64() {
        Some(number) => Ok(number_value(rounding(number))),
        None => Err(type_error(input, function)),
    }
}

fn add_all(input: &Value) -> AppResult<Value> {
    let items = match input {
        Value::Null => return Ok(Value::Null),
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.values().cloned().collect(),
        other => return Err(type_error(other, "add")),
    };

    items
        .iter()
        .try_fold(Value::Null, |total, item| add_values(&total, item))
}

fn reverse(input: &Value) -> AppResult<Value> {
    match input {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
        Value::String(text) => Ok(Value::String(text.chars().rev().collect())),
        other => Err(type_error(other, "reverse")),
    }
}

fn sorted_array(input: &Value, function: &str) -> AppResult<Vec<Value>> {
    let Value::Array(items) = input else {
        return Err(type_error(input, function));
    };

    let mut items = items.clone();
    items.sort_by(compare_values);
    Ok(items)
}

// Pairs each array item with the collected outputs of `selector`.
fn keyed_items(input: &Value, selector: &Ast, function: &str) -> AppResult<Vec<(Value, Value)>> {
    let Value::Array(items) = input else {
        return Err(type_error(input, function));
    };

    items
        .iter()
        .map(|item| Ok((Value::Array(evaluate(selector, item)?), item.clone())))
        .collect()
}

fn sort_by(input: &Value, selector: &Ast, function: &str) -> AppResult<Vec<Value>> {
    let mut keyed = keyed_items(input, selector, function)?;
    keyed.sort_by(|(lhs, _), (rhs, _)| compare_values(lhs, rhs));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

fn group_by(input: &Value, selector: &Ast, function: &str) -> AppResult<Vec<Vec<Value>>> {
    let mut keyed = keyed_items(input, selector, function)?;
    keyed.sort_by(|(lhs, _), (rhs, _)| compare_values(lhs, rhs));

    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for (key, item) in keyed {
        match groups.last_mut() {
            Some((group_key, members)) if compare_values(group_key, &key) == Ordering::Equal => {
                members.push(item);
            }
            _ => groups.push((key, vec![item])),
        }
    }

    Ok(groups.into_iter().map(|(_, members)| members).collect())
}

// Ties keep the first minimum and the last maximum, as jq does.
fn extreme(
    input: &Value,
    selector: Option<&Ast>,
    function: &str,
    pick_max: bool,
) -> AppResult<Value> {
    let keyed = match selector {
        Some(selector) => keyed_items(input, selector, function)?,
        None => match input {
            Value::Array(items) => items.iter().map(|item| (item.clone(), item.clone())).collect(),
            other => return Err(type_error(other, function)),
        },
    };

    let mut best: Option<(Value, Value)> = None;
    for (key, item) in keyed {
        let replace = match &best {
            None => true,
            Some((best_key, _)) => {
                let order = compare_values(&key, best_key);
                if pick_max {
                    order != Ordering::Less
                } else {
                    order == Ordering::Less
                }
            }
        };
        if replace {
            best = Some((key, item));
        }
    }

    Ok(best.map(|(_, item)| item).unwrap_or(Value::Null))
}

// Outputs after the first are never observed, and neither are their errors.
fn first_output(generator: &Ast, input: &Value) -> AppResult<Vec<Value>> {
    if let Some(first) = evaluate_until_error(generator, input).into_iter().next() {
        return Ok(one(first));
    }

    evaluate(generator, input).map(|_| Vec::new())
}

fn any_or_all(
    input: &Value,
    predicate: Option<&Ast>,
    function: &str,
    any: bool,
) -> AppResult<Value> {
    let items = iterate_value(input).map_err(|_| type_error(input, function))?;

    for item in &items {
        let verdicts = match predicate {
            Some(predicate) => evaluate(predicate, item)?,
            None => one(item.clone()),
        };
        if verdicts.iter().any(|verdict| is_truthy(verdict) == any) {
            return Ok(Value::Bool(any));
        }
    }

    Ok(Value::Bool(!any))
}

fn flatten(input: &Value, depth: &Value) -> AppResult<Value> {
    let Some(depth) = depth.as_f64() else {
        return Err(type_error(depth, "flatten"));
    };
    if depth < 0.0 {
        return Err(eval_error("flatten depth must not be negative".to_owned()));
    }
    let Value::Array(items) = input else {
        return Err(type_error(input, "flatten"));
    };

    let mut flat = Vec::new();
    flatten_into(items, depth, &mut flat);
    Ok(Value::Array(flat))
}

fn flatten_into(items: &[Value], depth: f64, flat: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(nested) if depth > 0.0 => flatten_into(nested, depth - 1.0, flat),
            other => flat.push(other.clone()),
        }
    }
}

// Keeps the first output per value and drops values whose mapper is empty.
fn map_values(input: &Value, mapper: &Ast) -> AppResult<Value> {
    match input {
        Value::Object(map) => {
            let mut mapped = Map::new();
            for (key, value) in map {
                if let Some(first) = evaluate(mapper, value)?.into_iter().next() {
                    mapped.insert(key.clone(), first);
                }
            }
            Ok(Value::Object(mapped))
        }
        Value::Array(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                if let Some(first) = evaluate(mapper, item)?.into_iter().next() {
                    mapped.push(first);
                }
            }
            Ok(Value::Array(mapped))
        }
        other => Err(type_error(other, "map_values")),
    }
}

fn trim_affix(
    input: &Value,
    affix: &Ast,
    strip: fn(&str, &str) -> Option<String>,
) -> AppResult<Vec<Value>> {
    Ok(evaluate(affix, input)?
        .iter()
        .map(|affix| match (input, affix) {
            (Value::String(text), Value::String(affix)) => strip(text, affix)
                .map(Value::String)
                .unwrap_or_else(|| input.clone()),
            _ => input.clone(),
        })
        .collect())
}

fn to_entries(input: &Value) -> AppResult<Value> {
    let Value::Object(map) = input else {
        return Err(type_error(input, "to_entries"));
    };

    Ok(Value::Array(
        map.iter()
            .map(|(key, value)| {
                let mut entry = Map::new();
                entry.insert("key".to_owned(), Value::String(key.clone()));
                entry.insert("value".to_owned(), value.clone());
                Value::Object(entry)
            })
            .collect(),
    ))
}

fn from_entries(input: &Value) -> AppResult<Value> {
    let mut object = Map::new();

    for entry in iterate_value(input)? {
        let Value::Object(fields) = &entry else {
            return Err(type_error(&entry, "from_entries"));
        };
        let key = ["key", "k", "name", "Name", "K", "Key"]
            .iter()
            .find_map(|name| fields.get(*name).filter(|value| !value.is_null()));
        let key = match key {
            Some(Value::String(key)) => key.clone(),
            Some(Value::Number(key)) => key.to_string(),
            Some(Value::Bool(key)) => key.to_string(),
            _ => {
                return Err(eval_error(format!(
                    "from_entries entry {entry} has no usable key"
                )));
            }
        };
        let value = ["value", "v", "Value"]
            .iter()
            .find_map(|name| fields.get(*name))
            .cloned()
            .unwrap_or(Value::Null);
        object.insert(key, value);
    }

    Ok(Value::Object(object))
}

fn format_timestamp(input: &Value, format: &str, function: &str) -> AppResult<Value> {
    let Some(seconds) = input.as_f64() else {
        return Err(type_error(input, function));
    };
    let timestamp = DateTime::from_timestamp(seconds.trunc() as i64, 0)
        .ok_or_else(|| eval_error(format!("timestamp {seconds} is out of range")))?;

    let mut formatted = String::new();
    write!(formatted, "{}", timestamp.format(format))
        .map_err(|_| eval_error(format!("invalid date format '{format}'")))?;
    Ok(Value::String(formatted))
}

fn parse_timestamp(input: &Value, function: &str) -> AppResult<Value> {
    let Value::String(text) = input else {
        return Err(type_error(input, function));
    };

    NaiveDateTime::parse_from_str(text, ISO8601_FORMAT)
        .map(|timestamp| timestamp.and_utc().timestamp())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|timestamp| timestamp.timestamp()))
        .map(Value::from)
        .map_err(|_| {
            eval_error(format!(
                "date \"{text}\" does not match format \"{ISO8601_FORMAT}\""
            ))
        })
}

fn has_key(input: &Value, key: &Value) -> AppResult<bool> {
    match (input, key) {
        (Value::Object(map), Value::String(name)) => Ok(map.contains_key(name)),
        (Value::Array(items), Value::Number(position)) => {
            let position = position.as_f64().unwrap_or(-1.0);
            Ok(position >= 0.0 && position < items.len() as f64)
        }
        _ => Err(eval_error(format!(
            "cannot check whether {} has {}",
            type_name(input),
            describe_key(key)
        ))),
    }
}

fn contains(container: &Value, element: &Value) -> AppResult<Value> {
    if type_name(container) != type_name(element) {
        return Err(eval_error(format!(
            "{} and {} cannot have their containment checked",
            describe_value(container),
            describe_value(element)
        )));
    }

    Ok(Value::Bool(contains_value(container, element)))
}

fn contains_value(container: &Value, element: &Value) -> bool {
    match (container, element) {
        (Value::Object(container), Value::Object(element)) => {
            element.iter().all(|(key, wanted)| {
                container
                    .get(key)
                    .is_some_and(|value| contains_value(value, wanted))
            })
        }
        (Value::Array(container), Value::Array(element)) => element.iter().all(|wanted| {
            container
                .iter()
                .any(|candidate| contains_value(candidate, wanted))
        }),
        (Value::String(container), Value::String(element)) => {
            container.contains(element.as_str())
        }
        _ => compare_values(container, element) == Ordering::Equal,
    }
}

fn string_predicate(
    input: &Value,
    argument: &Ast,
    function: &str,
    predicate: fn(&str, &str) -> bool,
) -> AppResult<Vec<Value>> {
    let Value::String(text) = input else {
        return Err(type_error(input, function));
    };

    evaluate(argument, input)?
        .iter()
        .map(|argument| match argument {
            Value::String(argument) => Ok(Value::Bool(predicate(text, argument))),
            other => Err(type_error(other, function)),
        })
        .collect()
}

fn test_regex(input: &Value, pattern: &Ast, flags: Option<&Ast>) -> AppResult<Vec<Value>> {
    let Value::String(text) = input else {
        return Err(type_error(input, "test"));
    };
    let flag_values = match flags {
        Some(flags) => evaluate(flags, input)?,
        None => one(Value::Null),
    };

    let mut outputs = Vec::new();
    for pattern in evaluate(pattern, input)? {
        for flags in &flag_values {
            outputs.push(Value::Bool(compile_regex(&pattern, flags)?.is_match(text)));
        }
    }
    Ok(outputs)
}

fn compile_regex(pattern: &Value, flags: &Value) -> AppResult<Regex> {
    let Value::String(pattern) = pattern else {
        return Err(type_error(pattern, "test"));
    };

    let mut builder = RegexBuilder::new(pattern);
    match flags {
        Value::Null => {}
        Value::String(flags) => {
            for flag in flags.chars() {
                match flag {
                    'i' => {
                        builder.case_insensitive(true);
                    }
                    'x' => {
                        builder.ignore_whitespace(true);
                    }
                    's' => {
                        builder.dot_matches_new_line(true);
                    }
                    'g' | 'n' => {}
                    other => {
                        return Err(eval_error(format!("{other} is not a valid regex flag")));
                    }
                }
            }
        }
        other => return Err(type_error(other, "test")),
    }

    builder
        .build()
        .map_err(|error| eval_error(format!("invalid regex '{pattern}': {error}")))
}

fn join(input: &Value, separator: &Value) -> AppResult<Value> {
    let Value::String(separator) = separator else {
        return Err(type_error(separator, "join"));
    };
    let parts = iterate_value(input)?
        .into_iter()
        .map(|item| match item {
            Value::Null => Ok(String::new()),
            Value::String(text) => Ok(text),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(type_error(&other, "join")),
        })
        .collect::<AppResult<Vec<String>>>()?;

    Ok(Value::String(parts.join(separator.as_str())))
}

/// A path into a value together with the value found there.
type PathValue = (Vec<Value>, Value);

fn paths(ast: &Ast, input: &Value) -> AppResult<Vec<PathValue>> {
    match ast {
        Ast::Identity => Ok(vec![(Vec::new(), input.clone())]),
        Ast::Index { target, key } => {
            let keys = evaluate(key, input)?;
            let mut found = Vec::new();
            for (path, value) in paths(target, input)? {
                for key in &keys {
                    let mut extended = path.clone();
                    extended.push(key.clone());
                    found.push((extended, index_value(&value, key)?));
                }
            }
            Ok(found)
        }
        Ast::Iterate(target) => {
            let mut found = Vec::new();
            for (path, value) in paths(target, input)? {
                let children: Vec<(Value, Value)> = match &value {
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(position, item)| (Value::from(position), item.clone()))
                        .collect(),
                    Value::Object(map) => map
                        .iter()
                        .map(|(key, item)| (Value::String(key.clone()), item.clone()))
                        .collect(),
                    other => {
                        return Err(eval_error(format!(
                            "cannot iterate over {}",
                            describe_value(other)
                        )));
                    }
                };
                for (key, child) in children {
                    let mut extended = path.clone();
                    extended.push(key);
                    found.push((extended, child));
                }
            }
            Ok(found)
        }
        Ast::Pipe(lhs, rhs) => {
            let mut found = Vec::new();
            for (prefix, value) in paths(lhs, input)? {
                for (suffix, leaf) in paths(rhs, &value)? {
                    let mut path = prefix.clone();
                    path.extend(suffix);
                    found.push((path, leaf));
                }
            }
            Ok(found)
        }
        Ast::Comma(lhs, rhs) => {
            let mut found = paths(lhs, input)?;
            found.extend(paths(rhs, input)?);
            Ok(found)
        }
        Ast::Try(inner) => Ok(paths(inner, input).unwrap_or_default()),
        Ast::Call { name, args } => match (name.as_str(), args.as_slice()) {
            ("empty", []) => Ok(Vec::new()),
            ("select", [predicate]) => Ok(evaluate(predicate, input)?
                .iter()
                .filter(|value| is_truthy(value))
                .map(|_| (Vec::new(), input.clone()))
                .collect()),
            ("first", []) => {
                let key = Value::from(0);
                Ok(vec![(vec![key.clone()], index_value(input, &key)?)])
            }
            ("last", []) => {
                let key = Value::from(-1);
                Ok(vec![(vec![key.clone()], index_value(input, &key)?)])
            }
            _ => Err(eval_error(format!("{name}/{} is not a path expression", args.len()))),
        },
        _ => Err(eval_error("invalid path expression".to_owned())),
    }
}

fn delete_paths(input: &Value, selector: &Ast) -> AppResult<Value> {
    let mut targets: Vec<Value> = paths(selector, input)?
        .into_iter()
        .map(|(path, _)| Value::Array(path))
        .collect();
    // Deepest and highest indices first so earlier deletions do not shift later ones.
    targets.sort_by(|lhs, rhs| compare_values(rhs, lhs));
    targets.dedup_by(|lhs, rhs| compare_values(lhs, rhs) == Ordering::Equal);

    let mut result = input.clone();
    for target in &targets {
        if let Value::Array(path) = target {
            delete_path(&mut result, path)?;
        }
    }
    Ok(result)
}

fn delete_path(value: &mut Value, path: &[Value]) -> AppResult<()> {
    let Some((last, parents)) = path.split_last() else {
        *value = Value::Null;
        return Ok(());
    };

    let mut current = value;
    for key in parents {
        current = match (current, key) {
            (Value::Object(map), Value::String(name)) => match map.get_mut(name) {
                Some(child) => child,
                None => return Ok(()),
            },
            (Value::Array(items), Value::Number(position)) => {
                let Some(index) = array_position(items.len(), position) else {
                    return Ok(());
                };
                match items.get_mut(index) {
                    Some(child) => child,
                    None => return Ok(()),
                }
            }
            (Value::Null, _) => return Ok(()),
            (other, key) => return Err(delete_error(other, key)),
        };
    }

    match (current, last) {
        (Value::Object(map), Value::String(name)) => {
            map.remove(name);
        }
        (Value::Array(items), Value::Number(position)) => {
            if let Some(index) = array_position(items.len(), position) {
                items.remove(index);
            }
        }
        (Value::Null, _) => {}
        (other, key) => return Err(delete_error(other, key)),
    }
    Ok(())
}

fn array_position(length: usize, position: &serde_json::Number) -> Option<usize> {
    let position = position.as_f64()?.floor();
    let resolved = if position < 0.0 {
        length as f64 + position
    } else {
        position
    };

    (resolved >= 0.0 && resolved < length as f64).then_some(resolved as usize)
}

fn delete_error(target: &Value, key: &Value) -> AppError {
    eval_error(format!(
        "cannot delete {} from {}",
        describe_key(key),
        type_name(target)
    ))
}
