use std::cmp::Ordering;

use pullbridge_core::{AppError, AppResult};
use serde_json::{Map, Value};

use super::builtins::call_builtin;
use super::parser::{Ast, BinaryOp, FormatPart, number_value};

/// Upper bound for strings built by repetition.
const MAX_REPEATED_STRING_BYTES: usize = 16 * 1024 * 1024;

/// Receives each output of an expression as it is produced.
pub(super) type Emit<'a> = dyn FnMut(Value) -> AppResult<()> + 'a;

/// Runs an expression and collects every output.
pub(super) fn evaluate(ast: &Ast, input: &Value) -> AppResult<Vec<Value>> {
    let mut outputs = Vec::new();
    run(ast, input, &mut |value| {
        outputs.push(value);
        Ok(())
    })?;
    Ok(outputs)
}

/// Collects the outputs produced before the first error and drops the error.
pub(super) fn evaluate_until_error(ast: &Ast, input: &Value) -> Vec<Value> {
    let mut outputs = Vec::new();
    let _ = run(ast, input, &mut |value| {
        outputs.push(value);
        Ok(())
    });
    outputs
}

pub(super) fn run(ast: &Ast, input: &Value, emit: &mut Emit<'_>) -> AppResult<()> {
    match ast {
        Ast::Identity => emit(input.clone()),
        Ast::Literal(value) => emit(value.clone()),
        Ast::Index { target, key } => {
            let keys = evaluate(key, input)?;
            run(target, input, &mut |target_value| {
                for key_value in &keys {
                    emit(index_value(&target_value, key_value)?)?;
                }
                Ok(())
            })
        }
        Ast::Slice { target, from, to } => {
            let from_values = optional_outputs(from.as_deref(), input)?;
            let to_values = optional_outputs(to.as_deref(), input)?;
            run(target, input, &mut |target_value| {
                for to_value in &to_values {
                    for from_value in &from_values {
                        emit(slice_value(&target_value, from_value, to_value)?)?;
                    }
                }
                Ok(())
            })
        }
        Ast::Iterate(target) => run(target, input, &mut |target_value| {
            for item in iterate_value(&target_value)? {
                emit(item)?;
            }
            Ok(())
        }),
        // Errors raised downstream of `?` still propagate.
        Ast::Try(inner) => {
            for value in evaluate_until_error(inner, input) {
                emit(value)?;
            }
            Ok(())
        }
        Ast::Pipe(lhs, rhs) => run(lhs, input, &mut |intermediate| {
            run(rhs, &intermediate, &mut *emit)
        }),
        Ast::Comma(lhs, rhs) => {
            run(lhs, input, &mut *emit)?;
            run(rhs, input, emit)
        }
        Ast::Alternative(lhs, rhs) => {
            let truthy: Vec<Value> = evaluate_until_error(lhs, input)
                .into_iter()
                .filter(is_truthy)
                .collect();
            if truthy.is_empty() {
                return run(rhs, input, emit);
            }
            for value in truthy {
                emit(value)?;
            }
            Ok(())
        }
        Ast::And(lhs, rhs) => run(lhs, input, &mut |left| {
            if !is_truthy(&left) {
                return emit(Value::Bool(false));
            }
            run(rhs, input, &mut |right| emit(Value::Bool(is_truthy(&right))))
        }),
        Ast::Or(lhs, rhs) => run(lhs, input, &mut |left| {
            if is_truthy(&left) {
                return emit(Value::Bool(true));
            }
            run(rhs, input, &mut |right| emit(Value::Bool(is_truthy(&right))))
        }),
        Ast::Binary { op, lhs, rhs } => {
            let left_values = evaluate(lhs, input)?;
            run(rhs, input, &mut |right| {
                for left in &left_values {
                    emit(apply_binary(*op, left, &right)?)?;
                }
                Ok(())
            })
        }
        Ast::Negate(inner) => run(inner, input, &mut |value| match value.as_f64() {
            Some(number) => emit(number_value(-number)),
            None => Err(eval_error(format!(
                "{} cannot be negated",
                describe_value(&value)
            ))),
        }),
        Ast::Array(inner) => match inner {
            Some(inner) => emit(Value::Array(evaluate(inner, input)?)),
            None => emit(Value::Array(Vec::new())),
        },
        Ast::Object(entries) => {
            for object in build_objects(entries, input)? {
                emit(object)?;
            }
            Ok(())
        }
        Ast::If {
            branches,
            otherwise,
        } => run_if(branches, otherwise.as_deref(), input, emit),
        Ast::Call { name, args } => {
            for value in call_builtin(name.as_str(), args, input)? {
                emit(value)?;
            }
            Ok(())
        }
        Ast::Format(parts) => {
            for text in format_strings(parts, input)? {
                emit(Value::String(text))?;
            }
            Ok(())
        }
    }
}

fn optional_outputs(ast: Option<&Ast>, input: &Value) -> AppResult<Vec<Value>> {
    match ast {
        Some(ast) => evaluate(ast, input),
        None => Ok(vec![Value::Null]),
    }
}

fn run_if(
    branches: &[(Ast, Ast)],
    otherwise: Option<&Ast>,
    input: &Value,
    emit: &mut Emit<'_>,
) -> AppResult<()> {
    let Some(((condition, body), rest)) = branches.split_first() else {
        return match otherwise {
            Some(otherwise) => run(otherwise, input, emit),
            None => emit(input.clone()),
        };
    };

    run(condition, input, &mut |condition_value| {
        if is_truthy(&condition_value) {
            run(body, input, &mut *emit)
        } else {
            run_if(rest, otherwise, input, &mut *emit)
        }
    })
}

fn build_objects(entries: &[(Ast, Ast)], input: &Value) -> AppResult<Vec<Value>> {
    let mut partials = vec![Map::new()];

    for (key_ast, value_ast) in entries {
        let keys = evaluate(key_ast, input)?;
        let values = evaluate(value_ast, input)?;
        let mut next = Vec::with_capacity(partials.len() * keys.len() * values.len());

        for partial in &partials {
            for key in &keys {
                let Value::String(key) = key else {
                    return Err(eval_error(format!(
                        "object keys must be strings, got {}",
                        type_name(key)
                    )));
                };
                for value in &values {
                    let mut object = partial.clone();
                    object.insert(key.clone(), value.clone());
                    next.push(object);
                }
            }
        }

        partials = next;
    }

    Ok(partials.into_iter().map(Value::Object).collect())
}

fn format_strings(parts: &[FormatPart], input: &Value) -> AppResult<Vec<String>> {
    let mut partials = vec![String::new()];

    for part in parts {
        match part {
            FormatPart::Literal(text) => {
                for partial in &mut partials {
                    partial.push_str(text);
                }
            }
            FormatPart::Expr(ast) => {
                let values = evaluate(ast, input)?;
                let mut next = Vec::with_capacity(partials.len() * values.len());
                for partial in &partials {
                    for value in &values {
                        next.push(format!("{partial}{}", to_text(value)));
                    }
                }
                partials = next;
            }
        }
    }

    Ok(partials)
}

/// Strings as-is, everything else as compact JSON.
pub(super) fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(super) fn index_value(target: &Value, key: &Value) -> AppResult<Value> {
    match (target, key) {
        (Value::Object(map), Value::String(name)) => {
            Ok(map.get(name).cloned().unwrap_or(Value::Null))
        }
        (Value::Null, Value::String(_) | Value::Number(_)) => Ok(Value::Null),
        (Value::Array(items), Value::Number(position)) => {
            let position = position.as_f64().unwrap_or_default().floor();
            let length = items.len() as f64;
            let resolved = if position < 0.0 {
                length + position
            } else {
                position
            };
            if resolved < 0.0 || resolved >= length {
                return Ok(Value::Null);
            }
            Ok(items[resolved as usize].clone())
        }
        _ => Err(eval_error(format!(
            "cannot index {} with {}",
            type_name(target),
            describe_key(key)
        ))),
    }
}

fn slice_value(target: &Value, from: &Value, to: &Value) -> AppResult<Value> {
    let bounds = |length: usize| -> AppResult<(usize, usize)> {
        let resolve = |bound: &Value, default: usize| -> AppResult<usize> {
            match bound {
                Value::Null => Ok(default),
                Value::Number(number) => {
                    let number = number.as_f64().unwrap_or_default().floor();
                    let resolved = if number < 0.0 {
                        length as f64 + number
                    } else {
                        number
                    };
                    Ok(resolved.clamp(0.0, length as f64) as usize)
                }
                other => Err(eval_error(format!(
                    "slice bounds must be numbers, got {}",
                    type_name(other)
                ))),
            }
        };
        let start = resolve(from, 0)?;
        let end = resolve(to, length)?;
        Ok((start, end.max(start)))
    };

    match target {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let (start, end) = bounds(items.len())?;
            Ok(Value::Array(items[start..end].to_vec()))
        }
        Value::String(content) => {
            let chars: Vec<char> = content.chars().collect();
            let (start, end) = bounds(chars.len())?;
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        other => Err(eval_error(format!("cannot slice {}", type_name(other)))),
    }
}

pub(super) fn iterate_value(target: &Value) -> AppResult<Vec<Value>> {
    match target {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(eval_error(format!(
            "cannot iterate over {}",
            describe_value(other)
        ))),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> AppResult<Value> {
    match op {
        BinaryOp::Add => add_values(left, right),
        BinaryOp::Subtract => subtract_values(left, right),
        BinaryOp::Multiply => multiply_values(left, right),
        BinaryOp::Divide => divide_values(left, right),
        BinaryOp::Modulo => modulo_values(left, right),
        BinaryOp::Equal => Ok(Value::Bool(compare_values(left, right) == Ordering::Equal)),
        BinaryOp::NotEqual => Ok(Value::Bool(compare_values(left, right) != Ordering::Equal)),
        BinaryOp::Less => Ok(Value::Bool(compare_values(left, right) == Ordering::Less)),
        BinaryOp::LessOrEqual => Ok(Value::Bool(
            compare_values(left, right) != Ordering::Greater,
        )),
        BinaryOp::Greater => Ok(Value::Bool(
            compare_values(left, right) == Ordering::Greater,
        )),
        BinaryOp::GreaterOrEqual => {
            Ok(Value::Bool(compare_values(left, right) != Ordering::Less))
        }
    }
}

pub(super) fn add_values(left: &Value, right: &Value) -> AppResult<Value> {
    match (left, right) {
        (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
        (Value::Number(lhs), Value::Number(rhs)) => Ok(number_value(
            lhs.as_f64().unwrap_or_default() + rhs.as_f64().unwrap_or_default(),
        )),
        (Value::String(lhs), Value::String(rhs)) => Ok(Value::String(format!("{lhs}{rhs}"))),
        (Value::Array(lhs), Value::Array(rhs)) => {
            let mut combined = lhs.clone();
            combined.extend(rhs.iter().cloned());
            Ok(Value::Array(combined))
        }
        (Value::Object(lhs), Value::Object(rhs)) => {
            let mut merged = lhs.clone();
            for (key, value) in rhs {
                merged.insert(key.clone(), value.clone());
            }
            Ok(Value::Object(merged))
        }
        _ => Err(operand_error(left, right, "added")),
    }
}

fn subtract_values(left: &Value, right: &Value) -> AppResult<Value> {
    match (left, right) {
        (Value::Number(lhs), Value::Number(rhs)) => Ok(number_value(
            lhs.as_f64().unwrap_or_default() - rhs.as_f64().unwrap_or_default(),
        )),
        (Value::Array(lhs), Value::Array(rhs)) => Ok(Value::Array(
            lhs.iter()
                .filter(|item| {
                    !rhs.iter()
                        .any(|removed| compare_values(item, removed) == Ordering::Equal)
                })
                .cloned()
                .collect(),
        )),
        _ => Err(operand_error(left, right, "subtracted")),
    }
}

fn multiply_values(left: &Value, right: &Value) -> AppResult<Value> {
    match (left, right) {
        (Value::Number(lhs), Value::Number(rhs)) => Ok(number_value(
            lhs.as_f64().unwrap_or_default() * rhs.as_f64().unwrap_or_default(),
        )),
        (Value::String(text), Value::Number(times)) | (Value::Number(times), Value::String(text)) => {
            let times = times.as_f64().unwrap_or_default();
            if times.is_nan() || times <= 0.0 {
                return Ok(Value::Null);
            }
            repeat_string(text, times)
        }
        (Value::Object(lhs), Value::Object(rhs)) => Ok(Value::Object(deep_merge(lhs, rhs))),
        _ => Err(operand_error(left, right, "multiplied")),
    }
}

fn repeat_string(text: &str, times: f64) -> AppResult<Value> {
    if text.is_empty() {
        return Ok(Value::String(String::new()));
    }
    let too_long = || {
        eval_error(format!(
            "repeating a string {times} times exceeds {MAX_REPEATED_STRING_BYTES} bytes"
        ))
    };
    // Saturating cast; the byte check below rejects anything that large.
    let count = times.ceil() as usize;
    let length = text.len().checked_mul(count).ok_or_else(too_long)?;
    if length > MAX_REPEATED_STRING_BYTES {
        return Err(too_long());
    }

    Ok(Value::String(text.repeat(count)))
}

fn divide_values(left: &Value, right: &Value) -> AppResult<Value> {
    match (left, right) {
        (Value::Number(lhs), Value::Number(rhs)) => {
            let divisor = rhs.as_f64().unwrap_or_default();
            if divisor == 0.0 {
                return Err(operand_error(left, right, "divided because the divisor is zero"));
            }
            Ok(number_value(lhs.as_f64().unwrap_or_default() / divisor))
        }
        (Value::String(text), Value::String(separator)) => Ok(split_string(text, separator)),
        _ => Err(operand_error(left, right, "divided")),
    }
}

fn modulo_values(left: &Value, right: &Value) -> AppResult<Value> {
    match (left, right) {
        (Value::Number(lhs), Value::Number(rhs)) => {
            let divisor = rhs.as_f64().unwrap_or_default().trunc() as i64;
            if divisor == 0 {
                return Err(operand_error(left, right, "divided because the divisor is zero"));
            }
            let dividend = lhs.as_f64().unwrap_or_default().trunc() as i64;
            // `i64::MIN % -1` overflows; its remainder is zero like every `x % -1`.
            Ok(Value::from(dividend.wrapping_rem(divisor)))
        }
        _ => Err(operand_error(left, right, "divided")),
    }
}

fn deep_merge(lhs: &Map<String, Value>, rhs: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = lhs.clone();
    for (key, value) in rhs {
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

pub(super) fn split_string(text: &str, separator: &str) -> Value {
    if text.is_empty() {
        return Value::Array(Vec::new());
    }
    if separator.is_empty() {
        return Value::Array(
            text.chars()
                .map(|character| Value::String(character.to_string()))
                .collect(),
        );
    }

    Value::Array(
        text.split(separator)
            .map(|part| Value::String(part.to_owned()))
            .collect(),
    )
}

pub(super) fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order across JSON values.
pub(super) fn compare_values(left: &Value, right: &Value) -> Ordering {
    let rank_order = type_rank(left).cmp(&type_rank(right));
    if rank_order != Ordering::Equal {
        return rank_order;
    }

    match (left, right) {
        (Value::Number(lhs), Value::Number(rhs)) => lhs
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&rhs.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),
        (Value::Array(lhs), Value::Array(rhs)) => {
            for (left_item, right_item) in lhs.iter().zip(rhs) {
                let order = compare_values(left_item, right_item);
                if order != Ordering::Equal {
                    return order;
                }
            }
            lhs.len().cmp(&rhs.len())
        }
        (Value::Object(lhs), Value::Object(rhs)) => {
            let mut left_keys: Vec<&String> = lhs.keys().collect();
            let mut right_keys: Vec<&String> = rhs.keys().collect();
            left_keys.sort();
            right_keys.sort();
            let key_order = left_keys.cmp(&right_keys);
            if key_order != Ordering::Equal {
                return key_order;
            }
            for key in left_keys {
                let order = compare_values(&lhs[key], &rhs[key]);
                if order != Ordering::Equal {
                    return order;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

pub(super) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(super) fn describe_value(value: &Value) -> String {
    format!("{} ({value})", type_name(value))
}

pub(super) fn describe_key(key: &Value) -> String {
    match key {
        Value::String(name) => format!("\"{name}\""),
        other => type_name(other).to_owned(),
    }
}

pub(super) fn type_error(value: &Value, function: &str) -> AppError {
    eval_error(format!(
        "{function} cannot be applied to {}",
        describe_value(value)
    ))
}

fn operand_error(left: &Value, right: &Value, verb: &str) -> AppError {
    eval_error(format!(
        "{} and {} cannot be {verb}",
        describe_value(left),
        describe_value(right)
    ))
}

pub(super) fn eval_error(message: String) -> AppError {
    AppError::Transform(message)
}
