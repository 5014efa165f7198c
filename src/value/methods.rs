use super::Value;
use crate::error::TplError;
use indexmap::IndexMap;

impl Value {
    /// Dispatch a dotted method call. Aliases (`to_s`/`to_string`,
    /// `rev`/`reverse`, ...) resolve to the same implementation. An
    /// unregistered name is always `UnknownMethod`, never a silent `Null`.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, TplError> {
        match self {
            Value::Integer(n) => integer_method(*n, method, args),
            Value::Float(f) => float_method(*f, method, args),
            Value::Str(s) => str_method(s, method, args),
            Value::Bool(b) => bool_method(*b, method, args),
            Value::List(items) => list_method(items, method, args),
            Value::Hash(map) => hash_method(map, method, args),
            Value::Tuple(items) => tuple_method(items, method, args),
            Value::Null => Err(unknown("Null", method)),
        }
    }
}

fn unknown(variant: &'static str, method: &str) -> TplError {
    TplError::UnknownMethod {
        variant,
        method: method.to_string(),
    }
}

// Every registered method is nullary; argument lists only exist so the
// arity check can reject `n.abs(1)` instead of ignoring it.
fn no_args(method: &str, args: &[Value]) -> Result<(), TplError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(TplError::ArityMismatch {
            method: method.to_string(),
            expected: 0,
            got: args.len(),
        })
    }
}

fn integer_method(n: i64, method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "abs" => Ok(Value::Integer(n.abs())),
        "to_s" | "to_string" => Ok(Value::Str(n.to_string())),
        "to_f" | "to_float" => Ok(Value::Float(n as f64)),
        "times" => {
            if n < 0 {
                return Err(TplError::InvalidArgument(format!(
                    "cannot call `times` on negative integer {n}"
                )));
            }
            // Endpoint-inclusive: 3.times is [0, 1, 2, 3].
            Ok(Value::List((0..=n).map(Value::Integer).collect()))
        }
        _ => Err(unknown("Integer", method)),
    }
}

fn float_method(f: f64, method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "abs" => Ok(Value::Float(f.abs())),
        "to_s" | "to_string" => Ok(Value::Str(f.to_string())),
        // Rounds to nearest, ties away from zero, same rule as `round`.
        "to_i" | "to_integer" => Ok(Value::Integer(f.round() as i64)),
        "round" => Ok(Value::Float(f.round())),
        "ceil" => Ok(Value::Float(f.ceil())),
        "floor" => Ok(Value::Float(f.floor())),
        _ => Err(unknown("Float", method)),
    }
}

fn str_method(s: &str, method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "trim" => Ok(Value::Str(s.trim().to_string())),
        "upper" | "to_uppercase" => Ok(Value::Str(s.to_uppercase())),
        "lower" | "to_lowercase" => Ok(Value::Str(s.to_lowercase())),
        "capitalize" => {
            let mut chars = s.chars();
            let out = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
            Ok(Value::Str(out))
        }
        "len" => Ok(Value::Integer(s.chars().count() as i64)),
        "to_s" | "to_string" => Ok(Value::Str(s.to_string())),
        "urlencode" => Ok(Value::Str(urlencode(s))),
        "urldecode" => Ok(Value::Str(urldecode(s))),
        _ => Err(unknown("Str", method)),
    }
}

fn bool_method(b: bool, method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "to_s" | "to_string" => Ok(Value::Str(b.to_string())),
        _ => Err(unknown("Bool", method)),
    }
}

fn list_method(items: &[Value], method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "enumerate" => Ok(Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| Value::Tuple(vec![Value::Integer(i as i64), v.clone()]))
                .collect(),
        )),
        "reverse" | "rev" => Ok(Value::List(items.iter().rev().cloned().collect())),
        "len" => Ok(Value::Integer(items.len() as i64)),
        "empty" | "is_empty" => Ok(Value::Bool(items.is_empty())),
        _ => Err(unknown("List", method)),
    }
}

fn hash_method(
    map: &IndexMap<String, Value>,
    method: &str,
    args: &[Value],
) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "keys" => Ok(Value::List(
            map.keys().map(|k| Value::Str(k.clone())).collect(),
        )),
        "values" => Ok(Value::List(map.values().cloned().collect())),
        "iter" => Ok(Value::List(
            map.iter()
                .map(|(k, v)| Value::Tuple(vec![Value::Str(k.clone()), v.clone()]))
                .collect(),
        )),
        "len" => Ok(Value::Integer(map.len() as i64)),
        "empty" | "is_empty" => Ok(Value::Bool(map.is_empty())),
        // Not a registered method: fall back to key access, so templates
        // can write `user.name` against a hash context.
        key => match map.get(key) {
            Some(v) => Ok(v.clone()),
            None => Err(unknown("Hash", method)),
        },
    }
}

fn tuple_method(items: &[Value], method: &str, args: &[Value]) -> Result<Value, TplError> {
    no_args(method, args)?;
    match method {
        "iter" => Ok(Value::List(items.to_vec())),
        "len" => Ok(Value::Integer(items.len() as i64)),
        _ => Err(unknown("Tuple", method)),
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn urldecode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes().peekable();

    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hi = iter.next();
                let lo = iter.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let hex = [hi, lo];
                        match u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or(""), 16) {
                            Ok(byte) => bytes.push(byte),
                            Err(_) => {
                                bytes.push(b'%');
                                bytes.push(hi);
                                bytes.push(lo);
                            }
                        }
                    }
                    (Some(hi), None) => {
                        bytes.push(b'%');
                        bytes.push(hi);
                    }
                    (None, _) => bytes.push(b'%'),
                }
            }
            b'+' => bytes.push(b' '),
            b => bytes.push(b),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_abs() {
        assert_eq!(
            Value::Integer(-5).invoke("abs", &[]).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            Value::Integer(5).invoke("abs", &[]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_times_is_endpoint_inclusive() {
        let result = Value::Integer(3).invoke("times", &[]).unwrap();
        assert_eq!(
            result,
            Value::List(vec![
                Value::Integer(0),
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
            ])
        );
    }

    #[test]
    fn test_times_negative_rejected() {
        let err = Value::Integer(-1).invoke("times", &[]).unwrap_err();
        assert!(matches!(err, TplError::InvalidArgument(_)));
    }

    #[test]
    fn test_float_to_i_rounds_half_away_from_zero() {
        assert_eq!(
            Value::Float(25.4).invoke("to_i", &[]).unwrap(),
            Value::Integer(25)
        );
        assert_eq!(
            Value::Float(25.5).invoke("to_i", &[]).unwrap(),
            Value::Integer(26)
        );
        assert_eq!(
            Value::Float(-25.5).invoke("to_i", &[]).unwrap(),
            Value::Integer(-26)
        );
        assert_eq!(
            Value::Float(25.4).invoke("to_integer", &[]).unwrap(),
            Value::Integer(25)
        );
    }

    #[test]
    fn test_integer_to_f_widens() {
        assert_eq!(
            Value::Integer(25).invoke("to_f", &[]).unwrap(),
            Value::Float(25.0)
        );
    }

    #[test]
    fn test_str_trim_keeps_internal_whitespace() {
        assert_eq!(
            Value::Str("  messy string  ".into()).invoke("trim", &[]).unwrap(),
            Value::Str("messy string".into())
        );
    }

    #[test]
    fn test_str_capitalize() {
        assert_eq!(
            Value::Str("hello world".into())
                .invoke("capitalize", &[])
                .unwrap(),
            Value::Str("Hello world".into())
        );
        assert_eq!(
            Value::Str("".into()).invoke("capitalize", &[]).unwrap(),
            Value::Str("".into())
        );
    }

    #[test]
    fn test_list_enumerate() {
        let list = Value::List(vec![Value::Str("one".into()), Value::Str("two".into())]);
        let result = list.invoke("enumerate", &[]).unwrap();
        assert_eq!(
            result,
            Value::List(vec![
                Value::Tuple(vec![Value::Integer(0), Value::Str("one".into())]),
                Value::Tuple(vec![Value::Integer(1), Value::Str("two".into())]),
            ])
        );
    }

    #[test]
    fn test_list_reverse_is_involution() {
        let list = Value::List(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
        ]);
        let twice = list
            .invoke("reverse", &[])
            .unwrap()
            .invoke("rev", &[])
            .unwrap();
        assert_eq!(twice, list);
    }

    #[test]
    fn test_hash_iter_lines_up_with_keys_and_values() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Value::Integer(2));
        map.insert("a".to_string(), Value::Integer(1));
        let hash = Value::Hash(map);

        let keys = hash.invoke("keys", &[]).unwrap();
        let values = hash.invoke("values", &[]).unwrap();
        let iter = hash.invoke("iter", &[]).unwrap();

        // Insertion order, not sorted.
        assert_eq!(
            keys,
            Value::List(vec![Value::Str("b".into()), Value::Str("a".into())])
        );
        let (Value::List(keys), Value::List(values), Value::List(pairs)) = (keys, values, iter)
        else {
            panic!("expected lists");
        };
        assert_eq!(pairs.len(), keys.len());
        assert_eq!(pairs.len(), values.len());
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(
                pair,
                &Value::Tuple(vec![keys[i].clone(), values[i].clone()])
            );
        }
    }

    #[test]
    fn test_hash_dot_falls_back_to_key() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::Str("alice".into()));
        let hash = Value::Hash(map);
        assert_eq!(
            hash.invoke("name", &[]).unwrap(),
            Value::Str("alice".into())
        );
        let err = hash.invoke("missing", &[]).unwrap_err();
        assert!(matches!(err, TplError::UnknownMethod { .. }));
    }

    #[test]
    fn test_unknown_method_never_nil() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Integer(1),
            Value::Float(1.0),
            Value::Str("x".into()),
            Value::List(vec![]),
            Value::Tuple(vec![]),
        ] {
            let err = value.invoke("definitely_not_a_method", &[]).unwrap_err();
            assert!(matches!(err, TplError::UnknownMethod { .. }));
        }
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Value::Integer(5)
            .invoke("abs", &[Value::Integer(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            TplError::ArityMismatch {
                expected: 0,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_urlencode_roundtrip() {
        let original = Value::Str("hello world&x=1".into());
        let encoded = original.invoke("urlencode", &[]).unwrap();
        assert_eq!(encoded, Value::Str("hello%20world%26x%3D1".into()));
        assert_eq!(encoded.invoke("urldecode", &[]).unwrap(), original);
    }
}
