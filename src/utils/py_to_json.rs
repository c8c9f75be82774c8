use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};
use serde_json::{Number, Value};

/// Converts a Python value into JSON. Unknown objects fall back to their `str()`.
pub fn py_to_json(py: Python, obj: &PyAny) -> PyResult<Value> {
    if obj.is_none() { return Ok(Value::Null); }
    if let Ok(b) = obj.extract::<bool>() { return Ok(Value::Bool(b)); }
    if let Ok(s) = obj.extract::<String>() { return Ok(Value::String(s)); }
    if let Ok(i) = obj.extract::<i64>() { return Ok(Value::Number(i.into())); }
    if let Ok(f) = obj.extract::<f64>() {
        return Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        return list.iter().map(|i| py_to_json(py, i)).collect::<PyResult<Vec<_>>>().map(Value::Array);
    }
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        return tuple.iter().map(|i| py_to_json(py, i)).collect::<PyResult<Vec<_>>>().map(Value::Array);
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut map = serde_json::Map::new();
        for (k, v) in dict.iter() { map.insert(k.str()?.to_string(), py_to_json(py, v)?); }
        return Ok(Value::Object(map));
    }
    Ok(Value::String(obj.str()?.to_string()))
}
