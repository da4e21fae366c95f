//! Fusión determinista de settings JSON.

use serde_json::Value;

/// Deep merge: cuando ambos son objetos se fusionan recursivamente y las
/// claves de `b` reemplazan a las de `a`. En cualquier otro caso `b` tiene
/// precedencia, salvo `b == null`, que no aporta nada.
pub fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, v) in mb.iter() {
                let merged = match out.get(k) {
                    Some(existing) => merge_json(existing, v),
                    None => v.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (_, Value::Null) => a.clone(),
        (_, other) => other.clone(),
    }
}
