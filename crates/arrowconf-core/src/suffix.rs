//! Built-in suffix resolvers: `::atoi` and `::duration`

use std::time::Duration;

use crate::error::{Error, Result};
use crate::resolver::RegistryBuilder;
use crate::value::Value;

/// Integer coercion
pub const ATOI: &str = "atoi";
/// Duration coercion
pub const DURATION: &str = "duration";

pub(crate) fn register_builtins(builder: RegistryBuilder) -> RegistryBuilder {
    builder.suffix_fn(ATOI, atoi).suffix_fn(DURATION, duration)
}

/// Coerce a base-10 string to an integer. Integers pass through.
pub fn atoi(value: Value) -> Result<Value> {
    match value {
        Value::Integer(i) => Ok(Value::Integer(i)),
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| Error::parse(format!("parse int {:?}: {}", s, e))),
        other => Err(Error::type_coercion("an integer", other.type_name())),
    }
}

/// Coerce to a duration.
///
/// Integers count nanoseconds, strings use the humantime grammar
/// (`"1s"`, `"1h30m"`, `"250ms"`). Durations pass through.
pub fn duration(value: Value) -> Result<Value> {
    match value {
        Value::Duration(d) => Ok(Value::Duration(d)),
        Value::Integer(ticks) => u64::try_from(ticks)
            .map(|n| Value::Duration(Duration::from_nanos(n)))
            .map_err(|_| Error::parse(format!("negative duration: {}", ticks))),
        Value::String(s) => humantime::parse_duration(&s)
            .map(Value::Duration)
            .map_err(|e| Error::parse(format!("parse duration {:?}: {}", s, e))),
        other => Err(Error::type_coercion("a duration", other.type_name())),
    }
}
