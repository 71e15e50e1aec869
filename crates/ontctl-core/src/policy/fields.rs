// Typed field access over a JSON object, recording one `PolicyError` per
// missing or malformed field.

use serde_json::{Map, Value};

use super::PolicyError;

pub(crate) struct Fields<'v, 'e> {
    prefix: String,
    obj: &'v Map<String, Value>,
    errors: &'e mut Vec<PolicyError>,
}

impl<'v, 'e> Fields<'v, 'e> {
    /// `None` (with an error recorded) when `value` is not an object.
    pub(crate) fn new(
        prefix: impl Into<String>,
        value: &'v Value,
        errors: &'e mut Vec<PolicyError>,
    ) -> Option<Self> {
        let prefix = prefix.into();
        if let Value::Object(obj) = value {
            Some(Self {
                prefix,
                obj,
                errors,
            })
        } else {
            errors.push(PolicyError::new(prefix, "expected an object"));
            None
        }
    }

    pub(crate) fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    pub(crate) fn error(&mut self, name: &str, reason: impl Into<String>) {
        let field = self.path(name);
        self.errors.push(PolicyError::new(field, reason));
    }

    pub(crate) fn errors(&mut self) -> &mut Vec<PolicyError> {
        &mut *self.errors
    }

    pub(crate) fn raw(&self, name: &str) -> Option<&'v Value> {
        self.obj.get(name).filter(|v| !v.is_null())
    }

    // ── Strings ──────────────────────────────────────────────────────

    /// Present and non-empty string. Absent fields are not an error.
    pub(crate) fn opt_str(&mut self, name: &str) -> Result<Option<String>, ()> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => {
                self.error(name, "expected a string");
                Err(())
            }
        }
    }

    pub(crate) fn req_str(&mut self, name: &str) -> Option<String> {
        match self.opt_str(name) {
            Ok(Some(s)) => Some(s),
            Ok(None) => {
                self.error(name, "required");
                None
            }
            Err(()) => None,
        }
    }

    // ── Numbers ──────────────────────────────────────────────────────

    /// Non-negative integer; numeric strings are accepted.
    pub(crate) fn opt_uint(&mut self, name: &str, max: u64) -> Result<Option<u64>, ()> {
        let Some(raw) = self.raw(name) else {
            return Ok(None);
        };
        let parsed = match raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n <= max => Ok(Some(n)),
            Some(n) => {
                self.error(name, format!("{n} exceeds {max}"));
                Err(())
            }
            None => {
                self.error(name, "expected a non-negative integer");
                Err(())
            }
        }
    }

    /// TCP/UDP port, 1..=65535.
    pub(crate) fn opt_port(&mut self, name: &str) -> Result<Option<u16>, ()> {
        match self.opt_uint(name, u64::from(u16::MAX))? {
            None => Ok(None),
            Some(0) => {
                self.error(name, "port must be non-zero");
                Err(())
            }
            Some(n) => u16::try_from(n).map(Some).map_err(|_| ()),
        }
    }

    pub(crate) fn req_port(&mut self, name: &str) -> Option<u16> {
        match self.opt_port(name) {
            Ok(Some(port)) => Some(port),
            Ok(None) => {
                self.error(name, "required");
                None
            }
            Err(()) => None,
        }
    }

    pub(crate) fn opt_f64(&mut self, name: &str) -> Result<Option<f64>, ()> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
            Some(_) => {
                self.error(name, "expected a number");
                Err(())
            }
        }
    }

    // ── Booleans ─────────────────────────────────────────────────────

    pub(crate) fn opt_bool(&mut self, name: &str) -> Result<Option<bool>, ()> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => {
                self.error(name, "expected true or false");
                Err(())
            }
        }
    }

    /// Parse a string field through `FromStr`, reporting the accepted forms.
    pub(crate) fn opt_enum<T: std::str::FromStr>(
        &mut self,
        name: &str,
        accepted: &str,
    ) -> Result<Option<T>, ()> {
        let Some(raw) = self.opt_str(name)? else {
            return Ok(None);
        };
        if let Ok(v) = raw.to_lowercase().parse::<T>() {
            Ok(Some(v))
        } else {
            self.error(name, format!("'{raw}' is not one of {accepted}"));
            Err(())
        }
    }
}
