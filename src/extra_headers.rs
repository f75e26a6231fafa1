
use serde_json;
use serde_json::Value;
// `preserve_order` on the serde_json dependency backs this with an
// insertion-ordered map rather than a BTreeMap, so get/set/delete cycles
// don't silently re-sort keys.
use serde_json::map::Map;
use std::fmt;
use crate::mseed_error::MSeedError;

pub const FDSN_EXTRA_HEADERS: &str = "FDSN";

/// Splits an RFC 6901 JSON Pointer into its unescaped reference tokens.
/// `""` (whole-document pointer) yields an empty token list.
fn pointer_tokens(pointer: &str) -> Result<Vec<String>, MSeedError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(MSeedError::NotFound(pointer.to_string()));
    }
    Ok(pointer[1..]
        .split('/')
        .map(|tok| tok.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Inserts `value` at `pointer`, creating intermediate JSON objects along the
/// way. Fails with `PathConflict` if an intermediate node already exists and
/// is not an object.
fn set_pointer(root: &mut Value, pointer: &str, value: Value) -> Result<(), MSeedError> {
    let tokens = pointer_tokens(pointer)?;
    if tokens.is_empty() {
        *root = value;
        return Ok(());
    }
    let mut current = root;
    for (i, tok) in tokens.iter().enumerate() {
        if !current.is_object() {
            return Err(MSeedError::PathConflict(pointer.to_string()));
        }
        let map = current.as_object_mut().unwrap();
        if i == tokens.len() - 1 {
            map.insert(tok.clone(), value);
            return Ok(());
        }
        current = map
            .entry(tok.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

/// Removes and returns the value at `pointer`. Fails with `NotFound` if any
/// segment of the path is absent.
fn delete_pointer(root: &mut Value, pointer: &str) -> Result<Value, MSeedError> {
    let tokens = pointer_tokens(pointer)?;
    if tokens.is_empty() {
        return Err(MSeedError::NotFound(pointer.to_string()));
    }
    let mut current = root;
    for (i, tok) in tokens.iter().enumerate() {
        let map = current
            .as_object_mut()
            .ok_or_else(|| MSeedError::NotFound(pointer.to_string()))?;
        if i == tokens.len() - 1 {
            return map
                .remove(tok)
                .ok_or_else(|| MSeedError::NotFound(pointer.to_string()));
        }
        current = map
            .get_mut(tok)
            .ok_or_else(|| MSeedError::NotFound(pointer.to_string()))?;
    }
    unreachable!()
}

#[derive(Debug, Clone)]
pub struct ExtraHeaders {
    raw_str: Option<String>,
    map: Map<String, Value>,
}

impl ExtraHeaders {
    pub fn new() -> ExtraHeaders {
        let map = serde_json::map::Map::new();
        ExtraHeaders {
            raw_str: None,
            map,
        }
    }

    pub fn is_parsed(&self) -> bool {
        match &self.raw_str {
            Some(_) => false,
            None => true,
        }
    }

    pub fn parse(&mut self) -> Result<(), MSeedError> {
        let raw_opt = self.raw_str.to_owned();
        self.raw_str = None;
         match raw_opt {
            Some(s) => {
                let v: Value = serde_json::from_str(&s)?;
                match v {
                    Value::Object(map) => {
                        self.map = map;
                        Ok(())
                    },
                    _ => Err(MSeedError::ExtraHeaderNotObject(v)),
                }
            },
            None => {Ok(())},
        }

    }

    pub fn get_fdsn_headers(&mut self) -> Result<&Map<String, Value>, MSeedError> {
        self.parse()?;
        if ! &self.map.contains_key(FDSN_EXTRA_HEADERS) {
            let fdsn = serde_json::map::Map::new();
            &self.map.insert(FDSN_EXTRA_HEADERS.to_string(), serde_json::Value::Object(fdsn));
        }
        let fdsn = self.map.get(FDSN_EXTRA_HEADERS).unwrap();
        match fdsn.as_object() {
            Some(fdsn_obj) => Ok(fdsn_obj),
            None => Err(MSeedError::ExtraHeaderParse(String::from("value for key=FDSN is not object in json")))
        }
    }

    /// Returns the subtree at `pointer` (RFC 6901), or `None` if the path is
    /// absent. A missing path is a normal result, not an error.
    pub fn get(&mut self, pointer: &str) -> Result<Option<Value>, MSeedError> {
        self.parse()?;
        let root = Value::Object(self.map.clone());
        Ok(root.pointer(pointer).cloned())
    }

    /// Inserts or replaces the value at `pointer`, creating intermediate
    /// objects as needed.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<(), MSeedError> {
        self.parse()?;
        let mut root = Value::Object(std::mem::take(&mut self.map));
        let result = set_pointer(&mut root, pointer, value);
        if let Value::Object(m) = root {
            self.map = m;
        }
        result
    }

    /// Removes the value at `pointer`, returning it.
    pub fn delete(&mut self, pointer: &str) -> Result<Value, MSeedError> {
        self.parse()?;
        let mut root = Value::Object(std::mem::take(&mut self.map));
        let result = delete_pointer(&mut root, pointer);
        if let Value::Object(m) = root {
            self.map = m;
        }
        result
    }

    pub fn validate(&mut self) -> Result<(), MSeedError> {
        self.parse()?;
        // make sure if FDSN is in extra headers, its value is a json Object
        match &self.map.get(FDSN_EXTRA_HEADERS) {
            Some(fdsn_obj) => {
                 match fdsn_obj.as_object() {
                    Some(_) => Ok(()),
                    None => Err(MSeedError::ExtraHeaderParse(String::from("value for key=FDSN is not object in json"))),
                }
            },
            None => Ok(())
        }
    }
}

impl Default for ExtraHeaders {
    fn default() -> Self {
        ExtraHeaders::new()
    }
}

impl From<String> for ExtraHeaders {
    fn from(s: String) -> Self {
        ExtraHeaders {
            raw_str: Some(s),
            map: Map::new(), // empty placeholder map
        }
    }
}

impl fmt::Display for ExtraHeaders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.raw_str {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "{}", Value::Object(self.map.clone())),
        }
    }
}
