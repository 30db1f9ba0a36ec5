//! Connection and identity configuration.
//!
//! # Design
//! Configuration is plain data, deserializable from any serde source, and
//! consumed once when the client is constructed. Header merging is an
//! explicit ordered fold: identity headers first, then caller headers, with a
//! later header replacing an earlier one of the same (case-insensitive) name.
//! A caller header may therefore override `X-PROJECT-ID`/`X-PROJECT-KEY`.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

pub const PROJECT_ID_HEADER: &str = "X-PROJECT-ID";
pub const PROJECT_KEY_HEADER: &str = "X-PROJECT-KEY";

pub const DEFAULT_PROTOCOL: &str = "https://";
pub const DEFAULT_HOST: &str = "api.crudly.co";
pub const DEFAULT_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudlyConfig {
    pub project_id: String,
    pub project_key: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Extra headers sent with every request, applied in order. Deserializes
    /// from a `{name: value}` object (document order kept) or a list of pairs.
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub custom_headers: Vec<(String, String)>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn deserialize_headers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
    struct HeadersVisitor;

    impl<'de> Visitor<'de> for HeadersVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of header names to values or a list of [name, value] pairs")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut headers = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                headers.push(entry);
            }
            Ok(headers)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut headers = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(entry) = seq.next_element()? {
                headers.push(entry);
            }
            Ok(headers)
        }
    }

    deserializer.deserialize_any(HeadersVisitor)
}

impl CrudlyConfig {
    pub fn new(project_id: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_key: project_key.into(),
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            custom_headers: Vec::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Protocol prefix including the separator, e.g. `http://`.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> String {
        format!("{}{}:{}", self.protocol, self.host, self.port)
    }

    /// Identity headers merged with the custom headers.
    pub fn headers(&self) -> Vec<(String, String)> {
        let identity = [
            (PROJECT_ID_HEADER.to_string(), self.project_id.clone()),
            (PROJECT_KEY_HEADER.to_string(), self.project_key.clone()),
        ];
        let mut merged: Vec<(String, String)> = Vec::with_capacity(identity.len() + self.custom_headers.len());
        for (name, value) in identity.into_iter().chain(self.custom_headers.iter().cloned()) {
            match merged.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
                Some(slot) => slot.1 = value,
                None => merged.push((name, value)),
            }
        }
        merged
    }
}
