// SPDX-License-Identifier: GPL-3.0-only

//! Classification of captured values
//!
//! The hosting UI uses this to pick an action for a capture (open a link,
//! join a network, ...). Classification never fails: anything unrecognised
//! is [`ScanPayload::Text`].

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanPayload {
    /// http(s) link
    Url(String),
    /// `WIFI:` network credentials
    Wifi {
        ssid: String,
        password: Option<String>,
        hidden: bool,
    },
    /// `tel:` number
    Phone(String),
    /// `mailto:` address, without query parameters
    Email(String),
    /// Purely numeric content, typical for retail barcodes
    Digits(String),
    Text(String),
}

impl ScanPayload {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();

        if let Some(rest) = strip_prefix_ignore_case(value, "WIFI:") {
            return parse_wifi(rest);
        }
        if starts_with_ignore_case(value, "http://") || starts_with_ignore_case(value, "https://") {
            return Self::Url(value.to_string());
        }
        if let Some(number) = strip_prefix_ignore_case(value, "tel:") {
            return Self::Phone(number.to_string());
        }
        if let Some(rest) = strip_prefix_ignore_case(value, "mailto:") {
            let address = rest.split_once('?').map_or(rest, |(address, _)| address);
            return Self::Email(address.to_string());
        }
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Digits(value.to_string());
        }

        Self::Text(value.to_string())
    }

    /// Short label for the primary action button
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Url(_) => "Open Link",
            Self::Wifi { .. } => "Connect to WiFi",
            Self::Phone(_) => "Call",
            Self::Email(_) => "Send Email",
            Self::Digits(_) | Self::Text(_) => "Copy",
        }
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if starts_with_ignore_case(value, prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

/// `S:<ssid>;T:<auth>;P:<password>;H:<hidden>;;` with `\` escapes
fn parse_wifi(fields: &str) -> ScanPayload {
    let mut ssid = String::new();
    let mut password = None;
    let mut hidden = false;

    for field in split_unescaped(fields) {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        match key {
            "S" => ssid = value.to_string(),
            "P" if !value.is_empty() => password = Some(value.to_string()),
            "H" => hidden = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }

    ScanPayload::Wifi {
        ssid,
        password,
        hidden,
    }
}

/// Split on `;` while resolving backslash escapes
fn split_unescaped(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ';' => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }

    fields
}
