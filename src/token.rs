//! Action token codec.
//!
//! A token is the opaque string attached to a keyboard button and delivered
//! back by the chat platform when that button is pressed. It encodes four
//! fields: namespace, menu id, render id, and button id. Each field is
//! percent-encoded, so the `:` delimiter can never appear inside a field.
//!
//! The codec is a pure transport encoding. It does not check whether the
//! referenced render or button still exists; resolving a token against
//! stored session state is the navigation controller's job.

use std::fmt;

/// Namespace used when the configuration does not override it.
pub const DEFAULT_NAMESPACE: &str = "mm";

const SEPARATOR: char = ':';

/// Decoded form of an action token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    pub menu_id: String,
    pub render_id: String,
    pub button_id: String,
}

impl ActionToken {
    pub fn new(
        menu_id: impl Into<String>,
        render_id: impl Into<String>,
        button_id: impl Into<String>,
    ) -> Self {
        Self {
            menu_id: menu_id.into(),
            render_id: render_id.into(),
            button_id: button_id.into(),
        }
    }

    /// Encode this token under `namespace`.
    pub fn encode(&self, namespace: &str) -> String {
        let mut out = String::new();
        for (i, segment) in [
            namespace,
            self.menu_id.as_str(),
            self.render_id.as_str(),
            self.button_id.as_str(),
        ]
        .into_iter()
        .enumerate()
        {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(&urlencoding::encode(segment));
        }
        out
    }

    /// Decode `raw` as a token in `namespace`.
    ///
    /// Returns `None` for foreign callback data: anything not prefixed with
    /// `namespace` + `:`, with fewer than four segments, or with a segment
    /// that fails to percent-decode.
    pub fn decode(raw: &str, namespace: &str) -> Option<Self> {
        let encoded_ns = urlencoding::encode(namespace).into_owned();
        let rest = raw.strip_prefix(&encoded_ns)?.strip_prefix(SEPARATOR)?;

        let mut segments = rest.split(SEPARATOR);
        let menu_id = decode_segment(segments.next()?)?;
        let render_id = decode_segment(segments.next()?)?;
        let button_id = decode_segment(segments.next()?)?;

        Some(Self {
            menu_id,
            render_id,
            button_id,
        })
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.menu_id, self.render_id, self.button_id)
    }
}

fn decode_segment(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|cow| cow.into_owned())
}
