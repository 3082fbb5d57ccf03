//! TwiML rendering for call setup.

/// TwiML verbs the call-setup endpoint emits.
#[derive(Debug, Clone, PartialEq)]
pub enum TwimlVerb {
    /// Open a bidirectional media stream to `stream_url`.
    Connect { stream_url: String },
}

/// Render a TwiML `<Response>` document.
pub fn render_twiml(verbs: &[TwimlVerb]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");

    for verb in verbs {
        match verb {
            TwimlVerb::Connect { stream_url } => {
                xml.push_str("  <Connect>\n");
                xml.push_str(&format!(
                    "    <Stream url=\"{}\"/>\n",
                    xml_escape(stream_url)
                ));
                xml.push_str("  </Connect>\n");
            }
        }
    }

    xml.push_str("</Response>");
    xml
}

/// Stream URL for the relay endpoint on `host`, carrying the chosen voice.
pub fn media_stream_url(host: &str, voice: &str) -> String {
    let mut url = format!("wss://{host}/media-stream?");
    url.push_str(
        &url::form_urlencoded::Serializer::new(String::new())
            .append_pair("voice", voice)
            .finish(),
    );
    url
}

/// Strip any `:port` suffix from a Host header value.
pub fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// Escape XML special characters for attribute and text content.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
