//! Signature base string construction (RFC 5849, section 3.4.1).
//!
//! ```text
//! ENC(METHOD) & ENC(base string URI) & ENC(normalized parameters)
//! ```

use std::collections::BTreeMap;

use url::Url;

use crate::encoding::percent_encode;
use crate::message::{Message, fields};

/// Build the signature base string of a message.
pub fn signature_base_string(message: &Message) -> String {
    format!(
        "{}&{}&{}",
        percent_encode(message.method().as_str()),
        percent_encode(&base_string_uri(message.endpoint())),
        percent_encode(&normalized_parameters(message.fields())),
    )
}

/// Normalize an endpoint: lower-case scheme and host, no default port, no
/// query or fragment.
pub fn base_string_uri(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    // `Url::port` is already `None` for the scheme's default port.
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = match url.path() {
        "" => "/",
        path => path,
    };
    format!("{scheme}://{host}{port}{path}")
}

/// Encode every signable field, sort by encoded name then encoded value and
/// join as `name=value` pairs.
pub fn normalized_parameters(all_fields: &BTreeMap<String, String>) -> String {
    let mut pairs: Vec<(String, String)> = all_fields
        .iter()
        .filter(|(name, _)| fields::is_signable(name))
        .map(|(name, value)| (percent_encode(name), percent_encode(value)))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HttpMethod, MessageType};

    #[test]
    fn test_base_string_uri_normalization() {
        let cases = [
            ("HTTP://EXAMPLE.COM:80/r%20v/X?id=123", "http://example.com/r%20v/X"),
            ("https://www.example.net:8080/?q=1", "https://www.example.net:8080/"),
            ("https://Example.com:443/a/b#frag", "https://example.com/a/b"),
            ("http://example.com", "http://example.com/"),
        ];
        for (input, expected) in cases {
            assert_eq!(base_string_uri(&Url::parse(input).unwrap()), expected);
        }
    }

    #[test]
    fn test_parameters_sorted_after_encoding() {
        let fields: BTreeMap<String, String> = [
            ("b", "2"),
            ("a", "z"),
            ("a b", "x"),
            ("oauth_signature", "ignored"),
            ("realm", "body"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(normalized_parameters(&fields), "a=z&a%20b=x&b=2&realm=body");
    }

    #[test]
    fn test_reference_base_string() {
        let message = Message::parse(
            MessageType::ResourceAuthorized,
            HttpMethod::Get,
            "http://photos.example.net/photos?file=vacation.jpg&size=original",
        )
        .unwrap()
        .with_field("oauth_consumer_key", "dpf43f3p2l4k3l03")
        .with_field("oauth_token", "nnch734d00sl2jdk")
        .with_field("oauth_signature_method", "HMAC-SHA1")
        .with_field("oauth_timestamp", "1191242096")
        .with_field("oauth_nonce", "kllo9940pd9333jh");

        assert_eq!(
            signature_base_string(&message),
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg\
             %26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh\
             %26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096\
             %26oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }
}
