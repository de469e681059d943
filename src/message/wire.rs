//! Transmittable message form.
//!
//! A [`WireMessage`] is what the channel hands to transport after
//! [`Channel::prepare_outgoing`](crate::channel::Channel::prepare_outgoing) and
//! what transport hands back to
//! [`Channel::process_incoming`](crate::channel::Channel::process_incoming).
//! Protocol fields travel in one of three places:
//!
//! ```text
//! AuthorizationHeader: Authorization: OAuth oauth_consumer_key="...", ...
//! PostForm:            application/x-www-form-urlencoded body
//! Query:               URL query string
//! ```

use std::collections::BTreeMap;

use url::Url;

use crate::encoding::{percent_decode, percent_encode};
use crate::error::OAuthError;
use crate::message::{HttpMethod, Message, fields};

/// Content type of form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Where the protocol fields are placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMethod {
    /// Protocol fields in the `Authorization` header, application fields in
    /// the body (for methods with a body) or query.
    #[default]
    AuthorizationHeader,
    /// Every field in a form body.
    PostForm,
    /// Every field in the URL query.
    Query,
}

/// A message in its transmittable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// HTTP method
    pub method: HttpMethod,
    /// Request URL including any query string
    pub url: Url,
    /// Value of the `Authorization` header, if any
    pub authorization: Option<String>,
    /// Form-encoded body, if any
    pub body: Option<String>,
}

impl WireMessage {
    /// Render a message for transport.
    pub fn from_message(message: &Message, delivery: DeliveryMethod) -> Self {
        let mut url = message.endpoint().clone();
        let mut authorization = None;
        let mut body = None;

        match delivery {
            DeliveryMethod::AuthorizationHeader => {
                let (protocol, application): (Vec<_>, Vec<_>) = message
                    .fields()
                    .iter()
                    .partition(|(name, _)| fields::is_protocol(name));

                authorization = Some(authorization_header(message.realm(), protocol.into_iter()));
                let encoded = encode_pairs(application.into_iter());
                if !encoded.is_empty() {
                    if message.method().has_body() {
                        body = Some(encoded);
                    } else {
                        url.set_query(Some(&encoded));
                    }
                }
            }
            DeliveryMethod::PostForm => {
                body = Some(encode_pairs(message.fields().iter()));
            }
            DeliveryMethod::Query => {
                let encoded = encode_pairs(message.fields().iter());
                if !encoded.is_empty() {
                    url.set_query(Some(&encoded));
                }
            }
        }

        Self {
            method: message.method(),
            url,
            authorization,
            body,
        }
    }

    /// Content type to send with the body, if there is one.
    pub fn content_type(&self) -> Option<&'static str> {
        self.body.as_ref().map(|_| FORM_CONTENT_TYPE)
    }

    /// The request URL without query or fragment.
    pub fn endpoint(&self) -> Url {
        let mut endpoint = self.url.clone();
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        endpoint
    }

    /// Collect the fields from header, query and body.
    ///
    /// A field that appears in more than one place with different values is
    /// rejected rather than silently picking one. The header `realm` is not a
    /// field; see [`WireMessage::realm`].
    pub fn fields(&self) -> Result<BTreeMap<String, String>, OAuthError> {
        let mut collected = BTreeMap::new();

        if let Some(header) = &self.authorization {
            for (name, value) in parse_authorization_header(header)? {
                if name != fields::REALM {
                    insert_unique(&mut collected, name, value)?;
                }
            }
        }

        for (name, value) in self.url.query_pairs() {
            insert_unique(&mut collected, name.into_owned(), value.into_owned())?;
        }

        if let Some(body) = &self.body {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
                .map_err(|e| OAuthError::InvalidMessage(format!("Invalid form body: {e}")))?;
            for (name, value) in pairs {
                insert_unique(&mut collected, name, value)?;
            }
        }

        Ok(collected)
    }

    /// The `realm` parameter of the `Authorization` header, if any.
    pub fn realm(&self) -> Result<Option<String>, OAuthError> {
        let Some(header) = &self.authorization else {
            return Ok(None);
        };
        Ok(parse_authorization_header(header)?
            .into_iter()
            .find(|(name, _)| name == fields::REALM)
            .map(|(_, value)| value))
    }
}

fn insert_unique(
    collected: &mut BTreeMap<String, String>,
    name: String,
    value: String,
) -> Result<(), OAuthError> {
    match collected.get(&name) {
        Some(existing) if *existing != value => Err(OAuthError::InvalidMessage(format!(
            "Conflicting values for field {name}"
        ))),
        Some(_) => Ok(()),
        None => {
            collected.insert(name, value);
            Ok(())
        }
    }
}

fn encode_pairs<'a>(pairs: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    pairs
        .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn authorization_header<'a>(
    realm: Option<&str>,
    pairs: impl Iterator<Item = (&'a String, &'a String)>,
) -> String {
    let params = realm
        .map(|realm| format!("{}=\"{}\"", fields::REALM, percent_encode(realm)))
        .into_iter()
        .chain(pairs.map(|(name, value)| {
            format!("{}=\"{}\"", percent_encode(name), percent_encode(value))
        }))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {params}")
}

fn parse_authorization_header(header: &str) -> Result<Vec<(String, String)>, OAuthError> {
    let header = header.trim();
    let params = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("OAuth") => rest,
        _ if header.eq_ignore_ascii_case("OAuth") => "",
        _ => {
            return Err(OAuthError::InvalidMessage(
                "Authorization header does not use the OAuth scheme".to_string(),
            ));
        }
    };

    params
        .split(',')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                OAuthError::InvalidMessage(format!("Malformed Authorization parameter: {param}"))
            })?;
            let value = value
                .trim()
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .ok_or_else(|| {
                    OAuthError::InvalidMessage(format!("Unquoted Authorization value for {name}"))
                })?;
            Ok((percent_decode(name.trim())?, percent_decode(value)?))
        })
        .collect()
}
