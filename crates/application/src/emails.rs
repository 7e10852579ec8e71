//! Composition of magic-link and verification emails.
//!
//! Links are built with `url` so query values (notably the email address)
//! are form-encoded; the raw token travels only inside these links.

use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, EmailAddress};
use url::Url;

/// Query parameters embedded in a verify link.
pub(crate) struct VerifyLink<'a> {
    /// Base verify URL (page that posts to /verifyToken).
    pub base_url: &'a str,
    /// Raw token, as minted.
    pub token: &'a str,
    /// Subscriber email.
    pub email: &'a EmailAddress,
    /// Optional post-verification redirect.
    pub forward_url: Option<&'a str>,
    /// Optional validated channel ids carried through the link.
    pub opt_ins: Option<&'a [ChannelId]>,
}

pub(crate) fn build_verify_link(link: &VerifyLink<'_>) -> AppResult<String> {
    let mut url = Url::parse(link.base_url)
        .map_err(|error| AppError::Validation(format!("invalid verify URL: {error}")))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("token", link.token);
        pairs.append_pair("email", link.email.as_str());

        if let Some(forward_url) = link.forward_url {
            pairs.append_pair("forwardUrl", forward_url);
        }

        if let Some(opt_ins) = link.opt_ins {
            let joined: Vec<String> = opt_ins.iter().map(ToString::to_string).collect();
            pairs.append_pair("optIns", &joined.join(","));
        }
    }

    Ok(url.into())
}

pub(crate) fn build_unsubscribe_link(
    base_url: &str,
    email: &EmailAddress,
    signature: &str,
) -> AppResult<String> {
    let mut url = Url::parse(base_url)
        .map_err(|error| AppError::Validation(format!("invalid unsubscribe URL: {error}")))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("email", email.as_str());
        pairs.append_pair("hash", signature);
    }

    Ok(url.into())
}

/// Renders the HTML body: caller-supplied or default message, the link
/// anchor, and an optional unsubscribe footer.
pub(crate) fn render_html_body(
    message: &str,
    link: &str,
    link_text: &str,
    unsubscribe_link: Option<&str>,
) -> String {
    let mut body = format!("{message}\n<p><a href=\"{link}\"><b>{link_text}</b></a></p>\n");

    if let Some(unsubscribe_link) = unsubscribe_link {
        body.push_str(&format!(
            "<p><a href=\"{unsubscribe_link}\">Unsubscribe</a></p>\n"
        ));
    }

    body
}

/// Plain-text fallback carrying the same link.
pub(crate) fn render_text_body(lead: &str, link: &str) -> String {
    format!("{lead}\n{link}\n")
}

#[cfg(test)]
mod tests {
    use linkletter_domain::{ChannelId, EmailAddress};

    use super::{VerifyLink, build_unsubscribe_link, build_verify_link, render_html_body};

    fn email() -> EmailAddress {
        EmailAddress::new("a@x.com").unwrap_or_else(|_| panic!("test email"))
    }

    #[test]
    fn verify_link_encodes_token_and_email() {
        let email = email();
        let link = build_verify_link(&VerifyLink {
            base_url: "https://h/verify",
            token: "deadbeef",
            email: &email,
            forward_url: None,
            opt_ins: None,
        })
        .unwrap_or_else(|_| panic!("link failed"));

        assert_eq!(link, "https://h/verify?token=deadbeef&email=a%40x.com");
    }

    #[test]
    fn verify_link_carries_forward_url_and_opt_ins() {
        let email = email();
        let channel = ChannelId::new();
        let link = build_verify_link(&VerifyLink {
            base_url: "https://h/verify",
            token: "t",
            email: &email,
            forward_url: Some("https://h/after"),
            opt_ins: Some(&[channel]),
        })
        .unwrap_or_else(|_| panic!("link failed"));

        assert!(link.contains("forwardUrl=https%3A%2F%2Fh%2Fafter"));
        assert!(link.contains(&format!("optIns={channel}")));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let email = email();
        let result = build_verify_link(&VerifyLink {
            base_url: "not a url",
            token: "t",
            email: &email,
            forward_url: None,
            opt_ins: None,
        });

        assert!(result.is_err());
    }

    #[test]
    fn unsubscribe_link_embeds_email_and_signature() {
        let email = email();
        let link = build_unsubscribe_link("https://h/unsubscribe", &email, "sig")
            .unwrap_or_else(|_| panic!("link failed"));

        assert_eq!(link, "https://h/unsubscribe?email=a%40x.com&hash=sig");
    }

    #[test]
    fn html_body_includes_unsubscribe_footer_when_configured() {
        let body = render_html_body("<p>Hi</p>", "https://h/v?x=1", "Login", Some("https://h/u"));

        assert!(body.contains("<p>Hi</p>"));
        assert!(body.contains("<a href=\"https://h/v?x=1\"><b>Login</b></a>"));
        assert!(body.contains("<a href=\"https://h/u\">Unsubscribe</a>"));
    }
}
