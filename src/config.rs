use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

/// Public USGS endpoint of the FDSN event service.
pub(crate) const DEFAULT_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    contact: Option<String>,
    verify: Option<bool>,
}

/// Resolves client configuration from (in order of precedence): explicit
/// arguments, `QUAKEFEED_URL` / `QUAKEFEED_CONTACT` environment variables,
/// a `.quakefeedrc` file, and finally the public USGS endpoint. Unlike
/// credentialed services, nothing here is mandatory.
pub(crate) fn load_config(
    url: Option<String>,
    contact: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("QUAKEFEED_URL").ok());
    let mut contact = contact.or_else(|| std::env::var("QUAKEFEED_CONTACT").ok());
    let mut file_verify: Option<bool> = None;

    if url.is_none() || contact.is_none() || verify.is_none() {
        for rc_path in rc_candidates() {
            if rc_path.exists() {
                let cfg = read_rc(&rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;

                if url.is_none() {
                    url = cfg.url;
                }
                if contact.is_none() {
                    contact = cfg.contact;
                }
                file_verify = cfg.verify;
                break;
            }
        }
    }

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        contact,
        verify: verify.or(file_verify).unwrap_or(true),
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let value = strip_quotes(value.trim());
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "url" => cfg.url = Some(value.to_string()),
                "contact" => cfg.contact = Some(value.to_string()),
                "verify" => cfg.verify = Some(value != "0"),
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // Search order: QUAKEFEED_RC (explicit), then the working directory,
    // then the home directory.
    if let Ok(p) = std::env::var("QUAKEFEED_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".quakefeedrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".quakefeedrc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_parsing_with_comments_and_quotes() {
        let cfg = parse_rc(
            "# local override\nurl: https://mirror.example/fdsnws/event/1\ncontact: 'ops@example.org'\nverify: 0\n",
        );
        assert_eq!(
            cfg.url.as_deref(),
            Some("https://mirror.example/fdsnws/event/1")
        );
        assert_eq!(cfg.contact.as_deref(), Some("ops@example.org"));
        assert_eq!(cfg.verify, Some(false));
    }

    #[test]
    fn rc_ignores_unknown_keys_and_blank_values() {
        let cfg = parse_rc("token: abc\nurl:\n");
        assert_eq!(cfg, RcConfig::default());
    }

    #[test]
    fn strip_quotes_variants() {
        assert_eq!(strip_quotes("\"a\""), "a");
        assert_eq!(strip_quotes("'a'"), "a");
        assert_eq!(strip_quotes("a"), "a");
        assert_eq!(strip_quotes("\"a"), "\"a");
    }
}
