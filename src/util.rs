use std::time::Duration;

pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn backoff(current: Duration, max: Duration) -> Duration {
    let next = Duration::from_secs_f64((current.as_secs_f64() * 1.5).max(1.0));
    if next > max { max } else { next }
}

pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let max = Duration::from_secs(120);
        let mut sleep = Duration::from_secs(1);
        sleep = backoff(sleep, max);
        assert_eq!(sleep, Duration::from_secs_f64(1.5));
        for _ in 0..20 {
            sleep = backoff(sleep, max);
        }
        assert_eq!(sleep, max);
    }

    #[test]
    fn transient_statuses_are_retriable() {
        assert!(retriable_status(503));
        assert!(retriable_status(429));
        assert!(!retriable_status(400));
        assert!(!retriable_status(204));
    }

    #[test]
    fn urljoin_variants() {
        assert_eq!(urljoin("https://a/b/", "query"), "https://a/b/query");
        assert_eq!(urljoin("https://a/b", "/query"), "https://a/b/query");
        assert_eq!(
            urljoin("https://a/b", "https://c/d"),
            "https://c/d"
        );
    }

    #[test]
    fn filename_guess() {
        assert_eq!(
            guess_filename_from_url("https://x/product/shakemap/grid.xml?x=1").as_deref(),
            Some("grid.xml")
        );
        assert_eq!(guess_filename_from_url("https://x/"), None);
    }
}
