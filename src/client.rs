use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::load_config;
use crate::error::format_fdsn_error;
use crate::product::UrlContent;
use crate::quake::{EarthquakeCatalog, EarthquakeDetailFeature, EarthquakeFeature};
use crate::util::{backoff, guess_filename_from_url, retriable_status, urljoin};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base event-service URL, typically
    /// `https://earthquake.usgs.gov/fdsnws/event/1`.
    pub url: String,
    /// Contact address advertised in the User-Agent, as a courtesy to the
    /// service operators. Optional.
    pub contact: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

/// Blocking client for the FDSN event web service.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,

    timeout: Duration,
    retry_max: usize,
    sleep_max: Duration,
    progress: bool,

    http: HttpClient,
}

#[derive(Debug, serde::Deserialize)]
struct CountReply {
    count: u64,
}

impl Client {
    /// Creates a client using environment variables and/or `.quakefeedrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`contact` arguments
    /// - environment variables `QUAKEFEED_URL` / `QUAKEFEED_CONTACT`
    /// - config file from `QUAKEFEED_RC` or `.quakefeedrc`
    /// - the public USGS endpoint
    pub fn new(url: Option<String>, contact: Option<String>, verify: Option<bool>) -> Result<Self> {
        let cfg = load_config(url, contact, verify)?;

        let agent = match &cfg.contact {
            Some(contact) => format!("quakefeed-rs/{} ({})", env!("CARGO_PKG_VERSION"), contact),
            None => format!("quakefeed-rs/{}", env!("CARGO_PKG_VERSION")),
        };
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent).unwrap_or(HeaderValue::from_static("quakefeed-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url,
            timeout: Duration::from_secs(60),
            retry_max: 10,
            sleep_max: Duration::from_secs(60),
            progress: true,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max;
        self
    }

    pub fn with_sleep_max(mut self, sleep_max: Duration) -> Self {
        self.sleep_max = sleep_max;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Runs a catalog query and parses the result.
    ///
    /// `params` is serialized into the query string; `format=geojson` is
    /// always added. See the service documentation for parameter names
    /// (`starttime`, `endtime`, `minmagnitude`, ...).
    pub fn query<T: Serialize>(&self, params: &T) -> Result<EarthquakeCatalog> {
        let url = urljoin(&self.url, "query");
        self.api_json(&url, Some(params))
    }

    /// Returns the number of events a query would match, without fetching
    /// them.
    pub fn count<T: Serialize>(&self, params: &T) -> Result<u64> {
        let url = urljoin(&self.url, "count");
        let reply: CountReply = self.api_json(&url, Some(params))?;
        Ok(reply.count)
    }

    /// Follows a summary feature's detail link and parses the full event
    /// record.
    pub fn detail(&self, feature: &EarthquakeFeature) -> Result<EarthquakeDetailFeature> {
        self.detail_from_url(feature.detail_url())
    }

    /// Fetches a detail document from an explicit URL.
    pub fn detail_from_url(&self, url: &str) -> Result<EarthquakeDetailFeature> {
        self.api_json::<(), _>(url, None)
    }

    /// Downloads a remote product content entry to `target`.
    ///
    /// An empty `target` falls back to the filename in the content URL.
    /// Interrupted transfers resume with a Range request.
    pub fn download(&self, content: &UrlContent, target: &Path) -> Result<PathBuf> {
        let target = if target.as_os_str().is_empty() {
            guess_filename_from_url(&content.url)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("download"))
        } else {
            target.to_path_buf()
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }

        let mut downloaded: u64 = 0;
        let mut mode_append = false;
        let mut range_from: Option<u64> = None;

        if target.exists() {
            downloaded = std::fs::metadata(&target)?.len();
            if downloaded < content.length {
                mode_append = true;
                range_from = Some(downloaded);
            }
        }

        let pb = if self.progress {
            let pb = ProgressBar::new(content.length);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .unwrap()
                .progress_chars("=>-"),
            );
            pb.set_position(downloaded);
            Some(pb)
        } else {
            None
        };

        let mut tries = 0usize;
        'download_attempt: while tries < self.retry_max {
            let mut headers = HeaderMap::new();
            if let Some(from) = range_from {
                headers.insert(RANGE, HeaderValue::from_str(&format!("bytes={}-", from))?);
            }

            let resp = self.robust_request(|| {
                self.http
                    .get(&content.url)
                    .headers(headers.clone())
                    .send()
            })?;

            let mut resp = resp.error_for_status().context("download request failed")?;
            let mut out = OpenOptions::new()
                .create(true)
                .write(true)
                .append(mode_append)
                .truncate(!mode_append)
                .open(&target)
                .with_context(|| format!("failed to open {}", target.display()))?;

            let mut buf = [0u8; 64 * 1024];
            loop {
                let n = match resp.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        tries += 1;
                        if tries >= self.retry_max {
                            return Err(e).context("download interrupted")?;
                        }

                        // resume
                        out.flush().ok();
                        downloaded = std::fs::metadata(&target)?.len();
                        range_from = Some(downloaded);
                        mode_append = true;
                        if let Some(pb) = &pb {
                            pb.set_position(downloaded);
                        }
                        info!(
                            "download interrupted at {} byte(s), resuming {}",
                            downloaded, content.url
                        );
                        thread::sleep(self.sleep_max);
                        continue 'download_attempt;
                    }
                };

                out.write_all(&buf[..n])?;
                downloaded += n as u64;
                if let Some(pb) = &pb {
                    pb.inc(n as u64);
                }
            }

            out.flush()?;

            if downloaded >= content.length {
                if let Some(pb) = &pb {
                    pb.finish_and_clear();
                }
                return Ok(target);
            }

            tries += 1;
            // short read without an I/O error; resume and retry
            downloaded = std::fs::metadata(&target)?.len();
            range_from = Some(downloaded);
            mode_append = true;
            if let Some(pb) = &pb {
                pb.set_position(downloaded);
            }
            thread::sleep(self.sleep_max);
        }

        bail!(
            "download failed: downloaded {} byte(s) out of {}",
            downloaded,
            content.length
        )
    }

    fn api_json<TReq: Serialize, TResp: DeserializeOwned>(
        &self,
        url: &str,
        params: Option<&TReq>,
    ) -> Result<TResp> {
        debug!("GET {}", url);
        let resp = self.robust_request(|| {
            let mut req = self.http.get(url).timeout(self.timeout);
            if let Some(params) = params {
                req = req.query(&[("format", "geojson")]).query(params);
            }
            req.send()
        })?;

        let status = resp.status();

        // 204 is a success status, but for this service it means the query
        // matched nothing; surface that as an error with remediation.
        if status == StatusCode::NO_CONTENT {
            return Err(format_fdsn_error(status, url, ""));
        }

        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(format_fdsn_error(status, url, &text));
        }

        serde_json::from_str::<TResp>(&text)
            .with_context(|| format!("failed to parse API JSON (url={}, status={})", url, status))
    }

    fn robust_request<F>(&self, mut f: F) -> Result<Response>
    where
        F: FnMut() -> std::result::Result<Response, reqwest::Error>,
    {
        let mut tries = 0usize;
        let mut sleep = Duration::from_secs(1);
        loop {
            let result = f();

            match result {
                Ok(resp) => {
                    if retriable_status(resp.status().as_u16()) {
                        tries += 1;
                        if tries >= self.retry_max {
                            return Ok(resp);
                        }
                        warn!(
                            "transient HTTP {} from {}, retrying",
                            resp.status(),
                            resp.url()
                        );
                        thread::sleep(sleep);
                        sleep = backoff(sleep, self.sleep_max);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    tries += 1;
                    if tries >= self.retry_max {
                        return Err(err).context("could not connect")?;
                    }
                    // timeouts / transient connection errors
                    warn!("request failed ({}), retrying", err);
                    thread::sleep(sleep);
                    sleep = backoff(sleep, self.sleep_max);
                }
            }
        }
    }
}
